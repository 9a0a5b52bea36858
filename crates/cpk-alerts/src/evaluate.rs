//! Rule evaluation. Each rule kind maps to one function; `evaluate_rules`
//! is the dispatch table.

use chrono::{Days, NaiveDate};
use cpk_calendar::PeriodKey;
use cpk_cashflow::{CashFlowMatrix, PeriodBucket};
use cpk_money::Cents;
use cpk_schemas::{
    Contract, ContractStatus, DebitNote, DebitNoteStatus, DrillDown, Schedule, Severity,
    WorkspaceId,
};
use serde::{Deserialize, Serialize};

use crate::rules::{RuleConfig, RuleKind};

/// Everything the rules read for one tenant.
#[derive(Debug, Clone, Copy)]
pub struct TenantData<'a> {
    pub workspace_id: WorkspaceId,
    pub today: NaiveDate,
    pub matrix: &'a CashFlowMatrix,
    pub schedules: &'a [Schedule],
    pub contracts: &'a [Contract],
    pub notes: &'a [DebitNote],
}

impl TenantData<'_> {
    /// The current period and everything after it.
    fn projected(&self) -> impl Iterator<Item = &PeriodBucket> {
        let today = self.today;
        self.matrix.periods.iter().filter(move |b| b.period.end() >= today)
    }

    fn current(&self) -> Option<&PeriodBucket> {
        let key = PeriodKey::containing(self.today, self.matrix.request.granularity);
        self.matrix.bucket(key)
    }
}

/// A candidate alert produced by one rule for one target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub rule_id: String,
    pub target_key: String,
    pub severity: Severity,
    pub title: String,
    pub message: String,
    pub drill_down: DrillDown,
}

struct Emit<'r> {
    rule: &'r RuleConfig,
    out: Vec<Finding>,
}

impl Emit<'_> {
    fn push(&mut self, target_key: String, title: String, message: String, drill_down: DrillDown) {
        self.out.push(Finding {
            rule_id: self.rule.id.clone(),
            target_key,
            severity: self.rule.severity,
            title,
            message,
            drill_down,
        });
    }
}

fn cashflow_drill(data: &TenantData<'_>, period: PeriodKey) -> DrillDown {
    DrillDown::new("cashflow")
        .with("period", period)
        .with("granularity", data.matrix.request.granularity)
}

fn past(date: NaiveDate, days: u32, today: NaiveDate) -> bool {
    date.checked_add_days(Days::new(u64::from(days)))
        .map_or(false, |limit| limit < today)
}

fn negative_projected_balance(data: &TenantData<'_>, emit: &mut Emit<'_>) {
    for b in data.projected().filter(|b| b.planned_cum_adj.is_negative()) {
        emit.push(
            b.period.to_string(),
            format!("Projected balance negative in {}", b.period),
            format!("Projected balance for {} is {}", b.period, b.planned_cum_adj),
            cashflow_drill(data, b.period),
        );
    }
}

fn low_balance(data: &TenantData<'_>, threshold: Cents, emit: &mut Emit<'_>) {
    let worst = data
        .projected()
        .fold(None::<&PeriodBucket>, |acc, b| match acc {
            Some(w) if w.planned_cum_adj <= b.planned_cum_adj => Some(w),
            _ => Some(b),
        });
    if let Some(w) = worst.filter(|w| w.planned_cum_adj < threshold) {
        emit.push(
            "worst".to_string(),
            "Projected balance below threshold".to_string(),
            format!(
                "Lowest projected balance {} in {} is under {}",
                w.planned_cum_adj, w.period, threshold
            ),
            cashflow_drill(data, w.period),
        );
    }
}

fn overdue_schedule(data: &TenantData<'_>, grace_days: u32, emit: &mut Emit<'_>) {
    let overdue = data
        .schedules
        .iter()
        .filter(|s| s.workspace_id == data.workspace_id)
        .filter(|s| s.is_planned() && !s.is_linked())
        .filter(|s| past(s.due_date, grace_days, data.today));
    for s in overdue {
        emit.push(
            s.id.to_string(),
            format!("Overdue {} schedule", s.direction),
            format!("'{}' for {} was due on {}", s.description, s.amount, s.due_date),
            DrillDown::new("schedules")
                .with("contract_id", s.contract_id)
                .with("schedule_id", s.id),
        );
    }
}

fn realised_shortfall(data: &TenantData<'_>, tolerance_percent: f64, emit: &mut Emit<'_>) {
    let Some(b) = data.current() else {
        return;
    };
    let planned = b.planned_net();
    if !planned.is_positive() {
        return;
    }
    let shortfall = planned - b.realised_net();
    let allowed = planned.to_f64() * tolerance_percent / 100.0;
    if shortfall.to_f64() > allowed {
        emit.push(
            b.period.to_string(),
            format!("Realised cash short of plan in {}", b.period),
            format!(
                "Realised net {} against planned {} ({} short)",
                b.realised_net(),
                planned,
                shortfall
            ),
            cashflow_drill(data, b.period),
        );
    }
}

fn contract_ending(data: &TenantData<'_>, within_days: u32, emit: &mut Emit<'_>) {
    let Some(horizon) = data.today.checked_add_days(Days::new(u64::from(within_days))) else {
        return;
    };
    for c in data
        .contracts
        .iter()
        .filter(|c| c.workspace_id == data.workspace_id && c.status == ContractStatus::Active)
    {
        let Some(end) = c.end_date else { continue };
        if end >= data.today && end <= horizon {
            emit.push(
                c.id.to_string(),
                "Contract ending soon".to_string(),
                format!("'{}' ends on {}", c.description, end),
                DrillDown::new("contracts").with("contract_id", c.id),
            );
        }
    }
}

fn unpaid_debit_note(data: &TenantData<'_>, after_days: u32, emit: &mut Emit<'_>) {
    for n in data
        .notes
        .iter()
        .filter(|n| n.workspace_id == data.workspace_id && n.status == DebitNoteStatus::Draft)
        .filter(|n| past(n.due_on, after_days, data.today))
    {
        emit.push(
            n.id.to_string(),
            "Debit note unpaid".to_string(),
            format!("'{}' for {} was due on {}", n.description, n.total, n.due_on),
            DrillDown::new("debit_notes")
                .with("debit_note_id", n.id)
                .with("contract_id", n.contract_id),
        );
    }
}

/// Run every enabled rule, in configuration order.
pub fn evaluate_rules(rules: &[RuleConfig], data: &TenantData<'_>) -> Vec<Finding> {
    let mut out = Vec::new();
    for rule in rules.iter().filter(|r| r.enabled) {
        let mut emit = Emit {
            rule,
            out: Vec::new(),
        };
        match rule.rule {
            RuleKind::NegativeProjectedBalance => negative_projected_balance(data, &mut emit),
            RuleKind::LowBalance { threshold } => low_balance(data, threshold, &mut emit),
            RuleKind::OverdueSchedule { grace_days } => {
                overdue_schedule(data, grace_days, &mut emit)
            }
            RuleKind::RealisedShortfall { tolerance_percent } => {
                realised_shortfall(data, tolerance_percent, &mut emit)
            }
            RuleKind::ContractEnding { within_days } => {
                contract_ending(data, within_days, &mut emit)
            }
            RuleKind::UnpaidDebitNote { after_days } => {
                unpaid_debit_note(data, after_days, &mut emit)
            }
        }
        out.append(&mut emit.out);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use cpk_calendar::Granularity;
    use cpk_cashflow::{build_matrix, MatrixRequest};
    use cpk_schemas::{
        Account, AccountId, AccountKind, ContractId, Direction, EntityId, ScheduleId,
        ScheduleStatus,
    };

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, day).unwrap()
    }

    struct World {
        ws: WorkspaceId,
        entity: EntityId,
        accounts: Vec<Account>,
        schedules: Vec<Schedule>,
    }

    impl World {
        fn new(opening: i64) -> Self {
            let ws = WorkspaceId::new_v4();
            let entity = EntityId::new_v4();
            Self {
                ws,
                entity,
                accounts: vec![Account {
                    id: AccountId::new_v4(),
                    workspace_id: ws,
                    entity_id: entity,
                    name: "main".into(),
                    kind: AccountKind::Checking,
                    currency: "BRL".into(),
                    opening_balance: Cents::new(opening),
                    opening_balance_as_of: d(1, 1),
                }],
                schedules: Vec::new(),
            }
        }

        fn schedule(&mut self, dir: Direction, cents: i64, due: NaiveDate) -> ScheduleId {
            let id = ScheduleId::new_v4();
            self.schedules.push(Schedule {
                id,
                workspace_id: self.ws,
                contract_id: ContractId::new_v4(),
                entity_id: self.entity,
                account_id: None,
                direction: dir,
                amount: Cents::new(cents),
                due_date: due,
                status: ScheduleStatus::Planned,
                sequence: 1,
                transaction_id: None,
                description: "item".into(),
            });
            id
        }

        fn run(&self, today: NaiveDate, rules: &[RuleConfig]) -> Vec<Finding> {
            let req = MatrixRequest::window(today, 1, 3, Granularity::Month).unwrap();
            let matrix = build_matrix(&req, &self.accounts, &self.schedules, &[]).unwrap();
            let data = TenantData {
                workspace_id: self.ws,
                today,
                matrix: &matrix,
                schedules: &self.schedules,
                contracts: &[],
                notes: &[],
            };
            evaluate_rules(rules, &data)
        }
    }

    fn rule(kind: RuleKind) -> Vec<RuleConfig> {
        vec![RuleConfig::new("r", Severity::Warning, kind)]
    }

    #[test]
    fn negative_balance_flags_each_projected_period() {
        let mut w = World::new(10_000);
        w.schedule(Direction::Payable, 15_000, d(5, 10));
        let found = w.run(d(4, 15), &rule(RuleKind::NegativeProjectedBalance));
        let keys: Vec<&str> = found.iter().map(|f| f.target_key.as_str()).collect();
        assert_eq!(keys, vec!["2024-05", "2024-06", "2024-07"]);
        assert_eq!(found[0].drill_down.filters["period"], "2024-05");
    }

    #[test]
    fn past_periods_are_not_projected() {
        let mut w = World::new(0);
        w.schedule(Direction::Payable, 100, d(3, 1));
        w.schedule(Direction::Receivable, 100, d(4, 1));
        assert!(w.run(d(4, 15), &rule(RuleKind::NegativeProjectedBalance)).is_empty());
    }

    #[test]
    fn low_balance_reports_the_earliest_worst_period() {
        let mut w = World::new(50_000);
        w.schedule(Direction::Payable, 45_000, d(5, 1));
        let found = w.run(
            d(4, 15),
            &rule(RuleKind::LowBalance {
                threshold: Cents::new(10_000),
            }),
        );
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].target_key, "worst");
        assert_eq!(found[0].drill_down.filters["period"], "2024-05");

        let none = w.run(
            d(4, 15),
            &rule(RuleKind::LowBalance {
                threshold: Cents::new(5_000),
            }),
        );
        assert!(none.is_empty());
    }

    #[test]
    fn overdue_respects_grace_and_disabled_rules_are_skipped() {
        let mut w = World::new(0);
        let late = w.schedule(Direction::Receivable, 100, d(4, 1));
        w.schedule(Direction::Receivable, 100, d(4, 12));

        let found = w.run(d(4, 15), &rule(RuleKind::OverdueSchedule { grace_days: 3 }));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].target_key, late.to_string());

        let mut off = rule(RuleKind::OverdueSchedule { grace_days: 0 });
        off[0].enabled = false;
        assert!(w.run(d(4, 15), &off).is_empty());
    }

    #[test]
    fn shortfall_uses_the_current_period() {
        let mut w = World::new(0);
        w.schedule(Direction::Receivable, 10_000, d(4, 5));
        let found = w.run(
            d(4, 20),
            &rule(RuleKind::RealisedShortfall {
                tolerance_percent: 10.0,
            }),
        );
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].target_key, "2024-04");

        let tolerant = w.run(
            d(4, 20),
            &rule(RuleKind::RealisedShortfall {
                tolerance_percent: 100.0,
            }),
        );
        assert!(tolerant.is_empty());
    }
}
