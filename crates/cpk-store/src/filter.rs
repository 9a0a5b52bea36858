use chrono::NaiveDate;
use cpk_schemas::{
    AccountId, ContractId, EntityId, Schedule, ScheduleStatus, Transaction, TransactionKind,
};
use serde::{Deserialize, Serialize};

/// Schedule query. `None` fields do not filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleFilter {
    pub contract_id: Option<ContractId>,
    pub status: Option<ScheduleStatus>,
    /// Inclusive.
    pub due_from: Option<NaiveDate>,
    /// Inclusive.
    pub due_to: Option<NaiveDate>,
    pub entity_id: Option<EntityId>,
    pub account_id: Option<AccountId>,
}

impl ScheduleFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn for_contract(contract_id: ContractId) -> Self {
        Self {
            contract_id: Some(contract_id),
            ..Self::default()
        }
    }

    pub fn due_between(mut self, from: NaiveDate, to: NaiveDate) -> Self {
        self.due_from = Some(from);
        self.due_to = Some(to);
        self
    }

    pub fn with_status(mut self, status: ScheduleStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn matches(&self, s: &Schedule) -> bool {
        self.contract_id.map_or(true, |c| s.contract_id == c)
            && self.status.map_or(true, |st| s.status == st)
            && self.due_from.map_or(true, |d| s.due_date >= d)
            && self.due_to.map_or(true, |d| s.due_date <= d)
            && self.entity_id.map_or(true, |e| s.entity_id == e)
            && self.account_id.map_or(true, |a| s.account_id == Some(a))
    }
}

/// Transaction query. `None` fields do not filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionFilter {
    pub kind: Option<TransactionKind>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub entity_id: Option<EntityId>,
    pub account_id: Option<AccountId>,
}

impl TransactionFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn of_kind(kind: TransactionKind) -> Self {
        Self {
            kind: Some(kind),
            ..Self::default()
        }
    }

    pub fn dated_between(mut self, from: NaiveDate, to: NaiveDate) -> Self {
        self.date_from = Some(from);
        self.date_to = Some(to);
        self
    }

    pub fn matches(&self, t: &Transaction) -> bool {
        self.kind.map_or(true, |k| t.kind == k)
            && self.date_from.map_or(true, |d| t.date >= d)
            && self.date_to.map_or(true, |d| t.date <= d)
            && self.entity_id.map_or(true, |e| t.entity_id == Some(e))
            && self.account_id.map_or(true, |a| t.account_id == Some(a))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cpk_schemas::{Cents, Direction, ScheduleId, WorkspaceId};

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 2, day).unwrap()
    }

    #[test]
    fn empty_filter_matches_everything_and_ranges_are_inclusive() {
        let s = Schedule {
            id: ScheduleId::new_v4(),
            workspace_id: WorkspaceId::new_v4(),
            contract_id: ContractId::new_v4(),
            entity_id: EntityId::new_v4(),
            account_id: None,
            direction: Direction::Payable,
            amount: Cents::units(10),
            due_date: d(10),
            status: ScheduleStatus::Planned,
            sequence: 1,
            transaction_id: None,
            description: String::new(),
        };
        assert!(ScheduleFilter::all().matches(&s));
        assert!(ScheduleFilter::all().due_between(d(10), d(10)).matches(&s));
        assert!(!ScheduleFilter::all().due_between(d(11), d(20)).matches(&s));
        assert!(!ScheduleFilter::for_contract(ContractId::new_v4()).matches(&s));

        let by_account = ScheduleFilter {
            account_id: Some(AccountId::new_v4()),
            ..ScheduleFilter::all()
        };
        assert!(!by_account.matches(&s));
    }
}
