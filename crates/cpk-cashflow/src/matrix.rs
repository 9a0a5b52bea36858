use std::collections::BTreeMap;

use chrono::NaiveDate;
use cpk_calendar::{enumerate_periods, PeriodKey};
use cpk_money::Cents;
use cpk_schemas::{Account, CoreResult, Direction, Schedule, Transaction, TransactionKind};
use serde::{Deserialize, Serialize};

use crate::scope::{MatrixRequest, Scope};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One period of the matrix. Derived, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodBucket {
    pub period: PeriodKey,
    pub planned_income: Cents,
    pub planned_expense: Cents,
    pub realised_income: Cents,
    pub realised_expense: Cents,
    pub planned_cum: Cents,
    pub realised_cum: Cents,
    pub planned_cum_adj: Cents,
    pub realised_cum_adj: Cents,
}

impl PeriodBucket {
    fn empty(period: PeriodKey) -> Self {
        Self {
            period,
            planned_income: Cents::ZERO,
            planned_expense: Cents::ZERO,
            realised_income: Cents::ZERO,
            realised_expense: Cents::ZERO,
            planned_cum: Cents::ZERO,
            realised_cum: Cents::ZERO,
            planned_cum_adj: Cents::ZERO,
            realised_cum_adj: Cents::ZERO,
        }
    }

    pub fn planned_net(&self) -> Cents {
        self.planned_income - self.planned_expense
    }

    pub fn realised_net(&self) -> Cents {
        self.realised_income - self.realised_expense
    }

    pub fn has_activity(&self) -> bool {
        !(self.planned_income.is_zero()
            && self.planned_expense.is_zero()
            && self.realised_income.is_zero()
            && self.realised_expense.is_zero())
    }
}

/// Sum of the matching accounts' opening balances.
///
/// `as_of` is the latest `opening_balance_as_of` among them, `None` when no
/// account matched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartingBalance {
    pub amount: Cents,
    pub as_of: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashFlowMatrix {
    pub request: MatrixRequest,
    pub starting_balance: StartingBalance,
    /// Strictly chronological, one entry per period in range.
    pub periods: Vec<PeriodBucket>,
}

impl CashFlowMatrix {
    pub fn bucket(&self, period: PeriodKey) -> Option<&PeriodBucket> {
        self.periods
            .binary_search_by(|b| b.period.cmp(&period))
            .ok()
            .map(|i| &self.periods[i])
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

fn starting_balance(scope: &Scope<'_>, accounts: &[Account]) -> StartingBalance {
    let matching: Vec<&Account> = accounts.iter().filter(|a| scope.includes_account(a)).collect();
    StartingBalance {
        amount: matching.iter().map(|a| a.opening_balance).sum(),
        as_of: matching.iter().map(|a| a.opening_balance_as_of).max(),
    }
}

/// Build the matrix for `req` from the tenant's accounts, schedules and
/// transactions. Rows outside the range or filter are ignored.
pub fn build_matrix(
    req: &MatrixRequest,
    accounts: &[Account],
    schedules: &[Schedule],
    transactions: &[Transaction],
) -> CoreResult<CashFlowMatrix> {
    req.validate()?;
    let scope = Scope::new(req, accounts);

    let mut buckets: BTreeMap<PeriodKey, PeriodBucket> =
        enumerate_periods(req.from, req.to, req.granularity)
            .into_iter()
            .map(|k| (k, PeriodBucket::empty(k)))
            .collect();

    for s in schedules.iter().filter(|s| scope.includes_schedule(s)) {
        let key = PeriodKey::containing(s.due_date, req.granularity);
        if let Some(b) = buckets.get_mut(&key) {
            match s.direction {
                Direction::Receivable => b.planned_income += s.amount,
                Direction::Payable => b.planned_expense += s.amount,
            }
        }
    }

    for t in transactions.iter().filter(|t| scope.includes_transaction(t)) {
        let key = PeriodKey::containing(t.date, req.granularity);
        if let Some(b) = buckets.get_mut(&key) {
            match t.kind {
                TransactionKind::Income => b.realised_income += t.amount,
                TransactionKind::Expense => b.realised_expense += t.amount,
                TransactionKind::Transfer => {}
            }
        }
    }

    let start = starting_balance(&scope, accounts);
    let mut planned_cum = Cents::ZERO;
    let mut realised_cum = Cents::ZERO;
    let periods = buckets
        .into_values()
        .map(|mut b| {
            planned_cum += b.planned_net();
            realised_cum += b.realised_net();
            b.planned_cum = planned_cum;
            b.realised_cum = realised_cum;
            b.planned_cum_adj = planned_cum + start.amount;
            b.realised_cum_adj = realised_cum + start.amount;
            b
        })
        .collect();

    Ok(CashFlowMatrix {
        request: *req,
        starting_balance: start,
        periods,
    })
}
