//! Request shape and the inclusion rules shared by matrix and drill-down.

use std::collections::HashMap;

use chrono::NaiveDate;
use cpk_calendar::{add_months, end_of_month, is_date_in_range, start_of_month, Granularity};
use cpk_schemas::{
    Account, AccountId, CoreError, CoreResult, EntityId, Schedule, ScheduleStatus, Transaction,
    TransactionKind,
};
use serde::{Deserialize, Serialize};

/// Optional narrowing of the matrix. An absent field means "unfiltered".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashFlowFilter {
    pub entity_id: Option<EntityId>,
    pub account_id: Option<AccountId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatrixRequest {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub granularity: Granularity,
    pub filter: CashFlowFilter,
}

impl MatrixRequest {
    /// Whole months from `lookback_months` before `today` to `horizon_months`
    /// after it.
    pub fn window(
        today: NaiveDate,
        lookback_months: u32,
        horizon_months: u32,
        granularity: Granularity,
    ) -> CoreResult<MatrixRequest> {
        let from = start_of_month(add_months(today, -i64::from(lookback_months))?);
        let to = end_of_month(add_months(today, i64::from(horizon_months))?);
        Ok(MatrixRequest {
            from,
            to,
            granularity,
            filter: CashFlowFilter::default(),
        })
    }

    pub fn with_filter(mut self, filter: CashFlowFilter) -> Self {
        self.filter = filter;
        self
    }

    pub(crate) fn validate(&self) -> CoreResult<()> {
        if self.to < self.from {
            return Err(CoreError::invalid(format!(
                "cash-flow range is inverted: {} > {}",
                self.from, self.to
            )));
        }
        Ok(())
    }
}

/// Inclusion predicates bound to one request.
///
/// Transactions may carry only an account; their entity is then resolved
/// through the account list.
pub(crate) struct Scope<'a> {
    req: &'a MatrixRequest,
    account_entity: HashMap<AccountId, EntityId>,
}

impl<'a> Scope<'a> {
    pub(crate) fn new(req: &'a MatrixRequest, accounts: &[Account]) -> Self {
        Self {
            req,
            account_entity: accounts.iter().map(|a| (a.id, a.entity_id)).collect(),
        }
    }

    fn in_range(&self, date: NaiveDate) -> bool {
        is_date_in_range(date, self.req.from, self.req.to)
    }

    fn matches(&self, entity: Option<EntityId>, account: Option<AccountId>) -> bool {
        let f = &self.req.filter;
        let entity = entity.or_else(|| account.and_then(|a| self.account_entity.get(&a).copied()));
        f.entity_id.map_or(true, |want| entity == Some(want))
            && f.account_id.map_or(true, |want| account == Some(want))
    }

    /// Planned column: every non-cancelled schedule due in range.
    pub(crate) fn includes_schedule(&self, s: &Schedule) -> bool {
        s.status != ScheduleStatus::Cancelled
            && self.in_range(s.due_date)
            && self.matches(Some(s.entity_id), s.account_id)
    }

    /// Realised column: income and expense transactions dated in range.
    /// Transfers move cash between own accounts and are excluded; reversals
    /// carry a negative amount and net out their original.
    pub(crate) fn includes_transaction(&self, t: &Transaction) -> bool {
        t.kind != TransactionKind::Transfer
            && self.in_range(t.date)
            && self.matches(t.entity_id, t.account_id)
    }

    /// Starting balance: checking and investment accounts only.
    pub(crate) fn includes_account(&self, a: &Account) -> bool {
        a.kind.counts_toward_starting_balance() && self.matches(Some(a.entity_id), Some(a.id))
    }
}
