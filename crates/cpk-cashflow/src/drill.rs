use cpk_calendar::PeriodKey;
use cpk_schemas::{Account, CoreError, CoreResult, Schedule, Transaction};
use serde::{Deserialize, Serialize};

use crate::scope::{MatrixRequest, Scope};

/// The rows one matrix bucket summed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodDetail {
    pub period: PeriodKey,
    pub schedules: Vec<Schedule>,
    pub transactions: Vec<Transaction>,
}

/// List the schedules and transactions behind `period` of the matrix built
/// for `req`, ordered by date then id.
pub fn drill_down(
    req: &MatrixRequest,
    period: PeriodKey,
    accounts: &[Account],
    schedules: &[Schedule],
    transactions: &[Transaction],
) -> CoreResult<PeriodDetail> {
    req.validate()?;
    if period.granularity() != req.granularity {
        return Err(CoreError::invalid(format!(
            "period {period} does not match granularity {}",
            req.granularity
        )));
    }
    if period.end() < req.from || period.start() > req.to {
        return Err(CoreError::invalid(format!(
            "period {period} is outside {}..{}",
            req.from, req.to
        )));
    }

    let scope = Scope::new(req, accounts);

    let mut s: Vec<Schedule> = schedules
        .iter()
        .filter(|s| scope.includes_schedule(s) && period.contains(s.due_date))
        .cloned()
        .collect();
    s.sort_by_key(|s| (s.due_date, s.id));

    let mut t: Vec<Transaction> = transactions
        .iter()
        .filter(|t| scope.includes_transaction(t) && period.contains(t.date))
        .cloned()
        .collect();
    t.sort_by_key(|t| (t.date, t.id));

    Ok(PeriodDetail {
        period,
        schedules: s,
        transactions: t,
    })
}
