//! Write sets for contract updates and cancellations.
//!
//! Planning is pure. Stores call these under the tenant write lock and
//! write the resulting `SchedulePlan` in the same transaction.

use std::collections::{BTreeSet, HashSet};

use chrono::NaiveDate;
use cpk_money::{divide_amount, sum_amounts, Cents};
use cpk_schemas::{
    Contract, ContractAmount, ContractId, ContractStatus, CoreError, CoreResult, Schedule,
    ScheduleId, ScheduleStatus,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulePlan {
    pub insert: Vec<Schedule>,
    /// Existing schedules with a changed status.
    pub update: Vec<Schedule>,
    pub delete: Vec<ScheduleId>,
    /// Status to set on the contract, if any.
    pub contract_status: Option<(ContractId, ContractStatus)>,
}

impl SchedulePlan {
    pub fn is_empty(&self) -> bool {
        self.insert.is_empty()
            && self.update.is_empty()
            && self.delete.is_empty()
            && self.contract_status.is_none()
    }
}

/// A schedule that regeneration and cancellation must leave alone.
fn is_settled(s: &Schedule, claimed: &BTreeSet<ScheduleId>) -> bool {
    s.status == ScheduleStatus::Realized || s.is_linked() || claimed.contains(&s.id)
}

/// Replace a contract's open schedules with a freshly generated series.
///
/// `claimed` holds the ids referenced by any non-cancelled debit note.
/// Realized, linked and claimed schedules are kept untouched; the rest are
/// deleted, and generated schedules are inserted for every due date not
/// already covered by a kept schedule.
///
/// For a `Total` contract the inserted rows are re-split so that kept plus
/// inserted still sum to the generated series. `ConflictState` when the kept
/// rows leave nothing positive to distribute.
pub fn plan_regeneration(
    contract: &Contract,
    existing: &[Schedule],
    generated: Vec<Schedule>,
    claimed: &BTreeSet<ScheduleId>,
) -> CoreResult<SchedulePlan> {
    let mut kept: Vec<&Schedule> = Vec::new();
    let mut delete = Vec::new();
    for s in existing.iter().filter(|s| s.contract_id == contract.id) {
        if is_settled(s, claimed) {
            kept.push(s);
        } else {
            delete.push(s.id);
        }
    }
    let kept_dates: HashSet<NaiveDate> = kept.iter().map(|s| s.due_date).collect();

    let series_total = sum_amounts(generated.iter().map(|s| s.amount))?;
    let mut insert: Vec<Schedule> = generated
        .into_iter()
        .filter(|s| !kept_dates.contains(&s.due_date))
        .collect();

    if matches!(contract.amount, ContractAmount::Total(_)) {
        respread_total(contract, series_total, &kept, &mut insert)?;
    }

    Ok(SchedulePlan {
        insert,
        update: Vec::new(),
        delete,
        contract_status: None,
    })
}

fn respread_total(
    contract: &Contract,
    series_total: Cents,
    kept: &[&Schedule],
    insert: &mut [Schedule],
) -> CoreResult<()> {
    let settled = sum_amounts(kept.iter().map(|s| s.amount))?;
    let remainder = series_total.checked_sub(settled).ok_or_else(|| {
        CoreError::invalid(format!("contract {}: total out of range", contract.id))
    })?;

    if insert.is_empty() {
        if remainder.is_zero() {
            return Ok(());
        }
        return Err(CoreError::conflict(format!(
            "contract {}: settled schedules sum to {settled}, total is {series_total}, \
             and no open period is left to absorb the difference",
            contract.id
        )));
    }
    if !remainder.is_positive() {
        return Err(CoreError::conflict(format!(
            "contract {}: settled schedules already sum to {settled} of {series_total}",
            contract.id
        )));
    }

    let n = u32::try_from(insert.len())
        .map_err(|_| CoreError::invalid(format!("contract {}: too many periods", contract.id)))?;
    for (row, part) in insert.iter_mut().zip(divide_amount(remainder, n)?) {
        row.amount = part;
    }
    Ok(())
}

/// Cancel a contract: every planned, unlinked, unclaimed schedule becomes
/// `Cancelled` and the contract itself is marked cancelled.
pub fn plan_cancellation(
    contract: &Contract,
    existing: &[Schedule],
    claimed: &BTreeSet<ScheduleId>,
) -> SchedulePlan {
    let update = existing
        .iter()
        .filter(|s| s.contract_id == contract.id)
        .filter(|s| s.is_planned() && !is_settled(s, claimed))
        .map(|s| Schedule {
            status: ScheduleStatus::Cancelled,
            ..s.clone()
        })
        .collect();

    SchedulePlan {
        insert: Vec::new(),
        update,
        delete: Vec::new(),
        contract_status: Some((contract.id, ContractStatus::Cancelled)),
    }
}
