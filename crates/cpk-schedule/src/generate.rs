use chrono::NaiveDate;
use cpk_calendar::{add_months, generate_recurrence_dates};
use cpk_money::{divide_amount, Cents};
use cpk_schemas::{
    ordered_line_items, AdjustmentIndex, AdjustmentTerms, Contract, ContractAmount, CoreError,
    CoreResult, Schedule, ScheduleId, ScheduleStatus,
};

use crate::index::IndexRateProvider;

/// Knobs the generator reads from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerateOptions {
    /// Horizon for recurring contracts with no end date.
    pub open_ended_horizon_months: u32,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            open_ended_horizon_months: 12,
        }
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Expand `contract` into its planned schedules.
///
/// Named adjustment indices are looked up from `rates`, one call per boundary.
pub async fn generate_schedules(
    contract: &Contract,
    opts: &GenerateOptions,
    rates: &dyn IndexRateProvider,
) -> CoreResult<Vec<Schedule>> {
    let dates = series_dates(contract, opts)?;
    let step_percents = resolve_step_percents(contract, &dates, rates).await?;
    build_schedules(contract, &dates, &step_percents)
}

/// Due dates of the contract's series.
///
/// Fails with `ConflictState` for closed contracts and with
/// `InvalidArgument` when the period yields no date at all.
pub fn series_dates(contract: &Contract, opts: &GenerateOptions) -> CoreResult<Vec<NaiveDate>> {
    if contract.status.is_closed() {
        return Err(CoreError::conflict(format!(
            "contract {} is {} and cannot generate schedules",
            contract.id, contract.status
        )));
    }

    let end = match contract.end_date {
        Some(end) => end,
        None => {
            let horizon = add_months(
                contract.start_date,
                i64::from(opts.open_ended_horizon_months),
            )?;
            horizon.pred_opt().unwrap_or(contract.start_date)
        }
    };

    let dates = generate_recurrence_dates(contract.start_date, end, contract.recurrence)?;
    if dates.is_empty() {
        return Err(CoreError::invalid(format!(
            "contract {} period {}..{} yields no due dates",
            contract.id, contract.start_date, end
        )));
    }
    Ok(dates)
}

// ---------------------------------------------------------------------------
// Adjustment boundaries
// ---------------------------------------------------------------------------

fn validated_terms(contract: &Contract) -> CoreResult<Option<&AdjustmentTerms>> {
    let Some(terms) = contract.adjustment.as_ref() else {
        return Ok(None);
    };
    if matches!(contract.amount, ContractAmount::Total(_)) {
        return Err(CoreError::invalid(format!(
            "contract {}: adjustment terms require a per-period amount",
            contract.id
        )));
    }
    if terms.every_months == 0 {
        return Err(CoreError::invalid(format!(
            "contract {}: adjustment every_months must be >= 1",
            contract.id
        )));
    }
    Ok(Some(terms))
}

/// Boundary `k` (k >= 1) is `start + k * every_months`, up to `last`.
fn adjustment_boundaries(
    start: NaiveDate,
    every_months: u32,
    last: NaiveDate,
) -> CoreResult<Vec<NaiveDate>> {
    let mut out = Vec::new();
    let mut k: i64 = 1;
    loop {
        let boundary = add_months(start, k * i64::from(every_months))?;
        if boundary > last {
            return Ok(out);
        }
        out.push(boundary);
        k += 1;
    }
}

async fn resolve_step_percents(
    contract: &Contract,
    dates: &[NaiveDate],
    rates: &dyn IndexRateProvider,
) -> CoreResult<Vec<f64>> {
    let Some(terms) = validated_terms(contract)? else {
        return Ok(Vec::new());
    };
    let Some(last) = dates.last().copied() else {
        return Ok(Vec::new());
    };
    let boundaries = adjustment_boundaries(contract.start_date, terms.every_months, last)?;

    match &terms.index {
        AdjustmentIndex::Fixed { percent } => Ok(vec![*percent; boundaries.len()]),
        AdjustmentIndex::Named { index } => {
            let mut out = Vec::with_capacity(boundaries.len());
            for boundary in boundaries {
                let from = add_months(boundary, -i64::from(terms.every_months))?;
                let pct = rates.accumulated_percent(index, from, boundary).await?;
                if !pct.is_finite() {
                    return Err(CoreError::upstream(format!(
                        "index rates: '{index}' returned a non-finite rate for {from}..{boundary}"
                    )));
                }
                out.push(pct);
            }
            Ok(out)
        }
    }
}

// ---------------------------------------------------------------------------
// Pure construction
// ---------------------------------------------------------------------------

/// Build schedules for `dates` with pre-resolved adjustment percentages
/// (`step_percents[k - 1]` applies at boundary `k`).
pub fn build_schedules(
    contract: &Contract,
    dates: &[NaiveDate],
    step_percents: &[f64],
) -> CoreResult<Vec<Schedule>> {
    let n = u32::try_from(dates.len())
        .map_err(|_| CoreError::invalid(format!("contract {}: too many periods", contract.id)))?;

    let base: Vec<Cents> = match contract.amount {
        ContractAmount::Total(total) => divide_amount(total, n)?,
        ContractAmount::PerPeriod(per) => {
            if !per.is_positive() {
                return Err(CoreError::invalid(format!(
                    "contract {}: per-period amount must be > 0, got {per}",
                    contract.id
                )));
            }
            vec![per; dates.len()]
        }
    };

    let boundaries = match (validated_terms(contract)?, dates.last()) {
        (Some(terms), Some(last)) => {
            adjustment_boundaries(contract.start_date, terms.every_months, *last)?
        }
        _ => Vec::new(),
    };
    if step_percents.len() < boundaries.len() {
        return Err(CoreError::invalid(format!(
            "contract {}: {} adjustment boundaries but {} rates supplied",
            contract.id,
            boundaries.len(),
            step_percents.len()
        )));
    }

    let items = ordered_line_items(&contract.line_items)
        .map_err(|e| CoreError::invalid(format!("contract {}: {}", contract.id, e.message())))?;

    let mut schedules = Vec::with_capacity(dates.len());
    for (i, (due_date, base_amount)) in dates.iter().zip(base).enumerate() {
        let steps = boundaries.iter().filter(|b| **b <= *due_date).count();
        let mut amount = base_amount;
        for pct in &step_percents[..steps] {
            amount = amount.apply_percent(*pct)?;
        }
        for item in &items {
            amount = amount.checked_add(item.signed_amount()).ok_or_else(|| {
                CoreError::invalid(format!(
                    "contract {}: schedule due {due_date} out of range",
                    contract.id
                ))
            })?;
        }
        if amount.is_negative() {
            return Err(CoreError::invalid(format!(
                "contract {}: schedule due {due_date} would be negative ({amount})",
                contract.id
            )));
        }

        let sequence = i as u32 + 1;
        schedules.push(Schedule {
            id: ScheduleId::new_v4(),
            workspace_id: contract.workspace_id,
            contract_id: contract.id,
            entity_id: contract.entity_id,
            account_id: contract.account_id,
            direction: contract.direction,
            amount,
            due_date: *due_date,
            status: ScheduleStatus::Planned,
            sequence,
            transaction_id: None,
            description: format!("{} {sequence}/{n}", contract.description),
        });
    }
    Ok(schedules)
}
