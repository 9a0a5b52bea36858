//! Contract writes planned against the rows on file.
//!
//! Stores call [`plan_contract`] with the contract, schedules and notes they
//! loaded under the tenant write lock, then write the effect in the same
//! transaction. A note claimed or a link made after the caller generated its
//! series is therefore seen before anything is deleted.

use cpk_billing::live_claims;
use cpk_schedule::{plan_cancellation, plan_regeneration, SchedulePlan};
use cpk_schemas::{
    Contract, ContractId, ContractStatus, CoreError, CoreResult, DebitNote, Schedule, WorkspaceId,
};

use crate::store::ensure_owned;

#[derive(Debug, Clone, PartialEq)]
pub enum ContractCommand {
    /// Store `contract` and replace its open schedules with `generated`.
    Save {
        contract: Contract,
        generated: Vec<Schedule>,
    },
    Cancel { contract_id: ContractId },
}

impl ContractCommand {
    pub fn contract_id(&self) -> ContractId {
        match self {
            ContractCommand::Save { contract, .. } => contract.id,
            ContractCommand::Cancel { contract_id } => *contract_id,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContractEffect {
    /// Contract row to insert or replace, line items included.
    pub upsert: Option<Contract>,
    pub plan: SchedulePlan,
}

/// `on_file` is the stored contract, if any. `schedules` may hold rows of
/// other contracts; only the command's contract is planned.
pub fn plan_contract(
    cmd: &ContractCommand,
    ws: WorkspaceId,
    on_file: Option<&Contract>,
    schedules: &[Schedule],
    notes: &[DebitNote],
) -> CoreResult<ContractEffect> {
    let contract_id = cmd.contract_id();
    let existing: Vec<Schedule> = schedules
        .iter()
        .filter(|s| s.contract_id == contract_id)
        .cloned()
        .collect();
    let claimed = live_claims(notes);

    match cmd {
        ContractCommand::Save {
            contract,
            generated,
        } => {
            ensure_owned(ws, contract.workspace_id, "contract", contract.id)?;
            for s in generated {
                ensure_owned(ws, s.workspace_id, "schedule", s.id)?;
                if s.contract_id != contract.id {
                    return Err(CoreError::invalid(format!(
                        "schedule {} belongs to contract {}, not {}",
                        s.id, s.contract_id, contract.id
                    )));
                }
            }
            for c in [Some(contract), on_file].into_iter().flatten() {
                if c.status.is_closed() {
                    return Err(CoreError::conflict(format!(
                        "contract {} is {}; closed contracts are not rescheduled",
                        c.id, c.status
                    )));
                }
            }
            let plan = plan_regeneration(contract, &existing, generated.clone(), &claimed)?;
            Ok(ContractEffect {
                upsert: Some(contract.clone()),
                plan,
            })
        }
        ContractCommand::Cancel { contract_id } => {
            let contract = on_file.ok_or_else(|| CoreError::not_found("contract", contract_id))?;
            if contract.status == ContractStatus::Cancelled {
                return Err(CoreError::conflict(format!(
                    "contract {contract_id} is already cancelled"
                )));
            }
            Ok(ContractEffect {
                upsert: None,
                plan: plan_cancellation(contract, &existing, &claimed),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use cpk_schedule::build_schedules;
    use cpk_schemas::{
        Cents, ContractAmount, DebitNoteId, DebitNoteStatus, Direction, EntityId, NaiveDate,
        Recurrence,
    };

    fn d(m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, 10).unwrap()
    }

    fn contract(ws: WorkspaceId) -> Contract {
        Contract {
            id: ContractId::new_v4(),
            workspace_id: ws,
            entity_id: EntityId::new_v4(),
            counterparty_id: None,
            account_id: None,
            description: "retainer".into(),
            direction: Direction::Receivable,
            amount: ContractAmount::Total(Cents::units(900)),
            currency: "BRL".into(),
            recurrence: Recurrence::Monthly,
            start_date: d(1),
            end_date: Some(d(3)),
            adjustment: None,
            status: ContractStatus::Active,
            line_items: Vec::new(),
        }
    }

    fn series(c: &Contract) -> Vec<Schedule> {
        build_schedules(c, &[d(1), d(2), d(3)], &[]).unwrap()
    }

    fn draft_note(c: &Contract, claims: Vec<cpk_schemas::ScheduleId>) -> DebitNote {
        let at = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        DebitNote {
            id: DebitNoteId::new_v4(),
            workspace_id: c.workspace_id,
            contract_id: c.id,
            description: "jan".into(),
            issued_on: d(1),
            due_on: d(1),
            schedule_ids: claims,
            line_items: Vec::new(),
            total: Cents::units(300),
            status: DebitNoteStatus::Draft,
            linked_transaction_id: None,
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn save_keeps_rows_claimed_by_notes_on_file() {
        let ws = WorkspaceId::new_v4();
        let c = contract(ws);
        let on_file = series(&c);
        let notes = vec![draft_note(&c, vec![on_file[0].id])];

        let cmd = ContractCommand::Save {
            contract: c.clone(),
            generated: series(&c),
        };
        let effect = plan_contract(&cmd, ws, Some(&c), &on_file, &notes).unwrap();
        assert!(!effect.plan.delete.contains(&on_file[0].id));
        assert_eq!(effect.plan.delete.len(), 2);
        assert_eq!(effect.plan.insert.len(), 2);
        assert_eq!(effect.upsert.as_ref(), Some(&c));
    }

    #[test]
    fn save_against_a_cancelled_contract_on_file_is_a_conflict() {
        let ws = WorkspaceId::new_v4();
        let c = contract(ws);
        let mut cancelled = c.clone();
        cancelled.status = ContractStatus::Cancelled;

        let cmd = ContractCommand::Save {
            contract: c.clone(),
            generated: series(&c),
        };
        let err = plan_contract(&cmd, ws, Some(&cancelled), &[], &[]).unwrap_err();
        assert_eq!(err.code(), "CONFLICT_STATE");
    }

    #[test]
    fn generated_rows_must_belong_to_the_saved_contract() {
        let ws = WorkspaceId::new_v4();
        let c = contract(ws);
        let other = contract(ws);
        let cmd = ContractCommand::Save {
            contract: c,
            generated: series(&other),
        };
        let err = plan_contract(&cmd, ws, None, &[], &[]).unwrap_err();
        assert_eq!(err.code(), "INVALID_ARGUMENT");
    }

    #[test]
    fn cancel_needs_the_contract_on_file() {
        let ws = WorkspaceId::new_v4();
        let cmd = ContractCommand::Cancel {
            contract_id: ContractId::new_v4(),
        };
        let err = plan_contract(&cmd, ws, None, &[], &[]).unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");
    }
}
