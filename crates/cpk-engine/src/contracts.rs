//! Contract lifecycle: schedule generation on save, regeneration on
//! update, cancellation.

use cpk_schedule::{generate_schedules, SchedulePlan};
use cpk_schemas::{Contract, ContractId, CoreError, CoreResult, Schedule, WorkspaceId};
use cpk_store::ContractCommand;
use tracing::info;

use crate::engine::{ensure_tenant, Engine};

impl Engine {
    /// Expand a contract without writing anything.
    pub async fn preview_schedules(
        &self,
        ws: WorkspaceId,
        contract: &Contract,
    ) -> CoreResult<Vec<Schedule>> {
        ensure_tenant(ws, contract.workspace_id, "contract")?;
        generate_schedules(contract, &self.settings.generate, self.rates.as_ref()).await
    }

    /// Store a new or updated contract and bring its schedules in line.
    ///
    /// Generation runs first, so an invalid contract or an unavailable index
    /// leaves both the contract and its schedules untouched. The store plans
    /// the replacement against the rows it reads under the tenant lock and
    /// writes contract and schedules together.
    pub async fn save_contract(
        &self,
        ws: WorkspaceId,
        contract: &Contract,
    ) -> CoreResult<SchedulePlan> {
        ensure_tenant(ws, contract.workspace_id, "contract")?;
        if contract.status.is_closed() {
            return Err(CoreError::conflict(format!(
                "contract {} is {}; closed contracts are not rescheduled",
                contract.id, contract.status
            )));
        }
        let generated = self.preview_schedules(ws, contract).await?;
        let cmd = ContractCommand::Save {
            contract: contract.clone(),
            generated,
        };
        let plan = self.store.apply_contract(ws, &cmd).await?;
        info!(
            workspace_id = %ws,
            contract_id = %contract.id,
            inserted = plan.insert.len(),
            deleted = plan.delete.len(),
            "contract schedules synced"
        );
        Ok(plan)
    }

    /// Regenerate the schedules of a stored contract.
    pub async fn regenerate_schedules(
        &self,
        ws: WorkspaceId,
        contract_id: ContractId,
    ) -> CoreResult<SchedulePlan> {
        let contract = self.store.contract(ws, contract_id).await?;
        self.save_contract(ws, &contract).await
    }

    /// Cancel a contract and every open schedule it still has.
    pub async fn cancel_contract(
        &self,
        ws: WorkspaceId,
        contract_id: ContractId,
    ) -> CoreResult<SchedulePlan> {
        let plan = self
            .store
            .apply_contract(ws, &ContractCommand::Cancel { contract_id })
            .await?;
        info!(
            workspace_id = %ws,
            contract_id = %contract_id,
            cancelled = plan.update.len(),
            "contract cancelled"
        );
        Ok(plan)
    }
}
