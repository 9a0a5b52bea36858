use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cpk_billing::{plan_billing, BillingCommand, BillingEffect, BillingSnapshot};
use cpk_reconcile::{apply_link_command, LinkCommand};
use cpk_schedule::SchedulePlan;
use cpk_schemas::{
    Account, Alert, AlertChanges, Contract, ContractId, CoreError, CoreResult, DebitNote,
    DebitNoteId, Entity, Schedule, Transaction, TransactionId, Workspace, WorkspaceId,
};
use cpk_store::{
    ensure_owned, plan_contract, ContractCommand, ScheduleFilter, Store, TransactionFilter,
};
use tokio::sync::{Mutex, RwLock};

#[derive(Debug)]
struct Tenant {
    workspace: Workspace,
    entities: Vec<Entity>,
    accounts: Vec<Account>,
    contracts: Vec<Contract>,
    schedules: Vec<Schedule>,
    transactions: Vec<Transaction>,
    notes: Vec<DebitNote>,
    alerts: Vec<Alert>,
}

impl Tenant {
    fn new(workspace: Workspace) -> Self {
        Self {
            workspace,
            entities: Vec::new(),
            accounts: Vec::new(),
            contracts: Vec::new(),
            schedules: Vec::new(),
            transactions: Vec::new(),
            notes: Vec::new(),
            alerts: Vec::new(),
        }
    }
}

/// In-memory `Store`. Every tenant sits behind its own async mutex, which
/// doubles as the contract, billing and link write lock.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tenants: RwLock<BTreeMap<WorkspaceId, Arc<Mutex<Tenant>>>>,
    failing: RwLock<BTreeSet<WorkspaceId>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_workspace(&self, name: &str) -> WorkspaceId {
        let ws = WorkspaceId::new_v4();
        let tenant = Tenant::new(Workspace {
            id: ws,
            name: name.to_string(),
        });
        self.tenants
            .write()
            .await
            .insert(ws, Arc::new(Mutex::new(tenant)));
        ws
    }

    /// Every call for `ws` fails with `UpstreamUnavailable` until cleared.
    pub async fn fail_tenant(&self, ws: WorkspaceId) {
        self.failing.write().await.insert(ws);
    }

    pub async fn heal_tenant(&self, ws: WorkspaceId) {
        self.failing.write().await.remove(&ws);
    }

    async fn tenant(&self, ws: WorkspaceId) -> CoreResult<Arc<Mutex<Tenant>>> {
        if self.failing.read().await.contains(&ws) {
            return Err(CoreError::upstream(format!("memory store: tenant {ws} is offline")));
        }
        self.tenants
            .read()
            .await
            .get(&ws)
            .cloned()
            .ok_or_else(|| CoreError::not_found("workspace", ws))
    }

    pub async fn seed_entity(&self, entity: Entity) -> CoreResult<()> {
        let t = self.tenant(entity.workspace_id).await?;
        t.lock().await.entities.push(entity);
        Ok(())
    }

    pub async fn seed_account(&self, account: Account) -> CoreResult<()> {
        let t = self.tenant(account.workspace_id).await?;
        t.lock().await.accounts.push(account);
        Ok(())
    }

    pub async fn seed_debit_note(&self, note: DebitNote) -> CoreResult<()> {
        let t = self.tenant(note.workspace_id).await?;
        t.lock().await.notes.push(note);
        Ok(())
    }
}

#[async_trait]
impl Store for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn list_workspaces(&self) -> CoreResult<Vec<Workspace>> {
        let tenants: Vec<Arc<Mutex<Tenant>>> =
            self.tenants.read().await.values().cloned().collect();
        let mut out = Vec::with_capacity(tenants.len());
        for t in tenants {
            out.push(t.lock().await.workspace.clone());
        }
        out.sort_by(|a, b| (&a.name, a.id).cmp(&(&b.name, b.id)));
        Ok(out)
    }

    async fn entities(&self, ws: WorkspaceId) -> CoreResult<Vec<Entity>> {
        let t = self.tenant(ws).await?;
        let out = t.lock().await.entities.clone();
        Ok(out)
    }

    async fn accounts(&self, ws: WorkspaceId) -> CoreResult<Vec<Account>> {
        let t = self.tenant(ws).await?;
        let out = t.lock().await.accounts.clone();
        Ok(out)
    }

    async fn contracts(&self, ws: WorkspaceId) -> CoreResult<Vec<Contract>> {
        let t = self.tenant(ws).await?;
        let out = t.lock().await.contracts.clone();
        Ok(out)
    }

    async fn contract(&self, ws: WorkspaceId, id: ContractId) -> CoreResult<Contract> {
        let t = self.tenant(ws).await?;
        let guard = t.lock().await;
        guard
            .contracts
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or_else(|| CoreError::not_found("contract", id))
    }

    async fn upsert_contract(&self, ws: WorkspaceId, contract: &Contract) -> CoreResult<()> {
        ensure_owned(ws, contract.workspace_id, "contract", contract.id)?;
        let t = self.tenant(ws).await?;
        let mut guard = t.lock().await;
        match guard.contracts.iter_mut().find(|c| c.id == contract.id) {
            Some(row) => *row = contract.clone(),
            None => guard.contracts.push(contract.clone()),
        }
        Ok(())
    }

    async fn schedules(
        &self,
        ws: WorkspaceId,
        filter: &ScheduleFilter,
    ) -> CoreResult<Vec<Schedule>> {
        let t = self.tenant(ws).await?;
        let guard = t.lock().await;
        let mut out: Vec<Schedule> = guard
            .schedules
            .iter()
            .filter(|s| filter.matches(s))
            .cloned()
            .collect();
        out.sort_by_key(|s| (s.due_date, s.sequence, s.id));
        Ok(out)
    }

    async fn insert_schedules(&self, ws: WorkspaceId, rows: &[Schedule]) -> CoreResult<()> {
        let t = self.tenant(ws).await?;
        let mut guard = t.lock().await;
        for s in rows {
            ensure_owned(ws, s.workspace_id, "schedule", s.id)?;
            if guard.schedules.iter().any(|e| e.id == s.id) {
                return Err(CoreError::conflict(format!("schedule {} already exists", s.id)));
            }
        }
        guard.schedules.extend(rows.iter().cloned());
        Ok(())
    }

    async fn apply_contract(
        &self,
        ws: WorkspaceId,
        cmd: &ContractCommand,
    ) -> CoreResult<SchedulePlan> {
        let t = self.tenant(ws).await?;
        let mut guard = t.lock().await;
        let contract_id = cmd.contract_id();
        let effect = {
            let on_file = guard.contracts.iter().find(|c| c.id == contract_id);
            plan_contract(cmd, ws, on_file, &guard.schedules, &guard.notes)?
        };

        if let Some(contract) = &effect.upsert {
            match guard.contracts.iter_mut().find(|c| c.id == contract.id) {
                Some(row) => *row = contract.clone(),
                None => guard.contracts.push(contract.clone()),
            }
        }
        let plan = &effect.plan;
        let delete: BTreeSet<_> = plan.delete.iter().copied().collect();
        guard.schedules.retain(|s| !delete.contains(&s.id));
        for s in &plan.update {
            if let Some(row) = guard.schedules.iter_mut().find(|e| e.id == s.id) {
                *row = s.clone();
            }
        }
        guard.schedules.extend(plan.insert.iter().cloned());
        if let Some((cid, status)) = plan.contract_status {
            if let Some(c) = guard.contracts.iter_mut().find(|c| c.id == cid) {
                c.status = status;
            }
        }
        Ok(effect.plan)
    }

    async fn transactions(
        &self,
        ws: WorkspaceId,
        filter: &TransactionFilter,
    ) -> CoreResult<Vec<Transaction>> {
        let t = self.tenant(ws).await?;
        let guard = t.lock().await;
        let mut out: Vec<Transaction> = guard
            .transactions
            .iter()
            .filter(|tx| filter.matches(tx))
            .cloned()
            .collect();
        out.sort_by_key(|tx| (tx.date, tx.id));
        Ok(out)
    }

    async fn insert_transaction(&self, ws: WorkspaceId, tx: &Transaction) -> CoreResult<()> {
        ensure_owned(ws, tx.workspace_id, "transaction", tx.id)?;
        let t = self.tenant(ws).await?;
        let mut guard = t.lock().await;
        if guard.transactions.iter().any(|e| e.id == tx.id) {
            return Err(CoreError::conflict(format!("transaction {} already exists", tx.id)));
        }
        if let Some(original) = tx.reverses {
            if !guard.transactions.iter().any(|e| e.id == original) {
                return Err(CoreError::not_found("transaction", original));
            }
            if guard.transactions.iter().any(|e| e.reverses == Some(original)) {
                return Err(CoreError::conflict(format!(
                    "transaction {original} is already reversed"
                )));
            }
        }
        guard.transactions.push(tx.clone());
        Ok(())
    }

    async fn transaction(&self, ws: WorkspaceId, id: TransactionId) -> CoreResult<Transaction> {
        let t = self.tenant(ws).await?;
        let guard = t.lock().await;
        guard
            .transactions
            .iter()
            .find(|tx| tx.id == id)
            .cloned()
            .ok_or_else(|| CoreError::not_found("transaction", id))
    }

    async fn debit_notes(&self, ws: WorkspaceId) -> CoreResult<Vec<DebitNote>> {
        let t = self.tenant(ws).await?;
        let mut out = t.lock().await.notes.clone();
        out.sort_by_key(|n| (n.issued_on, n.id));
        Ok(out)
    }

    async fn debit_note(&self, ws: WorkspaceId, id: DebitNoteId) -> CoreResult<DebitNote> {
        let t = self.tenant(ws).await?;
        let guard = t.lock().await;
        guard
            .notes
            .iter()
            .find(|n| n.id == id)
            .cloned()
            .ok_or_else(|| CoreError::not_found("debit note", id))
    }

    async fn apply_billing(
        &self,
        ws: WorkspaceId,
        cmd: &BillingCommand,
        now: DateTime<Utc>,
    ) -> CoreResult<BillingEffect> {
        let t = self.tenant(ws).await?;
        let mut guard = t.lock().await;
        let effect = {
            let snap = BillingSnapshot {
                schedules: &guard.schedules,
                notes: &guard.notes,
                transactions: &guard.transactions,
            };
            plan_billing(cmd, &snap, ws, now)?
        };
        if let Some(id) = effect.delete {
            guard.notes.retain(|n| n.id != id);
        }
        if let Some(note) = &effect.upsert {
            match guard.notes.iter_mut().find(|n| n.id == note.id) {
                Some(row) => *row = note.clone(),
                None => guard.notes.push(note.clone()),
            }
        }
        Ok(effect)
    }

    async fn apply_link(&self, ws: WorkspaceId, cmd: &LinkCommand) -> CoreResult<Schedule> {
        let t = self.tenant(ws).await?;
        let mut guard = t.lock().await;
        let updated = apply_link_command(cmd, &guard.schedules, &guard.transactions)?;
        if let Some(row) = guard.schedules.iter_mut().find(|s| s.id == updated.id) {
            *row = updated.clone();
        }
        Ok(updated)
    }

    async fn alerts(&self, ws: WorkspaceId) -> CoreResult<Vec<Alert>> {
        let t = self.tenant(ws).await?;
        let mut out = t.lock().await.alerts.clone();
        out.sort_by(|a, b| a.key().cmp(&b.key()));
        Ok(out)
    }

    async fn apply_alert_changes(
        &self,
        ws: WorkspaceId,
        changes: &AlertChanges,
    ) -> CoreResult<()> {
        let t = self.tenant(ws).await?;
        let mut guard = t.lock().await;
        for row in changes.rows() {
            ensure_owned(ws, row.workspace_id, "alert", row.id)?;
        }
        for row in changes.rows() {
            match guard.alerts.iter_mut().find(|a| a.key() == row.key()) {
                Some(existing) => *existing = row.clone(),
                None => guard.alerts.push(row.clone()),
            }
        }
        Ok(())
    }
}
