use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cpk_billing::{plan_billing, BillingCommand, BillingEffect, BillingSnapshot};
use cpk_reconcile::{apply_link_command, LinkCommand};
use cpk_schedule::SchedulePlan;
use cpk_schemas::{
    Account, Alert, AlertChanges, Contract, ContractAmount, ContractId, CoreError, CoreResult,
    DebitNote, DebitNoteId, Entity, Schedule, Transaction, TransactionId, Workspace, WorkspaceId,
};
use cpk_store::{
    ensure_owned, plan_contract, ContractCommand, ScheduleFilter, Store, TransactionFilter,
};
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::rows::{
    self, db_err, ALERT_COLUMNS, CONTRACT_COLUMNS, NOTE_COLUMNS, SCHEDULE_COLUMNS,
    TRANSACTION_COLUMNS,
};

/// `Store` over PostgreSQL.
///
/// Writes run in one database transaction each. Lock-sensitive writes first
/// take `pg_advisory_xact_lock` on a key derived from the workspace id, so
/// two processes never plan contract saves, billing or links for one tenant
/// at once.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn create_workspace(&self, name: &str) -> CoreResult<Workspace> {
        let ws = Workspace {
            id: WorkspaceId::new_v4(),
            name: name.to_string(),
        };
        sqlx::query("insert into workspaces (id, name) values ($1, $2)")
            .bind(ws.id.as_uuid())
            .bind(&ws.name)
            .execute(&self.pool)
            .await
            .map_err(db_err("create_workspace"))?;
        Ok(ws)
    }

    pub async fn insert_entity(&self, entity: &Entity) -> CoreResult<()> {
        sqlx::query(
            r#"
            insert into entities (id, workspace_id, kind, legal_name, tax_document)
            values ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(entity.id.as_uuid())
        .bind(entity.workspace_id.as_uuid())
        .bind(entity.kind.as_str())
        .bind(&entity.legal_name)
        .bind(&entity.tax_document)
        .execute(&self.pool)
        .await
        .map_err(db_err("insert_entity"))?;
        Ok(())
    }

    pub async fn insert_account(&self, account: &Account) -> CoreResult<()> {
        sqlx::query(
            r#"
            insert into accounts (
              id, workspace_id, entity_id, name, kind, currency,
              opening_balance_cents, opening_balance_as_of
            ) values ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(account.id.as_uuid())
        .bind(account.workspace_id.as_uuid())
        .bind(account.entity_id.as_uuid())
        .bind(&account.name)
        .bind(account.kind.as_str())
        .bind(&account.currency)
        .bind(account.opening_balance.raw())
        .bind(account.opening_balance_as_of)
        .execute(&self.pool)
        .await
        .map_err(db_err("insert_account"))?;
        Ok(())
    }

    async fn conn(&self) -> CoreResult<sqlx::pool::PoolConnection<sqlx::Postgres>> {
        self.pool.acquire().await.map_err(db_err("acquire"))
    }

    async fn begin(&self) -> CoreResult<sqlx::Transaction<'static, sqlx::Postgres>> {
        self.pool.begin().await.map_err(db_err("begin"))
    }
}

/// Advisory-lock key: the first eight bytes of the workspace uuid.
fn tenant_lock_key(ws: WorkspaceId) -> i64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&ws.as_uuid().as_bytes()[..8]);
    i64::from_be_bytes(buf)
}

async fn lock_tenant(conn: &mut PgConnection, ws: WorkspaceId) -> CoreResult<()> {
    sqlx::query("select pg_advisory_xact_lock($1)")
        .bind(tenant_lock_key(ws))
        .execute(&mut *conn)
        .await
        .map_err(db_err("tenant lock"))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Reads shared by pool and transaction paths
// ---------------------------------------------------------------------------

async fn load_contracts(
    conn: &mut PgConnection,
    ws: WorkspaceId,
    only: Option<ContractId>,
) -> CoreResult<Vec<Contract>> {
    let sql = format!(
        "select {CONTRACT_COLUMNS} from contracts \
         where workspace_id = $1 and ($2::uuid is null or id = $2) \
         order by start_date, id"
    );
    let fetched = sqlx::query(&sql)
        .bind(ws.as_uuid())
        .bind(only.map(|c| c.as_uuid()))
        .fetch_all(&mut *conn)
        .await
        .map_err(db_err("contracts"))?;
    let mut contracts = fetched.iter().map(rows::contract).collect::<CoreResult<Vec<_>>>()?;
    if contracts.is_empty() {
        return Ok(contracts);
    }

    let ids: Vec<Uuid> = contracts.iter().map(|c| c.id.as_uuid()).collect();
    let item_rows = sqlx::query(
        r#"
        select contract_id, item_order, kind, description, amount_cents
        from contract_line_items
        where contract_id = any($1)
        order by contract_id, item_order
        "#,
    )
    .bind(&ids)
    .fetch_all(&mut *conn)
    .await
    .map_err(db_err("contract line items"))?;

    let mut items: BTreeMap<ContractId, Vec<_>> = BTreeMap::new();
    for row in &item_rows {
        let (cid, item) = rows::contract_line_item(row)?;
        items.entry(cid).or_default().push(item);
    }
    for c in &mut contracts {
        c.line_items = items.remove(&c.id).unwrap_or_default();
    }
    Ok(contracts)
}

async fn load_schedules(
    conn: &mut PgConnection,
    ws: WorkspaceId,
    f: &ScheduleFilter,
) -> CoreResult<Vec<Schedule>> {
    let sql = format!(
        "select {SCHEDULE_COLUMNS} from schedules \
         where workspace_id = $1 \
           and ($2::uuid is null or contract_id = $2) \
           and ($3::text is null or status = $3) \
           and ($4::date is null or due_date >= $4) \
           and ($5::date is null or due_date <= $5) \
           and ($6::uuid is null or entity_id = $6) \
           and ($7::uuid is null or account_id = $7) \
         order by due_date, sequence, id"
    );
    let fetched = sqlx::query(&sql)
        .bind(ws.as_uuid())
        .bind(f.contract_id.map(|c| c.as_uuid()))
        .bind(f.status.map(|s| s.as_str()))
        .bind(f.due_from)
        .bind(f.due_to)
        .bind(f.entity_id.map(|e| e.as_uuid()))
        .bind(f.account_id.map(|a| a.as_uuid()))
        .fetch_all(&mut *conn)
        .await
        .map_err(db_err("schedules"))?;
    fetched.iter().map(rows::schedule).collect()
}

async fn load_transactions(
    conn: &mut PgConnection,
    ws: WorkspaceId,
    f: &TransactionFilter,
) -> CoreResult<Vec<Transaction>> {
    let sql = format!(
        "select {TRANSACTION_COLUMNS} from transactions \
         where workspace_id = $1 \
           and ($2::text is null or kind = $2) \
           and ($3::date is null or date >= $3) \
           and ($4::date is null or date <= $4) \
           and ($5::uuid is null or entity_id = $5) \
           and ($6::uuid is null or account_id = $6) \
         order by date, id"
    );
    let fetched = sqlx::query(&sql)
        .bind(ws.as_uuid())
        .bind(f.kind.map(|k| k.as_str()))
        .bind(f.date_from)
        .bind(f.date_to)
        .bind(f.entity_id.map(|e| e.as_uuid()))
        .bind(f.account_id.map(|a| a.as_uuid()))
        .fetch_all(&mut *conn)
        .await
        .map_err(db_err("transactions"))?;
    fetched.iter().map(rows::transaction).collect()
}

async fn load_notes(
    conn: &mut PgConnection,
    ws: WorkspaceId,
    only: Option<DebitNoteId>,
) -> CoreResult<Vec<DebitNote>> {
    let sql = format!(
        "select {NOTE_COLUMNS} from debit_notes \
         where workspace_id = $1 and ($2::uuid is null or id = $2) \
         order by issued_on, id"
    );
    let fetched = sqlx::query(&sql)
        .bind(ws.as_uuid())
        .bind(only.map(|n| n.as_uuid()))
        .fetch_all(&mut *conn)
        .await
        .map_err(db_err("debit notes"))?;
    let mut notes = fetched.iter().map(rows::debit_note).collect::<CoreResult<Vec<_>>>()?;
    if notes.is_empty() {
        return Ok(notes);
    }

    let ids: Vec<Uuid> = notes.iter().map(|n| n.id.as_uuid()).collect();
    let link_rows: Vec<(Uuid, Uuid)> = sqlx::query_as(
        r#"
        select debit_note_id, schedule_id
        from debit_note_schedules
        where debit_note_id = any($1)
        order by debit_note_id, position
        "#,
    )
    .bind(&ids)
    .fetch_all(&mut *conn)
    .await
    .map_err(db_err("debit note schedules"))?;

    let mut claims: BTreeMap<Uuid, Vec<_>> = BTreeMap::new();
    for (note, schedule) in link_rows {
        claims
            .entry(note)
            .or_default()
            .push(cpk_schemas::ScheduleId(schedule));
    }
    for n in &mut notes {
        n.schedule_ids = claims.remove(&n.id.as_uuid()).unwrap_or_default();
    }
    Ok(notes)
}

// ---------------------------------------------------------------------------
// Writes (always inside a transaction)
// ---------------------------------------------------------------------------

async fn insert_schedule(conn: &mut PgConnection, s: &Schedule) -> CoreResult<()> {
    let sql = format!(
        "insert into schedules ({SCHEDULE_COLUMNS}) \
         values ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)"
    );
    sqlx::query(&sql)
        .bind(s.id.as_uuid())
        .bind(s.workspace_id.as_uuid())
        .bind(s.contract_id.as_uuid())
        .bind(s.entity_id.as_uuid())
        .bind(s.account_id.map(|a| a.as_uuid()))
        .bind(s.direction.as_str())
        .bind(s.amount.raw())
        .bind(s.due_date)
        .bind(s.status.as_str())
        .bind(sequence_column(s)?)
        .bind(s.transaction_id.map(|t| t.as_uuid()))
        .bind(&s.description)
        .execute(&mut *conn)
        .await
        .map_err(db_err("insert schedule"))?;
    Ok(())
}

async fn update_schedule(conn: &mut PgConnection, s: &Schedule) -> CoreResult<()> {
    let res = sqlx::query(
        r#"
        update schedules
        set account_id = $3,
            amount_cents = $4,
            due_date = $5,
            status = $6,
            sequence = $7,
            transaction_id = $8,
            description = $9
        where id = $1 and workspace_id = $2
        "#,
    )
    .bind(s.id.as_uuid())
    .bind(s.workspace_id.as_uuid())
    .bind(s.account_id.map(|a| a.as_uuid()))
    .bind(s.amount.raw())
    .bind(s.due_date)
    .bind(s.status.as_str())
    .bind(sequence_column(s)?)
    .bind(s.transaction_id.map(|t| t.as_uuid()))
    .bind(&s.description)
    .execute(&mut *conn)
    .await
    .map_err(db_err("update schedule"))?;
    if res.rows_affected() == 0 {
        return Err(CoreError::not_found("schedule", s.id));
    }
    Ok(())
}

fn sequence_column(s: &Schedule) -> CoreResult<i32> {
    i32::try_from(s.sequence)
        .map_err(|_| CoreError::invalid(format!("schedule {} sequence out of range", s.id)))
}

async fn upsert_note(conn: &mut PgConnection, note: &DebitNote) -> CoreResult<()> {
    let sql = format!(
        "insert into debit_notes ({NOTE_COLUMNS}) \
         values ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
         on conflict (id) do update set \
           description = excluded.description, \
           issued_on = excluded.issued_on, \
           due_on = excluded.due_on, \
           line_items = excluded.line_items, \
           total_cents = excluded.total_cents, \
           status = excluded.status, \
           linked_transaction_id = excluded.linked_transaction_id, \
           updated_at = excluded.updated_at \
         where debit_notes.workspace_id = excluded.workspace_id"
    );
    let res = sqlx::query(&sql)
        .bind(note.id.as_uuid())
        .bind(note.workspace_id.as_uuid())
        .bind(note.contract_id.as_uuid())
        .bind(&note.description)
        .bind(note.issued_on)
        .bind(note.due_on)
        .bind(Json(&note.line_items))
        .bind(note.total.raw())
        .bind(note.status.as_str())
        .bind(note.linked_transaction_id.map(|t| t.as_uuid()))
        .bind(note.created_at)
        .bind(note.updated_at)
        .execute(&mut *conn)
        .await
        .map_err(db_err("upsert debit note"))?;
    if res.rows_affected() == 0 {
        return Err(CoreError::not_found("debit note", note.id));
    }

    sqlx::query("delete from debit_note_schedules where debit_note_id = $1")
        .bind(note.id.as_uuid())
        .execute(&mut *conn)
        .await
        .map_err(db_err("clear debit note schedules"))?;
    for (position, sid) in note.schedule_ids.iter().enumerate() {
        sqlx::query(
            "insert into debit_note_schedules (debit_note_id, position, schedule_id) \
             values ($1, $2, $3)",
        )
        .bind(note.id.as_uuid())
        .bind(position as i32)
        .bind(sid.as_uuid())
        .execute(&mut *conn)
        .await
        .map_err(db_err("insert debit note schedule"))?;
    }
    Ok(())
}

/// Contract row plus its line items, replaced wholesale.
async fn write_contract(conn: &mut PgConnection, contract: &Contract) -> CoreResult<()> {
    let (amount_kind, amount) = match contract.amount {
        ContractAmount::Total(c) => ("total", c),
        ContractAmount::PerPeriod(c) => ("per_period", c),
    };
    let sql = format!(
        "insert into contracts ({CONTRACT_COLUMNS}) \
         values ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15) \
         on conflict (id) do update set \
           entity_id = excluded.entity_id, \
           counterparty_id = excluded.counterparty_id, \
           account_id = excluded.account_id, \
           description = excluded.description, \
           direction = excluded.direction, \
           amount_kind = excluded.amount_kind, \
           amount_cents = excluded.amount_cents, \
           currency = excluded.currency, \
           recurrence = excluded.recurrence, \
           start_date = excluded.start_date, \
           end_date = excluded.end_date, \
           adjustment = excluded.adjustment, \
           status = excluded.status \
         where contracts.workspace_id = excluded.workspace_id"
    );
    let res = sqlx::query(&sql)
        .bind(contract.id.as_uuid())
        .bind(contract.workspace_id.as_uuid())
        .bind(contract.entity_id.as_uuid())
        .bind(contract.counterparty_id.map(|e| e.as_uuid()))
        .bind(contract.account_id.map(|a| a.as_uuid()))
        .bind(&contract.description)
        .bind(contract.direction.as_str())
        .bind(amount_kind)
        .bind(amount.raw())
        .bind(&contract.currency)
        .bind(contract.recurrence.as_str())
        .bind(contract.start_date)
        .bind(contract.end_date)
        .bind(contract.adjustment.as_ref().map(Json))
        .bind(contract.status.as_str())
        .execute(&mut *conn)
        .await
        .map_err(db_err("upsert contract"))?;
    if res.rows_affected() == 0 {
        return Err(CoreError::not_found("contract", contract.id));
    }

    sqlx::query("delete from contract_line_items where contract_id = $1")
        .bind(contract.id.as_uuid())
        .execute(&mut *conn)
        .await
        .map_err(db_err("clear contract line items"))?;
    for item in &contract.line_items {
        sqlx::query(
            r#"
            insert into contract_line_items (contract_id, item_order, kind, description, amount_cents)
            values ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(contract.id.as_uuid())
        .bind(item.item_order)
        .bind(item.kind.as_str())
        .bind(&item.description)
        .bind(item.amount.raw())
        .execute(&mut *conn)
        .await
        .map_err(db_err("insert contract line item"))?;
    }
    Ok(())
}

/// Caller holds the tenant lock and planned `plan` inside the same
/// transaction.
async fn write_schedule_plan(
    conn: &mut PgConnection,
    ws: WorkspaceId,
    plan: &SchedulePlan,
) -> CoreResult<()> {
    if !plan.delete.is_empty() {
        let ids: Vec<Uuid> = plan.delete.iter().map(|id| id.as_uuid()).collect();
        sqlx::query("delete from schedules where workspace_id = $1 and id = any($2)")
            .bind(ws.as_uuid())
            .bind(&ids)
            .execute(&mut *conn)
            .await
            .map_err(db_err("delete schedules"))?;
    }
    for s in &plan.update {
        update_schedule(&mut *conn, s).await?;
    }
    for s in &plan.insert {
        insert_schedule(&mut *conn, s).await?;
    }
    if let Some((cid, status)) = plan.contract_status {
        let res = sqlx::query(
            "update contracts set status = $3 where id = $1 and workspace_id = $2",
        )
        .bind(cid.as_uuid())
        .bind(ws.as_uuid())
        .bind(status.as_str())
        .execute(&mut *conn)
        .await
        .map_err(db_err("update contract status"))?;
        if res.rows_affected() == 0 {
            return Err(CoreError::not_found("contract", cid));
        }
    }
    Ok(())
}

#[async_trait]
impl Store for PgStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn list_workspaces(&self) -> CoreResult<Vec<Workspace>> {
        let fetched = sqlx::query(
            r#"select id, name from workspaces order by name collate "C", id"#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err("list_workspaces"))?;
        fetched.iter().map(rows::workspace).collect()
    }

    async fn entities(&self, ws: WorkspaceId) -> CoreResult<Vec<Entity>> {
        let fetched = sqlx::query(
            r#"
            select id, workspace_id, kind, legal_name, tax_document
            from entities where workspace_id = $1
            order by legal_name collate "C", id
            "#,
        )
        .bind(ws.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err("entities"))?;
        fetched.iter().map(rows::entity).collect()
    }

    async fn accounts(&self, ws: WorkspaceId) -> CoreResult<Vec<Account>> {
        let fetched = sqlx::query(
            r#"
            select id, workspace_id, entity_id, name, kind, currency,
                   opening_balance_cents, opening_balance_as_of
            from accounts where workspace_id = $1
            order by name collate "C", id
            "#,
        )
        .bind(ws.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err("accounts"))?;
        fetched.iter().map(rows::account).collect()
    }

    async fn contracts(&self, ws: WorkspaceId) -> CoreResult<Vec<Contract>> {
        let mut conn = self.conn().await?;
        load_contracts(&mut conn, ws, None).await
    }

    async fn contract(&self, ws: WorkspaceId, id: ContractId) -> CoreResult<Contract> {
        let mut conn = self.conn().await?;
        load_contracts(&mut conn, ws, Some(id))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| CoreError::not_found("contract", id))
    }

    async fn upsert_contract(&self, ws: WorkspaceId, contract: &Contract) -> CoreResult<()> {
        ensure_owned(ws, contract.workspace_id, "contract", contract.id)?;
        let mut tx = self.begin().await?;
        lock_tenant(&mut tx, ws).await?;
        write_contract(&mut tx, contract).await?;
        tx.commit().await.map_err(db_err("commit"))?;
        Ok(())
    }

    async fn schedules(
        &self,
        ws: WorkspaceId,
        filter: &ScheduleFilter,
    ) -> CoreResult<Vec<Schedule>> {
        let mut conn = self.conn().await?;
        load_schedules(&mut conn, ws, filter).await
    }

    async fn insert_schedules(&self, ws: WorkspaceId, rows: &[Schedule]) -> CoreResult<()> {
        for s in rows {
            ensure_owned(ws, s.workspace_id, "schedule", s.id)?;
        }
        let mut tx = self.begin().await?;
        lock_tenant(&mut tx, ws).await?;
        for s in rows {
            insert_schedule(&mut tx, s).await?;
        }
        tx.commit().await.map_err(db_err("commit"))?;
        Ok(())
    }

    async fn apply_contract(
        &self,
        ws: WorkspaceId,
        cmd: &ContractCommand,
    ) -> CoreResult<SchedulePlan> {
        let contract_id = cmd.contract_id();
        let mut tx = self.begin().await?;
        lock_tenant(&mut tx, ws).await?;

        let on_file = load_contracts(&mut tx, ws, Some(contract_id))
            .await?
            .into_iter()
            .next();
        let schedules =
            load_schedules(&mut tx, ws, &ScheduleFilter::for_contract(contract_id)).await?;
        let notes = load_notes(&mut tx, ws, None).await?;
        let effect = plan_contract(cmd, ws, on_file.as_ref(), &schedules, &notes)?;

        if let Some(contract) = &effect.upsert {
            write_contract(&mut tx, contract).await?;
        }
        write_schedule_plan(&mut tx, ws, &effect.plan).await?;
        tx.commit().await.map_err(db_err("commit"))?;
        tracing::debug!(
            workspace = %ws,
            contract = %contract_id,
            inserted = effect.plan.insert.len(),
            updated = effect.plan.update.len(),
            deleted = effect.plan.delete.len(),
            "contract applied"
        );
        Ok(effect.plan)
    }

    async fn transactions(
        &self,
        ws: WorkspaceId,
        filter: &TransactionFilter,
    ) -> CoreResult<Vec<Transaction>> {
        let mut conn = self.conn().await?;
        load_transactions(&mut conn, ws, filter).await
    }

    async fn insert_transaction(&self, ws: WorkspaceId, t: &Transaction) -> CoreResult<()> {
        ensure_owned(ws, t.workspace_id, "transaction", t.id)?;
        let mut tx = self.begin().await?;
        lock_tenant(&mut tx, ws).await?;

        if let Some(original) = t.reverses {
            let (exists, reversed): (bool, bool) = sqlx::query_as(
                r#"
                select
                  exists (select 1 from transactions where id = $1 and workspace_id = $2),
                  exists (select 1 from transactions where reverses = $1)
                "#,
            )
            .bind(original.as_uuid())
            .bind(ws.as_uuid())
            .fetch_one(&mut *tx)
            .await
            .map_err(db_err("reversal check"))?;
            if !exists {
                return Err(CoreError::not_found("transaction", original));
            }
            if reversed {
                return Err(CoreError::conflict(format!(
                    "transaction {original} is already reversed"
                )));
            }
        }

        let sql = format!(
            "insert into transactions ({TRANSACTION_COLUMNS}) \
             values ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)"
        );
        sqlx::query(&sql)
            .bind(t.id.as_uuid())
            .bind(t.workspace_id.as_uuid())
            .bind(t.kind.as_str())
            .bind(t.amount.raw())
            .bind(&t.currency)
            .bind(t.date)
            .bind(&t.description)
            .bind(t.account_id.map(|a| a.as_uuid()))
            .bind(t.entity_id.map(|e| e.as_uuid()))
            .bind(t.reverses.map(|r| r.as_uuid()))
            .bind(&t.source)
            .execute(&mut *tx)
            .await
            .map_err(db_err("insert transaction"))?;
        tx.commit().await.map_err(db_err("commit"))?;
        Ok(())
    }

    async fn transaction(&self, ws: WorkspaceId, id: TransactionId) -> CoreResult<Transaction> {
        let sql = format!(
            "select {TRANSACTION_COLUMNS} from transactions where id = $1 and workspace_id = $2"
        );
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .bind(ws.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err("transaction"))?
            .ok_or_else(|| CoreError::not_found("transaction", id))?;
        rows::transaction(&row)
    }

    async fn debit_notes(&self, ws: WorkspaceId) -> CoreResult<Vec<DebitNote>> {
        let mut conn = self.conn().await?;
        load_notes(&mut conn, ws, None).await
    }

    async fn debit_note(&self, ws: WorkspaceId, id: DebitNoteId) -> CoreResult<DebitNote> {
        let mut conn = self.conn().await?;
        load_notes(&mut conn, ws, Some(id))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| CoreError::not_found("debit note", id))
    }

    async fn apply_billing(
        &self,
        ws: WorkspaceId,
        cmd: &BillingCommand,
        now: DateTime<Utc>,
    ) -> CoreResult<BillingEffect> {
        let mut tx = self.begin().await?;
        lock_tenant(&mut tx, ws).await?;

        let schedules = load_schedules(&mut tx, ws, &ScheduleFilter::all()).await?;
        let notes = load_notes(&mut tx, ws, None).await?;
        let transactions = load_transactions(&mut tx, ws, &TransactionFilter::all()).await?;
        let snap = BillingSnapshot {
            schedules: &schedules,
            notes: &notes,
            transactions: &transactions,
        };
        let effect = plan_billing(cmd, &snap, ws, now)?;

        if let Some(id) = effect.delete {
            sqlx::query("delete from debit_notes where id = $1 and workspace_id = $2")
                .bind(id.as_uuid())
                .bind(ws.as_uuid())
                .execute(&mut *tx)
                .await
                .map_err(db_err("delete debit note"))?;
        }
        if let Some(note) = &effect.upsert {
            upsert_note(&mut tx, note).await?;
        }
        tx.commit().await.map_err(db_err("commit"))?;
        Ok(effect)
    }

    async fn apply_link(&self, ws: WorkspaceId, cmd: &LinkCommand) -> CoreResult<Schedule> {
        let mut tx = self.begin().await?;
        lock_tenant(&mut tx, ws).await?;

        let schedules = load_schedules(&mut tx, ws, &ScheduleFilter::all()).await?;
        let transactions = load_transactions(&mut tx, ws, &TransactionFilter::all()).await?;
        let updated = apply_link_command(cmd, &schedules, &transactions)?;
        update_schedule(&mut tx, &updated).await?;
        tx.commit().await.map_err(db_err("commit"))?;
        Ok(updated)
    }

    async fn alerts(&self, ws: WorkspaceId) -> CoreResult<Vec<Alert>> {
        let sql = format!(
            r#"select {ALERT_COLUMNS} from alerts where workspace_id = $1
               order by rule_id collate "C", target_key collate "C""#
        );
        let fetched = sqlx::query(&sql)
            .bind(ws.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(db_err("alerts"))?;
        fetched.iter().map(rows::alert).collect()
    }

    async fn apply_alert_changes(
        &self,
        ws: WorkspaceId,
        changes: &AlertChanges,
    ) -> CoreResult<()> {
        for row in changes.rows() {
            ensure_owned(ws, row.workspace_id, "alert", row.id)?;
        }
        let sql = format!(
            "insert into alerts ({ALERT_COLUMNS}) \
             values ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
             on conflict (workspace_id, rule_id, target_key) do update set \
               severity = excluded.severity, \
               state = excluded.state, \
               title = excluded.title, \
               message = excluded.message, \
               drill_down = excluded.drill_down, \
               last_seen = excluded.last_seen, \
               resolved_at = excluded.resolved_at"
        );
        let mut tx = self.begin().await?;
        for a in changes.rows() {
            sqlx::query(&sql)
                .bind(a.id.as_uuid())
                .bind(a.workspace_id.as_uuid())
                .bind(&a.rule_id)
                .bind(&a.target_key)
                .bind(a.severity.as_str())
                .bind(a.state.as_str())
                .bind(&a.title)
                .bind(&a.message)
                .bind(Json(&a.drill_down))
                .bind(a.first_seen)
                .bind(a.last_seen)
                .bind(a.resolved_at)
                .execute(&mut *tx)
                .await
                .map_err(db_err("upsert alert"))?;
        }
        tx.commit().await.map_err(db_err("commit"))?;
        Ok(())
    }
}
