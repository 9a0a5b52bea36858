use anyhow::Result;
use cpk_schemas::{ContractId, Schedule, ScheduleStatus, WorkspaceId};
use cpk_store::{ScheduleFilter, Store};
use tracing::info;

use super::config::ConfigArgs;
use super::{open_session, opt, Output};

fn print_schedule(s: &Schedule) {
    println!(
        "schedule id={} sequence={} due_date={} direction={} amount={} status={} transaction_id={}",
        s.id,
        s.sequence,
        s.due_date,
        s.direction,
        s.amount,
        s.status,
        opt(&s.transaction_id)
    );
}

pub async fn generate(
    args: &ConfigArgs,
    out: Output,
    ws: WorkspaceId,
    contract_id: ContractId,
    dry_run: bool,
) -> Result<()> {
    let session = open_session(args).await?;

    if dry_run {
        let contract = session.store.contract(ws, contract_id).await?;
        let preview = session.engine.preview_schedules(ws, &contract).await?;
        return out.emit(&preview, || {
            println!("dry_run=true contract_id={} schedules={}", contract_id, preview.len());
            preview.iter().for_each(print_schedule);
        });
    }

    let plan = session.engine.regenerate_schedules(ws, contract_id).await?;
    info!(
        workspace_id = %ws,
        %contract_id,
        inserted = plan.insert.len(),
        deleted = plan.delete.len(),
        "schedules regenerated"
    );
    out.emit(&plan, || {
        println!("contract_id={contract_id}");
        println!("inserted={}", plan.insert.len());
        println!("updated={}", plan.update.len());
        println!("deleted={}", plan.delete.len());
        if let Some((_, status)) = &plan.contract_status {
            println!("contract_status={status}");
        }
    })
}

pub async fn list(
    args: &ConfigArgs,
    out: Output,
    ws: WorkspaceId,
    contract_id: Option<ContractId>,
    status: Option<ScheduleStatus>,
) -> Result<()> {
    let session = open_session(args).await?;
    let filter = ScheduleFilter {
        contract_id,
        status,
        ..ScheduleFilter::all()
    };
    let schedules = session.engine.schedules(ws, &filter).await?;
    out.emit(&schedules, || {
        println!("schedules={}", schedules.len());
        schedules.iter().for_each(print_schedule);
    })
}
