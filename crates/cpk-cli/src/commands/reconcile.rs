use anyhow::{bail, Result};
use cpk_schemas::{DebitNoteId, ScheduleId, WorkspaceId};

use super::config::ConfigArgs;
use super::{open_session, Output};

pub async fn candidates(
    args: &ConfigArgs,
    out: Output,
    ws: WorkspaceId,
    debit_note: Option<DebitNoteId>,
    schedule: Option<ScheduleId>,
) -> Result<()> {
    let session = open_session(args).await?;
    let found = match (debit_note, schedule) {
        (Some(note_id), _) => session.engine.debit_note_candidates(ws, note_id).await?,
        (None, Some(schedule_id)) => session.engine.schedule_candidates(ws, schedule_id).await?,
        (None, None) => bail!("pass --debit-note or --schedule"),
    };

    out.emit(&found, || {
        println!("candidates={}", found.len());
        for c in &found {
            println!(
                "transaction_id={} date={} amount={} date_distance_days={} amount_distance={}",
                c.transaction.id,
                c.transaction.date,
                c.transaction.amount,
                c.date_distance_days,
                c.amount_distance
            );
        }
    })
}
