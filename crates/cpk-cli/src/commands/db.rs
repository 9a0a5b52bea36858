use anyhow::Result;
use serde_json::json;

use super::config::{self, ConfigArgs};
use super::{database_url, Output};

pub async fn status(args: &ConfigArgs, out: Output) -> Result<()> {
    let cfg = config::load(args)?;
    let pool = cpk_db::connect(&database_url(&cfg)?).await?;
    let s = cpk_db::status(&pool).await?;
    out.emit(&s, || {
        println!("db_ok={} has_schedules_table={}", s.ok, s.has_schedules_table)
    })
}

pub async fn migrate(args: &ConfigArgs, out: Output) -> Result<()> {
    let cfg = config::load(args)?;
    let pool = cpk_db::connect(&database_url(&cfg)?).await?;
    cpk_db::migrate(&pool).await?;
    out.emit(&json!({ "migrations_applied": true }), || {
        println!("migrations_applied=true")
    })
}
