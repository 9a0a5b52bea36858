use anyhow::Result;
use chrono::{NaiveDate, Utc};
use cpk_calendar::{Granularity, PeriodKey};
use cpk_cashflow::{CashFlowFilter, ExecutiveKpis, MatrixRequest};

use super::config::ConfigArgs;
use super::{open_session, opt, Output};
use crate::MatrixArgs;

fn request(args: &MatrixArgs) -> MatrixRequest {
    MatrixRequest {
        from: args.from,
        to: args.to,
        granularity: args.granularity,
        filter: CashFlowFilter {
            entity_id: args.entity,
            account_id: args.account,
        },
    }
}

pub async fn matrix(cfg: &ConfigArgs, out: Output, args: &MatrixArgs) -> Result<()> {
    let session = open_session(cfg).await?;
    let m = session
        .engine
        .cash_flow_matrix(args.workspace, &request(args))
        .await?;

    out.emit(&m, || {
        println!(
            "starting_balance={} as_of={}",
            m.starting_balance.amount,
            opt(&m.starting_balance.as_of)
        );
        for b in &m.periods {
            println!(
                "period={} planned_income={} planned_expense={} realised_income={} \
                 realised_expense={} planned_cum={} realised_cum={} planned_cum_adj={} \
                 realised_cum_adj={}",
                b.period,
                b.planned_income,
                b.planned_expense,
                b.realised_income,
                b.realised_expense,
                b.planned_cum,
                b.realised_cum,
                b.planned_cum_adj,
                b.realised_cum_adj
            );
        }
    })
}

pub async fn drill(
    cfg: &ConfigArgs,
    out: Output,
    args: &MatrixArgs,
    period: PeriodKey,
) -> Result<()> {
    let session = open_session(cfg).await?;
    let detail = session
        .engine
        .drill_down(args.workspace, &request(args), period)
        .await?;

    out.emit(&detail, || {
        println!("period={}", detail.period);
        for s in &detail.schedules {
            println!(
                "schedule id={} due_date={} direction={} amount={} status={}",
                s.id, s.due_date, s.direction, s.amount, s.status
            );
        }
        for t in &detail.transactions {
            println!(
                "transaction id={} date={} kind={} amount={} reverses={}",
                t.id,
                t.date,
                t.kind,
                t.amount,
                opt(&t.reverses)
            );
        }
    })
}

pub async fn kpis(
    cfg: &ConfigArgs,
    out: Output,
    ws: cpk_schemas::WorkspaceId,
    today: Option<NaiveDate>,
) -> Result<()> {
    let session = open_session(cfg).await?;
    let today = today.unwrap_or_else(|| Utc::now().date_naive());
    let window = &session.config.cashflow;
    let req = MatrixRequest::window(
        today,
        window.lookback_months,
        window.horizon_months,
        Granularity::Month,
    )?;
    let kpis = session.engine.executive_kpis(ws, &req, today).await?;

    out.emit(&kpis, || match &kpis {
        ExecutiveKpis::NoData => println!("has_data=false"),
        ExecutiveKpis::Data(s) => {
            println!("has_data=true");
            println!("from={} to={} today={}", req.from, req.to, today);
            println!(
                "planned_income={} planned_expense={} planned_net={}",
                s.planned_income, s.planned_expense, s.planned_net
            );
            println!(
                "realised_income={} realised_expense={} realised_net={}",
                s.realised_income, s.realised_expense, s.realised_net
            );
            println!(
                "income_delta={} expense_delta={} net_delta={}",
                s.income_delta, s.expense_delta, s.net_delta
            );
            println!(
                "worst_period={} worst_balance={}",
                s.worst_point.period, s.worst_point.balance
            );
            for p in s.trend.iter().flatten() {
                println!("trend period={} planned_net={}", p.period, p.planned_net);
            }
        }
    })
}
