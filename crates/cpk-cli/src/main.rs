use anyhow::Result;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use cpk_calendar::{Granularity, PeriodKey};
use cpk_schemas::{
    AccountId, ContractId, DebitNoteId, EntityId, ScheduleId, ScheduleStatus, WorkspaceId,
};

mod commands;

use commands::{alerts, cashflow, config, db, reconcile, schedules, Output};

#[derive(Parser)]
#[command(name = "cpk")]
#[command(about = "Cash-planning engine CLI", long_about = None)]
struct Cli {
    /// Print results as JSON instead of key=value lines
    #[arg(long, global = true, default_value_t = false)]
    json: bool,

    /// Layered config paths in merge order (base -> env -> overrides)
    #[arg(long = "config", global = true)]
    config_paths: Vec<String>,

    /// Fail when the config carries keys the engine never reads
    #[arg(long, global = true, default_value_t = false)]
    strict_config: bool,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Database commands
    Db {
        #[command(subcommand)]
        cmd: DbCmd,
    },

    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Payment schedules
    Schedules {
        #[command(subcommand)]
        cmd: SchedulesCmd,
    },

    /// Cash-flow projections
    Cashflow {
        #[command(subcommand)]
        cmd: CashflowCmd,
    },

    /// Reconciliation helpers
    Reconcile {
        #[command(subcommand)]
        cmd: ReconcileCmd,
    },

    /// Alert engine
    Alerts {
        #[command(subcommand)]
        cmd: AlertsCmd,
    },
}

#[derive(Subcommand)]
enum DbCmd {
    Status,

    /// Apply SQL migrations
    Migrate,
}

#[derive(Subcommand)]
enum SchedulesCmd {
    /// Regenerate a contract's schedules and print the applied plan
    Generate {
        #[arg(long)]
        workspace: WorkspaceId,

        #[arg(long)]
        contract: ContractId,

        /// Print the expansion without writing anything
        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },

    /// List schedules, ordered by due date
    List {
        #[arg(long)]
        workspace: WorkspaceId,

        #[arg(long)]
        contract: Option<ContractId>,

        /// planned | realized | cancelled
        #[arg(long)]
        status: Option<ScheduleStatus>,
    },
}

#[derive(Args)]
pub(crate) struct MatrixArgs {
    #[arg(long)]
    workspace: WorkspaceId,

    /// First day, YYYY-MM-DD
    #[arg(long)]
    from: NaiveDate,

    /// Last day, YYYY-MM-DD
    #[arg(long)]
    to: NaiveDate,

    /// day | month
    #[arg(long, default_value = "month")]
    granularity: Granularity,

    #[arg(long)]
    entity: Option<EntityId>,

    #[arg(long)]
    account: Option<AccountId>,
}

#[derive(Subcommand)]
enum CashflowCmd {
    /// Planned vs realised matrix with cumulative balances
    Matrix {
        #[command(flatten)]
        args: MatrixArgs,
    },

    /// Rows behind one period of the matrix
    Drill {
        #[command(flatten)]
        args: MatrixArgs,

        /// YYYY-MM for month buckets, YYYY-MM-DD for day buckets
        #[arg(long)]
        period: PeriodKey,
    },

    /// Executive KPIs over the configured window around today
    Kpis {
        #[arg(long)]
        workspace: WorkspaceId,

        /// Defaults to the current UTC date
        #[arg(long)]
        today: Option<NaiveDate>,
    },
}

#[derive(Subcommand)]
enum ReconcileCmd {
    /// Transactions that could settle a debit note or a schedule
    Candidates {
        #[arg(long)]
        workspace: WorkspaceId,

        #[arg(long, conflicts_with = "schedule", required_unless_present = "schedule")]
        debit_note: Option<DebitNoteId>,

        #[arg(long)]
        schedule: Option<ScheduleId>,
    },
}

#[derive(Subcommand)]
enum AlertsCmd {
    /// Run one alert batch. Without --workspace every tenant is evaluated.
    Evaluate {
        #[arg(long)]
        workspace: Vec<WorkspaceId>,

        /// Defaults to the current UTC date
        #[arg(long)]
        today: Option<NaiveDate>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // dev-time convenience; a missing file is fine
    let _ = dotenvy::from_filename(".env.local");

    // stdout carries command output; logs go to stderr
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let out = Output::new(cli.json);
    let cfg_args = config::ConfigArgs {
        paths: cli.config_paths,
        strict: cli.strict_config,
    };

    match cli.cmd {
        Commands::Db { cmd } => match cmd {
            DbCmd::Status => db::status(&cfg_args, out).await?,
            DbCmd::Migrate => db::migrate(&cfg_args, out).await?,
        },

        Commands::ConfigHash { paths } => config::hash(&paths, cfg_args.strict, out)?,

        Commands::Schedules { cmd } => match cmd {
            SchedulesCmd::Generate {
                workspace,
                contract,
                dry_run,
            } => schedules::generate(&cfg_args, out, workspace, contract, dry_run).await?,
            SchedulesCmd::List {
                workspace,
                contract,
                status,
            } => schedules::list(&cfg_args, out, workspace, contract, status).await?,
        },

        Commands::Cashflow { cmd } => match cmd {
            CashflowCmd::Matrix { args } => cashflow::matrix(&cfg_args, out, &args).await?,
            CashflowCmd::Drill { args, period } => {
                cashflow::drill(&cfg_args, out, &args, period).await?
            }
            CashflowCmd::Kpis { workspace, today } => {
                cashflow::kpis(&cfg_args, out, workspace, today).await?
            }
        },

        Commands::Reconcile { cmd } => match cmd {
            ReconcileCmd::Candidates {
                workspace,
                debit_note,
                schedule,
            } => reconcile::candidates(&cfg_args, out, workspace, debit_note, schedule).await?,
        },

        Commands::Alerts { cmd } => match cmd {
            AlertsCmd::Evaluate { workspace, today } => {
                alerts::evaluate(&cfg_args, out, &workspace, today).await?
            }
        },
    }

    Ok(())
}
