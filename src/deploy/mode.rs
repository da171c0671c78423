use super::*;
use crate::Config;
use crate::Switches;
use crate::database::*;
use crate::error::Error;
use crate::runtime::*;
use crate::stages::*;
use anyhow::Context;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use std::path::PathBuf;

/// Snapshot-driven orchestration of the event content pipeline.
#[derive(Debug, Parser)]
#[command(name = "deploy", version, args_conflicts_with_subcommands = true)]
pub struct Cli {
    #[command(subcommand)]
    mode: Option<Mode>,
    #[command(flatten)]
    flags: Flags,
}

/// Restore the database from a snapshot.
#[derive(Debug, Parser)]
#[command(name = "restore", version)]
pub struct RestoreCli {
    /// Snapshot to load (`.sql` or `.sql.gz`).
    #[arg(env = "SNAPSHOT_PATH")]
    path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Args)]
pub struct Flags {
    /// Leave the service group running when the run ends.
    #[arg(long)]
    keep_up: bool,
    /// Do not restore the snapshot before running stages.
    #[arg(long)]
    skip_restore: bool,
    /// Do not commit or merge the fresh snapshot.
    #[arg(long)]
    skip_version: bool,
    /// Do not print the end-of-run report.
    #[arg(long)]
    skip_report: bool,
    /// Run stages against one source instead of all.
    #[arg(long, default_value = "all")]
    source: Target,
}

impl From<Flags> for Switches {
    fn from(flags: Flags) -> Self {
        Self {
            keep_up: flags.keep_up,
            skip_restore: flags.skip_restore,
            skip_version: flags.skip_version,
            skip_report: flags.skip_report,
            target: flags.source,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Mode {
    /// Full pipeline: restore, stages, dump, version, report (default).
    Run(Flags),
    /// Truncate restorable tables and load a snapshot.
    Restore {
        #[arg(env = "SNAPSHOT_PATH")]
        path: Option<PathBuf>,
    },
    /// Write a snapshot of the running database.
    Dump { path: Option<PathBuf> },
    /// Show service group, snapshot and table state.
    Status,
    /// List the pipeline stages in execution order.
    Stages,
}

impl Mode {
    /// Entry point of the `deploy` binary. Returns the process exit code.
    pub async fn run() -> i32 {
        let cli = match Cli::try_parse() {
            Ok(cli) => cli,
            Err(e) => return usage(e),
        };
        let mode = cli.mode.unwrap_or(Self::Run(cli.flags));
        exit(mode.execute(Config::from_env()).await)
    }

    /// Entry point of the `restore` binary. Returns the process exit code.
    pub async fn restore() -> i32 {
        let cli = match RestoreCli::try_parse() {
            Ok(cli) => cli,
            Err(e) => return usage(e),
        };
        let mode = Self::Restore { path: cli.path };
        exit(mode.execute(Config::from_env()).await)
    }

    pub async fn execute(self, config: Config) -> anyhow::Result<()> {
        match self {
            Self::Run(flags) => {
                let summary = Orchestrator::from(config.with(flags.into())).run().await?;
                summary.lines().iter().for_each(|l| log::info!("{}", l));
                if let Versioning::Failed(ref e) = summary.versioning {
                    log::warn!("{:<32}{}", "pipeline succeeded, but", e);
                }
                Ok(())
            }
            Self::Restore { path } => Ok(restore_from(&config, path).await?),
            Self::Dump { path } => dump_to(&config, path).await,
            Self::Status => status(&config).await,
            Self::Stages => {
                Stage::all()
                    .iter()
                    .for_each(|s| println!("{}. {}", s.ordinal(), s));
                Ok(())
            }
        }
    }
}

/// Restore entry point: usage, file, handle, then truncate and load.
async fn restore_from(config: &Config, path: Option<PathBuf>) -> crate::Result<()> {
    restore_with(&Compose::from(config), &Postgres::from(config), config, path).await
}

async fn restore_with<R, D>(
    runtime: &R,
    db: &D,
    config: &Config,
    path: Option<PathBuf>,
) -> crate::Result<()>
where
    R: Runtime,
    D: Database,
{
    let path = path.ok_or_else(|| Error::Usage(String::from("restore <SNAPSHOT.sql[.gz]>")))?;
    let snapshot = Snapshot::new(path);
    if !snapshot.exists() {
        return Err(Error::SnapshotMissing(snapshot.path().to_path_buf()));
    }
    let _lock = RunLock::acquire(&config.lock)?;
    let handle = runtime.find(&config.container).await?;
    log::info!("{:<32}{:<32}", "database container", handle);
    let tables = restore(db, &handle, &snapshot).await?;
    log::info!("{:<32}{:<32}", "restore complete", format!("{} tables", tables.len()));
    Ok(())
}

async fn dump_to(config: &Config, path: Option<PathBuf>) -> anyhow::Result<()> {
    let snapshot = Snapshot::new(path.unwrap_or_else(|| config.snapshot.clone()));
    let _lock = RunLock::acquire(&config.lock)?;
    let handle = Compose::from(config).find(&config.container).await?;
    Postgres::from(config)
        .dump(&handle, &snapshot)
        .await
        .with_context(|| format!("manual dump to {}", snapshot))?;
    log::info!("{:<32}{:<32}", "dump complete", snapshot);
    Ok(())
}

async fn status(config: &Config) -> anyhow::Result<()> {
    let runtime = Compose::from(config);
    let snapshot = Snapshot::new(config.snapshot.clone());
    log::info!("{:<32}{:<32}", "service group running", runtime.running().await);
    match std::fs::metadata(snapshot.path()) {
        Ok(meta) => log::info!("{:<32}{:<32}", snapshot, format!("{} bytes", meta.len())),
        Err(_) => log::warn!("{:<32}{:<32}", "no snapshot at", snapshot),
    }
    let handle = match runtime.find(&config.container).await {
        Ok(handle) => handle,
        Err(e) => {
            log::warn!("{}", e);
            return Ok(());
        }
    };
    log::info!("{:<32}{:<32}", "database container", handle);
    let db = Postgres::from(config);
    let tables = db.tables(&handle).await.context("listing restorable tables")?;
    let counts = db.counts(&handle, &tables).await.context("counting table rows")?;
    log::info!("┌──────────────────────┬───────────────┐");
    log::info!("│ Table                │          Rows │");
    log::info!("├──────────────────────┼───────────────┤");
    for (table, n) in counts {
        log::info!("│ {:<20} │ {:>13} │", table, n);
    }
    log::info!("└──────────────────────┴───────────────┘");
    Ok(())
}

/// Print a clap error. Help and version exit 0; anything else is a usage error.
fn usage(e: clap::Error) -> i32 {
    let _ = e.print();
    match e.use_stderr() {
        true => 1,
        false => 0,
    }
}

fn exit(result: anyhow::Result<()>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(e) => {
            log::error!("{:#}", e);
            e.downcast_ref::<Error>().map(Error::code).unwrap_or(9)
        }
    }
}
