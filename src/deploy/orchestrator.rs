use super::*;
use crate::Config;
use crate::database::*;
use crate::error::Result;
use crate::runtime::*;
use crate::stages::*;
use crate::vcs::*;
use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;

/// Sequences one run over the four adapters.
///
/// Every step blocks until it completes. A fatal error stops the run at
/// that step; the service group is torn down afterwards regardless, unless
/// `keep_up` was requested.
pub struct Orchestrator<R, D, S, V> {
    config: Config,
    runtime: R,
    database: D,
    runner: S,
    vcs: V,
}

impl From<Config> for Orchestrator<Compose, Postgres, Process, Git> {
    fn from(config: Config) -> Self {
        Self::new(
            Compose::from(&config),
            Postgres::from(&config),
            Process::from(&config),
            Git::from(&config),
            config,
        )
    }
}

impl<R, D, S, V> Orchestrator<R, D, S, V>
where
    R: Runtime,
    D: Database,
    S: Runner,
    V: Vcs,
{
    pub fn new(runtime: R, database: D, runner: S, vcs: V, config: Config) -> Self {
        Self {
            config,
            runtime,
            database,
            runner,
            vcs,
        }
    }

    /// Run the whole pipeline under the run lock. Ctrl+C abandons the
    /// current step and still tears down.
    pub async fn run(&self) -> Result<Summary> {
        crate::defer(true);
        let result = self.run_until(interrupt()).await;
        crate::defer(false);
        result
    }

    /// Run the pipeline until it ends or `stop` resolves, whichever is first.
    /// Teardown follows either way.
    pub async fn run_until<F>(&self, stop: F) -> Result<Summary>
    where
        F: Future<Output = ()>,
    {
        let _lock = RunLock::acquire(&self.config.lock)?;
        let mut summary = Summary::default();
        summary.enter(Phase::Init);
        let outcome = tokio::select! {
            outcome = AssertUnwindSafe(self.pipeline(&mut summary)).catch_unwind() => outcome,
            _ = stop => {
                log::warn!("{:<32}{:<32}", "run interrupted", "tearing down");
                Ok(Err(crate::Error::Interrupted))
            }
        };
        self.teardown(&mut summary).await;
        match outcome {
            Ok(Ok(())) => {
                summary.enter(Phase::Done);
                Ok(summary)
            }
            Ok(Err(e)) => {
                log::error!("{:<32}{}", "run halted", e);
                log::error!(
                    "{:<32}{}",
                    "phases completed",
                    summary
                        .phases
                        .iter()
                        .map(|p| p.to_string())
                        .collect::<Vec<_>>()
                        .join(" -> ")
                );
                Err(e)
            }
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }

    async fn pipeline(&self, summary: &mut Summary) -> Result<()> {
        self.runtime.start().await?;
        summary.enter(Phase::RuntimeUp);
        let snapshot = Snapshot::new(&self.config.snapshot);
        self.restore(&snapshot, summary).await?;
        self.stages(summary).await?;
        self.dump(&snapshot).await?;
        summary.enter(Phase::Dumped);
        summary.versioning = self.version(&snapshot).await;
        if let Versioning::Merged = summary.versioning {
            summary.enter(Phase::Versioned);
        }
        if let Some(report) = self.report().await {
            log::info!("end of run report");
            report
                .to_string()
                .lines()
                .for_each(|line| log::info!("{}", line));
            summary.report = Some(report);
            summary.enter(Phase::Reported);
        }
        Ok(())
    }

    async fn restore(&self, snapshot: &Snapshot, summary: &mut Summary) -> Result<()> {
        if self.config.switches.skip_restore {
            log::info!("{:<32}{:<32}", "skipping restore", "requested");
            return Ok(());
        }
        if !snapshot.exists() {
            log::warn!("{:<32}{:<32}", "no snapshot, skipping restore", snapshot);
            return Ok(());
        }
        let handle = self.runtime.find(&self.config.container).await?;
        let tables = restore(&self.database, &handle, snapshot).await?;
        summary.restored = Some(tables);
        summary.enter(Phase::Restored);
        Ok(())
    }

    async fn stages(&self, summary: &mut Summary) -> Result<()> {
        let target = self.config.switches.target;
        for stage in Stage::all() {
            log::info!(
                "{:<32}{:<32}",
                format!("running stage {}/8", stage.ordinal()),
                format!("{} {}", stage, target)
            );
            self.runner.run(stage, target).await?;
            summary.enter(Phase::Stage(stage));
        }
        Ok(())
    }

    async fn dump(&self, snapshot: &Snapshot) -> Result<()> {
        let handle = self.runtime.find(&self.config.container).await?;
        log::info!("{:<32}{:<32}", "dumping snapshot", snapshot);
        self.database.dump(&handle, snapshot).await
    }

    /// Commit and merge the fresh snapshot if it changed. Never fatal.
    async fn version(&self, snapshot: &Snapshot) -> Versioning {
        if self.config.switches.skip_version {
            log::info!("{:<32}{:<32}", "skipping versioning", "requested");
            return Versioning::Skipped;
        }
        let path = match std::path::absolute(snapshot.path()) {
            Ok(path) => path,
            Err(e) => return Versioning::Failed(crate::Error::VersioningFailed(e.to_string())),
        };
        let working = self.config.working_branch.as_str();
        let stable = self.config.stable_branch.as_str();
        match self.vcs.changed(&path).await {
            Ok(false) => {
                log::info!("{:<32}{:<32}", "snapshot unchanged", "nothing to commit");
                return Versioning::Unchanged;
            }
            Ok(true) => {}
            Err(e) => {
                log::warn!("{:<32}{}", "versioning failed", e);
                return Versioning::Failed(e);
            }
        }
        if let Err(e) = self.vcs.commit(&path, &message(), working).await {
            log::warn!("{:<32}{}", "versioning failed", e);
            return Versioning::Failed(e);
        }
        match self.vcs.merge(working, stable).await {
            Ok(()) => Versioning::Merged,
            Err(e) => {
                log::warn!("{:<32}{}", "merge failed after push", e);
                Versioning::Failed(e)
            }
        }
    }

    /// End-of-run report, if the database container is still reachable.
    async fn report(&self) -> Option<Report> {
        if self.config.switches.skip_report {
            return None;
        }
        let handle = match self.runtime.find(&self.config.container).await {
            Ok(handle) => handle,
            Err(e) => {
                log::warn!("{:<32}{}", "skipping report", e);
                return None;
            }
        };
        self.database
            .report(&handle, &self.config.report_query)
            .await
            .map_err(|e| log::warn!("{:<32}{}", "skipping report", e))
            .ok()
    }

    async fn teardown(&self, summary: &mut Summary) {
        if self.config.switches.keep_up {
            log::warn!("{:<32}{:<32}", "leaving service group up", "--keep-up");
            summary.teardown = Teardown::KeptUp;
            return;
        }
        match self.runtime.stop().await {
            Ok(()) => {
                summary.teardown = Teardown::Stopped;
                summary.enter(Phase::RuntimeDown);
            }
            Err(e) => {
                log::warn!("{:<32}{}", "teardown failed", e);
                summary.teardown = Teardown::Failed(e.to_string());
            }
        }
    }
}

/// Resolves on Ctrl+C. Never resolves if the handler cannot be installed.
async fn interrupt() {
    if tokio::signal::ctrl_c().await.is_err() {
        futures::future::pending::<()>().await;
    }
}

fn message() -> String {
    let time = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    format!("Update database snapshot ({})", time)
}
