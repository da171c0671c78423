//! Snapshot-driven orchestration of the event content pipeline.
//!
//! A run brings the backing service group up, restores the last database
//! snapshot, drives the eight pipeline stages in their fixed order, dumps a
//! fresh snapshot, versions it in git when it changed, prints a summary
//! report, and tears the service group down again.
//!
//! ## Adapters
//!
//! - [`Runtime`]: container service group lifecycle and handle lookup
//! - [`Database`]: table discovery, truncate, restore, dump, reports
//! - [`Runner`]: opaque invocation of one pipeline stage
//! - [`Vcs`]: snapshot change detection, commit, merge-forward
//!
//! ## Orchestration
//!
//! - [`Orchestrator`]: the run state machine over the adapters above
//! - [`Mode`]: command line entry points
pub mod config;
pub mod database;
pub mod deploy;
pub mod error;
pub mod runtime;
mod shell;
pub mod stages;
pub mod vcs;

#[cfg(test)]
mod testing;

pub use config::*;
pub use database::*;
pub use deploy::*;
pub use error::*;
pub use runtime::*;
pub use stages::*;
pub use vcs::*;

// ============================================================================
// DATABASE
// ============================================================================
/// Schema whose tables are restorable.
pub const SCHEMA: &str = "public";
/// Migration bookkeeping table. Never truncated, restored, or dumped.
pub const MIGRATIONS: &str = "alembic_version";
/// Connection attempts while the database container finishes booting.
pub const CONNECT_ATTEMPTS: usize = 30;
/// Pause between connection attempts.
pub const CONNECT_BACKOFF: std::time::Duration = std::time::Duration::from_secs(1);
/// Container port whose host binding the catalog connection goes through.
pub const POSTGRES_PORT: &str = "5432/tcp";

// ============================================================================
// SNAPSHOTS
// ============================================================================
/// File suffix selecting the gzip-compressed snapshot variant.
pub const GZIP_SUFFIX: &str = "gz";
/// Suffix appended to a snapshot path while a dump is being written.
pub const PARTIAL_SUFFIX: &str = "partial";

// ============================================================================
// RUNTIME UTILITIES
// ============================================================================
/// Initialize dual logging (terminal + file) with timestamped log files.
/// Writes DEBUG level to `$LOG_DIR/<unix-time>.log` and INFO to terminal.
/// Falls back to terminal-only logging if the log file cannot be created.
pub fn log() {
    let config = simplelog::ConfigBuilder::new()
        .set_location_level(log::LevelFilter::Off)
        .set_target_level(log::LevelFilter::Off)
        .set_thread_level(log::LevelFilter::Off)
        .build();
    let term = simplelog::TermLogger::new(
        log::LevelFilter::Info,
        config.clone(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    );
    let mut loggers: Vec<Box<dyn simplelog::SharedLogger>> = vec![term];
    let dir = std::env::var("LOG_DIR").unwrap_or_else(|_| String::from("logs"));
    let time = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    match std::fs::create_dir_all(&dir)
        .and_then(|_| std::fs::File::create(format!("{}/{}.log", dir, time)))
    {
        Ok(file) => loggers.push(simplelog::WriteLogger::new(
            log::LevelFilter::Debug,
            config,
            file,
        )),
        Err(e) => eprintln!("file logging disabled: {}", e),
    }
    let _ = simplelog::CombinedLogger::init(loggers);
}

/// Set while an orchestrated run owns teardown of the service group.
static TEARDOWN: std::sync::atomic::AtomicBool = std::sync::atomic::AtomicBool::new(false);

/// Claim or release the first Ctrl+C on behalf of a run's teardown.
pub fn defer(claimed: bool) {
    TEARDOWN.store(claimed, std::sync::atomic::Ordering::SeqCst);
}

/// Register Ctrl+C handler.
/// While a run has claimed teardown ([`defer`]) the first interrupt is left to
/// it, so the service group still goes down. Any other interrupt exits
/// immediately.
pub fn kys() {
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if TEARDOWN.swap(false, std::sync::atomic::Ordering::SeqCst) {
                println!();
                log::warn!("interrupt received, tearing down (again to exit now)");
                continue;
            }
            println!();
            log::warn!("violent interrupt received, exiting immediately");
            std::process::exit(130);
        }
    });
}
