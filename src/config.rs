//! Explicit run configuration.
//!
//! Everything a run depends on (database identity, compose file, snapshot
//! location, stage command, branches) is resolved once from the environment
//! and handed to the [`crate::Orchestrator`] at construction.
use crate::runtime::Filter;
use crate::stages::Target;
use std::path::PathBuf;

/// End-of-run summary: events per website, with generation and publish progress.
pub const REPORT_QUERY: &str = r#"SELECT "Website Name" AS website,
       COUNT(*) AS events,
       COUNT(*) FILTER (WHERE "Generated Content") AS generated,
       COUNT(*) FILTER (WHERE "Published") AS published
FROM event
GROUP BY 1
ORDER BY 1"#;

#[derive(Debug, Clone)]
pub struct Config {
    pub db_name: String,
    pub db_user: String,
    pub db_password: Option<String>,
    pub compose: PathBuf,
    pub container: Filter,
    pub snapshot: PathBuf,
    pub stage_program: String,
    pub stage_args: Vec<String>,
    pub stage_dir: PathBuf,
    pub repository: PathBuf,
    pub remote: String,
    pub working_branch: String,
    pub stable_branch: String,
    pub lock: PathBuf,
    pub report_query: String,
    pub switches: Switches,
}

/// Per-run toggles, normally set from command line flags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Switches {
    /// Leave the service group running when the run ends.
    pub keep_up: bool,
    pub skip_restore: bool,
    pub skip_version: bool,
    pub skip_report: bool,
    pub target: Target,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Resolve configuration through an arbitrary variable lookup.
    pub fn from_vars<F>(var: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| var(key).unwrap_or_else(|| String::from(default));
        let container = match var("DB_IMAGE") {
            Some(image) => Filter::Ancestor(image),
            None => Filter::Name(get("DB_CONTAINER", "postgres")),
        };
        Self {
            db_name: get("DB_NAME", "events"),
            db_user: get("DB_USER", "postgres"),
            db_password: var("DB_PASSWORD"),
            compose: PathBuf::from(get("COMPOSE_FILE", "docker-compose.yml")),
            container,
            snapshot: PathBuf::from(get("SNAPSHOT_PATH", "backup/latest.sql.gz")),
            stage_program: get("STAGE_PROGRAM", "python"),
            stage_args: get("STAGE_ARGS", "main.py")
                .split_whitespace()
                .map(String::from)
                .collect(),
            stage_dir: PathBuf::from(get("STAGE_DIR", ".")),
            repository: PathBuf::from(get("GIT_DIR", ".")),
            remote: get("GIT_REMOTE", "origin"),
            working_branch: get("WORKING_BRANCH", "develop"),
            stable_branch: get("STABLE_BRANCH", "main"),
            lock: PathBuf::from(get("LOCK_PATH", ".deploy.lock")),
            report_query: get("REPORT_QUERY", REPORT_QUERY),
            switches: Switches::default(),
        }
    }

    pub fn with(mut self, switches: Switches) -> Self {
        self.switches = switches;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_vars(|_| None)
    }
}
