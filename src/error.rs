use crate::runtime::Filter;
use crate::stages::Stage;
use crate::stages::Target;
use std::path::PathBuf;

/// Everything that can end (or dent) a run.
///
/// Fatal variants halt the run and map to a distinct process exit code via
/// [`Error::code`]. [`Error::VersioningFailed`], [`Error::MergeFailed`] and
/// [`Error::ReportFailed`] are caught by the orchestrator and reported in the
/// run summary instead.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("usage: {0}")]
    Usage(String),
    #[error("snapshot not found: {}", .0.display())]
    SnapshotMissing(PathBuf),
    #[error("database container not found ({0})")]
    RuntimeNotFound(Filter),
    #[error("service group failed to start: {0}")]
    RuntimeStartFailed(String),
    #[error("database query failed: {0}")]
    Query(String),
    #[error("truncate of table {table} failed: {reason}")]
    TruncateFailed { table: String, reason: String },
    #[error("restore from {} failed: {reason}", .path.display())]
    RestoreFailed { path: PathBuf, reason: String },
    #[error("dump to {} failed: {reason}", .path.display())]
    DumpFailed { path: PathBuf, reason: String },
    #[error("stage {stage} ({target}) failed: {reason}")]
    StageFailed {
        stage: Stage,
        target: Target,
        reason: String,
    },
    #[error("snapshot versioning failed: {0}")]
    VersioningFailed(String),
    #[error("merge {from} -> {into} failed after push: {reason}")]
    MergeFailed {
        from: String,
        into: String,
        reason: String,
    },
    #[error("report failed: {0}")]
    ReportFailed(String),
    #[error("another run holds the lock at {}", .0.display())]
    AlreadyRunning(PathBuf),
    #[error("interrupted")]
    Interrupted,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Process exit code for this error.
    pub fn code(&self) -> i32 {
        match self {
            Self::Usage(_) => 1,
            Self::SnapshotMissing(_) => 2,
            Self::RuntimeNotFound(_) => 3,
            Self::Query(_) => 4,
            Self::TruncateFailed { .. } => 4,
            Self::RestoreFailed { .. } => 4,
            Self::StageFailed { .. } => 5,
            Self::DumpFailed { .. } => 6,
            Self::RuntimeStartFailed(_) => 7,
            Self::AlreadyRunning(_) => 8,
            Self::Interrupted => 130,
            Self::VersioningFailed(_) => 9,
            Self::MergeFailed { .. } => 9,
            Self::ReportFailed(_) => 9,
            Self::Io(_) => 9,
        }
    }

    /// Whether the orchestrator must stop the run on this error.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Self::VersioningFailed(_) | Self::MergeFailed { .. } | Self::ReportFailed(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
