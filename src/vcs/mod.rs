//! Version control adapter for the snapshot file.
//!
//! Two long-lived branches are kept in step: snapshots are committed on the
//! working branch, which is then fast-forwarded into the stable branch.
mod git;

pub use git::*;

use crate::error::Result;
use std::path::Path;

#[async_trait::async_trait]
pub trait Vcs: Send + Sync {
    /// True when `path` differs from its last committed version (or is new).
    async fn changed(&self, path: &Path) -> Result<bool>;
    /// Commit `path` alone on `branch` and push it.
    async fn commit(&self, path: &Path, message: &str, branch: &str) -> Result<()>;
    /// Fast-forward `into` to `from`, push it, and leave `from` checked out.
    async fn merge(&self, from: &str, into: &str) -> Result<()>;
}
