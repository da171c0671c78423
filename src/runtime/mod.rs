//! Container runtime adapter.
//!
//! The backing services (the database and its companions) are managed as one
//! compose group. Every database operation needs a [`Handle`] to the running
//! database container, resolved through a [`Filter`].
mod compose;
mod filter;
mod handle;

pub use compose::*;
pub use filter::*;
pub use handle::*;

use crate::error::Result;

/// Lifecycle of the backing service group.
#[async_trait::async_trait]
pub trait Runtime: Send + Sync {
    /// True if any member of the group reports running.
    async fn running(&self) -> bool;
    /// Bring the group up. No-op when any member is already running.
    async fn start(&self) -> Result<()>;
    /// Bring the group down.
    async fn stop(&self) -> Result<()>;
    /// First running container matching the filter, else `RuntimeNotFound`.
    async fn find(&self, filter: &Filter) -> Result<Handle>;
}
