//! Pipeline stages and the boundary that runs them.
//!
//! A stage is opaque: the orchestrator only observes whether the invocation
//! succeeded. Ordering is the orchestrator's job, not the runner's.
mod process;
mod stage;
mod target;

pub use process::*;
pub use stage::*;
pub use target::*;

/// Invokes one stage against a target.
#[async_trait::async_trait]
pub trait Runner: Send + Sync {
    async fn run(&self, stage: Stage, target: Target) -> crate::Result<()>;
}
