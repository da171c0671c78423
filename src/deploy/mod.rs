//! Deployment orchestration.
//!
//! A run walks a fixed state machine:
//!
//! 1. **RuntimeUp**: start the service group unless something already runs
//! 2. **Restored**: truncate and load the snapshot, if one exists
//! 3. **Stage 1..8**: the pipeline stages, strictly in order
//! 4. **Dumped**: write a fresh snapshot
//! 5. **Versioned**: commit, push and merge-forward, if the snapshot changed
//! 6. **Reported**: print the summary query, if the database is reachable
//! 7. **RuntimeDown**: stop the service group on every exit path
mod lock;
mod mode;
mod orchestrator;
mod phase;
mod summary;


pub use lock::*;
pub use mode::*;
pub use orchestrator::*;
pub use phase::*;
pub use summary::*;
