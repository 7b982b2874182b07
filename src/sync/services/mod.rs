//! Orchestration services for the synchronization engine.

pub mod engine;
pub mod locks;
pub mod retry;

pub use engine::{SyncEngine, SyncError, SyncOutcome, SyncResult};
pub use locks::LinkLocks;
pub use retry::{RetryError, RetryPolicy, RetryableError};
