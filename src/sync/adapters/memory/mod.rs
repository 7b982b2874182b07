//! In-memory collaborator adapters.
//!
//! Faithful stand-ins for the external task store and tracker, with hooks
//! for simulating external edits and transient outages in tests.

mod task_store;
mod tracker;

pub use task_store::{InMemoryTaskStore, TaskOp};
pub use tracker::{InMemoryIssueTracker, TrackerOp};
