//! Tasklink: bidirectional synchronization between a local task store and a
//! remote issue tracker.
//!
//! The crate keeps a project-management task and its linked GitHub issue
//! consistent: task status changes close/reopen/comment on the issue, and
//! issue state changes update the task, with deterministic conflict
//! resolution when both sides move independently.
//!
//! # Architecture
//!
//! Tasklink follows hexagonal architecture principles:
//!
//! - **Domain**: Pure business logic with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for external interactions
//! - **Adapters**: Concrete implementations of ports (stores, trackers)
//!
//! # Modules
//!
//! - [`link`]: the Link registry — the 1:1 task-to-issue association and
//!   its last-synchronized state snapshot
//! - [`sync`]: the state mapper, sync engine, and conflict resolution

pub mod link;
pub mod sync;
