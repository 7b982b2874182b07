//! Domain model for synchronization: events, mapping rules, and conflict
//! resolution, all free of infrastructure concerns.

pub mod conflict;
pub mod mapper;

mod event;

pub use conflict::{Resolution, resolve_divergence};
pub use event::{SyncChange, SyncEvent, SyncSource};
