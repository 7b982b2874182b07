//! Link registry for task-to-issue associations.
//!
//! A `Link` records that a local task and a remote issue are the same unit
//! of work, together with the last-known state of both sides and the
//! direction of the most recent successful synchronization. The registry
//! enforces the 1:1 invariant: at most one link per task and per issue.
//! The module follows hexagonal architecture:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]

pub mod adapters;
pub mod domain;
pub mod ports;

#[cfg(test)]
mod tests;
