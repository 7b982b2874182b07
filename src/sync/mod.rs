//! Synchronization engine between the task store and the issue tracker.
//!
//! Given an observed change on either side, the engine looks up the link,
//! computes the target state for the opposite side through the pure state
//! mapper, applies it through the external collaborators with bounded
//! retries, and records the settled snapshot in the link registry.
//! Divergence discovered at mutation time is arbitrated by the conflict
//! rules in [`domain::conflict`]. The module follows hexagonal
//! architecture:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
