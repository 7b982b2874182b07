//! Port contracts for the link registry.

pub mod registry;

pub use registry::{LinkRegistry, LinkRegistryError, LinkRegistryResult};
