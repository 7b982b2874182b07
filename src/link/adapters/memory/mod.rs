//! In-memory link registry adapter.

mod registry;

pub use registry::InMemoryLinkRegistry;
