//! Adapter implementations of the link registry port.

pub mod memory;
