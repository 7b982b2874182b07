//! Adapter implementations of the collaborator ports.

pub mod memory;
