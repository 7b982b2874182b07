//! Unit and service tests for the synchronization context.
