//! Unit tests for the link registry context.
