//! Error types for link domain validation and parsing.

use thiserror::Error;

/// Errors returned while constructing domain link values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LinkDomainError {
    /// The issue number is invalid.
    #[error("invalid issue number {0}, expected a positive integer")]
    InvalidIssueNumber(u64),

    /// The sync label does not follow the `github:<number>` convention.
    #[error("invalid sync label '{0}', expected github:<issue-number>")]
    InvalidSyncLabel(String),
}

/// Error returned while parsing task statuses from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown task status: {0}")]
pub struct ParseTaskStatusError(pub String);

/// Error returned while parsing issue states from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown issue state: {0}")]
pub struct ParseIssueStateError(pub String);
