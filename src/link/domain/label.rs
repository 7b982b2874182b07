//! The `github:<number>` label convention linking tasks to issues.
//!
//! The label is the durable, out-of-band representation of a link that
//! surrounding systems depend on. The registry can be reconstructed by
//! scanning task labels for this form.

use super::{IssueNumber, LinkDomainError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Label prefix identifying tracker-linked tasks.
const LABEL_PREFIX: &str = "github:";

/// Structured label of the form `github:<issueNumber>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SyncLabel(IssueNumber);

impl SyncLabel {
    /// Creates a sync label for the given issue number.
    #[must_use]
    pub const fn new(issue_number: IssueNumber) -> Self {
        Self(issue_number)
    }

    /// Returns the issue number the label points at.
    #[must_use]
    pub const fn issue_number(self) -> IssueNumber {
        self.0
    }

    /// Parses a raw label value, returning `None` for labels that do not
    /// carry the `github:` prefix at all.
    ///
    /// # Errors
    ///
    /// Returns [`LinkDomainError::InvalidSyncLabel`] when the prefix is
    /// present but the remainder is not a valid issue number.
    pub fn parse(raw: &str) -> Result<Option<Self>, LinkDomainError> {
        let Some(rest) = raw.trim().strip_prefix(LABEL_PREFIX) else {
            return Ok(None);
        };
        let number: u64 = rest
            .parse()
            .map_err(|_| LinkDomainError::InvalidSyncLabel(raw.to_owned()))?;
        let issue_number = IssueNumber::new(number)
            .map_err(|_| LinkDomainError::InvalidSyncLabel(raw.to_owned()))?;
        Ok(Some(Self(issue_number)))
    }
}

impl fmt::Display for SyncLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{LABEL_PREFIX}{}", self.0)
    }
}
