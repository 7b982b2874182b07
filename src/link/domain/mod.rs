//! Domain model for the link registry.
//!
//! Models the 1:1 association between a local task and a remote issue,
//! the shared status/state vocabulary, and the `github:<number>` label
//! convention the registry can be rebuilt from, while keeping all
//! infrastructure concerns outside of the domain boundary.

mod error;
mod ids;
mod label;
mod link;
mod status;

pub use error::{LinkDomainError, ParseIssueStateError, ParseTaskStatusError};
pub use ids::{IssueNumber, LinkId, ProjectId, TaskId};
pub use label::SyncLabel;
pub use link::{Link, LinkPhase, PersistedLinkData, SnapshotUpdate};
pub use status::{IssueState, SyncDirection, TaskStatus};
