//! Per-entity failures
//!
//! None of these abort a collection run; the entity is logged and skipped.

use thiserror::Error;

/// Why one entity produced no fact
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EntityFailure {
    /// The entity has no usable kind or name
    #[error("Invalid entity reference: {0}")]
    EntityRef(String),

    /// The SCM URL does not name a repository
    #[error("Unparseable repository URL '{0}'")]
    RepoUrl(String),

    /// Credential resolution failed
    #[error("Failed to resolve credentials: {0}")]
    Credentials(String),

    /// The upstream query failed
    #[error("Branch count query failed: {0}")]
    Query(String),

    /// The upstream answer lacked the expected shape
    #[error("Unexpected query response: {0}")]
    Response(String),

    /// The per-entity task died before completing
    #[error("Collection task aborted: {0}")]
    Aborted(String),
}
