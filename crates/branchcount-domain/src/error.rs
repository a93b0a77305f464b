//! Error types shared across the workspace

use thiserror::Error;

/// Failure to parse a string-encoded reference ([`FactRef`](crate::FactRef),
/// [`EntityRef`](crate::EntityRef) or [`RepoLocation`](crate::RepoLocation))
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RefParseError {
    /// The input string was empty
    #[error("Reference cannot be empty")]
    Empty,

    /// A required component was missing or empty
    #[error("Missing {component} in reference '{input}'")]
    MissingComponent {
        /// Name of the missing component (e.g. "kind", "source")
        component: &'static str,
        /// The offending input
        input: String,
    },

    /// A component contained a reserved separator character
    #[error("Invalid character in {component} '{value}'")]
    InvalidComponent {
        /// Name of the component
        component: &'static str,
        /// The offending value
        value: String,
    },

    /// The input did not match any supported format
    #[error("Unrecognized reference format: {0}")]
    Format(String),
}

/// Collector-wide failure of a `collect` call
///
/// Per-entity failures never surface here; they are logged and the entity is
/// skipped. This error means the whole batch was rejected.
#[derive(Error, Debug)]
pub enum CollectError {
    /// The shared fact reference could not be constructed
    #[error("Invalid fact reference: {0}")]
    FactRef(#[from] RefParseError),

    /// The collector's extractor configuration is unusable
    #[error("Configuration error: {0}")]
    Config(String),

    /// Any other collector-wide failure
    #[error("Collection failed: {0}")]
    Other(String),
}
