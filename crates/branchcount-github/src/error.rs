//! Error types for GitHub access

use thiserror::Error;

/// Errors that can occur while resolving credentials or querying GitHub
#[derive(Error, Debug)]
pub enum GithubError {
    /// Network or transport failure
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),

    /// Non-success HTTP status
    #[error("HTTP {status}: {body}")]
    Http {
        /// Response status code
        status: u16,
        /// Response body, as text
        body: String,
    },

    /// The response carried GraphQL errors
    #[error("GraphQL error: {0}")]
    GraphQl(String),

    /// The response could not be interpreted
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// No integration is configured for the host
    #[error("No GitHub integration configured for host '{0}'")]
    NoIntegration(String),

    /// The integration for the host has no token
    #[error("No token configured for GitHub host '{0}'")]
    MissingToken(String),

    /// The URL does not point at a repository
    #[error("Not a repository URL: {0}")]
    InvalidUrl(String),

    /// The `integrations.github` section is malformed
    #[error("Invalid GitHub integration config: {0}")]
    InvalidConfig(String),

    /// Generic error
    #[error("GitHub error: {0}")]
    Other(String),
}
