//! Trait definitions for external interactions
//!
//! These traits define the boundaries between collection logic and
//! infrastructure. Implementations live in other crates.

use crate::{CollectError, CollectionConfig, Entity, Fact, FactRef, ScmCredentials};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Optional narrowing hints passed to [`FactCollector::collect`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectParams {
    /// Facts the host wants collected
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fact_refs: Option<Vec<FactRef>>,

    /// Facts the host wants refreshed regardless of cache
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh: Option<Vec<FactRef>>,
}

/// A collector registered with the host
///
/// Implemented by the application layer (branchcount-collector)
#[async_trait]
pub trait FactCollector: Send + Sync {
    /// Stable identifier among registered collectors
    fn id(&self) -> &str;

    /// Collect facts for a batch of candidate entities
    ///
    /// Per-entity failures are skipped; `Err` means the whole batch failed.
    async fn collect(
        &self,
        entities: &[Entity],
        params: Option<&CollectParams>,
    ) -> Result<Vec<Fact>, CollectError>;

    /// What this collector produces and how often to run it
    async fn collection_configs(&self) -> Result<Vec<CollectionConfig>, CollectError>;

    /// Names of the facts this collector can produce
    async fn fact_names(&self) -> Result<Vec<String>, CollectError>;

    /// Payload schema for a fact, if the collector declares one
    async fn data_schema(&self, fact_ref: &FactRef) -> Result<Option<String>, CollectError>;
}

/// Resolves access credentials for a source-control URL
///
/// Implemented by the infrastructure layer (branchcount-github)
#[async_trait]
pub trait CredentialsProvider: Send + Sync {
    /// Error type for credential resolution
    type Error: std::fmt::Display + Send;

    /// Resolve credentials valid for queries against the URL's host
    async fn get_credentials(&self, url: &str) -> Result<ScmCredentials, Self::Error>;
}

/// One GraphQL request
#[derive(Debug, Clone)]
pub struct GraphQlRequest {
    /// Host the repository lives on (selects the API endpoint)
    pub host: String,

    /// Query document
    pub query: String,

    /// Query variables
    pub variables: serde_json::Value,

    /// Credentials to authenticate with
    pub credentials: ScmCredentials,
}

/// Executes GraphQL queries against a source-control API
///
/// Implemented by the infrastructure layer (branchcount-github)
#[async_trait]
pub trait GraphQlTransport: Send + Sync {
    /// Error type for query execution
    type Error: std::fmt::Display + Send;

    /// Execute the request and return the response's `data` object
    async fn execute(&self, request: GraphQlRequest) -> Result<serde_json::Value, Self::Error>;
}
