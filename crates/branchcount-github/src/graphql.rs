//! GitHub GraphQL client
//!
//! Sends queries to the GraphQL endpoint of the integration matching the
//! request host.
//!
//! # Examples
//!
//! ```no_run
//! use branchcount_github::{GithubGraphQlClient, GithubIntegrations};
//!
//! let client = GithubGraphQlClient::new(GithubIntegrations::default()).unwrap();
//! // `execute` is async and is usually driven by the fact collector
//! ```

use crate::integration::GithubIntegrations;
use crate::GithubError;
use async_trait::async_trait;
use branchcount_domain::traits::{GraphQlRequest, GraphQlTransport};
use branchcount_store::ConfigSource;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Default timeout for GraphQL requests (30 seconds)
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// User agent sent with every request
pub const USER_AGENT: &str = concat!("branchcount/", env!("CARGO_PKG_VERSION"));

/// Request body for the GraphQL API
#[derive(Serialize)]
struct GraphQlBody<'a> {
    query: &'a str,
    variables: &'a Value,
}

/// Response envelope of the GraphQL API
#[derive(Deserialize)]
struct GraphQlEnvelope {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    errors: Vec<GraphQlErrorEntry>,
}

#[derive(Deserialize)]
struct GraphQlErrorEntry {
    message: String,
}

/// GraphQL transport over the GitHub API
pub struct GithubGraphQlClient {
    integrations: GithubIntegrations,
    client: reqwest::Client,
}

impl GithubGraphQlClient {
    /// Create a client with the default timeout
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(integrations: GithubIntegrations) -> Result<Self, GithubError> {
        Self::with_timeout(integrations, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Create a client with an explicit request timeout
    pub fn with_timeout(integrations: GithubIntegrations, timeout: Duration) -> Result<Self, GithubError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            integrations,
            client,
        })
    }

    /// Create a client over the `integrations.github` section of a config source
    pub fn from_config(config: &dyn ConfigSource) -> Result<Self, GithubError> {
        Self::new(GithubIntegrations::from_config(config)?)
    }

    /// Integrations this client routes requests to
    pub fn integrations(&self) -> &GithubIntegrations {
        &self.integrations
    }
}

#[async_trait]
impl GraphQlTransport for GithubGraphQlClient {
    type Error = GithubError;

    async fn execute(&self, request: GraphQlRequest) -> Result<Value, Self::Error> {
        let url = self.integrations.require(&request.host)?.graphql_url();
        debug!(host = %request.host, "POST {}", url);

        let response = self
            .client
            .post(&url)
            .header(
                reqwest::header::AUTHORIZATION,
                request.credentials.authorization_header(),
            )
            .json(&GraphQlBody {
                query: &request.query,
                variables: &request.variables,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(GithubError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let envelope: GraphQlEnvelope = response
            .json()
            .await
            .map_err(|e| GithubError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

        if !envelope.errors.is_empty() {
            let messages: Vec<String> = envelope.errors.into_iter().map(|e| e.message).collect();
            return Err(GithubError::GraphQl(messages.join("; ")));
        }

        envelope
            .data
            .filter(|data| !data.is_null())
            .ok_or_else(|| GithubError::InvalidResponse("response has no data".to_string()))
    }
}
