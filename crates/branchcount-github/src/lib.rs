//! Branchcount GitHub Integration Layer
//!
//! Implements the `CredentialsProvider` and `GraphQlTransport` traits from
//! `branchcount-domain` against GitHub.
//!
//! # Providers
//!
//! - [`GithubCredentialsProvider`]: per-host tokens from `integrations.github`
//! - [`GithubGraphQlClient`]: GraphQL over HTTPS via reqwest
//! - [`MockGithub`]: deterministic in-memory GitHub for testing
//!
//! # Examples
//!
//! ```
//! use branchcount_github::MockGithub;
//! use branchcount_domain::traits::CredentialsProvider;
//!
//! let github = MockGithub::new().with_repo("acme", "payments", 7);
//! let runtime = tokio::runtime::Runtime::new().unwrap();
//! let credentials = runtime
//!     .block_on(github.get_credentials("https://github.com/acme/payments"))
//!     .unwrap();
//! assert_eq!(credentials.token, "mock-token");
//! ```

#![warn(missing_docs)]

pub mod credentials;
pub mod error;
pub mod graphql;
pub mod integration;

pub use credentials::GithubCredentialsProvider;
pub use error::GithubError;
pub use graphql::GithubGraphQlClient;
pub use integration::{GithubIntegrationConfig, GithubIntegrations};

use async_trait::async_trait;
use branchcount_domain::traits::{CredentialsProvider, GraphQlRequest, GraphQlTransport};
use branchcount_domain::{RepoLocation, ScmCredentials};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

type RepoKey = (String, String);

#[derive(Debug, Default)]
struct MockState {
    responses: HashMap<RepoKey, Value>,
    credential_failures: HashSet<RepoKey>,
    query_failures: HashSet<RepoKey>,
    credential_calls: usize,
    query_calls: usize,
    requests: Vec<GraphQlRequest>,
}

/// In-memory GitHub for deterministic testing
///
/// Serves branch counts per repository and can be told to fail credential
/// resolution or queries for specific repositories. Clones share state, so a
/// test can keep a handle while the collector owns another.
///
/// # Examples
///
/// ```
/// use branchcount_github::MockGithub;
///
/// let github = MockGithub::new()
///     .with_repo("acme", "payments", 7)
///     .fail_credentials_for("acme", "secret");
/// assert_eq!(github.credential_calls(), 0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockGithub {
    state: Arc<Mutex<MockState>>,
}

impl MockGithub {
    /// Create a mock with no repositories
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `count` branches for `owner/name`
    pub fn with_repo(self, owner: &str, name: &str, count: u64) -> Self {
        self.with_response(
            owner,
            name,
            json!({ "repository": { "refs": { "totalCount": count } } }),
        )
    }

    /// Serve an arbitrary `data` object for `owner/name`
    pub fn with_response(self, owner: &str, name: &str, data: Value) -> Self {
        self.state
            .lock()
            .unwrap()
            .responses
            .insert(key(owner, name), data);
        self
    }

    /// Fail credential resolution for `owner/name`
    pub fn fail_credentials_for(self, owner: &str, name: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .credential_failures
            .insert(key(owner, name));
        self
    }

    /// Fail queries for `owner/name`
    pub fn fail_queries_for(self, owner: &str, name: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .query_failures
            .insert(key(owner, name));
        self
    }

    /// Number of credential resolutions requested
    pub fn credential_calls(&self) -> usize {
        self.state.lock().unwrap().credential_calls
    }

    /// Number of queries executed
    pub fn query_calls(&self) -> usize {
        self.state.lock().unwrap().query_calls
    }

    /// Every request received, in arrival order
    pub fn requests(&self) -> Vec<GraphQlRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    /// Reset call counters and recorded requests
    pub fn reset_calls(&self) {
        let mut state = self.state.lock().unwrap();
        state.credential_calls = 0;
        state.query_calls = 0;
        state.requests.clear();
    }
}

fn key(owner: &str, name: &str) -> RepoKey {
    (owner.to_string(), name.to_string())
}

#[async_trait]
impl CredentialsProvider for MockGithub {
    type Error = GithubError;

    async fn get_credentials(&self, url: &str) -> Result<ScmCredentials, Self::Error> {
        let mut state = self.state.lock().unwrap();
        state.credential_calls += 1;

        let location: RepoLocation = url
            .parse()
            .map_err(|_| GithubError::InvalidUrl(url.to_string()))?;
        if state
            .credential_failures
            .contains(&key(&location.owner, &location.name))
        {
            return Err(GithubError::MissingToken(location.host));
        }
        Ok(ScmCredentials::bearer("mock-token"))
    }
}

#[async_trait]
impl GraphQlTransport for MockGithub {
    type Error = GithubError;

    async fn execute(&self, request: GraphQlRequest) -> Result<Value, Self::Error> {
        let mut state = self.state.lock().unwrap();
        state.query_calls += 1;
        state.requests.push(request.clone());

        let owner = request.variables["owner"].as_str().unwrap_or_default();
        let repo = request.variables["repo"].as_str().unwrap_or_default();
        let repo_key = key(owner, repo);

        if state.query_failures.contains(&repo_key) {
            return Err(GithubError::Http {
                status: 502,
                body: "Bad Gateway".to_string(),
            });
        }

        state.responses.get(&repo_key).cloned().ok_or_else(|| {
            GithubError::GraphQl(format!(
                "Could not resolve to a Repository with the name '{}/{}'.",
                owner, repo
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(owner: &str, repo: &str) -> GraphQlRequest {
        GraphQlRequest {
            host: "github.com".to_string(),
            query: "query { x }".to_string(),
            variables: json!({ "owner": owner, "repo": repo }),
            credentials: ScmCredentials::bearer("mock-token"),
        }
    }

    #[tokio::test]
    async fn test_mock_serves_counts() {
        let github = MockGithub::new().with_repo("acme", "payments", 7);
        let data = github.execute(request("acme", "payments")).await.unwrap();
        assert_eq!(data["repository"]["refs"]["totalCount"], 7);
        assert_eq!(github.query_calls(), 1);
    }

    #[tokio::test]
    async fn test_mock_unknown_repo_is_graphql_error() {
        let github = MockGithub::new();
        let result = github.execute(request("acme", "missing")).await;
        assert!(matches!(result, Err(GithubError::GraphQl(_))));
    }

    #[tokio::test]
    async fn test_mock_failures() {
        let github = MockGithub::new()
            .with_repo("acme", "flaky", 3)
            .fail_queries_for("acme", "flaky")
            .fail_credentials_for("acme", "secret");

        assert!(github.execute(request("acme", "flaky")).await.is_err());
        assert!(github
            .get_credentials("https://github.com/acme/secret")
            .await
            .is_err());
        assert!(github
            .get_credentials("https://github.com/acme/flaky")
            .await
            .is_ok());
        assert_eq!(github.credential_calls(), 2);
    }

    #[tokio::test]
    async fn test_mock_clones_share_state() {
        let github = MockGithub::new().with_repo("acme", "payments", 1);
        let handle = github.clone();
        github.execute(request("acme", "payments")).await.unwrap();
        assert_eq!(handle.query_calls(), 1);
        assert_eq!(handle.requests()[0].variables["repo"], "payments");

        handle.reset_calls();
        assert_eq!(github.query_calls(), 0);
    }
}
