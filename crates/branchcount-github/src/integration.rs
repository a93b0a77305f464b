//! GitHub integration settings
//!
//! Integrations are read from the `integrations.github` list of the app
//! config, one entry per GitHub host:
//!
//! ```yaml
//! integrations:
//!   github:
//!     - host: github.com
//!       token: ${GITHUB_TOKEN}
//!     - host: ghe.example.com
//!       apiBaseUrl: https://ghe.example.com/api
//!       token: ${GHE_TOKEN}
//! ```

use crate::GithubError;
use branchcount_store::ConfigSource;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Public GitHub host
pub const DEFAULT_HOST: &str = "github.com";

/// GraphQL endpoint of the public GitHub API
pub const DEFAULT_GRAPHQL_URL: &str = "https://api.github.com/graphql";

/// Environment variable holding the token of the implicit `github.com` integration
pub const TOKEN_ENV_VAR: &str = "GITHUB_TOKEN";

/// Config path of the integration list
pub const INTEGRATIONS_PATH: &str = "integrations.github";

/// Connection settings for one GitHub host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GithubIntegrationConfig {
    /// Host name (e.g. `github.com`)
    pub host: String,

    /// Access token
    #[serde(default)]
    pub token: Option<String>,

    /// REST/GraphQL API base URL (e.g. `https://ghe.example.com/api`)
    #[serde(default, alias = "api_base_url")]
    pub api_base_url: Option<String>,
}

impl GithubIntegrationConfig {
    /// Integration for a host with no token and default endpoints
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            token: None,
            api_base_url: None,
        }
    }

    /// Set the token
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Set the API base URL
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = Some(url.into());
        self
    }

    /// GraphQL endpoint for this host
    pub fn graphql_url(&self) -> String {
        match &self.api_base_url {
            Some(base) => format!("{}/graphql", base.trim_end_matches('/')),
            None if self.host == DEFAULT_HOST => DEFAULT_GRAPHQL_URL.to_string(),
            None => format!("https://{}/api/graphql", self.host),
        }
    }
}

/// All configured GitHub integrations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GithubIntegrations {
    entries: Vec<GithubIntegrationConfig>,
}

impl GithubIntegrations {
    /// Integrations from an explicit list
    ///
    /// An empty list falls back to [`GithubIntegrations::default`].
    pub fn new(entries: Vec<GithubIntegrationConfig>) -> Self {
        if entries.is_empty() {
            Self::default()
        } else {
            Self { entries }
        }
    }

    /// Read `integrations.github` from a config source
    ///
    /// # Errors
    /// Returns [`GithubError::InvalidConfig`] if the section is not a list of
    /// integration objects.
    pub fn from_config(config: &dyn ConfigSource) -> Result<Self, GithubError> {
        let Some(section) = config.get_optional(INTEGRATIONS_PATH) else {
            debug!("No GitHub integrations configured, using {}", DEFAULT_HOST);
            return Ok(Self::default());
        };

        let entries: Vec<GithubIntegrationConfig> = serde_json::from_value(section)
            .map_err(|e| GithubError::InvalidConfig(e.to_string()))?;
        debug!("Loaded {} GitHub integration(s)", entries.len());
        Ok(Self::new(entries))
    }

    /// Integration for a host (case-insensitive)
    pub fn find(&self, host: &str) -> Option<&GithubIntegrationConfig> {
        self.entries
            .iter()
            .find(|entry| entry.host.eq_ignore_ascii_case(host))
    }

    /// Integration for a host, or [`GithubError::NoIntegration`]
    pub fn require(&self, host: &str) -> Result<&GithubIntegrationConfig, GithubError> {
        self.find(host)
            .ok_or_else(|| GithubError::NoIntegration(host.to_string()))
    }

    /// Configured integrations
    pub fn entries(&self) -> &[GithubIntegrationConfig] {
        &self.entries
    }
}

impl Default for GithubIntegrations {
    /// A single `github.com` integration, token from `GITHUB_TOKEN` if set
    fn default() -> Self {
        let mut entry = GithubIntegrationConfig::new(DEFAULT_HOST);
        entry.token = std::env::var(TOKEN_ENV_VAR).ok().filter(|t| !t.is_empty());
        Self {
            entries: vec![entry],
        }
    }
}
