//! Token-based credentials for GitHub hosts

use crate::integration::GithubIntegrations;
use crate::GithubError;
use async_trait::async_trait;
use branchcount_domain::traits::CredentialsProvider;
use branchcount_domain::{RepoLocation, ScmCredentials};
use branchcount_store::ConfigSource;
use tracing::trace;

/// Resolves the configured token of the integration matching a URL's host
#[derive(Debug, Clone)]
pub struct GithubCredentialsProvider {
    integrations: GithubIntegrations,
}

impl GithubCredentialsProvider {
    /// Provider over explicit integrations
    pub fn new(integrations: GithubIntegrations) -> Self {
        Self { integrations }
    }

    /// Provider over the `integrations.github` section of a config source
    pub fn from_config(config: &dyn ConfigSource) -> Result<Self, GithubError> {
        Ok(Self::new(GithubIntegrations::from_config(config)?))
    }

    /// Integrations this provider resolves against
    pub fn integrations(&self) -> &GithubIntegrations {
        &self.integrations
    }
}

#[async_trait]
impl CredentialsProvider for GithubCredentialsProvider {
    type Error = GithubError;

    async fn get_credentials(&self, url: &str) -> Result<ScmCredentials, Self::Error> {
        let location: RepoLocation = url
            .parse()
            .map_err(|_| GithubError::InvalidUrl(url.to_string()))?;

        let integration = self.integrations.require(&location.host)?;
        let token = integration
            .token
            .as_deref()
            .filter(|token| !token.is_empty())
            .ok_or_else(|| GithubError::MissingToken(location.host.clone()))?;

        trace!(host = %location.host, "Resolved GitHub credentials");
        Ok(ScmCredentials::bearer(token))
    }
}
