//! Source-control locations and credentials

use crate::RefParseError;
use std::fmt;
use std::str::FromStr;
use url::Url;

/// Repository coordinates parsed from an SCM URL
///
/// Accepts the URL shapes catalog entities carry in their location
/// annotations:
///
/// ```
/// use branchcount_domain::RepoLocation;
///
/// let repo: RepoLocation = "https://github.com/acme/payments/tree/main/docs".parse().unwrap();
/// assert_eq!(repo.host, "github.com");
/// assert_eq!(repo.owner, "acme");
/// assert_eq!(repo.name, "payments");
///
/// let ssh: RepoLocation = "git@github.com:acme/payments.git".parse().unwrap();
/// assert_eq!(ssh, repo);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoLocation {
    /// Host name, without port (e.g. `github.com`)
    pub host: String,
    /// Repository owner (user or organization)
    pub owner: String,
    /// Repository name, without `.git`
    pub name: String,
}

impl RepoLocation {
    fn from_parts(host: &str, mut segments: impl Iterator<Item = String>) -> Option<Self> {
        let owner = segments.next()?;
        let name = segments.next()?;
        let name = name.strip_suffix(".git").unwrap_or(&name).to_string();
        if host.is_empty() || name.is_empty() {
            return None;
        }
        Some(Self {
            host: host.to_lowercase(),
            owner,
            name,
        })
    }

    /// `scheme://[user@]host[:port]/owner/repo[/...]`
    fn from_url(url: &Url) -> Option<Self> {
        let segments = url.path_segments()?.filter(|s| !s.is_empty()).map(str::to_string);
        Self::from_parts(url.host_str()?, segments)
    }

    /// `[user@]host:owner/repo[.git]`
    fn from_scp(s: &str) -> Option<Self> {
        let (authority, path) = s.split_once(':')?;
        let host = authority.rsplit_once('@').map_or(authority, |(_, host)| host);
        if host.contains(['/', ' ']) {
            return None;
        }

        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        if segments.len() != 2 || segments.iter().any(|s| s.contains(' ')) {
            return None;
        }
        Self::from_parts(host, segments.into_iter().map(str::to_string))
    }
}

impl FromStr for RepoLocation {
    type Err = RefParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(RefParseError::Empty);
        }

        let location = if s.contains("://") {
            Url::parse(s).ok().as_ref().and_then(Self::from_url)
        } else {
            Self::from_scp(s)
        };
        location.ok_or_else(|| RefParseError::Format(s.to_string()))
    }
}

impl fmt::Display for RepoLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.host, self.owner, self.name)
    }
}

/// Short-lived access credentials for one SCM URL
#[derive(Clone, PartialEq, Eq)]
pub struct ScmCredentials {
    /// Bearer token
    pub token: String,
}

impl ScmCredentials {
    /// Create credentials from a token
    pub fn bearer(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }

    /// Value for the `Authorization` header
    pub fn authorization_header(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

// Tokens never reach logs through Debug.
impl fmt::Debug for ScmCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScmCredentials").field("token", &"***").finish()
    }
}
