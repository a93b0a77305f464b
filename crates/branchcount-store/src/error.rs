//! Error types for configuration loading and extractor stores

use std::fmt;
use thiserror::Error;

/// One violated field in a configuration tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaIssue {
    /// Path of the offending value (e.g. `[1].collects.type`), empty for the root
    pub path: String,
    /// What is wrong with it
    pub message: String,
}

impl SchemaIssue {
    /// Create an issue
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for SchemaIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "<root>: {}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// Schema validation failure listing every violated field
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{}", render_issues(.issues))]
pub struct SchemaError {
    /// All issues found, in document order
    pub issues: Vec<SchemaIssue>,
}

impl SchemaError {
    /// Whether an issue was reported at exactly this path
    pub fn has_issue_at(&self, path: &str) -> bool {
        self.issues.iter().any(|issue| issue.path == path)
    }
}

fn render_issues(issues: &[SchemaIssue]) -> String {
    let rendered: Vec<String> = issues.iter().map(ToString::to_string).collect();
    format!("{} schema issue(s): {}", issues.len(), rendered.join("; "))
}

/// Errors from extractor stores
#[derive(Error, Debug, Clone)]
pub enum StoreError {
    /// The collector's configuration section failed validation
    #[error("Invalid configuration at '{namespace}': {source}")]
    InvalidConfig {
        /// Configuration path of the collector section
        namespace: String,
        /// Validation issues
        #[source]
        source: SchemaError,
    },
}

/// Errors from loading configuration sources
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse YAML
    #[error("Failed to parse config YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    /// Failed to parse TOML
    #[error("Failed to parse config TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Failed to parse JSON
    #[error("Failed to parse config JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// File extension is not one of yaml, yml, toml, json
    #[error("Unsupported config format: {0}")]
    UnsupportedFormat(String),

    /// Reload requested on a source that was not loaded from a file
    #[error("Config source has no backing file")]
    NoBackingFile,
}
