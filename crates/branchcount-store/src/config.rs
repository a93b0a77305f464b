//! Configuration sources
//!
//! A [`ConfigSource`] exposes an optional, nested configuration tree and an
//! optional change subscription. [`AppConfig`] is the file/in-memory
//! implementation used by the host: YAML, TOML or JSON files are parsed into
//! one JSON tree, `${VAR}` / `${VAR:-default}` placeholders are expanded from
//! the environment, and every subscriber is notified after the tree is
//! replaced.

use crate::error::ConfigError;
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError, RwLock, Weak};
use tracing::{debug, info};

/// Callback invoked (with no payload) whenever configuration changes
pub type Listener = Arc<dyn Fn() + Send + Sync>;

/// Read access to a configuration tree
pub trait ConfigSource: Send + Sync {
    /// Value at a dotted path (`soundcheck.collectors.branch`), `None` if
    /// absent or null
    fn get_optional(&self, path: &str) -> Option<Value>;

    /// Register a change listener
    ///
    /// Returns `None` when the source never changes.
    fn subscribe(&self, _listener: Listener) -> Option<Subscription> {
        None
    }
}

/// Set of change listeners shared by a source and its subscriptions
#[derive(Default)]
pub struct ListenerRegistry {
    next_id: AtomicU64,
    listeners: Mutex<BTreeMap<u64, Listener>>,
}

impl ListenerRegistry {
    /// Create an empty registry
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register a listener and return its owned subscription
    pub fn add(self: &Arc<Self>, listener: Listener) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, listener);
        Subscription {
            id,
            registry: Arc::downgrade(self),
        }
    }

    /// Invoke every listener
    ///
    /// Listeners run outside the registry lock so they may subscribe or
    /// unsubscribe themselves.
    pub fn notify(&self) {
        let listeners: Vec<Listener> = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        debug!("Notifying {} config listener(s)", listeners.len());
        for listener in listeners {
            listener();
        }
    }

    /// Number of registered listeners
    pub fn len(&self) -> usize {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether no listener is registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn remove(&self, id: u64) {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
    }
}

/// Owned registration of a change listener
///
/// Dropping the subscription unregisters the listener.
pub struct Subscription {
    id: u64,
    registry: Weak<ListenerRegistry>,
}

impl Subscription {
    /// Unregister the listener now
    pub fn unsubscribe(self) {
        // Drop does the work
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

/// Supported configuration file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// `.yaml` / `.yml`
    Yaml,
    /// `.toml`
    Toml,
    /// `.json`
    Json,
}

impl ConfigFormat {
    /// Pick a format from a file extension
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Ok(ConfigFormat::Yaml),
            Some("toml") => Ok(ConfigFormat::Toml),
            Some("json") => Ok(ConfigFormat::Json),
            _ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        }
    }

    /// Parse a document into a JSON tree, expanding environment placeholders
    pub fn parse(&self, contents: &str) -> Result<Value, ConfigError> {
        let mut value: Value = match self {
            ConfigFormat::Yaml => serde_yaml::from_str(contents)?,
            ConfigFormat::Toml => toml::from_str(contents)?,
            ConfigFormat::Json => serde_json::from_str(contents)?,
        };
        expand_env_in_value(&mut value);
        Ok(value)
    }
}

/// Application configuration tree
///
/// # Examples
///
/// ```
/// use branchcount_store::{AppConfig, ConfigSource};
///
/// let config = AppConfig::from_yaml_str(r#"
/// soundcheck:
///   collectors:
///     branch:
///       collects:
///         type: branchDescriptor
///         factName: branch_count
/// "#).unwrap();
///
/// let branch = config.get_optional("soundcheck.collectors.branch").unwrap();
/// assert_eq!(branch["collects"]["factName"], "branch_count");
/// assert!(config.get_optional("soundcheck.collectors.github").is_none());
/// ```
pub struct AppConfig {
    tree: RwLock<Arc<Value>>,
    path: Option<PathBuf>,
    listeners: Arc<ListenerRegistry>,
}

impl AppConfig {
    /// In-memory configuration (no placeholder expansion)
    pub fn from_value(value: Value) -> Self {
        Self {
            tree: RwLock::new(Arc::new(value)),
            path: None,
            listeners: ListenerRegistry::new(),
        }
    }

    /// Empty configuration
    pub fn empty() -> Self {
        Self::from_value(Value::Object(Default::default()))
    }

    /// Parse a YAML document
    pub fn from_yaml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(Self::from_value(ConfigFormat::Yaml.parse(contents)?))
    }

    /// Parse a TOML document
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(Self::from_value(ConfigFormat::Toml.parse(contents)?))
    }

    /// Load a configuration file; the format follows the extension
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref().to_path_buf();
        let value = read_file(&path)?;
        info!("Loaded configuration from {}", path.display());
        Ok(Self {
            tree: RwLock::new(Arc::new(value)),
            path: Some(path),
            listeners: ListenerRegistry::new(),
        })
    }

    /// Backing file, if loaded from one
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Current tree
    pub fn snapshot(&self) -> Arc<Value> {
        Arc::clone(&self.tree.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Replace the whole tree and notify subscribers
    pub fn replace(&self, value: Value) {
        {
            let mut tree = self.tree.write().unwrap_or_else(PoisonError::into_inner);
            *tree = Arc::new(value);
        }
        self.listeners.notify();
    }

    /// Re-read the backing file, replace the tree and notify subscribers
    ///
    /// # Errors
    /// Returns an error (and keeps the current tree) if the file cannot be
    /// read or parsed, or if this config has no backing file.
    pub fn reload(&self) -> Result<(), ConfigError> {
        let path = self.path.as_ref().ok_or(ConfigError::NoBackingFile)?;
        let value = read_file(path)?;
        info!("Reloaded configuration from {}", path.display());
        self.replace(value);
        Ok(())
    }

    /// Number of active subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.listeners.len()
    }
}

impl ConfigSource for AppConfig {
    fn get_optional(&self, path: &str) -> Option<Value> {
        let tree = self.snapshot();
        lookup(&tree, path).cloned()
    }

    fn subscribe(&self, listener: Listener) -> Option<Subscription> {
        Some(self.listeners.add(listener))
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("path", &self.path)
            .field("subscribers", &self.listeners.len())
            .finish()
    }
}

fn read_file(path: &Path) -> Result<Value, ConfigError> {
    let format = ConfigFormat::from_path(path)?;
    let contents = std::fs::read_to_string(path)?;
    format.parse(&contents)
}

fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(value).filter(|v| !v.is_null());
    }
    path.split('.')
        .try_fold(value, |current, key| current.as_object()?.get(key))
        .filter(|v| !v.is_null())
}

/// Expand `${VAR}` and `${VAR:-default}` in a string
pub fn expand_env_vars(input: &str) -> String {
    static ENV_VAR_REGEX: OnceLock<Regex> = OnceLock::new();

    let regex = ENV_VAR_REGEX.get_or_init(|| {
        Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}")
            .expect("failed to compile env var regex")
    });

    regex
        .replace_all(input, |caps: &regex::Captures| {
            let default_value = caps.get(2).map(|m| m.as_str()).unwrap_or("");
            std::env::var(&caps[1]).unwrap_or_else(|_| default_value.to_string())
        })
        .into_owned()
}

fn expand_env_in_value(value: &mut Value) {
    match value {
        Value::String(s) if s.contains("${") => *s = expand_env_vars(s),
        Value::Array(items) => items.iter_mut().for_each(expand_env_in_value),
        Value::Object(map) => map.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_get_optional_paths() {
        let config = AppConfig::from_value(json!({
            "a": { "b": { "c": 1 }, "empty": null }
        }));
        assert_eq!(config.get_optional("a.b.c"), Some(json!(1)));
        assert_eq!(config.get_optional("a.b"), Some(json!({ "c": 1 })));
        assert_eq!(config.get_optional("a.missing"), None);
        assert_eq!(config.get_optional("a.b.c.d"), None);
        assert_eq!(config.get_optional("a.empty"), None);
    }

    #[test]
    fn test_toml_parses_into_same_tree() {
        let config = AppConfig::from_toml_str(
            r#"
            [soundcheck.collectors.branch.collects]
            type = "branchDescriptor"
            factName = "branch_count"
            "#,
        )
        .unwrap();
        assert_eq!(
            config.get_optional("soundcheck.collectors.branch.collects.type"),
            Some(json!("branchDescriptor"))
        );
    }

    #[test]
    fn test_replace_notifies_subscribers() {
        let config = AppConfig::empty();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let subscription = config
            .subscribe(Arc::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }))
            .unwrap();

        config.replace(json!({ "x": 1 }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(config.get_optional("x"), Some(json!(1)));

        subscription.unsubscribe();
        assert_eq!(config.subscriber_count(), 0);

        config.replace(json!({ "x": 2 }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_reload_without_file_fails() {
        let config = AppConfig::empty();
        assert!(matches!(config.reload(), Err(ConfigError::NoBackingFile)));
    }

    #[test]
    fn test_expand_env_vars() {
        std::env::set_var("BRANCHCOUNT_TEST_TOKEN", "secret");
        assert_eq!(expand_env_vars("${BRANCHCOUNT_TEST_TOKEN}"), "secret");
        assert_eq!(expand_env_vars("x-${BRANCHCOUNT_TEST_UNSET:-fallback}"), "x-fallback");
        assert_eq!(expand_env_vars("${BRANCHCOUNT_TEST_UNSET}"), "");
        assert_eq!(expand_env_vars("plain"), "plain");
    }

    #[test]
    fn test_unsupported_extension() {
        let result = ConfigFormat::from_path(Path::new("app-config.ini"));
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat(_))));
    }
}
