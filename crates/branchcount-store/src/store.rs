//! Hot-reloadable extractor config store

use crate::config::{ConfigSource, Subscription};
use crate::error::StoreError;
use crate::map::build_extractor_config_map;
use crate::schema::CollectorSchema;
use branchcount_domain::ExtractorConfig;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tracing::{debug, error, info, warn};

/// One coherent load of the configuration
#[derive(Debug, Default)]
struct Snapshot {
    configs: BTreeMap<String, ExtractorConfig>,
    error: Option<String>,
}

struct StoreInner {
    source: Arc<dyn ConfigSource>,
    namespace: String,
    schema: CollectorSchema,
    snapshot: RwLock<Arc<Snapshot>>,
    // Held across read and swap so an older read never replaces a newer one
    rebuild_lock: Mutex<()>,
}

impl StoreInner {
    /// Read, validate and flatten the namespace section
    fn parse(&self) -> Result<BTreeMap<String, ExtractorConfig>, StoreError> {
        let Some(section) = self.source.get_optional(&self.namespace) else {
            debug!(namespace = %self.namespace, "No extractors configured");
            return Ok(BTreeMap::new());
        };

        let configs = self
            .schema
            .validate(&section)
            .and_then(|blocks| build_extractor_config_map(&blocks))
            .map_err(|source| {
                error!(
                    namespace = %self.namespace,
                    "Failed to parse extractor configuration: {}",
                    source
                );
                StoreError::InvalidConfig {
                    namespace: self.namespace.clone(),
                    source,
                }
            })?;

        info!(
            namespace = %self.namespace,
            "Loaded {} extractor config(s)",
            configs.len()
        );
        Ok(configs)
    }

    /// Rebuild from scratch and swap the snapshot
    ///
    /// A failed rebuild installs an empty snapshot carrying the error.
    fn rebuild(&self) -> Result<(), StoreError> {
        let _guard = self.rebuild_lock.lock().unwrap_or_else(PoisonError::into_inner);
        match self.parse() {
            Ok(configs) => {
                self.swap(Snapshot { configs, error: None });
                Ok(())
            }
            Err(e) => {
                self.swap(Snapshot {
                    configs: BTreeMap::new(),
                    error: Some(e.to_string()),
                });
                Err(e)
            }
        }
    }

    fn swap(&self, snapshot: Snapshot) {
        *self.snapshot.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(snapshot);
    }

    fn current(&self) -> Arc<Snapshot> {
        Arc::clone(&self.snapshot.read().unwrap_or_else(PoisonError::into_inner))
    }
}

/// Explicit control over a store's hot reload
pub struct ReloadHandle {
    inner: Arc<StoreInner>,
    subscription: Mutex<Option<Subscription>>,
}

impl ReloadHandle {
    /// Rebuild the store from the current configuration now
    ///
    /// # Errors
    /// Returns the validation failure; the store then serves an empty mapping
    /// until a later reload succeeds.
    pub fn reload(&self) -> Result<(), StoreError> {
        self.inner.rebuild()
    }

    /// Stop reacting to configuration changes
    pub fn unregister(&self) {
        if let Some(subscription) = self
            .subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            subscription.unsubscribe();
            debug!(namespace = %self.inner.namespace, "Unregistered config listener");
        }
    }

    /// Whether configuration changes still trigger rebuilds
    pub fn is_subscribed(&self) -> bool {
        self.subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

/// Mapping from fact name to [`ExtractorConfig`], rebuilt on every
/// configuration change
///
/// Readers always see one complete snapshot; a rebuild replaces the whole
/// mapping at once.
///
/// # Examples
///
/// ```
/// use branchcount_store::{branch_count_schema, AppConfig, ExtractorsStore};
/// use serde_json::json;
/// use std::sync::Arc;
///
/// let config = Arc::new(AppConfig::from_value(json!({
///     "soundcheck": { "collectors": { "branch": {
///         "collects": { "type": "branchDescriptor", "factName": "branch_count" }
///     } } }
/// })));
///
/// let store = ExtractorsStore::create(config, "soundcheck.collectors.branch", branch_count_schema()).unwrap();
/// assert!(store.extractor_config("branch_count").is_some());
/// ```
pub struct ExtractorsStore {
    inner: Arc<StoreInner>,
    reload: ReloadHandle,
}

impl ExtractorsStore {
    /// Load the section at `namespace` and subscribe to changes
    ///
    /// An absent section yields an empty store.
    ///
    /// # Errors
    /// Returns [`StoreError::InvalidConfig`] if the section is present but
    /// invalid.
    pub fn create(
        source: Arc<dyn ConfigSource>,
        namespace: impl Into<String>,
        schema: CollectorSchema,
    ) -> Result<Self, StoreError> {
        let inner = Arc::new(StoreInner {
            source,
            namespace: namespace.into(),
            schema,
            snapshot: RwLock::new(Arc::new(Snapshot::default())),
            rebuild_lock: Mutex::new(()),
        });

        // Subscribe before the first read so no change is missed in between.
        // Weak so the source's listener list does not keep the store alive
        let weak = Arc::downgrade(&inner);
        let subscription = inner.source.subscribe(Arc::new(move || {
            if let Some(inner) = weak.upgrade() {
                if inner.rebuild().is_err() {
                    warn!(
                        namespace = %inner.namespace,
                        "Extractor configuration reload failed, serving no extractors"
                    );
                }
            }
        }));

        // On failure the subscription is dropped with the store
        inner.rebuild()?;

        let reload = ReloadHandle {
            inner: Arc::clone(&inner),
            subscription: Mutex::new(subscription),
        };

        Ok(Self { inner, reload })
    }

    /// Configuration path of this store's section
    pub fn namespace(&self) -> &str {
        &self.inner.namespace
    }

    /// Extractor config for a fact name
    pub fn extractor_config(&self, fact_name: &str) -> Option<ExtractorConfig> {
        self.inner.current().configs.get(fact_name).cloned()
    }

    /// All extractor configs of the current snapshot, ordered by fact name
    pub fn extractor_configs(&self) -> Vec<ExtractorConfig> {
        self.inner.current().configs.values().cloned().collect()
    }

    /// Failure of the most recent rebuild, if it failed
    pub fn last_error(&self) -> Option<String> {
        self.inner.current().error.clone()
    }

    /// Hot reload control
    pub fn reload_handle(&self) -> &ReloadHandle {
        &self.reload
    }
}

impl std::fmt::Debug for ExtractorsStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let snapshot = self.inner.current();
        f.debug_struct("ExtractorsStore")
            .field("namespace", &self.inner.namespace)
            .field("fact_names", &snapshot.configs.keys().collect::<Vec<_>>())
            .field("error", &snapshot.error)
            .finish()
    }
}
