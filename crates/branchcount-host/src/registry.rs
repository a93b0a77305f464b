//! Registry of fact collectors served by the host.

use branchcount_domain::traits::{CollectParams, FactCollector};
use branchcount_domain::{CollectError, CollectionConfig, Entity, Fact};
use std::sync::{Arc, PoisonError, RwLock};
use thiserror::Error;
use tracing::{debug, info};

/// Registry error
#[derive(Debug, Error)]
pub enum RegistryError {
    /// No collector with this id
    #[error("Collector not found: {0}")]
    CollectorNotFound(String),

    /// The collector rejected the request as a whole
    #[error(transparent)]
    Collect(#[from] CollectError),
}

/// Collectors available to the host, keyed by id
pub struct CollectorRegistry {
    collectors: Arc<RwLock<Vec<Arc<dyn FactCollector>>>>,
}

impl CollectorRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            collectors: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Register a collector, replacing any collector with the same id
    pub fn add_fact_collector(&self, collector: Arc<dyn FactCollector>) {
        let mut collectors = self.collectors.write().unwrap_or_else(PoisonError::into_inner);
        let id = collector.id().to_string();
        collectors.retain(|existing| existing.id() != id);
        collectors.push(collector);
        info!(collector = %id, "Registered fact collector");
    }

    /// Register several collectors
    pub fn add_fact_collectors<I>(&self, collectors: I)
    where
        I: IntoIterator<Item = Arc<dyn FactCollector>>,
    {
        for collector in collectors {
            self.add_fact_collector(collector);
        }
    }

    /// Collector by id
    pub fn get(&self, id: &str) -> Option<Arc<dyn FactCollector>> {
        self.collectors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|collector| collector.id() == id)
            .cloned()
    }

    /// Ids of all registered collectors, in registration order
    pub fn ids(&self) -> Vec<String> {
        self.snapshot().iter().map(|c| c.id().to_string()).collect()
    }

    /// Get collector count
    pub fn len(&self) -> usize {
        self.collectors.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether no collector is registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Collection configs of every registered collector
    pub async fn collection_configs(&self) -> Result<Vec<CollectionConfig>, RegistryError> {
        let mut configs = Vec::new();
        for collector in self.snapshot() {
            configs.extend(collector.collection_configs().await?);
        }
        Ok(configs)
    }

    /// Run a collector over a batch of entities
    ///
    /// When `params` names fact refs that the collector declares collection
    /// configs for, only entities matching one of those configs' filters are
    /// passed on. A config without a filter matches every entity.
    pub async fn collect(
        &self,
        id: &str,
        entities: &[Entity],
        params: Option<&CollectParams>,
    ) -> Result<Vec<Fact>, RegistryError> {
        let collector = self
            .get(id)
            .ok_or_else(|| RegistryError::CollectorNotFound(id.to_string()))?;

        let requested = params.and_then(|p| p.fact_refs.as_ref());
        let Some(requested) = requested else {
            return Ok(collector.collect(entities, params).await?);
        };

        let configs: Vec<CollectionConfig> = collector
            .collection_configs()
            .await?
            .into_iter()
            .filter(|config| config.fact_refs.iter().any(|r| requested.contains(r)))
            .collect();

        if configs.is_empty() {
            debug!(collector = %id, "No collection config matches the requested facts");
            return Ok(collector.collect(entities, params).await?);
        }

        let narrowed: Vec<Entity> = entities
            .iter()
            .filter(|entity| {
                configs.iter().any(|config| {
                    config
                        .filter
                        .as_ref()
                        .map_or(true, |filter| filter.matches(entity))
                })
            })
            .cloned()
            .collect();

        debug!(
            collector = %id,
            "Narrowed {} entities to {} by collection filters",
            entities.len(),
            narrowed.len()
        );
        Ok(collector.collect(&narrowed, params).await?)
    }

    fn snapshot(&self) -> Vec<Arc<dyn FactCollector>> {
        self.collectors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Default for CollectorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use branchcount_domain::{EntityFilter, FactRef};
    use serde_json::json;
    use std::sync::Mutex;

    /// Records the entities it is asked about and declares fixed configs
    struct RecordingCollector {
        id: String,
        configs: Vec<CollectionConfig>,
        seen: Mutex<Vec<String>>,
    }

    impl RecordingCollector {
        fn new(id: &str, configs: Vec<CollectionConfig>) -> Self {
            Self {
                id: id.to_string(),
                configs,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl FactCollector for RecordingCollector {
        fn id(&self) -> &str {
            &self.id
        }

        async fn collect(
            &self,
            entities: &[Entity],
            _params: Option<&CollectParams>,
        ) -> Result<Vec<Fact>, CollectError> {
            let mut seen = self.seen.lock().unwrap();
            seen.extend(entities.iter().map(|e| e.metadata.name.clone()));
            Ok(Vec::new())
        }

        async fn collection_configs(&self) -> Result<Vec<CollectionConfig>, CollectError> {
            Ok(self.configs.clone())
        }

        async fn fact_names(&self) -> Result<Vec<String>, CollectError> {
            Ok(self
                .configs
                .iter()
                .flat_map(|c| c.fact_refs.iter().map(|r| r.name().to_string()))
                .collect())
        }

        async fn data_schema(&self, _fact_ref: &FactRef) -> Result<Option<String>, CollectError> {
            Ok(None)
        }
    }

    fn config(fact_ref: &str, filter: Option<serde_json::Value>) -> CollectionConfig {
        CollectionConfig {
            fact_refs: vec![fact_ref.parse().unwrap()],
            filter: filter.map(|f| serde_json::from_value::<EntityFilter>(f).unwrap()),
            frequency: None,
            cache: None,
        }
    }

    fn entities() -> Vec<Entity> {
        vec![
            Entity::new("Component", "svc"),
            Entity::new("API", "api"),
            Entity::new("Group", "team"),
        ]
    }

    #[test]
    fn test_register_replaces_same_id() {
        let registry = CollectorRegistry::new();
        let collector = |id: &str| -> Arc<dyn FactCollector> {
            Arc::new(RecordingCollector::new(id, vec![]))
        };
        registry.add_fact_collectors(vec![collector("branch"), collector("other"), collector("branch")]);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.ids(), vec!["other", "branch"]);
        assert!(registry.get("missing").is_none());
    }

    #[tokio::test]
    async fn test_unknown_collector() {
        let registry = CollectorRegistry::new();
        let result = registry.collect("branch", &entities(), None).await;
        assert!(matches!(result, Err(RegistryError::CollectorNotFound(_))));
    }

    #[tokio::test]
    async fn test_narrows_by_requested_filters() {
        let collector = Arc::new(RecordingCollector::new(
            "branch",
            vec![
                config("branch:default/components", Some(json!({ "kind": "component" }))),
                config("branch:default/apis", Some(json!({ "kind": "API" }))),
            ],
        ));
        let registry = CollectorRegistry::new();
        registry.add_fact_collector(collector.clone());

        let params = CollectParams {
            fact_refs: Some(vec!["branch:default/components".parse().unwrap()]),
            refresh: None,
        };
        registry.collect("branch", &entities(), Some(&params)).await.unwrap();
        assert_eq!(*collector.seen.lock().unwrap(), vec!["svc"]);
    }

    #[tokio::test]
    async fn test_no_narrowing_without_matching_config() {
        let collector = Arc::new(RecordingCollector::new(
            "branch",
            vec![config("branch:default/components", Some(json!({ "kind": "component" })))],
        ));
        let registry = CollectorRegistry::new();
        registry.add_fact_collector(collector.clone());

        let params = CollectParams {
            fact_refs: Some(vec!["branch:default/branch_count".parse().unwrap()]),
            refresh: None,
        };
        registry.collect("branch", &entities(), Some(&params)).await.unwrap();
        assert_eq!(collector.seen.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_unfiltered_config_keeps_all() {
        let collector = Arc::new(RecordingCollector::new(
            "branch",
            vec![config("branch:default/branch_count", None)],
        ));
        let registry = CollectorRegistry::new();
        registry.add_fact_collector(collector.clone());

        let params = CollectParams {
            fact_refs: Some(vec!["branch:default/branch_count".parse().unwrap()]),
            refresh: None,
        };
        registry.collect("branch", &entities(), Some(&params)).await.unwrap();
        assert_eq!(collector.seen.lock().unwrap().len(), 3);

        let all = registry.collection_configs().await.unwrap();
        assert_eq!(all.len(), 1);
    }
}
