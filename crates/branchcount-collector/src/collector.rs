//! Branch count fact collector

use crate::error::EntityFailure;
use crate::query::{branch_refs, variables, BRANCH_COUNT_QUERY};
use async_trait::async_trait;
use branchcount_domain::traits::{
    CollectParams, CredentialsProvider, FactCollector, GraphQlRequest, GraphQlTransport,
};
use branchcount_domain::{
    CollectError, CollectionConfig, Entity, Fact, FactRef, RepoLocation, DEFAULT_SCOPE,
};
use branchcount_store::{branch_count_schema, ConfigSource, ExtractorsStore, StoreError};
use std::sync::Arc;
use tracing::{debug, error, info, trace, warn};

/// Identifier of the branch collector
pub const BRANCH_COLLECTOR_ID: &str = "branch";

/// Name of the fact every collection run produces
pub const BRANCH_COUNT_FACT_NAME: &str = "branch_count";

/// Config path of the collector's extractor section
pub const BRANCH_COLLECTOR_CONFIG_PATH: &str = "soundcheck.collectors.branch";

/// Counts the branches of every SCM-backed entity's repository
///
/// Each entity is handled by its own task; an entity whose URL, credentials or
/// query fails is logged and skipped without affecting the rest of the batch.
pub struct BranchCountFactCollector<C, T>
where
    C: CredentialsProvider,
    T: GraphQlTransport,
{
    credentials: Arc<C>,
    transport: Arc<T>,
    store: ExtractorsStore,
}

impl<C, T> BranchCountFactCollector<C, T>
where
    C: CredentialsProvider + 'static,
    T: GraphQlTransport + 'static,
{
    /// Create a collector reading its extractors from `config`
    ///
    /// # Errors
    /// Returns [`StoreError::InvalidConfig`] if the collector's section is
    /// present but invalid.
    pub fn create(
        config: Arc<dyn ConfigSource>,
        credentials: C,
        transport: T,
    ) -> Result<Self, StoreError> {
        let store = ExtractorsStore::create(config, BRANCH_COLLECTOR_CONFIG_PATH, branch_count_schema())?;
        Ok(Self {
            credentials: Arc::new(credentials),
            transport: Arc::new(transport),
            store,
        })
    }

    /// Extractor store backing this collector
    pub fn store(&self) -> &ExtractorsStore {
        &self.store
    }

    /// Canonical reference of the branch count fact
    pub fn fact_ref() -> Result<FactRef, CollectError> {
        Ok(FactRef::new(BRANCH_COLLECTOR_ID, DEFAULT_SCOPE, BRANCH_COUNT_FACT_NAME)?)
    }
}

/// Collect the branch count of one entity
async fn collect_entity<C, T>(
    credentials: &C,
    transport: &T,
    entity: &Entity,
    url: &str,
    fact_ref: FactRef,
) -> Result<Fact, EntityFailure>
where
    C: CredentialsProvider,
    T: GraphQlTransport,
{
    let entity_ref = entity
        .entity_ref()
        .map_err(|e| EntityFailure::EntityRef(e.to_string()))?;

    let location: RepoLocation = url
        .parse()
        .map_err(|_| EntityFailure::RepoUrl(url.to_string()))?;

    let scm_credentials = credentials
        .get_credentials(url)
        .await
        .map_err(|e| EntityFailure::Credentials(e.to_string()))?;

    let request = GraphQlRequest {
        host: location.host.clone(),
        query: BRANCH_COUNT_QUERY.to_string(),
        variables: variables(&location),
        credentials: scm_credentials,
    };

    let data = transport
        .execute(request)
        .await
        .map_err(|e| EntityFailure::Query(e.to_string()))?;

    let refs = branch_refs(&data)?;
    debug!(
        entity = %entity_ref,
        owner = %location.owner,
        repo = %location.name,
        "Collected branch count {}",
        refs["totalCount"]
    );
    Ok(Fact::new(entity_ref, fact_ref, refs))
}

#[async_trait]
impl<C, T> FactCollector for BranchCountFactCollector<C, T>
where
    C: CredentialsProvider + 'static,
    T: GraphQlTransport + 'static,
{
    fn id(&self) -> &str {
        BRANCH_COLLECTOR_ID
    }

    async fn collect(
        &self,
        entities: &[Entity],
        params: Option<&CollectParams>,
    ) -> Result<Vec<Fact>, CollectError> {
        if let Some(params) = params {
            trace!(collector = BRANCH_COLLECTOR_ID, ?params, "Collect params are not used");
        }

        let fact_ref = Self::fact_ref().inspect_err(|e| {
            error!(collector = BRANCH_COLLECTOR_ID, "Cannot build fact reference: {}", e);
        })?;

        if let Some(reason) = self.store.last_error() {
            error!(
                collector = BRANCH_COLLECTOR_ID,
                "Refusing to collect with invalid configuration: {}",
                reason
            );
            return Err(CollectError::Config(reason));
        }

        let eligible: Vec<(&Entity, String)> = entities
            .iter()
            .filter_map(|entity| entity.scm_url().map(|url| (entity, url.to_string())))
            .collect();

        let handles: Vec<_> = eligible
            .iter()
            .map(|(entity, url)| {
                let credentials = Arc::clone(&self.credentials);
                let transport = Arc::clone(&self.transport);
                let entity = (*entity).clone();
                let url = url.clone();
                let fact_ref = fact_ref.clone();
                tokio::spawn(async move {
                    collect_entity(credentials.as_ref(), transport.as_ref(), &entity, &url, fact_ref).await
                })
            })
            .collect();

        let mut facts = Vec::with_capacity(handles.len());
        for ((entity, url), handle) in eligible.iter().zip(handles) {
            let outcome = handle
                .await
                .unwrap_or_else(|e| Err(EntityFailure::Aborted(e.to_string())));

            match outcome {
                Ok(fact) => facts.push(fact),
                Err(failure) => {
                    let (owner, repo) = url
                        .parse::<RepoLocation>()
                        .map(|l| (l.owner, l.name))
                        .unwrap_or_default();
                    warn!(
                        collector = BRANCH_COLLECTOR_ID,
                        entity = %entity.metadata.name,
                        kind = %entity.kind,
                        owner = %owner,
                        repo = %repo,
                        "Skipping entity: {}",
                        failure
                    );
                }
            }
        }

        info!(
            collector = BRANCH_COLLECTOR_ID,
            "Collected {} fact(s) from {} eligible of {} entities ({} failed)",
            facts.len(),
            eligible.len(),
            entities.len(),
            eligible.len() - facts.len()
        );
        Ok(facts)
    }

    async fn collection_configs(&self) -> Result<Vec<CollectionConfig>, CollectError> {
        self.store
            .extractor_configs()
            .iter()
            .map(|config| {
                CollectionConfig::for_extractor(BRANCH_COLLECTOR_ID, config).map_err(CollectError::from)
            })
            .collect()
    }

    async fn fact_names(&self) -> Result<Vec<String>, CollectError> {
        Ok(self
            .store
            .extractor_configs()
            .into_iter()
            .map(|config| config.fact_name)
            .collect())
    }

    async fn data_schema(&self, _fact_ref: &FactRef) -> Result<Option<String>, CollectError> {
        Ok(None)
    }
}
