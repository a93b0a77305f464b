//! HTTP request handlers for the host.
//!
//! Exposes the registered fact collectors over a small JSON API using axum.

use crate::registry::{CollectorRegistry, RegistryError};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use branchcount_domain::traits::{CollectParams, FactCollector};
use branchcount_domain::{CollectError, CollectionConfig, Entity, Fact, FactRef};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Collectors served by this host
    pub registry: Arc<CollectorRegistry>,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthCheckResponse {
    /// Overall health status
    pub status: String,
    /// Number of registered collectors
    pub collector_count: usize,
}

/// One registered collector
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectorSummary {
    /// Collector id
    pub id: String,
    /// Facts it can produce
    pub fact_names: Vec<String>,
}

/// Query string of the schema endpoint
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaQuery {
    /// Fact reference (`source:scope/name` or `source:name`)
    pub fact_ref: String,
}

/// Payload schema of one fact
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaResponse {
    /// Fact the schema describes
    pub fact_ref: FactRef,
    /// Schema, if the collector declares one
    pub schema: Option<String>,
}

/// Collection request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectRequest {
    /// Candidate entities
    pub entities: Vec<Entity>,
    /// Facts to collect
    #[serde(default)]
    pub fact_refs: Option<Vec<FactRef>>,
    /// Facts to refresh regardless of cache
    #[serde(default)]
    pub refresh: Option<Vec<FactRef>>,
}

impl CollectRequest {
    fn params(&self) -> Option<CollectParams> {
        if self.fact_refs.is_none() && self.refresh.is_none() {
            return None;
        }
        Some(CollectParams {
            fact_refs: self.fact_refs.clone(),
            refresh: self.refresh.clone(),
        })
    }
}

/// Error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
}

/// Application error type
#[derive(Debug)]
pub enum AppError {
    /// Unknown collector
    NotFound(String),
    /// Malformed request
    BadRequest(String),
    /// The collector failed as a whole
    Collector(CollectError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::NotFound(id) => (StatusCode::NOT_FOUND, format!("Collector not found: {}", id)),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Collector(e) => {
                error!("Collector request failed: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
        };

        let body = Json(ErrorResponse { error: message });
        (status, body).into_response()
    }
}

impl From<RegistryError> for AppError {
    fn from(e: RegistryError) -> Self {
        match e {
            RegistryError::CollectorNotFound(id) => AppError::NotFound(id),
            RegistryError::Collect(e) => AppError::Collector(e),
        }
    }
}

impl From<CollectError> for AppError {
    fn from(e: CollectError) -> Self {
        AppError::Collector(e)
    }
}

fn collector(state: &AppState, id: &str) -> Result<Arc<dyn FactCollector>, AppError> {
    state
        .registry
        .get(id)
        .ok_or_else(|| AppError::NotFound(id.to_string()))
}

/// GET /health - Liveness check
async fn health_check(State(state): State<AppState>) -> Json<HealthCheckResponse> {
    Json(HealthCheckResponse {
        status: "healthy".to_string(),
        collector_count: state.registry.len(),
    })
}

/// GET /collectors - Registered collectors and their facts
async fn list_collectors(
    State(state): State<AppState>,
) -> Result<Json<Vec<CollectorSummary>>, AppError> {
    let mut summaries = Vec::new();
    for id in state.registry.ids() {
        let collector = collector(&state, &id)?;
        summaries.push(CollectorSummary {
            fact_names: collector.fact_names().await?,
            id,
        });
    }
    Ok(Json(summaries))
}

/// GET /collectors/:id/configs - Collection configs of one collector
async fn collection_configs(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<CollectionConfig>>, AppError> {
    let configs = collector(&state, &id)?.collection_configs().await?;
    Ok(Json(configs))
}

/// GET /collectors/:id/facts - Fact names of one collector
async fn fact_names(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<String>>, AppError> {
    let names = collector(&state, &id)?.fact_names().await?;
    Ok(Json(names))
}

/// GET /collectors/:id/schema?factRef=... - Payload schema of one fact
async fn data_schema(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<SchemaQuery>,
) -> Result<Json<SchemaResponse>, AppError> {
    let collector = collector(&state, &id)?;
    let fact_ref: FactRef = query
        .fact_ref
        .parse()
        .map_err(|e| AppError::BadRequest(format!("Invalid factRef: {}", e)))?;

    let schema = collector.data_schema(&fact_ref).await?;
    Ok(Json(SchemaResponse { fact_ref, schema }))
}

/// POST /collectors/:id/collect - Collect facts for a batch of entities
async fn collect(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<CollectRequest>,
) -> Result<Json<Vec<Fact>>, AppError> {
    let params = request.params();
    let facts = state
        .registry
        .collect(&id, &request.entities, params.as_ref())
        .await?;
    Ok(Json(facts))
}

/// Create the axum router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/collectors", get(list_collectors))
        .route("/collectors/:id/configs", get(collection_configs))
        .route("/collectors/:id/facts", get(fact_names))
        .route("/collectors/:id/schema", get(data_schema))
        .route("/collectors/:id/collect", post(collect))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_collect_request_params() {
        let bare: CollectRequest = serde_json::from_value(json!({ "entities": [] })).unwrap();
        assert!(bare.params().is_none());

        let narrowed: CollectRequest = serde_json::from_value(json!({
            "entities": [],
            "factRefs": ["branch:default/branch_count"]
        }))
        .unwrap();
        let params = narrowed.params().unwrap();
        assert_eq!(params.fact_refs.unwrap()[0].to_string(), "branch:default/branch_count");
        assert!(params.refresh.is_none());
    }

    #[test]
    fn test_error_status_codes() {
        assert_eq!(
            AppError::NotFound("x".into()).into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::BadRequest("x".into()).into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Collector(CollectError::Config("x".into()))
                .into_response()
                .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
