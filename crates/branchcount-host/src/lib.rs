//! Branchcount Host
//!
//! Serves registered fact collectors over HTTP and keeps their configuration
//! fresh by watching the app config file.

#![warn(missing_docs)]

pub mod cli;
pub mod config;
pub mod handlers;
pub mod registry;
pub mod watcher;

pub use cli::{Cli, CollectArgs, Command};
pub use config::{HostConfig, HostConfigError};
pub use registry::{CollectorRegistry, RegistryError};
pub use watcher::ConfigWatcher;

use branchcount_collector::BranchCountFactCollector;
use branchcount_domain::traits::FactCollector;
use branchcount_github::{GithubCredentialsProvider, GithubError, GithubGraphQlClient};
use branchcount_store::{AppConfig, ConfigError, ConfigSource, StoreError};
use handlers::{create_router, AppState};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing::{info, warn};

/// Host error
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    /// Configuration file error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Host section error
    #[error(transparent)]
    HostConfig(#[from] HostConfigError),

    /// Collector configuration error
    #[error(transparent)]
    Store(#[from] StoreError),

    /// GitHub integration error
    #[error(transparent)]
    Github(#[from] GithubError),

    /// The config was not loaded from a file
    #[error("Configuration has no backing file to watch")]
    NoConfigFile,

    /// Server binding error
    #[error("Failed to bind server: {0}")]
    Bind(#[from] std::io::Error),

    /// Server error
    #[error("Server error: {0}")]
    Server(String),
}

/// Register every collector this host ships with
///
/// The branch collector talks to GitHub through the integrations configured
/// under `integrations.github`.
pub fn build_registry(config: Arc<AppConfig>) -> Result<CollectorRegistry, HostError> {
    let source: Arc<dyn ConfigSource> = config;
    let credentials = GithubCredentialsProvider::from_config(source.as_ref())?;
    let transport = GithubGraphQlClient::from_config(source.as_ref())?;
    let branch = BranchCountFactCollector::create(source, credentials, transport)?;

    let registry = CollectorRegistry::new();
    registry.add_fact_collectors([Arc::new(branch) as Arc<dyn FactCollector>]);
    Ok(registry)
}

/// Start the host HTTP server
///
/// Builds the collector registry, starts the config watcher and serves until
/// Ctrl+C.
pub async fn start_server(config: Arc<AppConfig>) -> Result<(), HostError> {
    let host = HostConfig::from_config(config.as_ref())?;

    info!("Starting Branchcount host");
    info!("Bind address: {}", host.bind_addr());
    info!("Config watch interval: {:?}", host.watch_interval());

    let registry = Arc::new(build_registry(Arc::clone(&config))?);
    info!("Registered collectors: {}", registry.ids().join(", "));

    let (stop_watcher, watcher_shutdown) = oneshot::channel();
    let watcher = match ConfigWatcher::new(Arc::clone(&config), host.watch_interval()) {
        Ok(mut watcher) => Some(tokio::spawn(async move { watcher.run(watcher_shutdown).await })),
        Err(e) => {
            warn!("Config hot reload disabled: {}", e);
            None
        }
    };

    let app = create_router(AppState { registry });

    let listener = TcpListener::bind(&host.bind_addr()).await?;
    info!("Host listening on {}", host.bind_addr());

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_err() {
                warn!("Failed to listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
            info!("Shutdown signal received, stopping host");
        })
        .await
        .map_err(|e| HostError::Server(e.to_string()));

    let _ = stop_watcher.send(());
    if let Some(watcher) = watcher {
        let _ = watcher.await;
    }

    served
}
