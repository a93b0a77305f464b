//! Background worker that reloads the config file when it changes

use crate::HostError;
use branchcount_store::AppConfig;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::oneshot;
use tokio::time::{interval, MissedTickBehavior};

/// Modification stamp of a file: mtime plus length
type FileStamp = (Option<SystemTime>, u64);

/// Polls the app config's backing file and reloads it on change
///
/// Every subscriber of the [`AppConfig`] (the extractor stores among them)
/// is notified after a successful reload. A file that fails to parse is
/// logged and the previous configuration stays in effect.
///
/// # Examples
///
/// ```no_run
/// use branchcount_host::ConfigWatcher;
/// use branchcount_store::AppConfig;
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = Arc::new(AppConfig::from_file("app-config.yaml")?);
///     let mut watcher = ConfigWatcher::new(config, Duration::from_secs(10))?;
///     let (_stop, shutdown) = tokio::sync::oneshot::channel();
///
///     // Run until Ctrl+C or until `_stop` is used or dropped
///     watcher.run(shutdown).await;
///     Ok(())
/// }
/// ```
pub struct ConfigWatcher {
    config: Arc<AppConfig>,
    path: PathBuf,
    interval: Duration,
    last_seen: FileStamp,
    reloads: usize,
}

impl ConfigWatcher {
    /// Create a watcher for a file-backed config
    ///
    /// # Errors
    /// Returns [`HostError::NoConfigFile`] if the config was not loaded from a
    /// file.
    pub fn new(config: Arc<AppConfig>, interval: Duration) -> Result<Self, HostError> {
        let path = config.path().ok_or(HostError::NoConfigFile)?.to_path_buf();
        let last_seen = stamp(std::fs::metadata(&path));
        Ok(Self {
            config,
            path,
            interval,
            last_seen,
            reloads: 0,
        })
    }

    /// Run until Ctrl+C or until `shutdown` fires (or its sender is dropped)
    pub async fn run(&mut self, mut shutdown: oneshot::Receiver<()>) {
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            "Config watcher started for {} (interval: {:?})",
            self.path.display(),
            self.interval
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.check().await;
                }
                _ = &mut shutdown => {
                    tracing::debug!("Config watcher shutdown requested");
                    break;
                }
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Shutdown signal received, stopping config watcher");
                    break;
                }
            }
        }

        tracing::info!("Config watcher stopped after {} reload(s)", self.reloads);
    }

    /// Check the file once and reload it if it changed
    ///
    /// The reload reads the file and rebuilds every subscriber, so it runs on
    /// the blocking pool. Returns whether a reload succeeded.
    pub async fn check(&mut self) -> bool {
        let current = stamp(tokio::fs::metadata(&self.path).await);

        if current == self.last_seen {
            return false;
        }
        self.last_seen = current;

        tracing::debug!("Config file {} changed, reloading", self.path.display());
        let config = Arc::clone(&self.config);
        match tokio::task::spawn_blocking(move || config.reload()).await {
            Ok(Ok(())) => {
                self.reloads += 1;
                true
            }
            Ok(Err(e)) => {
                tracing::error!(
                    "Failed to reload {}, keeping previous configuration: {}",
                    self.path.display(),
                    e
                );
                false
            }
            Err(e) => {
                tracing::error!("Config reload task failed: {}", e);
                false
            }
        }
    }

    /// Number of successful reloads so far
    pub fn reloads(&self) -> usize {
        self.reloads
    }
}

fn stamp(metadata: std::io::Result<std::fs::Metadata>) -> FileStamp {
    match metadata {
        Ok(meta) => (meta.modified().ok(), meta.len()),
        Err(_) => (None, 0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use branchcount_store::ConfigSource;
    use serde_json::json;

    fn yaml_file(contents: &str) -> tempfile::NamedTempFile {
        let file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        std::fs::write(file.path(), contents).unwrap();
        file
    }

    #[test]
    fn test_requires_backing_file() {
        let config = Arc::new(AppConfig::empty());
        let result = ConfigWatcher::new(config, Duration::from_secs(1));
        assert!(matches!(result, Err(HostError::NoConfigFile)));
    }

    #[tokio::test]
    async fn test_reloads_on_change() {
        let file = yaml_file("value: 1\n");
        let config = Arc::new(AppConfig::from_file(file.path()).unwrap());
        let mut watcher = ConfigWatcher::new(config.clone(), Duration::from_millis(10)).unwrap();

        assert!(!watcher.check().await);

        std::fs::write(file.path(), "value: 22\n").unwrap();
        assert!(watcher.check().await);
        assert_eq!(config.get_optional("value"), Some(json!(22)));
        assert_eq!(watcher.reloads(), 1);

        assert!(!watcher.check().await);
    }

    #[tokio::test]
    async fn test_broken_file_keeps_previous_config() {
        let file = yaml_file("value: 1\n");
        let config = Arc::new(AppConfig::from_file(file.path()).unwrap());
        let mut watcher = ConfigWatcher::new(config.clone(), Duration::from_millis(10)).unwrap();

        std::fs::write(file.path(), "value: [unclosed\n").unwrap();
        assert!(!watcher.check().await);
        assert_eq!(config.get_optional("value"), Some(json!(1)));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_reload_runs_off_the_runtime_thread() {
        let file = yaml_file("value: 1\n");
        let config = Arc::new(AppConfig::from_file(file.path()).unwrap());
        let mut watcher = ConfigWatcher::new(config.clone(), Duration::from_millis(10)).unwrap();

        let listener_threads = Arc::new(std::sync::Mutex::new(Vec::new()));
        let recorded = Arc::clone(&listener_threads);
        let _subscription = config
            .subscribe(Arc::new(move || {
                recorded.lock().unwrap().push(std::thread::current().id());
            }))
            .unwrap();

        std::fs::write(file.path(), "value: 22\n").unwrap();
        assert!(watcher.check().await);

        let threads = listener_threads.lock().unwrap();
        assert_eq!(threads.len(), 1);
        assert_ne!(threads[0], std::thread::current().id());
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let file = yaml_file("value: 1\n");
        let config = Arc::new(AppConfig::from_file(file.path()).unwrap());
        let mut watcher = ConfigWatcher::new(config, Duration::from_millis(10)).unwrap();

        let (stop, shutdown) = oneshot::channel();
        let handle = tokio::spawn(async move {
            watcher.run(shutdown).await;
            watcher.reloads()
        });

        stop.send(()).unwrap();
        let reloads = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reloads, 0);
    }
}
