//! Configuration file watcher and the listen-port feed.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::watch;

use crate::config::loader::{load_config, ConfigError};
use crate::config::schema::ControlPlaneConfig;

/// Live configuration snapshot shared with every subsystem.
pub type SharedConfig = Arc<ArcSwap<ControlPlaneConfig>>;

/// Wrap a configuration in a [`SharedConfig`].
pub fn shared(config: ControlPlaneConfig) -> SharedConfig {
    Arc::new(ArcSwap::from_pointee(config))
}

/// Replayable feed of the desired listen port.
///
/// Every call to [`PortFeed::publish`] is delivered to subscribers, including
/// re-publishing the value already held.
#[derive(Clone)]
pub struct PortFeed {
    tx: Arc<watch::Sender<u16>>,
}

impl PortFeed {
    pub fn new(initial: u16) -> Self {
        let (tx, _) = watch::channel(initial);
        Self { tx: Arc::new(tx) }
    }

    /// Emit a port value. Never filtered against the previous value.
    pub fn publish(&self, port: u16) {
        self.tx.send_replace(port);
    }

    /// Current port value.
    pub fn current(&self) -> u16 {
        *self.tx.borrow()
    }

    /// Subscribe; the current value is delivered first.
    pub fn subscribe(&self) -> PortSubscription {
        let mut rx = self.tx.subscribe();
        rx.mark_changed();
        PortSubscription { rx }
    }
}

/// Receiving end of a [`PortFeed`].
pub struct PortSubscription {
    rx: watch::Receiver<u16>,
}

impl PortSubscription {
    /// Wait for the next emission. Returns `None` once the feed is dropped.
    pub async fn next(&mut self) -> Option<u16> {
        self.rx.changed().await.ok()?;
        Some(*self.rx.borrow_and_update())
    }
}

/// A watcher that monitors the configuration file for changes.
pub struct ConfigWatcher {
    path: PathBuf,
    current: SharedConfig,
    ports: PortFeed,
}

impl ConfigWatcher {
    pub fn new(path: &Path, current: SharedConfig, ports: PortFeed) -> Self {
        Self {
            path: path.to_path_buf(),
            current,
            ports,
        }
    }

    /// Reload the file once, swap the shared snapshot and emit its port.
    pub fn reload(&self) -> Result<(), ConfigError> {
        reload_into(&self.path, &self.current, &self.ports)
    }

    /// Start watching the file in a background thread.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let path = self.path.clone();
        let current = self.current.clone();
        let ports = self.ports.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() {
                        tracing::info!("Config file change detected, reloading...");
                        if let Err(e) = reload_into(&path, &current, &ports) {
                            tracing::error!(
                                "Failed to reload config: {}. Keeping current configuration.",
                                e
                            );
                        }
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "Config watcher started");
        Ok(watcher)
    }
}

fn reload_into(path: &Path, current: &SharedConfig, ports: &PortFeed) -> Result<(), ConfigError> {
    let config = load_config(path)?;
    let port = config.server.port;
    current.store(Arc::new(config));
    ports.publish(port);
    tracing::debug!(port, "Configuration applied");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_subscription_replays_current_value() {
        let feed = PortFeed::new(8080);
        let mut sub = feed.subscribe();
        assert_eq!(sub.next().await, Some(8080));
    }

    #[tokio::test]
    async fn test_same_value_is_redelivered() {
        let feed = PortFeed::new(8080);
        let mut sub = feed.subscribe();
        assert_eq!(sub.next().await, Some(8080));

        feed.publish(8080);
        let next = tokio::time::timeout(Duration::from_millis(200), sub.next()).await;
        assert_eq!(next.unwrap(), Some(8080));
    }

    #[tokio::test]
    async fn test_feed_closed() {
        let feed = PortFeed::new(1);
        let mut sub = feed.subscribe();
        assert_eq!(sub.next().await, Some(1));
        drop(feed);
        assert_eq!(sub.next().await, None);
    }

    #[tokio::test]
    async fn test_reload_swaps_config_and_emits_port() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nport = 9555").unwrap();

        let current = shared(ControlPlaneConfig::default());
        let feed = PortFeed::new(current.load().server.port);
        let mut sub = feed.subscribe();
        assert_eq!(sub.next().await, Some(8888));

        let watcher = ConfigWatcher::new(file.path(), current.clone(), feed.clone());
        watcher.reload().unwrap();

        assert_eq!(current.load().server.port, 9555);
        assert_eq!(sub.next().await, Some(9555));
    }

    #[tokio::test]
    async fn test_invalid_reload_keeps_previous() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nport = 9556\nmax_body_size = 0").unwrap();

        let current = shared(ControlPlaneConfig::default());
        let feed = PortFeed::new(8888);
        let watcher = ConfigWatcher::new(file.path(), current.clone(), feed.clone());

        assert!(watcher.reload().is_err());
        assert_eq!(current.load().server.port, 8888);
        assert_eq!(feed.current(), 8888);
    }
}
