//! Startup housekeeping.
//!
//! A process killed without a clean shutdown leaves the ephemeral rule
//! subscription behind. On the next start it is removed, unless the control
//! plane is already running and may have received a fresh one.

use std::time::Duration;

use tokio::sync::watch;

use crate::agent::rules::{RuleStore, EPHEMERAL_SUBSCRIPTION_ID};
use crate::config::SharedConfig;

/// Delay before stale state is cleared.
pub const STALE_CLEANUP_DELAY: Duration = Duration::from_secs(1);

/// Remove a leftover ephemeral subscription. Returns whether a delete was issued.
pub async fn clear_stale_ephemeral_rules(
    running: watch::Receiver<bool>,
    config: SharedConfig,
    rules: &dyn RuleStore,
    delay: Duration,
) -> bool {
    if *running.borrow() {
        return false;
    }
    tokio::time::sleep(delay).await;
    if *running.borrow() || !config.load().server.clear_ephemeral_on_exit {
        return false;
    }
    match rules.delete_subscription(EPHEMERAL_SUBSCRIPTION_ID).await {
        Ok(()) => {
            tracing::debug!("Stale ephemeral subscription cleared");
            true
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to clear stale ephemeral subscription");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::rules::{MemoryRuleStore, RawSubscription};
    use crate::config::{shared, ControlPlaneConfig};

    async fn store_with_leftover() -> MemoryRuleStore {
        let store = MemoryRuleStore::new();
        let sub = RawSubscription::parse("{}").unwrap().pin_ephemeral_identity();
        store.upsert_subscription(sub).await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_clears_when_not_running() {
        let store = store_with_leftover().await;
        let (_tx, running) = watch::channel(false);
        let config = shared(ControlPlaneConfig::default());

        assert!(clear_stale_ephemeral_rules(running, config, &store, Duration::ZERO).await);
        assert!(store.subscription(EPHEMERAL_SUBSCRIPTION_ID).is_none());
    }

    #[tokio::test]
    async fn test_skips_when_running_or_disabled() {
        let store = store_with_leftover().await;
        let (_tx, running) = watch::channel(true);
        let config = shared(ControlPlaneConfig::default());
        assert!(!clear_stale_ephemeral_rules(running, config, &store, Duration::ZERO).await);

        let mut disabled = ControlPlaneConfig::default();
        disabled.server.clear_ephemeral_on_exit = false;
        let (_tx, running) = watch::channel(false);
        assert!(!clear_stale_ephemeral_rules(running, shared(disabled), &store, Duration::ZERO).await);

        assert!(store.subscription(EPHEMERAL_SUBSCRIPTION_ID).is_some());
    }
}
