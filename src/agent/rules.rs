//! Rule subscriptions and the ephemeral slot.
//!
//! The ephemeral subscription is a single, non-persistent rule document
//! pushed by the inspector. It always lives under [`EPHEMERAL_SUBSCRIPTION_ID`]
//! and is replaced wholesale on every push.

use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

/// Reserved subscription id of the ephemeral slot.
pub const EPHEMERAL_SUBSCRIPTION_ID: i64 = -1;
pub const EPHEMERAL_SUBSCRIPTION_NAME: &str = "Memory Subscription";
pub const EPHEMERAL_SUBSCRIPTION_VERSION: i64 = 0;
pub const EPHEMERAL_SUBSCRIPTION_AUTHOR: &str = "@inspector/http";

/// A rule document as written by its author.
///
/// Only the identity fields are typed; the rules themselves are carried
/// through untouched.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RawSubscription {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: i64,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(flatten)]
    pub body: serde_json::Map<String, serde_json::Value>,
}

/// Why a rule document was refused.
#[derive(Debug, thiserror::Error)]
pub enum RuleParseError {
    #[error("rule document is not valid JSON: {0}")]
    Syntax(#[from] serde_json::Error),
    #[error("rule document must be a JSON object")]
    NotAnObject,
}

impl RawSubscription {
    /// Parse a rule document. Plain JSON only; comments and trailing commas are refused.
    pub fn parse(text: &str) -> Result<Self, RuleParseError> {
        let value: serde_json::Value = serde_json::from_str(text)?;
        if !value.is_object() {
            return Err(RuleParseError::NotAnObject);
        }
        Ok(serde_json::from_value(value)?)
    }

    /// Force the identity of the ephemeral slot onto this document.
    pub fn pin_ephemeral_identity(self) -> Self {
        Self {
            id: EPHEMERAL_SUBSCRIPTION_ID,
            name: EPHEMERAL_SUBSCRIPTION_NAME.to_string(),
            version: EPHEMERAL_SUBSCRIPTION_VERSION,
            author: Some(EPHEMERAL_SUBSCRIPTION_AUTHOR.to_string()),
            ..self
        }
    }
}

/// Per-subscription settings kept next to the document.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubsItem {
    pub id: i64,
    /// Sort order; negative sorts ahead of every user subscription.
    pub order: i64,
    pub enable: bool,
    pub enable_update: bool,
    /// Last modification, epoch milliseconds.
    pub mtime: i64,
}

impl SubsItem {
    /// Settings item for the ephemeral slot, reusing `existing` when present.
    pub fn ephemeral(existing: Option<SubsItem>, mtime: i64) -> Self {
        let base = existing.unwrap_or(SubsItem {
            id: EPHEMERAL_SUBSCRIPTION_ID,
            order: -1,
            enable: true,
            enable_update: false,
            mtime,
        });
        SubsItem { mtime, ..base }
    }
}

/// Persistent store of rule subscriptions.
#[async_trait]
pub trait RuleStore: Send + Sync {
    fn subscription(&self, id: i64) -> Option<RawSubscription>;
    async fn upsert_subscription(&self, subscription: RawSubscription) -> anyhow::Result<()>;
    fn item(&self, id: i64) -> Option<SubsItem>;
    async fn upsert_item(&self, item: SubsItem) -> anyhow::Result<()>;
    /// Remove a subscription and its settings item. Missing ids are ignored.
    async fn delete_subscription(&self, id: i64) -> anyhow::Result<()>;
}

#[derive(Default, Serialize, Deserialize)]
struct StoreFile {
    subscriptions: Vec<RawSubscription>,
    items: Vec<SubsItem>,
}

/// Concurrent in-memory rule store, optionally mirrored to a JSON file.
///
/// Mutations hold `writes` from the map update until the mirror is renamed
/// into place, so the file always reflects the latest committed state.
#[derive(Default)]
pub struct MemoryRuleStore {
    subscriptions: DashMap<i64, RawSubscription>,
    items: DashMap<i64, SubsItem>,
    file: Option<PathBuf>,
    writes: Mutex<()>,
}

impl MemoryRuleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a store mirrored to `path`, loading it if it exists.
    pub fn open(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let path = path.into();
        let store = Self {
            file: Some(path.clone()),
            ..Self::default()
        };
        if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("reading {}", path.display()))?;
            let file: StoreFile = serde_json::from_str(&content)
                .with_context(|| format!("parsing {}", path.display()))?;
            for sub in file.subscriptions {
                store.subscriptions.insert(sub.id, sub);
            }
            for item in file.items {
                store.items.insert(item.id, item);
            }
        }
        Ok(store)
    }

    /// Write the mirror. Callers hold `writes`.
    async fn persist(&self) -> anyhow::Result<()> {
        let Some(path) = &self.file else {
            return Ok(());
        };
        let mut file = StoreFile {
            subscriptions: self.subscriptions.iter().map(|e| e.value().clone()).collect(),
            items: self.items.iter().map(|e| e.value().clone()).collect(),
        };
        file.subscriptions.sort_by_key(|s| s.id);
        file.items.sort_by_key(|i| i.id);
        let body = serde_json::to_vec_pretty(&file)?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let staging = path.with_extension("json.tmp");
        tokio::fs::write(&staging, body)
            .await
            .with_context(|| format!("writing {}", staging.display()))?;
        tokio::fs::rename(&staging, path)
            .await
            .with_context(|| format!("replacing {}", path.display()))
    }
}

#[async_trait]
impl RuleStore for MemoryRuleStore {
    fn subscription(&self, id: i64) -> Option<RawSubscription> {
        self.subscriptions.get(&id).map(|e| e.value().clone())
    }

    async fn upsert_subscription(&self, subscription: RawSubscription) -> anyhow::Result<()> {
        let _guard = self.writes.lock().await;
        self.subscriptions.insert(subscription.id, subscription);
        self.persist().await
    }

    fn item(&self, id: i64) -> Option<SubsItem> {
        self.items.get(&id).map(|e| e.value().clone())
    }

    async fn upsert_item(&self, item: SubsItem) -> anyhow::Result<()> {
        let _guard = self.writes.lock().await;
        self.items.insert(item.id, item);
        self.persist().await
    }

    async fn delete_subscription(&self, id: i64) -> anyhow::Result<()> {
        let _guard = self.writes.lock().await;
        let removed = self.subscriptions.remove(&id).is_some() | self.items.remove(&id).is_some();
        if removed {
            tracing::info!(subscription_id = id, "Subscription deleted");
            self.persist().await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_keeps_rules_and_pins_identity() {
        let sub = RawSubscription::parse(
            r#"{"id": 42, "name": "mine", "version": 7, "author": "me", "apps": [{"id": "com.a"}]}"#,
        )
        .unwrap();
        assert_eq!(sub.id, 42);

        let pinned = sub.pin_ephemeral_identity();
        assert_eq!(pinned.id, EPHEMERAL_SUBSCRIPTION_ID);
        assert_eq!(pinned.name, EPHEMERAL_SUBSCRIPTION_NAME);
        assert_eq!(pinned.version, EPHEMERAL_SUBSCRIPTION_VERSION);
        assert_eq!(pinned.author.as_deref(), Some(EPHEMERAL_SUBSCRIPTION_AUTHOR));
        assert_eq!(pinned.body["apps"][0]["id"], "com.a");
    }

    #[test]
    fn test_parse_is_lenient_about_identity_fields() {
        let sub = RawSubscription::parse(r#"{"globalGroups": []}"#).unwrap();
        assert_eq!(sub.id, 0);
        assert!(sub.body.contains_key("globalGroups"));
    }

    #[test]
    fn test_parse_refuses_json5_and_non_objects() {
        assert!(matches!(
            RawSubscription::parse("{id: 1, // comment\n}"),
            Err(RuleParseError::Syntax(_))
        ));
        assert!(matches!(
            RawSubscription::parse(r#"{"id": 1,}"#),
            Err(RuleParseError::Syntax(_))
        ));
        assert!(matches!(
            RawSubscription::parse("[1, 2]"),
            Err(RuleParseError::NotAnObject)
        ));
    }

    #[test]
    fn test_ephemeral_item_reuses_existing() {
        let fresh = SubsItem::ephemeral(None, 100);
        assert_eq!(fresh.order, -1);
        assert!(!fresh.enable_update);

        let disabled = SubsItem { enable: false, ..fresh };
        let updated = SubsItem::ephemeral(Some(disabled), 200);
        assert!(!updated.enable);
        assert_eq!(updated.mtime, 200);
    }

    #[tokio::test]
    async fn test_file_backed_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.json");

        let store = MemoryRuleStore::open(&path).unwrap();
        let sub = RawSubscription::parse(r#"{"apps": []}"#).unwrap().pin_ephemeral_identity();
        store.upsert_subscription(sub.clone()).await.unwrap();
        store.upsert_item(SubsItem::ephemeral(None, 1)).await.unwrap();

        let reopened = MemoryRuleStore::open(&path).unwrap();
        assert_eq!(reopened.subscription(EPHEMERAL_SUBSCRIPTION_ID), Some(sub));

        reopened.delete_subscription(EPHEMERAL_SUBSCRIPTION_ID).await.unwrap();
        let again = MemoryRuleStore::open(&path).unwrap();
        assert!(again.subscription(EPHEMERAL_SUBSCRIPTION_ID).is_none());
        assert!(again.item(EPHEMERAL_SUBSCRIPTION_ID).is_none());
    }

    #[tokio::test]
    async fn test_concurrent_writes_leave_latest_state_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.json");
        let store = std::sync::Arc::new(MemoryRuleStore::open(&path).unwrap());

        let mut tasks = Vec::new();
        for mtime in 0..16 {
            let store = store.clone();
            tasks.push(tokio::spawn(async move {
                store.upsert_item(SubsItem::ephemeral(None, mtime)).await.unwrap();
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let in_memory = store.item(EPHEMERAL_SUBSCRIPTION_ID).unwrap();
        let on_disk = MemoryRuleStore::open(&path)
            .unwrap()
            .item(EPHEMERAL_SUBSCRIPTION_ID)
            .unwrap();
        assert_eq!(on_disk, in_memory);
        assert!(!path.with_extension("json.tmp").exists());
    }
}
