//! Snapshot and screenshot storage.
//!
//! # Layout
//! ```text
//! {snapshot_dir}/{id}.json   descriptor fields + node tree
//! {snapshot_dir}/{id}.png    screenshot
//! ```

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::agent::engine::{AutomationEngine, ENGINE_NOT_RUNNING};
use crate::agent::Rejected;

/// Metadata describing one stored snapshot.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotDescriptor {
    pub id: i64,
    pub app_id: Option<String>,
    pub activity_id: Option<String>,
    pub screen_width: u32,
    pub screen_height: u32,
    pub is_landscape: bool,
    /// Epoch milliseconds.
    pub created_at: i64,
}

#[derive(Serialize)]
struct SnapshotFile<'a> {
    #[serde(flatten)]
    descriptor: &'a SnapshotDescriptor,
    nodes: &'a serde_json::Value,
}

/// Storage for captured diagnostic artifacts.
#[async_trait]
pub trait CaptureStore: Send + Sync {
    /// Path where the snapshot with `id` is (or would be) stored.
    fn snapshot_file(&self, id: i64) -> PathBuf;

    /// Path where the screenshot with `id` is (or would be) stored.
    fn screenshot_file(&self, id: i64) -> PathBuf;

    /// Capture the current screen and persist it.
    async fn capture(&self) -> anyhow::Result<SnapshotDescriptor>;

    /// Every stored snapshot, newest first.
    async fn list(&self) -> Vec<SnapshotDescriptor>;
}

/// Directory-backed capture store fed by the automation engine.
pub struct FsCaptureStore {
    dir: PathBuf,
    engine: Arc<dyn AutomationEngine>,
    last_id: AtomicI64,
}

impl FsCaptureStore {
    pub fn new(dir: impl Into<PathBuf>, engine: Arc<dyn AutomationEngine>) -> Self {
        Self {
            dir: dir.into(),
            engine,
            last_id: AtomicI64::new(0),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Millisecond timestamp, bumped so two captures never share an id.
    fn next_id(&self) -> i64 {
        let now = chrono::Utc::now().timestamp_millis();
        let prev = self
            .last_id
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or(now);
        now.max(prev + 1)
    }
}

#[async_trait]
impl CaptureStore for FsCaptureStore {
    fn snapshot_file(&self, id: i64) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    fn screenshot_file(&self, id: i64) -> PathBuf {
        self.dir.join(format!("{id}.png"))
    }

    async fn capture(&self) -> anyhow::Result<SnapshotDescriptor> {
        if !self.engine.is_running() {
            return Err(Rejected::new(ENGINE_NOT_RUNNING).into());
        }
        let screen = self.engine.capture_screen().await?;

        let id = self.next_id();
        let descriptor = SnapshotDescriptor {
            id,
            app_id: screen.app_id,
            activity_id: screen.activity_id,
            screen_width: screen.screen_width,
            screen_height: screen.screen_height,
            is_landscape: screen.is_landscape,
            created_at: chrono::Utc::now().timestamp_millis(),
        };

        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("creating {}", self.dir.display()))?;

        let body = serde_json::to_vec(&SnapshotFile {
            descriptor: &descriptor,
            nodes: &screen.nodes,
        })?;
        let path = self.snapshot_file(id);
        tokio::fs::write(&path, body)
            .await
            .with_context(|| format!("writing {}", path.display()))?;

        if let Some(png) = screen.screenshot {
            let path = self.screenshot_file(id);
            tokio::fs::write(&path, png)
                .await
                .with_context(|| format!("writing {}", path.display()))?;
        }

        tracing::info!(snapshot_id = id, app_id = ?descriptor.app_id, "Snapshot captured");
        Ok(descriptor)
    }

    async fn list(&self) -> Vec<SnapshotDescriptor> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::debug!(dir = %self.dir.display(), error = %e, "Snapshot dir unreadable");
                return Vec::new();
            }
        };

        let mut snapshots = Vec::new();
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to read snapshot dir entry");
                    break;
                }
            };
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let parsed = tokio::fs::read(&path)
                .await
                .map_err(anyhow::Error::from)
                .and_then(|bytes| Ok(serde_json::from_slice::<SnapshotDescriptor>(&bytes)?));
            match parsed {
                Ok(descriptor) => snapshots.push(descriptor),
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable snapshot"),
            }
        }

        snapshots.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        snapshots
    }
}
