//! Shared fakes and helpers for integration tests.

#![allow(dead_code)]

use std::future::Future;
use std::net::{Ipv4Addr, TcpListener};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use agent_control_plane::agent::{
    ActionRequest, ActionResult, AgentInfo, AutomationEngine, Collaborators, DeviceInfo,
    DeviceInfoProvider, FsCaptureStore, MemoryRuleStore, Notice, Notifier, ScreenCapture,
};
use agent_control_plane::config::{shared, ControlPlaneConfig, SharedConfig};
use async_trait::async_trait;

/// Engine whose running flag and behaviour are set by the test.
#[derive(Default)]
pub struct FakeEngine {
    pub running: AtomicBool,
    pub fail_with_internal_error: AtomicBool,
    pub panic_on_exec: AtomicBool,
    pub executed: Mutex<Vec<ActionRequest>>,
}

impl FakeEngine {
    pub fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::SeqCst);
    }

    pub fn executed(&self) -> Vec<ActionRequest> {
        self.executed.lock().unwrap().clone()
    }
}

#[async_trait]
impl AutomationEngine for FakeEngine {
    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    async fn exec_action(&self, request: ActionRequest) -> anyhow::Result<ActionResult> {
        if self.panic_on_exec.load(Ordering::SeqCst) {
            panic!("engine exploded");
        }
        if self.fail_with_internal_error.load(Ordering::SeqCst) {
            anyhow::bail!("node tree went stale");
        }
        let action = request.action.clone().or_else(|| Some("click".to_string()));
        self.executed.lock().unwrap().push(request);
        Ok(ActionResult {
            action,
            result: true,
        })
    }

    async fn capture_screen(&self) -> anyhow::Result<ScreenCapture> {
        Ok(ScreenCapture {
            app_id: Some("com.example.shop".into()),
            activity_id: None,
            screen_width: 1080,
            screen_height: 2400,
            is_landscape: false,
            nodes: serde_json::json!([{ "id": 0, "text": "Skip" }]),
            screenshot: Some(b"\x89PNG fake".to_vec()),
        })
    }
}

pub struct StaticDevice;

impl DeviceInfoProvider for StaticDevice {
    fn device(&self) -> DeviceInfo {
        DeviceInfo {
            device: "walleye".into(),
            model: "Pixel 2".into(),
            manufacturer: "Google".into(),
            brand: None,
            os: "android".into(),
            os_version: Some("11".into()),
            arch: "aarch64".into(),
        }
    }

    fn agent(&self) -> AgentInfo {
        AgentInfo::current()
    }
}

/// Notifier that remembers every notice.
#[derive(Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().unwrap().clone()
    }

    pub fn count(&self, pred: impl Fn(&Notice) -> bool) -> usize {
        self.notices().iter().filter(|n| pred(n)).count()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices.lock().unwrap().push(notice);
    }
}

/// Collaborators with handles kept for assertions.
pub struct Fixture {
    pub engine: Arc<FakeEngine>,
    pub captures: Arc<FsCaptureStore>,
    pub rules: Arc<MemoryRuleStore>,
    pub notifier: Arc<RecordingNotifier>,
    pub config: SharedConfig,
    pub dir: tempfile::TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_config(ControlPlaneConfig::default())
    }

    pub fn with_config(config: ControlPlaneConfig) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let engine = Arc::new(FakeEngine::default());
        Self {
            captures: Arc::new(FsCaptureStore::new(dir.path(), engine.clone())),
            engine,
            rules: Arc::new(MemoryRuleStore::new()),
            notifier: Arc::new(RecordingNotifier::default()),
            config: shared(config),
            dir,
        }
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            engine: self.engine.clone(),
            captures: self.captures.clone(),
            rules: self.rules.clone(),
            device: Arc::new(StaticDevice),
            notifier: self.notifier.clone(),
        }
    }
}

/// A port that was free a moment ago.
pub fn free_port() -> u16 {
    let listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, 0)).unwrap();
    listener.local_addr().unwrap().port()
}

/// Poll `check` until it holds or five seconds pass.
pub async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while tokio::time::Instant::now() < deadline {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}
