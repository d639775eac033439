//! Collaborators owned by the on-device agent.
//!
//! The control plane never performs actions, captures screens or stores
//! rules itself. It delegates to the traits defined here.
//!
//! # Data Flow
//! ```text
//! route handler
//!     → engine.rs   (running flag, action executor, screen capture)
//!     → capture.rs  (snapshot/screenshot files on disk)
//!     → rules.rs    (rule subscriptions, ephemeral slot)
//!     → device.rs   (device identity, agent version)
//!     → notify.rs   (user-visible notifications)
//! ```
//!
//! # Design Decisions
//! - Collaborators synchronize internally; handlers hold only `Arc`s
//! - A collaborator signals an expected, user-facing failure with [`Rejected`]

pub mod capture;
pub mod device;
pub mod engine;
pub mod notify;
pub mod rules;

use std::sync::Arc;

pub use capture::{CaptureStore, FsCaptureStore, SnapshotDescriptor};
pub use device::{AgentInfo, DeviceInfo, DeviceInfoProvider, HostDeviceInfo};
pub use engine::{ActionRequest, ActionResult, AutomationEngine, DetachedEngine, ScreenCapture};
pub use notify::{Notice, Notifier, TracingNotifier};
pub use rules::{MemoryRuleStore, RawSubscription, RuleStore, SubsItem};

/// A named, user-facing failure raised by a collaborator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct Rejected(pub String);

impl Rejected {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// The full set of collaborators handed to the control plane.
#[derive(Clone)]
pub struct Collaborators {
    pub engine: Arc<dyn AutomationEngine>,
    pub captures: Arc<dyn CaptureStore>,
    pub rules: Arc<dyn RuleStore>,
    pub device: Arc<dyn DeviceInfoProvider>,
    pub notifier: Arc<dyn Notifier>,
}
