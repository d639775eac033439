//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Clear stale ephemeral rules left by an unclean exit
//!
//! Lifecycle (manager.rs):
//!     Port emitted → stop old server → probe port → start new server → publish status
//!     Port busy / start failure → Failed, control plane shuts itself down
//!
//! Shutdown (shutdown.rs, signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger → stop server → clear ephemeral rules → Stopped
//! ```
//!
//! # Design Decisions
//! - One sequential task performs every start/stop; restarts never overlap
//! - The server slot is written only by the manager
//! - Lifecycle failures are fatal to the control plane, never to the host

pub mod manager;
pub mod shutdown;
pub mod signals;
pub mod startup;

pub use manager::{ControlPlane, LifecycleError, LifecycleManager, LifecycleState, StatusWatch};
pub use shutdown::Shutdown;
