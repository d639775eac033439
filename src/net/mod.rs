//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Port emitted by config
//!     → probe.rs (is the port free?)
//!     → listener.rs (bind host:port)
//!     → Hand off to HTTP layer
//!
//! Lifecycle start:
//!     → probe.rs (local LAN addresses, display only)
//! ```
//!
//! # Design Decisions
//! - Availability probe is advisory; bind failure is handled separately
//! - Probes never leave sockets open

pub mod listener;
pub mod probe;

pub use listener::{bind, ListenerError};
pub use probe::{is_port_available, local_network_addresses};
