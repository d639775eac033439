//! User-visible notifications.

use std::fmt;

/// A lifecycle event the user should see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// The control plane came up.
    Started,
    /// A server instance is listening; carries the status label.
    Listening { port: u16 },
    /// The requested port is taken.
    PortBusy { port: u16 },
    /// The server instance could not be started.
    StartFailed { port: u16, reason: String },
    /// The control plane went down.
    Stopped,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::Started => write!(f, "HTTP service started"),
            Notice::Listening { port } => write!(f, "HTTP service - {port}"),
            Notice::PortBusy { port } => {
                write!(f, "Port {port} is in use, pick another port and retry")
            }
            Notice::StartFailed { reason, .. } => write!(f, "HTTP service failed to start: {reason}"),
            Notice::Stopped => write!(f, "HTTP service stopped"),
        }
    }
}

/// Sink for user-visible notifications.
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Notifier that writes notices to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notice: Notice) {
        match &notice {
            Notice::PortBusy { .. } | Notice::StartFailed { .. } => {
                tracing::warn!(notice = %notice, "Notification")
            }
            _ => tracing::info!(notice = %notice, "Notification"),
        }
    }
}
