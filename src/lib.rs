//! Local HTTP control plane for an on-device automation agent.

pub mod agent;
pub mod api;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;

pub use config::schema::ControlPlaneConfig;
pub use http::HttpServer;
pub use lifecycle::{ControlPlane, Shutdown};
