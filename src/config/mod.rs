//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ControlPlaneConfig (validated, immutable)
//!     → shared via ArcSwap to all subsystems
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → atomic swap of Arc<ControlPlaneConfig>
//!     → port published on the PortFeed
//!     → lifecycle manager restarts the server
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Every port emission restarts the server, even an unchanged one

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{BootstrapConfig, ControlPlaneConfig, ObservabilityConfig, ServerConfig, StorageConfig};
pub use watcher::{shared, ConfigWatcher, PortFeed, PortSubscription, SharedConfig};
