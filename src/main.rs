//! Agent Control Plane
//!
//! Serves the inspector's RPC surface on the local network and restarts it
//! whenever the configured port changes.
//!
//! # Architecture Overview
//!
//! ```text
//!   control-plane.toml ──▶ ConfigWatcher ──▶ PortFeed
//!                                               │
//!                                               ▼
//!                                      ┌──────────────────┐
//!                                      │ LifecycleManager │  stop → probe → start
//!                                      └────────┬─────────┘
//!                                               │ owns one
//!                                               ▼
//!   Inspector ──HTTP──▶ request id → trace → CORS → error translation → /api handlers
//!                                                                          │
//!                                    ┌──────────┬───────────┬──────────────┼──────────┐
//!                                    ▼          ▼           ▼              ▼          ▼
//!                                 engine   capture store  rule store   device info  notifier
//! ```

use std::path::PathBuf;

use agent_control_plane::agent::{
    AutomationEngine, Collaborators, DetachedEngine, FsCaptureStore, HostDeviceInfo,
    MemoryRuleStore, TracingNotifier,
};
use agent_control_plane::config::{self, ConfigWatcher, ControlPlaneConfig, PortFeed};
use agent_control_plane::lifecycle::{signals, startup, ControlPlane, LifecycleState};
use agent_control_plane::observability::{init_logging, metrics};
use clap::Parser;
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Parser)]
#[command(name = "agent-control-plane")]
#[command(about = "Local HTTP control plane for the automation agent", long_about = None)]
struct Args {
    /// Configuration file; watched for changes when present.
    #[arg(short, long, default_value = "control-plane.toml")]
    config: PathBuf,

    /// Override the configured listen port.
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config_exists = args.config.exists();
    let mut initial = if config_exists {
        config::load_config(&args.config)?
    } else {
        ControlPlaneConfig::default()
    };
    if let Some(port) = args.port {
        initial.server.port = port;
    }

    init_logging(&initial.observability.log_level);
    tracing::info!("agent-control-plane v{} starting", env!("CARGO_PKG_VERSION"));
    if !config_exists {
        tracing::warn!(path = %args.config.display(), "Config file not found, using defaults");
    }

    if initial.observability.metrics_enabled {
        match initial.observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to install metrics exporter");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %initial.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    tracing::info!(
        port = initial.server.port,
        bind_host = %initial.server.bind_host,
        snapshot_dir = %initial.storage.snapshot_dir,
        "Configuration loaded"
    );

    let engine: Arc<dyn AutomationEngine> = Arc::new(DetachedEngine);
    let rules = Arc::new(MemoryRuleStore::open(&initial.storage.rules_file)?);
    let agent = Collaborators {
        engine: engine.clone(),
        captures: Arc::new(FsCaptureStore::new(&initial.storage.snapshot_dir, engine)),
        rules: rules.clone(),
        device: Arc::new(HostDeviceInfo),
        notifier: Arc::new(TracingNotifier),
    };

    let enabled = initial.server.enabled;
    let ports = PortFeed::new(initial.server.port);
    let shared = config::shared(initial);

    // Keep the watcher alive for the lifetime of the process.
    let _watcher = if config_exists {
        Some(ConfigWatcher::new(&args.config, shared.clone(), ports.clone()).run()?)
    } else {
        None
    };

    if !enabled {
        tracing::info!("Control plane disabled in configuration");
        let (_tx, running) = watch::channel(false);
        startup::clear_stale_ephemeral_rules(
            running,
            shared,
            rules.as_ref(),
            startup::STALE_CLEANUP_DELAY,
        )
        .await;
        return Ok(());
    }

    let plane = ControlPlane::start(agent, shared.clone(), &ports);
    let status = plane.status();

    let cleanup_rules = rules.clone();
    let cleanup_config = shared.clone();
    let running = status.running();
    tokio::spawn(async move {
        startup::clear_stale_ephemeral_rules(
            running,
            cleanup_config,
            cleanup_rules.as_ref(),
            startup::STALE_CLEANUP_DELAY,
        )
        .await;
    });

    let outcome = tokio::select! {
        _ = signals::wait_for_termination() => plane.stop().await,
        _ = status.wait_for(|s| matches!(s, LifecycleState::Failed { .. })) => plane.wait().await,
    };

    match outcome {
        Ok(()) => {
            tracing::info!("Shutdown complete");
            Ok(())
        }
        Err(e) => {
            tracing::error!(error = %e, "Control plane terminated");
            Err(e.into())
        }
    }
}
