//! RPC surface used by the inspector.
//!
//! | Route                      | Collaborator |
//! |----------------------------|--------------|
//! | `POST /api/getServerInfo`      | device info  |
//! | `POST /api/getSnapshot`        | capture store |
//! | `POST /api/getScreenshot`      | capture store |
//! | `POST /api/captureSnapshot`    | capture store |
//! | `POST /api/getSnapshots`       | capture store |
//! | `POST /api/updateSubscription` | rule store   |
//! | `POST /api/execSelector`       | engine       |

pub mod handlers;
pub mod types;

use axum::{
    routing::{get, post},
    Router,
};

use crate::agent::Collaborators;
use crate::config::SharedConfig;
use self::handlers::*;

/// Fixed prefix of every RPC route.
pub const API_PREFIX: &str = "/api";

/// State injected into handlers.
#[derive(Clone)]
pub struct ApiState {
    pub agent: Collaborators,
    pub config: SharedConfig,
}

pub fn setup_api_router(state: ApiState) -> Router {
    let rpc = Router::new()
        .route("/getServerInfo", post(get_server_info))
        .route("/getSnapshot", post(get_snapshot))
        .route("/getScreenshot", post(get_screenshot))
        .route("/captureSnapshot", post(capture_snapshot))
        .route("/getSnapshots", post(get_snapshots))
        .route("/updateSubscription", post(update_subscription))
        .route("/execSelector", post(exec_selector))
        .method_not_allowed_fallback(wrong_method);

    Router::new()
        .route("/", get(bootstrap_page))
        .nest(API_PREFIX, rpc)
        .fallback(unknown_route)
        .method_not_allowed_fallback(wrong_method)
        .with_state(state)
}
