use std::path::Path;

use axum::{
    body::Body,
    extract::{rejection::StringRejection, State},
    http::{header::CONTENT_TYPE, Method, StatusCode, Uri},
    response::{Html, IntoResponse, Response},
    Json,
};
use tokio_util::io::ReaderStream;

use crate::agent::engine::{ActionRequest, ActionResult, ENGINE_NOT_RUNNING};
use crate::agent::rules::{RawSubscription, SubsItem, EPHEMERAL_SUBSCRIPTION_ID};
use crate::agent::SnapshotDescriptor;
use crate::api::types::{ReqId, ServerInfo};
use crate::api::ApiState;
use crate::http::response::{RpcError, RpcJson, RpcOk};

pub const SNAPSHOT_MISSING: &str = "snapshot does not exist";
pub const SCREENSHOT_MISSING: &str = "screenshot does not exist";

pub async fn bootstrap_page(State(state): State<ApiState>) -> Html<String> {
    let config = state.config.load();
    Html(format!(
        "<script type='module' src='{}'></script>",
        config.bootstrap.script_url
    ))
}

pub async fn get_server_info(State(state): State<ApiState>) -> Json<ServerInfo> {
    Json(ServerInfo {
        device: state.agent.device.device(),
        agent_version: state.agent.device.agent(),
    })
}

pub async fn get_snapshot(
    State(state): State<ApiState>,
    RpcJson(req): RpcJson<ReqId>,
) -> Result<Response, RpcError> {
    let path = state.agent.captures.snapshot_file(req.id);
    stream_file(&path, "application/json", SNAPSHOT_MISSING).await
}

pub async fn get_screenshot(
    State(state): State<ApiState>,
    RpcJson(req): RpcJson<ReqId>,
) -> Result<Response, RpcError> {
    let path = state.agent.captures.screenshot_file(req.id);
    stream_file(&path, "image/png", SCREENSHOT_MISSING).await
}

pub async fn capture_snapshot(
    State(state): State<ApiState>,
) -> Result<Json<SnapshotDescriptor>, RpcError> {
    Ok(Json(state.agent.captures.capture().await?))
}

pub async fn get_snapshots(State(state): State<ApiState>) -> Json<Vec<SnapshotDescriptor>> {
    Json(state.agent.captures.list().await)
}

pub async fn update_subscription(
    State(state): State<ApiState>,
    body: Result<String, StringRejection>,
) -> Result<Json<RpcOk>, RpcError> {
    let text = body?;
    let subscription = RawSubscription::parse(&text)
        .map_err(|e| RpcError::domain(e.to_string()))?
        .pin_ephemeral_identity();

    let rules = &state.agent.rules;
    rules.upsert_subscription(subscription).await?;
    let item = SubsItem::ephemeral(
        rules.item(EPHEMERAL_SUBSCRIPTION_ID),
        chrono::Utc::now().timestamp_millis(),
    );
    rules.upsert_item(item).await?;

    tracing::info!(bytes = text.len(), "Ephemeral subscription updated");
    Ok(Json(RpcOk::default()))
}

pub async fn exec_selector(
    State(state): State<ApiState>,
    body: Result<RpcJson<ActionRequest>, RpcError>,
) -> Result<Json<ActionResult>, RpcError> {
    if !state.agent.engine.is_running() {
        return Err(RpcError::domain(ENGINE_NOT_RUNNING));
    }
    let RpcJson(action) = body?;
    tracing::debug!(selector = %action.selector, action = ?action.action, "Executing action");
    Ok(Json(state.agent.engine.exec_action(action).await?))
}

pub async fn unknown_route(method: Method, uri: Uri) -> RpcError {
    RpcError::Unrouted {
        status: StatusCode::NOT_FOUND,
        message: format!("no route for {method} {}", uri.path()),
    }
}

pub async fn wrong_method(method: Method, uri: Uri) -> RpcError {
    RpcError::Unrouted {
        status: StatusCode::METHOD_NOT_ALLOWED,
        message: format!("{method} is not allowed on {}", uri.path()),
    }
}

async fn stream_file(
    path: &Path,
    content_type: &'static str,
    missing: &'static str,
) -> Result<Response, RpcError> {
    let file = match tokio::fs::File::open(path).await {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(RpcError::domain(missing));
        }
        Err(e) => {
            return Err(anyhow::Error::from(e)
                .context(format!("opening {}", path.display()))
                .into());
        }
    };
    let body = Body::from_stream(ReaderStream::new(file));
    Ok(([(CONTENT_TYPE, content_type)], body).into_response())
}
