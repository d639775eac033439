//! Error translation boundary.
//!
//! Every route runs inside [`translate_errors`]. Handler responses pass
//! through untouched unless they carry a [`RaisedError`], in which case the
//! failure is rendered as an [`ErrorEnvelope`]. Panics are converted into a
//! raised failure by [`panic_to_failure`] before they reach this boundary.

use std::any::Any;

use axum::{
    extract::Request,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

use crate::http::request::RequestIdExt;
use crate::http::response::{ErrorEnvelope, RaisedError, RpcError};

/// Message sent for failures that are not user-facing.
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

pub async fn translate_errors(request: Request, next: Next) -> Response {
    let request_id = request.request_id().to_string();
    let path = request.uri().path().to_string();

    let mut response = next.run(request).await;
    let Some(RaisedError(err)) = response.extensions_mut().remove::<RaisedError>() else {
        return response;
    };

    let message = match err.as_ref() {
        RpcError::Domain(message) | RpcError::Unrouted { message, .. } => {
            tracing::debug!(request_id = %request_id, path = %path, message = %message, "Request rejected");
            message.clone()
        }
        RpcError::Internal(e) => {
            tracing::error!(request_id = %request_id, path = %path, error = ?e, "Request failed");
            INTERNAL_ERROR_MESSAGE.to_string()
        }
    };

    (err.status(), Json(ErrorEnvelope { message })).into_response()
}

/// Panic handler for `CatchPanicLayer`.
pub fn panic_to_failure(payload: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic payload".to_string()
    };
    RpcError::Internal(anyhow::anyhow!("handler panicked: {detail}")).into_response()
}
