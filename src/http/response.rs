//! Failure types raised by route handlers and the wire shapes they render to.
//!
//! # Responsibilities
//! - Classify failures as domain (client error) or unexpected (server error)
//! - Carry a raised failure out of a handler to the error middleware
//! - Define the uniform `{ "message": ... }` envelope
//!
//! # Design Decisions
//! - `RpcError::into_response` only tags the response; rendering happens in
//!   `middleware::error`, so handlers never know the envelope shape
//! - Collaborator errors are classified by downcasting to `Rejected`

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, StringRejection};
use axum::extract::FromRequest;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use crate::agent::Rejected;

/// A failure raised while handling a request.
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    /// Expected, user-facing condition.
    #[error("{0}")]
    Domain(String),
    /// Request never reached a handler (unknown route, wrong method).
    #[error("{message}")]
    Unrouted { status: StatusCode, message: String },
    /// Anything else.
    #[error(transparent)]
    Internal(anyhow::Error),
}

impl RpcError {
    pub fn domain(message: impl Into<String>) -> Self {
        RpcError::Domain(message.into())
    }

    /// Status this failure is reported with.
    pub fn status(&self) -> StatusCode {
        match self {
            RpcError::Domain(_) => StatusCode::BAD_REQUEST,
            RpcError::Unrouted { status, .. } => *status,
            RpcError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<anyhow::Error> for RpcError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<Rejected>() {
            Ok(rejected) => RpcError::Domain(rejected.0),
            Err(err) => RpcError::Internal(err),
        }
    }
}

impl From<Rejected> for RpcError {
    fn from(rejected: Rejected) -> Self {
        RpcError::Domain(rejected.0)
    }
}

impl From<JsonRejection> for RpcError {
    fn from(rejection: JsonRejection) -> Self {
        RpcError::Domain(rejection.body_text())
    }
}

impl From<StringRejection> for RpcError {
    fn from(rejection: StringRejection) -> Self {
        RpcError::Domain(rejection.body_text())
    }
}

/// Response extension carrying a failure to the error middleware.
#[derive(Debug, Clone)]
pub struct RaisedError(pub Arc<RpcError>);

impl IntoResponse for RpcError {
    fn into_response(self) -> Response {
        let mut response = self.status().into_response();
        response.extensions_mut().insert(RaisedError(Arc::new(self)));
        response
    }
}

/// Uniform error body.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ErrorEnvelope {
    pub message: String,
}

/// Success acknowledgement with an optional message.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct RpcOk {
    pub message: Option<String>,
}

/// JSON request body whose rejections surface as domain failures.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(RpcError))]
pub struct RpcJson<T>(pub T);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejected_becomes_domain() {
        let err: RpcError = anyhow::Error::from(Rejected::new("nope")).into();
        assert!(matches!(&err, RpcError::Domain(m) if m == "nope"));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_other_errors_are_internal() {
        let err: RpcError = anyhow::anyhow!("disk on fire").into();
        assert!(matches!(err, RpcError::Internal(_)));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_into_response_tags_failure() {
        let response = RpcError::domain("missing").into_response();
        let raised = response.extensions().get::<RaisedError>().unwrap();
        assert_eq!(raised.0.to_string(), "missing");
    }

    #[test]
    fn test_unrouted_keeps_status() {
        let err = RpcError::Unrouted {
            status: StatusCode::METHOD_NOT_ALLOWED,
            message: "method not allowed".into(),
        };
        assert_eq!(err.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(err.to_string(), "method not allowed");
    }

    #[test]
    fn test_rpc_ok_serializes_null() {
        assert_eq!(
            serde_json::to_string(&RpcOk::default()).unwrap(),
            r#"{"message":null}"#
        );
    }
}
