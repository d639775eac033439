//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware pipeline)
//!     → request.rs (request ID)
//!     → middleware/cors.rs (cross-origin headers)
//!     → middleware/error.rs (failure → ErrorEnvelope)
//!     → api handlers
//!     → response.rs (RpcError, envelope shapes)
//!     → Send to client
//! ```

pub mod middleware;
pub mod request;
pub mod response;
pub mod server;

pub use request::{RequestIdExt, X_REQUEST_ID};
pub use response::{ErrorEnvelope, RpcError, RpcJson, RpcOk};
pub use server::{HttpServer, ServerError, ServerHandle};
