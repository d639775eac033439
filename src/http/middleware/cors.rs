//! Cross-origin policy.
//!
//! The inspector is served from another origin, so every origin, method and
//! header is allowed. Preflight requests are answered by the layer itself.

use tower_http::cors::{Any, CorsLayer};

pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers(Any)
}
