//! Cross-cutting request filters.

pub mod cors;
pub mod error;

pub use cors::cors_layer;
pub use error::{panic_to_failure, translate_errors, INTERNAL_ERROR_MESSAGE};
