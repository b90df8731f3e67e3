//! API middleware layer
//!
//! Provides middleware for request processing including CORS, logging, and validation.

pub mod cors;
pub mod logging;
pub mod validation;

pub use cors::{cors_layer, OriginPatterns};
pub use logging::logging_layer;
pub use validation::{json_body, validate_not_empty, validate_word_and_context};
