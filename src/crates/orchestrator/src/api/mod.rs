//! REST API Layer for the LexiLens service
//!
//! Provides HTTP endpoints for:
//! - Streaming word analysis over server-sent events
//! - Lazily loaded common mistakes and lexical map text
//! - Lexical map illustrations and pronunciation lookups (TTL cached)
//! - Interest topic summarization

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod sse;

pub use error::{ApiError, ApiErrorResponse, ApiResult};
pub use middleware::cors_layer;
pub use routes::{build_app, create_router, AppState, ImageCache};
