//! CORS middleware configuration
//!
//! Origins come from settings. An entry ending in `*` matches any origin with
//! that prefix, so `chrome-extension://*` admits every installed extension.

use axum::http::{request::Parts, HeaderValue};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};

/// Exact origins plus prefix wildcards.
#[derive(Debug, Clone, Default)]
pub struct OriginPatterns {
    exact: Vec<String>,
    prefixes: Vec<String>,
}

impl OriginPatterns {
    pub fn new<S: AsRef<str>>(origins: &[S]) -> Self {
        let mut patterns = Self::default();
        for origin in origins {
            let origin = origin.as_ref().trim();
            if origin.is_empty() {
                continue;
            }
            match origin.strip_suffix('*') {
                Some(prefix) => patterns.prefixes.push(prefix.to_string()),
                None => patterns.exact.push(origin.trim_end_matches('/').to_string()),
            }
        }
        patterns
    }

    pub fn matches(&self, origin: &str) -> bool {
        self.exact.iter().any(|o| o == origin)
            || self.prefixes.iter().any(|p| origin.starts_with(p.as_str()))
    }
}

/// Create the CORS layer for the configured origins
pub fn cors_layer<S: AsRef<str>>(allowed_origins: &[S]) -> CorsLayer {
    let patterns = OriginPatterns::new(allowed_origins);

    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(
            move |origin: &HeaderValue, _parts: &Parts| {
                origin.to_str().map(|o| patterns.matches(o)).unwrap_or(false)
            },
        ))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}
