//! CORS for browser clients of the hook API

use axum::http::{HeaderValue, request::Parts};
use regex::Regex;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};

/// Allows origins matching `origins`, with credentials. Methods and headers
/// are mirrored from the preflight request, since wildcards are not allowed
/// together with credentials.
pub fn cors_layer(origins: Regex) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(
            move |origin: &HeaderValue, _parts: &Parts| {
                origin
                    .to_str()
                    .map(|origin| origins.is_match(origin))
                    .unwrap_or(false)
            },
        ))
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
}
