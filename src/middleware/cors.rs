use tower_http::cors::{Any, CorsLayer};

/// Wide-open CORS; the API is token-authenticated, not cookie-authenticated.
pub fn permissive_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_methods(Any)
        .allow_headers(Any)
        .allow_origin(Any)
}
