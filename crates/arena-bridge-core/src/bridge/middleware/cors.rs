// CORS middleware
use axum::http::Method;
use tower_http::cors::{Any, CorsLayer};

/// CORS layer for the public API.
///
/// Chat front-ends usually run in a browser on another origin, so any origin
/// is accepted. Credentials are never allowed; auth uses a bearer header.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
        .allow_credentials(false)
        .max_age(std::time::Duration::from_secs(3600))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cors_layer_creation() {
        let _layer = cors_layer();
    }
}
