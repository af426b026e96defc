//! HTTP route handlers for the demo backend.
//!
//! Every response, errors and pre-flight included, carries permissive CORS
//! headers so the browser UI can call the API from its own origin. Verbs a
//! route does not support answer 405 through the shared `method_not_allowed`
//! fallback rather than axum's empty default.
//!
//! Request tracing is enabled via middleware that generates a unique request ID
//! for each incoming request, allowing correlation of all logs within a request.

pub mod crash;
pub mod health;
pub mod load;
pub mod parity;

use axum::{
    middleware,
    routing::{get, MethodRouter},
    Router,
};
use http::header::{
    HeaderName, HeaderValue, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN,
};
use tower_http::set_header::SetResponseHeaderLayer;

use crate::config::{CORS_ALLOW_HEADERS, CORS_ALLOW_METHODS, CORS_ALLOW_ORIGIN};
use crate::error::method_not_allowed;
use crate::middleware::{preflight_layer, request_span_layer};
use crate::state::AppState;

fn cors_header(name: HeaderName, value: &'static str) -> SetResponseHeaderLayer<HeaderValue> {
    SetResponseHeaderLayer::overriding(name, HeaderValue::from_static(value))
}

/// Query string as ordered pairs, repeated keys kept.
pub type QueryPairs = Vec<(String, String)>;

/// First value given for `key`, so `?number=4&number=5` reads as 4.
pub fn first_value<'a>(pairs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    pairs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

/// 405 for every verb the route does not register.
///
/// axum answers HEAD with the GET handler unless HEAD has its own endpoint, so
/// HEAD is pinned to 405 explicitly; otherwise `HEAD /crash-backend` would crash.
fn strict(route: MethodRouter<AppState>) -> MethodRouter<AppState> {
    route.head(method_not_allowed).fallback(method_not_allowed)
}

/// Creates the Axum router with all routes, CORS headers and request tracing.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/iseven", strict(get(parity::is_even)))
        .route(
            "/generate-load",
            strict(get(load::generate).post(load::generate_batch)),
        )
        .route("/crash-backend", strict(get(crash::crash).post(crash::crash)))
        // Health check - no state, answers until the process is gone
        .route("/healthz", strict(get(health::healthz)))
        .with_state(state)
        // Pre-flight sits inside the CORS layers so its 200 gets the headers too
        .layer(middleware::from_fn(preflight_layer))
        .layer(cors_header(ACCESS_CONTROL_ALLOW_ORIGIN, CORS_ALLOW_ORIGIN))
        .layer(cors_header(ACCESS_CONTROL_ALLOW_METHODS, CORS_ALLOW_METHODS))
        .layer(cors_header(ACCESS_CONTROL_ALLOW_HEADERS, CORS_ALLOW_HEADERS))
        // Request span middleware - outermost so the span covers everything
        .layer(middleware::from_fn(request_span_layer))
}
