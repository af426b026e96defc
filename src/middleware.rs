//! Request middleware: log correlation and CORS pre-flight.
//!
//! `request_span_layer` gives every request a UUID v4 and a tracing span so all
//! logs emitted while handling it (including the load worker's result line)
//! can be correlated. `preflight_layer` answers OPTIONS for any path before
//! routing takes place.

use std::time::Instant;

use axum::{
    body::Body,
    extract::Request,
    http::{Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::Instrument;
use uuid::Uuid;

/// Middleware that creates a request span tagged with a fresh request id.
///
/// Installed as the outermost layer so the span covers the pre-flight
/// short-circuit and the CORS header layers as well as the handlers.
pub async fn request_span_layer(request: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4();
    let span = tracing::info_span!(
        "request",
        request_id = %request_id,
        method = %request.method(),
        path = %request.uri().path(),
        duration_ms = tracing::field::Empty,
    );

    let start = Instant::now();

    async move {
        let response = next.run(request).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        tracing::Span::current().record("duration_ms", duration_ms);
        tracing::info!(
            status = response.status().as_u16(),
            duration_ms,
            "Request completed"
        );

        response
    }
    .instrument(span)
    .await
}

/// Answer every OPTIONS request with an empty 200.
///
/// Browsers only need the CORS headers on the pre-flight response; those are
/// added by the header layers wrapped around this one.
pub async fn preflight_layer(request: Request, next: Next) -> Response {
    if request.method() == Method::OPTIONS {
        tracing::debug!("Answering CORS pre-flight");
        return (StatusCode::OK, Body::empty()).into_response();
    }
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use axum::{middleware, routing::get, Router};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn app() -> Router {
        Router::new()
            .route("/only-get", get(|| async { "handled" }))
            .layer(middleware::from_fn(preflight_layer))
            .layer(middleware::from_fn(request_span_layer))
    }

    #[tokio::test]
    async fn options_short_circuits_with_empty_200() {
        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/only-get")
            .body(Body::empty())
            .unwrap();

        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn options_on_unknown_path_is_still_200() {
        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/nowhere")
            .body(Body::empty())
            .unwrap();

        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn other_methods_pass_through() {
        let request = Request::builder()
            .uri("/only-get")
            .body(Body::empty())
            .unwrap();

        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"handled");
    }
}
