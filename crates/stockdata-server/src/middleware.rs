//! Request middleware.

use std::time::Instant;

use axum::{
    extract::Request,
    http::{HeaderValue, header::CACHE_CONTROL},
    middleware::Next,
    response::Response,
};
use tracing::info;

/// `Cache-Control` for success responses whose handler set none.
pub const DEFAULT_CACHE_CONTROL: &str = "public, max-age=60";

/// Logs method, path, status and elapsed time of every request.
pub async fn log_requests(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;

    let duration_ms = start.elapsed().as_secs_f64() * 1000.0;
    info!(
        %method,
        %path,
        status = response.status().as_u16(),
        duration_ms,
        "Request completed"
    );

    response
}

/// Adds [`DEFAULT_CACHE_CONTROL`] to success responses without one.
pub async fn default_cache_control(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;

    if response.status().is_success() && !response.headers().contains_key(CACHE_CONTROL) {
        response.headers_mut().insert(
            CACHE_CONTROL,
            HeaderValue::from_static(DEFAULT_CACHE_CONTROL),
        );
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        Router,
        body::Body,
        http::StatusCode,
        middleware,
        response::IntoResponse,
        routing::get,
    };
    use tower::ServiceExt;

    fn app() -> Router {
        Router::new()
            .route("/plain", get(|| async { "OK" }))
            .route(
                "/tagged",
                get(|| async { ([(CACHE_CONTROL, "public, max-age=300")], "OK") }),
            )
            .route(
                "/failing",
                get(|| async { StatusCode::INTERNAL_SERVER_ERROR.into_response() }),
            )
            .layer(middleware::from_fn(default_cache_control))
            .layer(middleware::from_fn(log_requests))
    }

    async fn cache_control(uri: &str) -> Option<String> {
        let response = app()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        response
            .headers()
            .get(CACHE_CONTROL)
            .map(|v| v.to_str().unwrap().to_string())
    }

    #[tokio::test]
    async fn test_default_added_when_missing() {
        assert_eq!(
            cache_control("/plain").await.as_deref(),
            Some(DEFAULT_CACHE_CONTROL)
        );
    }

    #[tokio::test]
    async fn test_handler_value_kept() {
        assert_eq!(
            cache_control("/tagged").await.as_deref(),
            Some("public, max-age=300")
        );
    }

    #[tokio::test]
    async fn test_errors_not_tagged() {
        assert_eq!(cache_control("/failing").await, None);
    }
}
