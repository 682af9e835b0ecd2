//! HTTP error responses.

use std::any::Any;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use stockdata::DataError;
use thiserror::Error;
use tracing::error;

/// Body of every 500 response. Upstream details never reach the client.
pub const INTERNAL_ERROR_MESSAGE: &str = "An internal error occurred";

/// Errors surfaced by request handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Failure from the data layer.
    #[error(transparent)]
    Data(#[from] DataError),
    /// The symbol path segment is not valid UTF-8 once decoded.
    #[error("Invalid symbol: {0}")]
    InvalidSymbol(String),
    /// No route matched the request.
    #[error("Not found")]
    NotFound,
}

/// Result alias for request handlers.
pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    let body = Json(ErrorBody {
        error: message.into(),
    });
    (status, body).into_response()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::Data(err) if err.is_validation() => {
                error_response(StatusCode::BAD_REQUEST, err.to_string())
            }
            Self::Data(err) => {
                error!(error = ?err, "Request failed");
                error_response(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_MESSAGE)
            }
            Self::InvalidSymbol(_) => error_response(StatusCode::BAD_REQUEST, self.to_string()),
            Self::NotFound => error_response(StatusCode::NOT_FOUND, self.to_string()),
        }
    }
}

/// Converts a handler panic into the generic 500 response.
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic payload");
    error!(panic = detail, "Handler panicked");

    error_response(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_MESSAGE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_validation_error_is_bad_request() {
        let response = ApiError::from(DataError::InvalidPeriod("2w".into())).into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body(response).await, r#"{"error":"Invalid period: 2w"}"#);
    }

    #[tokio::test]
    async fn test_invalid_symbol_is_bad_request() {
        let response = ApiError::InvalidSymbol("\u{FFFD}".into()).into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body(response).await, "{\"error\":\"Invalid symbol: \u{FFFD}\"}");
    }

    #[tokio::test]
    async fn test_internal_error_hides_details() {
        let response =
            ApiError::from(DataError::Upstream("token=secret".into())).into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body(response).await;
        assert_eq!(body, r#"{"error":"An internal error occurred"}"#);
        assert!(!body.contains("secret"));
    }

    #[tokio::test]
    async fn test_panic_payloads() {
        let owned = panic_response(Box::new(String::from("owned secret")));
        let borrowed = panic_response(Box::new("static secret"));
        let other = panic_response(Box::new(42_u8));

        for response in [owned, borrowed, other] {
            assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
            assert!(!body(response).await.contains("secret"));
        }
    }
}
