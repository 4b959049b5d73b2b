//! API error types and JSON error response formatting.
//!
//! Every failure leaves the server as a JSON `{error, message}` body.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

/// JSON error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Machine-readable error code (e.g., "bad_request").
    pub error: String,
    /// Human-readable error message.
    pub message: String,
}

/// API error type that maps to HTTP status codes and JSON responses.
#[derive(Debug)]
pub enum ApiError {
    /// 400 Bad Request - empty query or text, or an unreadable JSON body.
    BadRequest(String),
    /// 500 Internal Server Error - missing configuration.
    Configuration(String),
    /// 500 Internal Server Error - anything else.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            ApiError::Configuration(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "configuration_error", msg)
            }
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg),
        };

        let body = ErrorBody {
            error: error_code.to_string(),
            message,
        };

        (status, Json(body)).into_response()
    }
}

impl From<sift_core::Error> for ApiError {
    fn from(err: sift_core::Error) -> Self {
        match err {
            sift_core::Error::InvalidInput(msg) => ApiError::BadRequest(msg),
            sift_core::Error::Config(msg) => ApiError::Configuration(msg),
            other => {
                tracing::error!(error = %other, "request failed");
                ApiError::Internal(other.to_string())
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (sift_core::Error::invalid_input("Query cannot be empty."), StatusCode::BAD_REQUEST),
            (sift_core::Error::config("GEMINI_API_KEY not found"), StatusCode::INTERNAL_SERVER_ERROR),
            (sift_core::Error::operation("boom"), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).into_response().status(), status);
        }
    }

    #[test]
    fn test_invalid_input_keeps_message() {
        match ApiError::from(sift_core::Error::invalid_input("Query cannot be empty.")) {
            ApiError::BadRequest(msg) => assert_eq!(msg, "Query cannot be empty."),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_json_rejection_is_bad_request() {
        use axum::extract::FromRequest;

        let request = axum::http::Request::post("/search")
            .header("content-type", "application/json")
            .body(axum::body::Body::from("not json"))
            .unwrap();
        let rejection = Json::<serde_json::Value>::from_request(request, &())
            .await
            .unwrap_err();

        let response = ApiError::from(rejection).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
