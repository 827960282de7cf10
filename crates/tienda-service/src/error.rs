//! API error types and responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Unauthorized - missing or invalid credentials.
    #[error("unauthorized")]
    Unauthorized,

    /// Forbidden - valid credentials but insufficient role.
    #[error("forbidden")]
    Forbidden,

    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Bad request - the operation cannot proceed (no active cart, empty cart).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Validation failure - input shape or values are invalid.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Insufficient stock to check out a cart line.
    #[error("insufficient stock for {product}: available={available}, requested={requested}")]
    InsufficientStock {
        /// Product short on stock.
        product: String,
        /// Units currently available.
        available: i32,
        /// Units requested by the cart.
        requested: i32,
    },

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// JSON error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match &self {
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                self.to_string(),
                None,
            ),
            Self::Forbidden => (StatusCode::FORBIDDEN, "forbidden", self.to_string(), None),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone(), None),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone(), None),
            Self::Validation(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "validation_failed",
                msg.clone(),
                None,
            ),
            Self::InsufficientStock {
                product,
                available,
                requested,
            } => (
                StatusCode::CONFLICT,
                "insufficient_stock",
                self.to_string(),
                Some(serde_json::json!({
                    "product": product,
                    "available": available,
                    "requested": requested
                })),
            ),
            Self::Internal(msg) => {
                tracing::error!(error = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<tienda_store::StoreError> for ApiError {
    fn from(err: tienda_store::StoreError) -> Self {
        match err {
            tienda_store::StoreError::NotFound { entity, id } => {
                Self::NotFound(format!("{entity} not found: {id}"))
            }
            tienda_store::StoreError::NoActiveCart => Self::BadRequest("no active cart".into()),
            tienda_store::StoreError::EmptyCart => Self::BadRequest("cart is empty".into()),
            tienda_store::StoreError::InsufficientStock {
                product,
                available,
                requested,
            } => Self::InsufficientStock {
                product,
                available,
                requested,
            },
            tienda_store::StoreError::Database(msg) => Self::Internal(msg),
        }
    }
}
