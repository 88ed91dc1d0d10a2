//! `AppError` — the kernel's error boundary type (§7).
//!
//! Service layers return `Result<_, AppError>`; the HTTP error tail maps
//! variants to status codes. Validation failures carry a full field-error
//! body and always reach 422.

use crate::http::{IntoResponse, Json, Response, StatusCode};
use crate::validation::ValidationErrorResponse;

pub enum AppError {
    /// A declared contract referenced an unknown driver, or a required
    /// startup resource was missing. Fatal at boot.
    Configuration(String),
    NotFound(String),
    Unauthorized(String),
    Forbidden(String),
    BadRequest(String),
    Conflict(String),
    /// A downstream driver or network call failed.
    Upstream(String),
    Internal(String),
    Validation(ValidationErrorResponse),
    Custom {
        status: StatusCode,
        body: serde_json::Value,
    },
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    let body = serde_json::json!({ "message": message.into(), "code": status.as_u16().to_string() });
    (status, Json(body)).into_response()
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Validation(resp) => {
                let body = serde_json::json!({
                    "message": "validation failed",
                    "code": "validation",
                    "fields": resp.fields,
                    "details": resp.details,
                });
                (StatusCode::UNPROCESSABLE_ENTITY, Json(body)).into_response()
            }
            AppError::Custom { status, body } => (status, Json(body)).into_response(),
            AppError::Configuration(msg) => error_response(StatusCode::INTERNAL_SERVER_ERROR, msg),
            AppError::NotFound(msg) => error_response(StatusCode::NOT_FOUND, msg),
            AppError::Unauthorized(msg) => error_response(StatusCode::UNAUTHORIZED, msg),
            AppError::Forbidden(msg) => error_response(StatusCode::FORBIDDEN, msg),
            AppError::BadRequest(msg) => error_response(StatusCode::BAD_REQUEST, msg),
            AppError::Conflict(msg) => error_response(StatusCode::CONFLICT, msg),
            AppError::Upstream(msg) => error_response(StatusCode::BAD_GATEWAY, msg),
            AppError::Internal(msg) => error_response(StatusCode::INTERNAL_SERVER_ERROR, msg),
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::Configuration(msg) => write!(f, "Configuration error: {msg}"),
            AppError::NotFound(msg) => write!(f, "Not Found: {msg}"),
            AppError::Unauthorized(msg) => write!(f, "Unauthorized: {msg}"),
            AppError::Forbidden(msg) => write!(f, "Forbidden: {msg}"),
            AppError::BadRequest(msg) => write!(f, "Bad Request: {msg}"),
            AppError::Conflict(msg) => write!(f, "Conflict: {msg}"),
            AppError::Upstream(msg) => write!(f, "Upstream error: {msg}"),
            AppError::Internal(msg) => write!(f, "Internal Error: {msg}"),
            AppError::Validation(resp) => write!(f, "Validation Error: {} fields", resp.fields.len()),
            AppError::Custom { status, body } => write!(f, "Custom Error ({status}): {body}"),
        }
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        <Self as std::fmt::Display>::fmt(self, f)
    }
}

impl std::error::Error for AppError {}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<crate::config::ConfigError> for AppError {
    fn from(err: crate::config::ConfigError) -> Self {
        AppError::Configuration(err.to_string())
    }
}

/// Generate `From<E> for AppError` implementations mapping error types to a
/// specific variant.
///
/// ```ignore
/// zbz_core::map_error! {
///     zbz_data::DataError => Internal,
///     std::io::Error => Internal,
/// }
/// ```
#[macro_export]
macro_rules! map_error {
    ( $( $err_ty:ty => $variant:ident ),* $(,)? ) => {
        $(
            impl From<$err_ty> for $crate::AppError {
                fn from(err: $err_ty) -> Self {
                    $crate::AppError::$variant(err.to_string())
                }
            }
        )*
    };
}
