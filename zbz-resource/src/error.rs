//! `ResourceError` — the CRUD pipeline's error boundary, converted into
//! [`zbz_core::AppError`] at the handler edge so the kernel's existing
//! status/envelope mapping (§7) does the actual HTTP translation.

use zbz_core::validation::ValidationErrorResponse;
use zbz_core::AppError;

#[derive(Debug)]
pub enum ResourceError {
    NotFound(String),
    BadRequest(String),
    Forbidden(String),
    Validation(ValidationErrorResponse),
    Data(zbz_data::DataError),
}

impl std::fmt::Display for ResourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceError::NotFound(msg) => write!(f, "not found: {msg}"),
            ResourceError::BadRequest(msg) => write!(f, "bad request: {msg}"),
            ResourceError::Forbidden(msg) => write!(f, "forbidden: {msg}"),
            ResourceError::Validation(resp) => write!(f, "validation failed: {} fields", resp.fields.len()),
            ResourceError::Data(err) => write!(f, "data error: {err}"),
        }
    }
}

impl std::error::Error for ResourceError {}

impl From<zbz_data::DataError> for ResourceError {
    fn from(err: zbz_data::DataError) -> Self {
        ResourceError::Data(err)
    }
}

/// Hand-written rather than `map_error!` — `ResourceError` carries several
/// variants that map to different `AppError` variants, the same reasoning
/// `AuthError`'s conversion follows.
impl From<ResourceError> for AppError {
    fn from(err: ResourceError) -> Self {
        match err {
            ResourceError::NotFound(msg) => AppError::NotFound(msg),
            ResourceError::BadRequest(msg) => AppError::BadRequest(msg),
            ResourceError::Forbidden(msg) => AppError::Forbidden(msg),
            ResourceError::Validation(resp) => AppError::Validation(resp),
            ResourceError::Data(err) => AppError::Internal(err.to_string()),
        }
    }
}
