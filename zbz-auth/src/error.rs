//! Failure modes owned by this crate: the OAuth redirect dance and the
//! token cache, as distinct from `zbz_core::http::AuthDriver`'s plain
//! `Result<(), String>` validation contract.

#[derive(Debug)]
pub enum AuthError {
    /// The `state` query parameter didn't match the `auth_state` cookie, or
    /// the cookie was missing entirely.
    StateMismatch,
    /// The provider rejected the authorization code, or the exchange call
    /// itself failed.
    Exchange(String),
    /// A cached token was found but has expired.
    TokenExpired,
    /// No cached token under this value.
    UnknownToken,
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::StateMismatch => write!(f, "OAuth state mismatch"),
            AuthError::Exchange(msg) => write!(f, "OAuth code exchange failed: {msg}"),
            AuthError::TokenExpired => write!(f, "token expired"),
            AuthError::UnknownToken => write!(f, "unknown token"),
        }
    }
}

impl std::error::Error for AuthError {}

impl From<AuthError> for zbz_core::AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::StateMismatch | AuthError::TokenExpired | AuthError::UnknownToken => {
                zbz_core::AppError::Unauthorized(err.to_string())
            }
            AuthError::Exchange(_) => zbz_core::AppError::Upstream(err.to_string()),
        }
    }
}
