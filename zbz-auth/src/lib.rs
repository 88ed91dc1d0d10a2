//! OAuth redirect flow and token validation (C10, §4.6).
//!
//! This crate owns the browser-facing half of authentication: the
//! `/auth/login` → `/auth/callback` → `/auth/logout` redirect dance, a
//! replace-never-mutate token cache, and [`TokenValidator`], the
//! [`zbz_core::http::AuthDriver`] the HTTP kernel validates bearer cookies
//! against.
//!
//! The actual authorization-server conversation — the identity provider
//! itself — is external, reached through the [`OAuthProvider`] trait.
//! [`InMemoryOAuthProvider`] is the reference implementation used in tests.

pub mod error;
pub mod provider;
pub mod routes;
pub mod token;
pub mod validator;

pub use error::AuthError;
pub use provider::{BoxFuture, InMemoryOAuthProvider, OAuthProvider};
pub use routes::install;
pub use token::{AuthToken, AuthUser};
pub use validator::TokenValidator;

/// Re-exports of the most commonly used auth types.
pub mod prelude {
    pub use crate::{install, AuthError, AuthToken, AuthUser, BoxFuture, InMemoryOAuthProvider, OAuthProvider, TokenValidator};
}
