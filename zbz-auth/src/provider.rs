//! `OAuthProvider` — the external driver seam. This crate owns the
//! redirect dance and the token cache; a concrete provider (Google, an
//! in-house IdP, ...) owns the actual authorization server conversation.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::RwLock;

use crate::error::AuthError;
use crate::token::AuthToken;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// An external OAuth authorization server this crate redirects to and
/// exchanges codes against. Never speaks cookies or HTTP status codes —
/// that's [`crate::routes`]'s job.
pub trait OAuthProvider: Send + Sync + 'static {
    /// The URL to send the browser to, with `state` embedded so the
    /// callback can verify it wasn't forged.
    fn login_url(&self, state: &str) -> String;

    /// Exchange an authorization code for a token.
    fn exchange<'a>(&'a self, code: &'a str) -> BoxFuture<'a, Result<AuthToken, AuthError>>;
}

/// In-memory reference provider. Codes are pre-registered with the token
/// they should resolve to, simulating a successful authorization-server
/// round trip without a network call.
#[derive(Default)]
pub struct InMemoryOAuthProvider {
    authorize_url: String,
    codes: RwLock<HashMap<String, AuthToken>>,
}

impl InMemoryOAuthProvider {
    pub fn new(authorize_url: impl Into<String>) -> Self {
        InMemoryOAuthProvider {
            authorize_url: authorize_url.into(),
            codes: RwLock::new(HashMap::new()),
        }
    }

    pub fn register_code(&self, code: impl Into<String>, token: AuthToken) {
        self.codes.write().expect("code cache lock poisoned").insert(code.into(), token);
    }
}

impl OAuthProvider for InMemoryOAuthProvider {
    fn login_url(&self, state: &str) -> String {
        format!("{}?state={state}", self.authorize_url)
    }

    fn exchange<'a>(&'a self, code: &'a str) -> BoxFuture<'a, Result<AuthToken, AuthError>> {
        Box::pin(async move {
            self.codes
                .read()
                .expect("code cache lock poisoned")
                .get(code)
                .cloned()
                .ok_or_else(|| AuthError::Exchange(format!("unknown authorization code '{code}'")))
        })
    }
}
