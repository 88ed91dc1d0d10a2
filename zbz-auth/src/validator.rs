//! `TokenValidator` — the `AuthDriver` the HTTP kernel validates bearer
//! cookies against, backed by a replace-never-mutate token cache.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use zbz_core::http::{AuthDriver, Bag, AUTH_TOKEN_KEY, PERMISSIONS_KEY};

use crate::token::{AuthToken, AuthUser};

/// Caches every token this process has issued, keyed by its bearer value.
/// A re-issued or refreshed token replaces the cached `Arc` wholesale — it
/// never mutates the one callers already hold a clone of.
#[derive(Default)]
pub struct TokenValidator {
    cache: RwLock<HashMap<String, Arc<AuthToken>>>,
}

impl TokenValidator {
    pub fn new() -> Self {
        TokenValidator::default()
    }

    /// Cache a freshly issued token, replacing any prior entry under the
    /// same value (which in practice never happens — values are unique per
    /// exchange).
    pub fn cache_token(&self, token: AuthToken) {
        self.cache
            .write()
            .expect("token cache lock poisoned")
            .insert(token.value.clone(), Arc::new(token));
    }

    pub fn forget(&self, token_value: &str) {
        self.cache.write().expect("token cache lock poisoned").remove(token_value);
    }
}

impl AuthDriver for TokenValidator {
    fn validate(&self, token: &str, bag: &mut Bag) -> Result<(), String> {
        let cached = self.cache.read().expect("token cache lock poisoned").get(token).cloned();
        let Some(cached) = cached else {
            return Err("unknown token".to_string());
        };
        if cached.is_expired() {
            self.forget(token);
            return Err("token expired".to_string());
        }
        bag.set("user", AuthUser::from(cached.as_ref()));
        bag.set(PERMISSIONS_KEY, cached.permissions.clone());
        bag.set(AUTH_TOKEN_KEY, cached.value.clone());
        Ok(())
    }

    /// This crate's own login route, not the external provider's URL — the
    /// kernel redirects here, and the login handler redirects onward.
    ///
    /// `return_path` comes straight from the request path, so it's encoded
    /// as a query value rather than spliced in raw — an unescaped `&`/`#`
    /// would otherwise let a crafted path inject extra query parameters
    /// into this redirect.
    fn login_url(&self, return_path: &str) -> String {
        let encoded: String = form_urlencoded::byte_serialize(return_path.as_bytes()).collect();
        format!("/auth/login?return_url={encoded}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn token(value: &str, expires_in: Duration) -> AuthToken {
        AuthToken {
            value: value.to_string(),
            sub: "user-1".to_string(),
            email: "a@b.com".to_string(),
            name: "A B".to_string(),
            permissions: vec!["read".to_string()],
            expires_at: Utc::now() + expires_in,
        }
    }

    #[test]
    fn cached_token_validates_and_populates_bag() {
        let validator = TokenValidator::new();
        validator.cache_token(token("tok", Duration::hours(1)));
        let mut bag = Bag::default();
        validator.validate("tok", &mut bag).unwrap();
        assert_eq!(bag.get::<Vec<String>>(PERMISSIONS_KEY).unwrap(), &vec!["read".to_string()]);
        assert_eq!(bag.get::<String>(AUTH_TOKEN_KEY).unwrap(), "tok");
    }

    #[test]
    fn unknown_token_fails() {
        let validator = TokenValidator::new();
        let mut bag = Bag::default();
        assert!(validator.validate("ghost", &mut bag).is_err());
    }

    #[test]
    fn expired_token_fails_and_is_evicted() {
        let validator = TokenValidator::new();
        validator.cache_token(token("tok", Duration::seconds(-1)));
        let mut bag = Bag::default();
        assert!(validator.validate("tok", &mut bag).is_err());
        assert!(validator.validate("tok", &mut bag).is_err());
    }

    #[test]
    fn login_url_points_at_the_local_login_route() {
        let validator = TokenValidator::new();
        assert_eq!(validator.login_url("/dashboard"), "/auth/login?return_url=%2Fdashboard");
    }

    #[test]
    fn login_url_encodes_query_metacharacters_in_the_return_path() {
        let validator = TokenValidator::new();
        let url = validator.login_url("/dashboard?x=1&evil=2");
        assert_eq!(url, "/auth/login?return_url=%2Fdashboard%3Fx%3D1%26evil%3D2");
    }
}
