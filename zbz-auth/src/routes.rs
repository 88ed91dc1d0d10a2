//! The three silent `/auth/*` routes: the login redirect, the provider
//! callback, and logout. Registered the same way the kernel's own
//! `/health`/`/openapi`/`/docs` routes are — undocumented, no auth layer of
//! their own.

use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;
use zbz_core::http::{HandlerFn, Method, OutCookie, RequestContext, RouteTable, StatusCode, AUTH_TOKEN_KEY};

use crate::provider::OAuthProvider;
use crate::validator::TokenValidator;

const STATE_COOKIE: &str = "auth_state";
const RETURN_URL_COOKIE: &str = "return_url";
const STATE_TTL_SECS: i64 = 300;
const TOKEN_TTL_SECS: i64 = 86_400;

/// Register `/auth/login`, `/auth/callback`, and `/auth/logout` against
/// `table`.
pub fn install(table: &mut RouteTable, provider: Arc<dyn OAuthProvider>, validator: Arc<TokenValidator>) {
    table.register_silent(Method::GET, "/auth/login", login_handler(provider.clone()), vec![]);
    table.register_silent(Method::GET, "/auth/callback", callback_handler(provider, validator.clone()), vec![]);
    table.register_silent(Method::GET, "/auth/logout", logout_handler(validator), vec![]);
}

fn login_handler(provider: Arc<dyn OAuthProvider>) -> HandlerFn {
    Arc::new(move |mut ctx: RequestContext| {
        let provider = provider.clone();
        Box::pin(async move {
            let return_url = ctx.query("return_url").unwrap_or("/").to_string();
            let state = generate_state();
            ctx.set_cookie(OutCookie::new(STATE_COOKIE, state.clone()).max_age(STATE_TTL_SECS));
            ctx.set_cookie(OutCookie::new(RETURN_URL_COOKIE, return_url).max_age(STATE_TTL_SECS));
            ctx.redirect(provider.login_url(&state));
            ctx
        })
    })
}

fn callback_handler(provider: Arc<dyn OAuthProvider>, validator: Arc<TokenValidator>) -> HandlerFn {
    Arc::new(move |mut ctx: RequestContext| {
        let provider = provider.clone();
        let validator = validator.clone();
        Box::pin(async move {
            let expected_state = ctx.cookie(STATE_COOKIE).map(str::to_string);
            let given_state = ctx.query("state").map(str::to_string);
            if expected_state.is_none() || expected_state != given_state {
                ctx.json(
                    StatusCode::UNAUTHORIZED,
                    &serde_json::json!({ "message": "invalid or missing OAuth state", "code": "unauthorized" }),
                );
                return ctx;
            }

            let Some(code) = ctx.query("code").map(str::to_string) else {
                ctx.json(
                    StatusCode::BAD_REQUEST,
                    &serde_json::json!({ "message": "missing 'code' parameter", "code": "bad_request" }),
                );
                return ctx;
            };
            let return_url = ctx.cookie(RETURN_URL_COOKIE).map(str::to_string).unwrap_or_else(|| "/".to_string());

            match provider.exchange(&code).await {
                Ok(token) => {
                    let value = token.value.clone();
                    validator.cache_token(token);
                    ctx.set_cookie(OutCookie::new(AUTH_TOKEN_KEY, value).max_age(TOKEN_TTL_SECS));
                    ctx.set_cookie(OutCookie::cleared(STATE_COOKIE));
                    ctx.set_cookie(OutCookie::cleared(RETURN_URL_COOKIE));
                    ctx.redirect(return_url);
                }
                Err(err) => {
                    tracing::warn!(error = %err, "oauth code exchange failed");
                    ctx.json(
                        StatusCode::UNAUTHORIZED,
                        &serde_json::json!({ "message": "authentication failed", "code": "unauthorized" }),
                    );
                }
            }
            ctx
        })
    })
}

fn logout_handler(validator: Arc<TokenValidator>) -> HandlerFn {
    Arc::new(move |mut ctx: RequestContext| {
        let validator = validator.clone();
        Box::pin(async move {
            if let Some(token) = ctx.cookie(AUTH_TOKEN_KEY) {
                validator.forget(token);
            }
            ctx.set_cookie(OutCookie::cleared(AUTH_TOKEN_KEY));
            ctx.redirect("/");
            ctx
        })
    })
}

fn generate_state() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::InMemoryOAuthProvider;
    use crate::token::AuthToken;
    use chrono::{Duration, Utc};
    use zbz_core::http::testing::TestRequest;

    fn token() -> AuthToken {
        AuthToken {
            value: "tok-1".to_string(),
            sub: "user-1".to_string(),
            email: "a@b.com".to_string(),
            name: "A B".to_string(),
            permissions: vec!["read".to_string()],
            expires_at: Utc::now() + Duration::hours(1),
        }
    }

    fn table() -> (RouteTable, Arc<InMemoryOAuthProvider>, Arc<TokenValidator>) {
        let provider = Arc::new(InMemoryOAuthProvider::new("https://idp.example/authorize"));
        let validator = Arc::new(TokenValidator::new());
        let mut table = RouteTable::new();
        install(&mut table, provider.clone(), validator.clone());
        (table, provider, validator)
    }

    #[tokio::test]
    async fn login_redirects_and_sets_state_cookies() {
        let (table, _provider, _validator) = table();
        let resp = TestRequest::get("/auth/login").query("return_url=/x").send(&table).await;
        assert_eq!(resp.status(), StatusCode::FOUND);
        let location = resp.headers().get(http::header::LOCATION).unwrap().to_str().unwrap();
        assert!(location.starts_with("https://idp.example/authorize?state="));

        let set_cookies: Vec<_> = resp
            .headers()
            .get_all(http::header::SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect();
        assert!(set_cookies.iter().any(|c| c.starts_with("auth_state=")));
        assert!(set_cookies.iter().any(|c| c.starts_with("return_url=/x")));
    }

    #[tokio::test]
    async fn callback_exchanges_code_and_redirects_to_return_url() {
        let (table, provider, validator) = table();
        provider.register_code("code-1", token());

        let login_resp = TestRequest::get("/auth/login").query("return_url=/dashboard").send(&table).await;
        let state = extract_cookie(&login_resp, "auth_state").unwrap();

        let resp = TestRequest::get("/auth/callback")
            .query(format!("state={state}&code=code-1"))
            .cookie("auth_state", &state)
            .cookie("return_url", "/dashboard")
            .send(&table)
            .await;

        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(resp.headers().get(http::header::LOCATION).unwrap(), "/dashboard");
        assert!(validator.validate("tok-1", &mut zbz_core::http::Bag::default()).is_ok());
    }

    #[tokio::test]
    async fn callback_with_mismatched_state_is_rejected() {
        let (table, provider, _validator) = table();
        provider.register_code("code-1", token());

        let resp = TestRequest::get("/auth/callback")
            .query("state=wrong&code=code-1")
            .cookie("auth_state", "right")
            .send(&table)
            .await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn logout_clears_the_token_and_forgets_it() {
        let (table, _provider, validator) = table();
        validator.cache_token(token());

        let resp = TestRequest::get("/auth/logout").cookie("auth_token", "tok-1").send(&table).await;
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(resp.headers().get(http::header::LOCATION).unwrap(), "/");
        assert!(validator.validate("tok-1", &mut zbz_core::http::Bag::default()).is_err());
    }

    fn extract_cookie(resp: &zbz_core::http::Response, name: &str) -> Option<String> {
        resp.headers().get_all(http::header::SET_COOKIE).iter().find_map(|v| {
            let s = v.to_str().ok()?;
            let prefix = format!("{name}=");
            s.starts_with(&prefix).then(|| s[prefix.len()..].split(';').next().unwrap().to_string())
        })
    }
}
