//! Middleware chain construction (component C9, §4.6).
//!
//! A chain is decorated once at route-registration time into a single
//! boxed closure: `[global…, auth?, scope?, error-tail, handler]`. There is
//! no per-request re-composition.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use super::request::RequestContext;
use super::response::StatusCode;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A terminal or intermediate step in the chain: takes the context, returns
/// the context (possibly with a response attached).
pub type HandlerFn = Arc<dyn Fn(RequestContext) -> BoxFuture<'static, RequestContext> + Send + Sync>;

/// One link in the middleware chain.
///
/// `call` receives the next link already bound; it decides whether, and
/// with what context, to invoke it.
pub trait Middleware: Send + Sync + 'static {
    fn call(&self, ctx: RequestContext, next: HandlerFn) -> BoxFuture<'static, RequestContext>;
}

impl<F> Middleware for F
where
    F: Fn(RequestContext, HandlerFn) -> BoxFuture<'static, RequestContext> + Send + Sync + 'static,
{
    fn call(&self, ctx: RequestContext, next: HandlerFn) -> BoxFuture<'static, RequestContext> {
        (self)(ctx, next)
    }
}

/// Fold a handler and its middleware stack into one callable chain.
///
/// `layers` is given outermost-first (the order they should run in); the
/// fold builds from the handler outward so the first layer wraps everything.
pub fn decorate(handler: HandlerFn, layers: Vec<Arc<dyn Middleware>>) -> HandlerFn {
    layers.into_iter().rev().fold(handler, |next, mw| {
        let mw = mw.clone();
        Arc::new(move |ctx: RequestContext| {
            let mw = mw.clone();
            let next = next.clone();
            Box::pin(async move { mw.call(ctx, next).await }) as BoxFuture<'static, RequestContext>
        }) as HandlerFn
    })
}

/// Validates a raw bearer/cookie token and, on success, populates the bag.
///
/// Implemented by the auth orchestrator (component C10); the HTTP kernel
/// only knows the contract, never a concrete token format.
pub trait AuthDriver: Send + Sync + 'static {
    /// Validate `token`, writing `user`/`permissions`/`auth_token` into the
    /// bag on success. Returns `Err(message)` on an invalid or expired token.
    fn validate(&self, token: &str, bag: &mut crate::http::request::Bag) -> Result<(), String>;

    /// The URL to redirect an unauthenticated caller to for interactive login.
    fn login_url(&self, return_path: &str) -> String;
}

/// Bag key under which the auth middleware stores the validated permission
/// set (`Vec<String>`), read back by [`scope_middleware`].
pub const PERMISSIONS_KEY: &str = "permissions";
pub const AUTH_TOKEN_KEY: &str = "auth_token";

/// Whether an endpoint tolerates anonymous callers by redirecting to login
/// (`EnsureAuth`) or must hard-fail with 401 (`RequireAuth`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    RequireAuth,
    EnsureAuth,
}

/// Builds the auth middleware layer for a given driver and mode (§4.6).
pub fn auth_middleware(driver: Arc<dyn AuthDriver>, mode: AuthMode) -> Arc<dyn Middleware> {
    Arc::new(move |mut ctx: RequestContext, next: HandlerFn| {
        let driver = driver.clone();
        Box::pin(async move {
            let token = ctx.cookie(AUTH_TOKEN_KEY).map(str::to_string);
            match token.as_deref().map(|t| driver.validate(t, ctx.bag_mut())) {
                Some(Ok(())) => next(ctx).await,
                _ => match mode {
                    AuthMode::RequireAuth => {
                        ctx.set_error(StatusCode::UNAUTHORIZED, "authentication required");
                        ctx.json(
                            StatusCode::UNAUTHORIZED,
                            &serde_json::json!({ "message": "authentication required", "code": "unauthorized" }),
                        );
                        ctx
                    }
                    AuthMode::EnsureAuth => {
                        let login = driver.login_url(ctx.path());
                        ctx.redirect(login);
                        ctx
                    }
                },
            }
        }) as BoxFuture<'static, RequestContext>
    })
}

/// Builds the scope middleware for one required permission string (§4.6).
pub fn scope_middleware(required: impl Into<String>) -> Arc<dyn Middleware> {
    let required = required.into();
    Arc::new(move |mut ctx: RequestContext, next: HandlerFn| {
        let required = required.clone();
        Box::pin(async move {
            let granted = ctx
                .bag()
                .get::<Vec<String>>(PERMISSIONS_KEY)
                .map(|perms| perms.iter().any(|p| p == &required))
                .unwrap_or(false);
            if granted {
                next(ctx).await
            } else {
                ctx.json(
                    StatusCode::FORBIDDEN,
                    &serde_json::json!({ "message": format!("missing scope: {required}"), "code": "forbidden" }),
                );
                ctx
            }
        }) as BoxFuture<'static, RequestContext>
    })
}

/// The innermost layer before the handler: after the handler runs, inspects
/// `error_message`/`error_status` in the bag and, if set, overwrites the
/// response with a standard JSON error envelope (§4.6).
pub fn error_tail() -> Arc<dyn Middleware> {
    Arc::new(move |ctx: RequestContext, next: HandlerFn| {
        Box::pin(async move {
            let mut ctx = next(ctx).await;
            if let Some((status, message)) = ctx.take_error() {
                ctx.json(
                    status,
                    &serde_json::json!({ "message": message, "code": status.as_u16().to_string() }),
                );
            }
            ctx
        }) as BoxFuture<'static, RequestContext>
    })
}
