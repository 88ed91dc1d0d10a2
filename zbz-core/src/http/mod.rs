//! Framework-neutral HTTP orchestrator (component C9, §4.6).
//!
//! Everything here is driver-agnostic: a `RequestContext` goes in, a
//! `Response` comes out. Concrete HTTP framework drivers (axum, hyper, ...)
//! are out of scope — [`testing`] is the one reference driver this crate
//! ships, used by this crate's own tests and by downstream crates' tests.

pub mod middleware;
pub mod request;
pub mod response;
pub mod route;
pub mod testing;

pub use middleware::{
    auth_middleware, decorate, error_tail, scope_middleware, AuthDriver, AuthMode, BoxFuture,
    HandlerFn, Middleware, AUTH_TOKEN_KEY, PERMISSIONS_KEY,
};
pub use request::{Bag, OutCookie, RequestContext};
pub use response::{Data, Html, IntoResponse, Json, Redirect, Response, StatusCode};
pub use route::{handle, HandlerContract, ParamInfo, ResponseInfo, RouteTable};

pub use http::Method;
