//! Framework-neutral response type and conversions.
//!
//! Concrete HTTP framework drivers (axum, hyper, ...) are out of scope; this
//! module only defines the shape a driver adapts to.

use bytes::Bytes;
use http::header::{CONTENT_TYPE, LOCATION};

pub use http::StatusCode;

/// A fully-built response: status, headers, and a materialized byte body.
///
/// Streaming bodies are left to concrete drivers — the orchestrator only
/// needs to hand a driver a status, a header set, and bytes.
pub type Response = http::Response<Bytes>;

/// Anything that can be converted into a final [`Response`].
///
/// Mirrors the conversion-trait shape used throughout the reference corpus
/// (axum's `IntoResponse`) without depending on any one HTTP framework.
pub trait IntoResponse {
    fn into_response(self) -> Response;
}

impl IntoResponse for Response {
    fn into_response(self) -> Response {
        self
    }
}

impl IntoResponse for StatusCode {
    fn into_response(self) -> Response {
        http::Response::builder()
            .status(self)
            .body(Bytes::new())
            .expect("status-only response is always valid")
    }
}

/// A JSON body, serialized on conversion to [`Response`].
pub struct Json<T>(pub T);

impl<T: serde::Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        match serde_json::to_vec(&self.0) {
            Ok(body) => http::Response::builder()
                .status(StatusCode::OK)
                .header(CONTENT_TYPE, "application/json")
                .body(Bytes::from(body))
                .expect("json response is always valid"),
            Err(err) => {
                let body = serde_json::json!({ "error": err.to_string() });
                let bytes = serde_json::to_vec(&body).unwrap_or_default();
                http::Response::builder()
                    .status(StatusCode::INTERNAL_SERVER_ERROR)
                    .header(CONTENT_TYPE, "application/json")
                    .body(Bytes::from(bytes))
                    .expect("fallback json response is always valid")
            }
        }
    }
}

impl<T: serde::Serialize> IntoResponse for (StatusCode, Json<T>) {
    fn into_response(self) -> Response {
        let (status, json) = self;
        let mut resp = json.into_response();
        *resp.status_mut() = status;
        resp
    }
}

/// A raw byte body with an explicit content type.
pub struct Data {
    pub status: StatusCode,
    pub content_type: &'static str,
    pub body: Bytes,
}

impl IntoResponse for Data {
    fn into_response(self) -> Response {
        http::Response::builder()
            .status(self.status)
            .header(CONTENT_TYPE, self.content_type)
            .body(self.body)
            .expect("data response is always valid")
    }
}

/// An HTML document body.
pub struct Html(pub StatusCode, pub String);

impl IntoResponse for Html {
    fn into_response(self) -> Response {
        http::Response::builder()
            .status(self.0)
            .header(CONTENT_TYPE, "text/html; charset=utf-8")
            .body(Bytes::from(self.1))
            .expect("html response is always valid")
    }
}

/// A redirect response (used by the auth flow and silent system routes).
pub struct Redirect {
    status: StatusCode,
    location: String,
}

impl Redirect {
    /// A `302 Found` redirect — the status every orchestrator redirect uses.
    pub fn to(location: impl Into<String>) -> Self {
        Redirect {
            status: StatusCode::FOUND,
            location: location.into(),
        }
    }
}

impl IntoResponse for Redirect {
    fn into_response(self) -> Response {
        http::Response::builder()
            .status(self.status)
            .header(LOCATION, self.location)
            .body(Bytes::new())
            .expect("redirect response is always valid")
    }
}
