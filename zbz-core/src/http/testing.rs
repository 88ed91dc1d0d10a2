//! An in-process reference driver used by tests and by any caller that
//! wants to exercise the route table without a real network listener.
//!
//! Concrete drivers (axum, hyper, ...) are out of scope; this is the
//! minimal adapter needed to prove the orchestrator works end to end.

use bytes::Bytes;
use http::{HeaderMap, Method};

use super::request::RequestContext;
use super::response::Response;
use super::route::{handle, RouteTable};

/// A single in-process call against a [`RouteTable`].
pub struct TestRequest {
    method: Method,
    path: String,
    query: String,
    headers: HeaderMap,
    body: Bytes,
}

impl TestRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        TestRequest {
            method,
            path: path.into(),
            query: String::new(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn query(mut self, query: impl Into<String>) -> Self {
        self.query = query.into();
        self
    }

    pub fn header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        if let Ok(v) = http::HeaderValue::from_str(&value.into()) {
            self.headers.insert(name, v);
        }
        self
    }

    pub fn cookie(self, name: &str, value: &str) -> Self {
        self.header("cookie", format!("{name}={value}"))
    }

    pub fn json_body<T: serde::Serialize>(mut self, value: &T) -> Self {
        self.body = Bytes::from(serde_json::to_vec(value).expect("serializable test body"));
        self.headers
            .insert(http::header::CONTENT_TYPE, http::HeaderValue::from_static("application/json"));
        self
    }

    pub async fn send(self, table: &RouteTable) -> Response {
        let ctx = RequestContext::new(self.method, self.path, self.headers, self.body).with_query(&self.query);
        handle(table, ctx).await.finish()
    }
}
