//! The framework-neutral request/response context (component C9).

use std::any::Any;
use std::collections::HashMap;

use bytes::Bytes;
use http::{HeaderMap, Method};

use super::response::{Data, Html, IntoResponse, Json, Redirect, Response, StatusCode};

/// A cookie to be written on the outgoing response via `Set-Cookie`.
#[derive(Debug, Clone)]
pub struct OutCookie {
    pub name: String,
    pub value: String,
    pub http_only: bool,
    pub max_age_secs: Option<i64>,
    pub path: String,
}

impl OutCookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        OutCookie {
            name: name.into(),
            value: value.into(),
            http_only: true,
            max_age_secs: None,
            path: "/".to_string(),
        }
    }

    pub fn max_age(mut self, secs: i64) -> Self {
        self.max_age_secs = Some(secs);
        self
    }

    /// A cookie cleared by expiring it immediately.
    pub fn cleared(name: impl Into<String>) -> Self {
        OutCookie {
            name: name.into(),
            value: String::new(),
            http_only: true,
            max_age_secs: Some(0),
            path: "/".to_string(),
        }
    }

    fn header_value(&self) -> String {
        let mut out = format!("{}={}; Path={}", self.name, self.value, self.path);
        if self.http_only {
            out.push_str("; HttpOnly");
        }
        if let Some(age) = self.max_age_secs {
            out.push_str(&format!("; Max-Age={age}"));
        }
        out
    }
}

/// Type-erased key/value bag carried alongside a request.
///
/// Middleware stash typed values here (`user`, `permissions`, `auth_token`,
/// `error_message`) for downstream middleware and the handler to read back.
#[derive(Default)]
pub struct Bag {
    values: HashMap<String, Box<dyn Any + Send + Sync>>,
}

impl Bag {
    pub fn set<T: Any + Send + Sync>(&mut self, key: impl Into<String>, value: T) {
        self.values.insert(key.into(), Box::new(value));
    }

    pub fn get<T: Any + Send + Sync>(&self, key: &str) -> Option<&T> {
        self.values.get(key).and_then(|v| v.downcast_ref::<T>())
    }

    pub fn remove(&mut self, key: &str) {
        self.values.remove(key);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }
}

/// Framework-neutral request context passed through the middleware chain and
/// into the handler.
///
/// A concrete driver builds one of these from its native request type and,
/// after the chain runs, converts the accumulated response state back into
/// its native response type (`unwrap_native` returns what the driver handed
/// in, for drivers that need to fall back to native APIs).
pub struct RequestContext {
    method: Method,
    path: String,
    path_params: HashMap<String, String>,
    query_params: HashMap<String, String>,
    headers: HeaderMap,
    body: Bytes,
    cookies: HashMap<String, String>,
    out_cookies: Vec<OutCookie>,
    bag: Bag,
    native: Option<Box<dyn Any + Send + Sync>>,
    response: Option<Response>,
}

impl RequestContext {
    pub fn new(method: Method, path: impl Into<String>, headers: HeaderMap, body: Bytes) -> Self {
        let path = path.into();
        let cookies = parse_cookie_header(headers.get(http::header::COOKIE));
        RequestContext {
            method,
            path,
            path_params: HashMap::new(),
            query_params: HashMap::new(),
            headers,
            body,
            cookies,
            out_cookies: Vec::new(),
            bag: Bag::default(),
            native: None,
            response: None,
        }
    }

    pub fn with_query(mut self, query: &str) -> Self {
        self.query_params = form_urlencoded::parse(query.as_bytes())
            .into_owned()
            .collect();
        self
    }

    pub fn with_native<T: Any + Send + Sync>(mut self, native: T) -> Self {
        self.native = Some(Box::new(native));
        self
    }

    pub fn native<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.native.as_ref().and_then(|n| n.downcast_ref::<T>())
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn path_params(&self) -> &HashMap<String, String> {
        &self.path_params
    }

    pub fn set_path_params(&mut self, params: HashMap<String, String>) {
        self.path_params = params;
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.path_params.get(key).map(String::as_str)
    }

    pub fn query(&self, key: &str) -> Option<&str> {
        self.query_params.get(key).map(String::as_str)
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    pub fn set_cookie(&mut self, cookie: OutCookie) {
        self.out_cookies.push(cookie);
    }

    pub fn bag(&self) -> &Bag {
        &self.bag
    }

    pub fn bag_mut(&mut self) -> &mut Bag {
        &mut self.bag
    }

    /// The conventional error channel read by the error tail middleware.
    pub fn set_error(&mut self, status: StatusCode, message: impl Into<String>) {
        self.bag.set("error_message", message.into());
        self.bag.set("error_status", status);
    }

    pub fn take_error(&mut self) -> Option<(StatusCode, String)> {
        let status = self.bag.get::<StatusCode>("error_status").copied();
        let message = self.bag.get::<String>("error_message").cloned();
        match (status, message) {
            (Some(status), Some(message)) => {
                self.bag.remove("error_status");
                self.bag.remove("error_message");
                Some((status, message))
            }
            _ => None,
        }
    }

    pub fn json<T: serde::Serialize>(&mut self, status: StatusCode, value: &T) {
        self.response = Some((status, Json(value)).into_response());
    }

    pub fn data(&mut self, status: StatusCode, content_type: &'static str, body: Bytes) {
        self.response = Some(
            Data {
                status,
                content_type,
                body,
            }
            .into_response(),
        );
    }

    pub fn html(&mut self, status: StatusCode, body: impl Into<String>) {
        self.response = Some(Html(status, body.into()).into_response());
    }

    pub fn redirect(&mut self, location: impl Into<String>) {
        self.response = Some(Redirect::to(location).into_response());
    }

    pub fn set_status(&mut self, status: StatusCode) {
        match &mut self.response {
            Some(resp) => *resp.status_mut() = status,
            None => self.response = Some(status.into_response()),
        }
    }

    pub fn has_response(&self) -> bool {
        self.response.is_some()
    }

    /// Finalize into a driver-agnostic [`Response`], applying any cookies
    /// accumulated during the chain.
    pub fn finish(mut self) -> Response {
        let mut resp = self
            .response
            .take()
            .unwrap_or_else(|| StatusCode::NOT_FOUND.into_response());
        for cookie in &self.out_cookies {
            if let Ok(value) = http::HeaderValue::from_str(&cookie.header_value()) {
                resp.headers_mut().append(http::header::SET_COOKIE, value);
            }
        }
        resp
    }
}

fn parse_cookie_header(value: Option<&http::HeaderValue>) -> HashMap<String, String> {
    let mut map = HashMap::new();
    let Some(value) = value.and_then(|v| v.to_str().ok()) else {
        return map;
    };
    for part in value.split(';') {
        if let Some((k, v)) = part.trim().split_once('=') {
            map.insert(k.trim().to_string(), v.trim().to_string());
        }
    }
    map
}
