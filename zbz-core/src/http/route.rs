//! Route table and documentation attachment (component C9).

use std::collections::HashMap;
use std::sync::Arc;

use http::Method;

use super::middleware::{decorate, HandlerFn, Middleware};
use super::request::RequestContext;

/// One parameter (path or query) documented against a handler contract.
#[derive(Debug, Clone)]
pub struct ParamInfo {
    pub name: String,
    pub description: Option<String>,
    pub required: bool,
}

/// The declared response shape for a handler contract.
#[derive(Debug, Clone)]
pub struct ResponseInfo {
    pub status: u16,
    pub type_ref: Option<String>,
    pub errors: Vec<u16>,
}

/// Documentation metadata for one registered route (§3 `HandlerContract`).
///
/// The callable itself lives in the [`RouteEntry`]; this struct carries only
/// what the docs service (zbz-openapi) needs to describe it.
#[derive(Debug, Clone)]
pub struct HandlerContract {
    pub name: String,
    pub description: String,
    pub tag: String,
    pub method: Method,
    pub path: String,
    pub parameters: Vec<ParamInfo>,
    pub query: Vec<ParamInfo>,
    pub request_body: Option<String>,
    pub response: ResponseInfo,
    pub auth: bool,
    pub scope: Option<String>,
}

enum Segment {
    Literal(String),
    Param(String),
}

struct PathPattern {
    segments: Vec<Segment>,
}

impl PathPattern {
    fn parse(path: &str) -> Self {
        let segments = path
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| {
                if let Some(name) = s.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
                    Segment::Param(name.to_string())
                } else {
                    Segment::Literal(s.to_string())
                }
            })
            .collect();
        PathPattern { segments }
    }

    fn matches(&self, path: &str) -> Option<HashMap<String, String>> {
        let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        if parts.len() != self.segments.len() {
            return None;
        }
        let mut params = HashMap::new();
        for (segment, part) in self.segments.iter().zip(parts.iter()) {
            match segment {
                Segment::Literal(lit) if lit == part => {}
                Segment::Literal(_) => return None,
                Segment::Param(name) => {
                    params.insert(name.clone(), part.to_string());
                }
            }
        }
        Some(params)
    }
}

struct RouteEntry {
    method: Method,
    pattern: PathPattern,
    handler: HandlerFn,
    doc: Option<HandlerContract>,
}

/// The route table the orchestrator dispatches against.
///
/// Holds global middleware plus every registered route's fully-decorated
/// handler chain. Chains are built once, at registration time.
#[derive(Default)]
pub struct RouteTable {
    global: Vec<Arc<dyn Middleware>>,
    routes: Vec<RouteEntry>,
}

impl RouteTable {
    pub fn new() -> Self {
        RouteTable::default()
    }

    /// Add a middleware applied to every route registered after this call.
    pub fn use_middleware(&mut self, mw: Arc<dyn Middleware>) {
        self.global.push(mw);
    }

    /// Register a documented route, decorating the handler with the global
    /// chain plus any route-specific layers (auth, scope, error tail).
    pub fn register(
        &mut self,
        method: Method,
        path: impl Into<String>,
        handler: HandlerFn,
        layers: Vec<Arc<dyn Middleware>>,
        doc: HandlerContract,
    ) {
        self.push(method, path, handler, layers, Some(doc));
    }

    /// Register a route that never appears in generated documentation
    /// (health checks, docs UI, auth callbacks).
    pub fn register_silent(
        &mut self,
        method: Method,
        path: impl Into<String>,
        handler: HandlerFn,
        layers: Vec<Arc<dyn Middleware>>,
    ) {
        self.push(method, path, handler, layers, None);
    }

    fn push(
        &mut self,
        method: Method,
        path: impl Into<String>,
        handler: HandlerFn,
        layers: Vec<Arc<dyn Middleware>>,
        doc: Option<HandlerContract>,
    ) {
        let path = path.into();
        let mut chain_layers = self.global.clone();
        chain_layers.extend(layers);
        let decorated = decorate(handler, chain_layers);
        self.routes.push(RouteEntry {
            method,
            pattern: PathPattern::parse(&path),
            handler: decorated,
            doc,
        });
    }

    /// Find the decorated handler for a request, along with its path
    /// parameters, or `None` for a 404.
    pub fn dispatch(&self, method: &Method, path: &str) -> Option<(HandlerFn, HashMap<String, String>)> {
        self.routes.iter().find_map(|route| {
            if &route.method != method {
                return None;
            }
            route
                .pattern
                .matches(path)
                .map(|params| (route.handler.clone(), params))
        })
    }

    /// All documented routes, for the OpenAPI/doc emission pass.
    pub fn documented(&self) -> Vec<&HandlerContract> {
        self.routes.iter().filter_map(|r| r.doc.as_ref()).collect()
    }
}

/// Run a request through the table, attaching matched path params.
pub async fn handle(table: &RouteTable, mut ctx: RequestContext) -> RequestContext {
    let method = ctx.method().clone();
    match table.dispatch(&method, ctx.path()) {
        Some((handler, params)) => {
            ctx.set_path_params(params);
            handler(ctx).await
        }
        None => {
            ctx.json(
                super::response::StatusCode::NOT_FOUND,
                &serde_json::json!({ "message": "not found", "code": "not_found" }),
            );
            ctx
        }
    }
}
