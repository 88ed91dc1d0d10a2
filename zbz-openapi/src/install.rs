//! Wires the generated spec and docs page into a [`RouteTable`] as the two
//! silent `/openapi` and `/docs` routes from the system HTTP surface.

use std::sync::Arc;

use bytes::Bytes;
use zbz_core::http::{auth_middleware, AuthDriver, AuthMode, HandlerFn, Method, RequestContext, RouteTable, StatusCode};

use crate::builder::{build_spec, OpenApiConfig};
use crate::docs::{docs_html, to_yaml};
use crate::schema::SchemaRegistry;

const OPENAPI_PATH: &str = "/openapi";
const DOCS_PATH: &str = "/docs";

/// Register `/openapi` (YAML spec) and `/docs` (a static landing page)
/// against `table`. Both routes are auth-gated with [`AuthMode::EnsureAuth`]
/// when `auth` is given, so a visiting browser gets redirected to sign in
/// rather than receiving a bare 401.
pub fn install(table: &mut RouteTable, config: OpenApiConfig, registry: &SchemaRegistry, auth: Option<Arc<dyn AuthDriver>>) {
    let yaml = {
        let contracts = table.documented();
        let spec = build_spec(&config, &contracts, registry);
        to_yaml(&spec).expect("generated openapi spec always serializes to yaml")
    };
    let html = docs_html(OPENAPI_PATH);

    let layers = match auth {
        Some(driver) => vec![auth_middleware(driver, AuthMode::EnsureAuth)],
        None => vec![],
    };

    table.register_silent(Method::GET, OPENAPI_PATH, openapi_handler(yaml), layers.clone());
    table.register_silent(Method::GET, DOCS_PATH, docs_handler(html), layers);
}

fn openapi_handler(yaml: String) -> HandlerFn {
    Arc::new(move |mut ctx: RequestContext| {
        let yaml = yaml.clone();
        Box::pin(async move {
            ctx.data(StatusCode::OK, "application/yaml", Bytes::from(yaml));
            ctx
        })
    })
}

fn docs_handler(html: String) -> HandlerFn {
    Arc::new(move |mut ctx: RequestContext| {
        let html = html.clone();
        Box::pin(async move {
            ctx.html(StatusCode::OK, html);
            ctx
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use zbz_core::http::testing::TestRequest;
    use zbz_core::http::{Bag, HandlerContract, ParamInfo, ResponseInfo};

    fn documented_table() -> RouteTable {
        let mut table = RouteTable::new();
        table.register(
            Method::GET,
            "/widgets",
            Arc::new(|mut ctx: RequestContext| {
                Box::pin(async move {
                    ctx.json(StatusCode::OK, &serde_json::json!([]));
                    ctx
                })
            }),
            vec![],
            HandlerContract {
                name: "list_widgets".to_string(),
                description: "List widgets".to_string(),
                tag: "Widgets".to_string(),
                method: Method::GET,
                path: "/widgets".to_string(),
                parameters: vec![],
                query: vec![ParamInfo { name: "page".to_string(), description: None, required: false }],
                request_body: None,
                response: ResponseInfo { status: 200, type_ref: None, errors: vec![] },
                auth: false,
                scope: None,
            },
        );
        table
    }

    #[tokio::test]
    async fn openapi_route_serves_yaml() {
        let mut table = documented_table();
        install(&mut table, OpenApiConfig::new("Test API", "1.0.0"), &SchemaRegistry::new(), None);

        let resp = TestRequest::get("/openapi").send(&table).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = String::from_utf8(resp.body().to_vec()).unwrap();
        let spec: serde_json::Value = serde_yaml::from_str(&body).unwrap();
        assert_eq!(spec["paths"]["/widgets"]["get"]["operationId"], "list_widgets");
    }

    #[tokio::test]
    async fn docs_route_serves_html_pointing_at_openapi() {
        let mut table = documented_table();
        install(&mut table, OpenApiConfig::new("Test API", "1.0.0"), &SchemaRegistry::new(), None);

        let resp = TestRequest::get("/docs").send(&table).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = String::from_utf8(resp.body().to_vec()).unwrap();
        assert!(body.contains("/openapi"));
    }

    #[tokio::test]
    async fn neither_route_appears_in_its_own_documented_list() {
        let mut table = documented_table();
        install(&mut table, OpenApiConfig::new("Test API", "1.0.0"), &SchemaRegistry::new(), None);
        assert_eq!(table.documented().len(), 1);
    }

    struct RejectAuth;
    impl AuthDriver for RejectAuth {
        fn validate(&self, _token: &str, _bag: &mut Bag) -> Result<(), String> {
            Err("no token".to_string())
        }
        fn login_url(&self, return_path: &str) -> String {
            format!("/auth/login?return_url={return_path}")
        }
    }

    #[tokio::test]
    async fn ensure_auth_mode_redirects_unauthenticated_visitors() {
        let mut table = documented_table();
        install(&mut table, OpenApiConfig::new("Test API", "1.0.0"), &SchemaRegistry::new(), Some(Arc::new(RejectAuth)));

        let resp = TestRequest::get("/docs").send(&table).await;
        assert_eq!(resp.status(), StatusCode::FOUND);
    }
}
