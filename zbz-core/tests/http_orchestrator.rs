use std::sync::Arc;

use zbz_core::http::{
    auth_middleware, error_tail, scope_middleware, testing::TestRequest, AuthDriver, AuthMode, Bag, HandlerContract,
    ParamInfo, ResponseInfo, RouteTable, StatusCode, PERMISSIONS_KEY,
};

async fn body_json(resp: http::Response<bytes::Bytes>) -> serde_json::Value {
    let body = resp.into_body();
    serde_json::from_slice(&body).unwrap()
}

fn contract(method: http::Method, path: &str) -> HandlerContract {
    HandlerContract {
        name: path.to_string(),
        description: String::new(),
        tag: "test".to_string(),
        method,
        path: path.to_string(),
        parameters: vec![ParamInfo {
            name: "id".to_string(),
            description: None,
            required: true,
        }],
        query: vec![],
        request_body: None,
        response: ResponseInfo {
            status: 200,
            type_ref: None,
            errors: vec![404],
        },
        auth: true,
        scope: None,
    }
}

struct FakeAuthDriver;

impl AuthDriver for FakeAuthDriver {
    fn validate(&self, token: &str, bag: &mut Bag) -> Result<(), String> {
        if token == "good" {
            bag.set(PERMISSIONS_KEY.to_string(), vec!["read:user".to_string()]);
            Ok(())
        } else {
            Err("bad token".to_string())
        }
    }

    fn login_url(&self, return_path: &str) -> String {
        format!("/auth/login?return_url={return_path}")
    }
}

#[tokio::test]
async fn route_without_params_dispatches_to_handler() {
    let mut table = RouteTable::new();
    let handler: zbz_core::http::HandlerFn = Arc::new(|mut ctx| {
        Box::pin(async move {
            ctx.json(StatusCode::OK, &serde_json::json!({"status": "healthy"}));
            ctx
        })
    });
    table.register_silent(http::Method::GET, "/health", handler, vec![]);

    let resp = TestRequest::get("/health").send(&table).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn path_params_are_extracted_and_passed_to_handler() {
    let mut table = RouteTable::new();
    let handler: zbz_core::http::HandlerFn = Arc::new(|mut ctx| {
        Box::pin(async move {
            let id = ctx.param("id").unwrap().to_string();
            ctx.json(StatusCode::OK, &serde_json::json!({"id": id}));
            ctx
        })
    });
    table.register(http::Method::GET, "/user/{id}", handler, vec![], contract(http::Method::GET, "/user/{id}"));

    let resp = TestRequest::get("/user/42").send(&table).await;
    let body = body_json(resp).await;
    assert_eq!(body["id"], "42");
}

#[tokio::test]
async fn unmatched_route_is_404() {
    let table = RouteTable::new();
    let resp = TestRequest::get("/nowhere").send(&table).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn auth_middleware_rejects_missing_token_on_require_auth() {
    let mut table = RouteTable::new();
    let handler: zbz_core::http::HandlerFn = Arc::new(|mut ctx| {
        Box::pin(async move {
            ctx.json(StatusCode::OK, &serde_json::json!({"ok": true}));
            ctx
        })
    });
    let driver = Arc::new(FakeAuthDriver) as Arc<dyn AuthDriver>;
    table.register(
        http::Method::GET,
        "/secret",
        handler,
        vec![auth_middleware(driver, AuthMode::RequireAuth), error_tail()],
        contract(http::Method::GET, "/secret"),
    );

    let resp = TestRequest::get("/secret").send(&table).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn auth_middleware_on_ensure_auth_redirects_to_login() {
    let mut table = RouteTable::new();
    let handler: zbz_core::http::HandlerFn = Arc::new(|mut ctx| {
        Box::pin(async move {
            ctx.json(StatusCode::OK, &serde_json::json!({"ok": true}));
            ctx
        })
    });
    let driver = Arc::new(FakeAuthDriver) as Arc<dyn AuthDriver>;
    table.register_silent(
        http::Method::GET,
        "/docs",
        handler,
        vec![auth_middleware(driver, AuthMode::EnsureAuth)],
    );

    let resp = TestRequest::get("/docs").send(&table).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    let location = resp.headers().get(http::header::LOCATION).unwrap().to_str().unwrap();
    assert!(location.starts_with("/auth/login"));
}

#[tokio::test]
async fn valid_token_passes_auth_and_scope_middleware() {
    let mut table = RouteTable::new();
    let handler: zbz_core::http::HandlerFn = Arc::new(|mut ctx| {
        Box::pin(async move {
            ctx.json(StatusCode::OK, &serde_json::json!({"ok": true}));
            ctx
        })
    });
    let driver = Arc::new(FakeAuthDriver) as Arc<dyn AuthDriver>;
    table.register(
        http::Method::GET,
        "/user/{id}",
        handler,
        vec![
            auth_middleware(driver, AuthMode::RequireAuth),
            scope_middleware("read:user"),
            error_tail(),
        ],
        contract(http::Method::GET, "/user/{id}"),
    );

    let resp = TestRequest::get("/user/1").cookie("auth_token", "good").send(&table).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn scope_middleware_rejects_caller_missing_required_permission() {
    let mut table = RouteTable::new();
    let handler: zbz_core::http::HandlerFn = Arc::new(|mut ctx| {
        Box::pin(async move {
            ctx.json(StatusCode::OK, &serde_json::json!({"ok": true}));
            ctx
        })
    });
    let driver = Arc::new(FakeAuthDriver) as Arc<dyn AuthDriver>;
    table.register(
        http::Method::DELETE,
        "/user/{id}",
        handler,
        vec![
            auth_middleware(driver, AuthMode::RequireAuth),
            scope_middleware("write:admin"),
        ],
        contract(http::Method::DELETE, "/user/{id}"),
    );

    let resp = TestRequest::delete("/user/1").cookie("auth_token", "good").send(&table).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn error_tail_converts_bag_error_message_into_json_envelope() {
    let mut table = RouteTable::new();
    let handler: zbz_core::http::HandlerFn = Arc::new(|mut ctx| {
        Box::pin(async move {
            ctx.set_error(StatusCode::CONFLICT, "duplicate id");
            ctx
        })
    });
    table.register(
        http::Method::POST,
        "/user",
        handler,
        vec![error_tail()],
        contract(http::Method::POST, "/user"),
    );

    let resp = TestRequest::post("/user").send(&table).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body = body_json(resp).await;
    assert_eq!(body["message"], "duplicate id");
}

#[tokio::test]
async fn documented_routes_exclude_silent_registrations() {
    let mut table = RouteTable::new();
    let handler: zbz_core::http::HandlerFn = Arc::new(|ctx| Box::pin(async move { ctx }));
    table.register_silent(http::Method::GET, "/health", handler.clone(), vec![]);
    table.register(http::Method::GET, "/user/{id}", handler, vec![], contract(http::Method::GET, "/user/{id}"));

    let docs = table.documented();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].path, "/user/{id}");
}
