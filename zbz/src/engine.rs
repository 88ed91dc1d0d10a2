//! The [`Engine`] lifecycle: Register → Attach → Inject → Prime → Start.
//!
//! Each stage is a consuming method so the lifecycle can only run forward —
//! there is no axum coupling or compile-time bean graph here, just a plain
//! struct that accumulates what it needs and hands back a finished
//! [`RouteTable`] a caller wires into whatever HTTP server they like.
//!
//! * **Register** — `Engine::register(config)` opens the lifecycle.
//! * **Attach** — `with_*` methods plug in the database, auth driver, hook
//!   bus and OpenAPI config; `attach::<T>()` adds one model's CRUD resource.
//! * **Inject** — `inject()` prepares every attached resource's SQL
//!   contracts against the database.
//! * **Prime** — `prime()` registers the system routes (`/health`, and,
//!   with the `resource` feature, each resource's CRUD routes plus
//!   `/openapi`/`/docs`).
//! * **Start** — `start()` installs the tracing subscriber and the
//!   logger-to-hook-bus bridge, then returns the finished `RouteTable`.

use std::fmt;
use std::sync::Arc;

use zbz_core::config::ZbzConfig;
use zbz_core::http::{AuthDriver, Method, RequestContext, RouteTable, StatusCode};

#[cfg(feature = "hooks")]
use zbz_hooks::HookBus;

#[cfg(feature = "resource")]
use std::future::Future;
#[cfg(feature = "resource")]
use std::pin::Pin;
#[cfg(feature = "resource")]
use zbz_core::catalog::Described;
#[cfg(feature = "resource")]
use zbz_data::Database;
#[cfg(feature = "resource")]
use zbz_openapi::{OpenApiConfig, SchemaRegistry};
#[cfg(feature = "resource")]
use zbz_resource::{register_meta_schema, Core, ResourceError};

#[derive(Debug)]
pub enum EngineError {
    /// A resource was attached, or `prime()` was called on one, before
    /// `with_auth` supplied a driver — every CRUD route requires auth.
    MissingAuthDriver,
    #[cfg(feature = "resource")]
    MissingDatabase,
    #[cfg(feature = "resource")]
    Resource(ResourceError),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::MissingAuthDriver => write!(f, "no auth driver registered via with_auth"),
            #[cfg(feature = "resource")]
            EngineError::MissingDatabase => write!(f, "no database registered via with_database"),
            #[cfg(feature = "resource")]
            EngineError::Resource(err) => write!(f, "resource error: {err}"),
        }
    }
}

impl std::error::Error for EngineError {}

#[cfg(feature = "resource")]
impl From<ResourceError> for EngineError {
    fn from(err: ResourceError) -> Self {
        EngineError::Resource(err)
    }
}

#[cfg(feature = "resource")]
trait AttachedResource: Send + Sync {
    fn inject<'a>(&'a self) -> Pin<Box<dyn Future<Output = Result<(), ResourceError>> + Send + 'a>>;
    fn register(&self, table: &mut RouteTable, auth: Arc<dyn AuthDriver>);
}

#[cfg(feature = "resource")]
impl<T: Described + 'static> AttachedResource for Core<T> {
    fn inject<'a>(&'a self) -> Pin<Box<dyn Future<Output = Result<(), ResourceError>> + Send + 'a>> {
        Box::pin(Core::inject(self))
    }

    fn register(&self, table: &mut RouteTable, auth: Arc<dyn AuthDriver>) {
        Core::register(self, table, auth)
    }
}

/// Owns the boot-time wiring of a `zbz` application and produces a
/// `RouteTable` ready to be served. See the module docs for the five stages.
pub struct Engine {
    config: ZbzConfig,
    table: RouteTable,
    auth: Option<Arc<dyn AuthDriver>>,
    #[cfg(feature = "hooks")]
    hooks: Option<HookBus>,
    #[cfg(feature = "resource")]
    db: Option<Arc<dyn Database>>,
    #[cfg(feature = "resource")]
    schema: SchemaRegistry,
    #[cfg(feature = "resource")]
    resources: Vec<Box<dyn AttachedResource>>,
    #[cfg(feature = "resource")]
    openapi: OpenApiConfig,
}

impl Engine {
    /// Stage 1 — Register. Opens the lifecycle with the resolved
    /// application configuration.
    pub fn register(config: ZbzConfig) -> Self {
        Engine {
            config,
            table: RouteTable::new(),
            auth: None,
            #[cfg(feature = "hooks")]
            hooks: None,
            #[cfg(feature = "resource")]
            db: None,
            #[cfg(feature = "resource")]
            schema: SchemaRegistry::new(),
            #[cfg(feature = "resource")]
            resources: Vec::new(),
            #[cfg(feature = "resource")]
            openapi: OpenApiConfig::new("zbz application", "0.1.0"),
        }
    }

    pub fn with_auth(mut self, driver: Arc<dyn AuthDriver>) -> Self {
        self.auth = Some(driver);
        self
    }

    #[cfg(feature = "hooks")]
    pub fn with_hooks(mut self, hooks: HookBus) -> Self {
        self.hooks = Some(hooks);
        self
    }

    #[cfg(feature = "resource")]
    pub fn with_database(mut self, db: Arc<dyn Database>) -> Self {
        self.db = Some(db);
        self
    }

    #[cfg(feature = "resource")]
    pub fn with_openapi(mut self, config: OpenApiConfig) -> Self {
        self.openapi = config;
        self
    }

    /// Stage 2 — Attach. Builds `T`'s CRUD resource from its reflected
    /// catalog metadata and registers its OpenAPI schema, deferring table
    /// creation and route registration to `inject`/`prime`.
    #[cfg(feature = "resource")]
    pub fn attach<T: Described + 'static>(mut self) -> Result<Self, EngineError> {
        let db = self.db.clone().ok_or(EngineError::MissingDatabase)?;
        let core = Core::<T>::new(db).map_err(EngineError::from)?;
        register_meta_schema(&mut self.schema, core.meta());
        self.resources.push(Box::new(core));
        Ok(self)
    }

    /// Stage 3 — Inject. Prepares every attached resource's SQL contracts
    /// against the database and creates its table.
    #[cfg(feature = "resource")]
    pub async fn inject(self) -> Result<Self, EngineError> {
        for resource in &self.resources {
            resource.inject().await.map_err(EngineError::from)?;
        }
        Ok(self)
    }

    /// Stage 4 — Prime. Registers the system `/health` route plus, with
    /// attached resources, their CRUD routes and the `/openapi`/`/docs`
    /// pair built from the schemas `attach` collected.
    pub fn prime(mut self) -> Result<Self, EngineError> {
        self.table.register_silent(Method::GET, "/health", health_handler(), vec![]);

        #[cfg(feature = "resource")]
        {
            if !self.resources.is_empty() {
                let auth = self.auth.clone().ok_or(EngineError::MissingAuthDriver)?;
                for resource in &self.resources {
                    resource.register(&mut self.table, auth.clone());
                }
            }
            zbz_openapi::install(&mut self.table, self.openapi.clone(), &self.schema, self.auth.clone());
        }

        Ok(self)
    }

    /// Stage 5 — Start. Installs the tracing subscriber (JSON layer when
    /// `log.json` is set in config) and, with the `hooks` feature, bridges
    /// every log entry onto the hook bus as a `LogEntryCreated` event. Hands
    /// back the finished route table for a caller's server of choice.
    pub fn start(self) -> RouteTable {
        let json = self.config.get_or("log.json", false);
        zbz_core::log::init_tracing(json);

        #[cfg(feature = "hooks")]
        if let Some(hooks) = self.hooks {
            zbz_core::log::add_sink(Arc::new(zbz_hooks::LogEntrySink::new(hooks)));
        }

        self.table
    }
}

fn health_handler() -> zbz_core::http::HandlerFn {
    Arc::new(move |mut ctx: RequestContext| {
        Box::pin(async move {
            ctx.json(
                StatusCode::OK,
                &serde_json::json!({
                    "status": "healthy",
                    "message": "The service is running smoothly.",
                }),
            );
            ctx
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use zbz_core::catalog;
    use zbz_core::catalog::raw::{RawField, RawMeta};
    use zbz_core::catalog::BaseModel;
    use zbz_core::http::testing::TestRequest;
    use zbz_data::InMemoryDatabase;

    struct Widget {
        #[allow(dead_code)]
        base: BaseModel,
        #[allow(dead_code)]
        name: String,
    }

    impl Described for Widget {
        fn raw_meta() -> RawMeta {
            RawMeta {
                type_name: "Widget",
                description: "A widget",
                has_base: true,
                fields: vec![RawField {
                    rust_name: "name",
                    rust_type: "String",
                    is_option: false,
                    json: Some("name"),
                    db: Some("name"),
                    desc: None,
                    example: None,
                    validate: Some("required"),
                    scope: None,
                    encrypt: None,
                    encrypt_algo: None,
                    residency: None,
                    redact: None,
                    edit: None,
                }],
            }
        }
    }

    struct AllowAll;
    impl AuthDriver for AllowAll {
        fn validate(&self, _token: &str, bag: &mut zbz_core::http::Bag) -> Result<(), String> {
            bag.set(zbz_core::http::PERMISSIONS_KEY, vec!["admin".to_string()]);
            Ok(())
        }
        fn login_url(&self, return_path: &str) -> String {
            format!("/auth/login?return_url={return_path}")
        }
    }

    #[tokio::test]
    async fn health_route_requires_no_auth() {
        let engine = Engine::register(ZbzConfig::empty());
        let table = engine.prime().unwrap().start();
        let resp = TestRequest::get("/health").send(&table).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: serde_json::Value = serde_json::from_slice(resp.body()).unwrap();
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["message"], "The service is running smoothly.");
    }

    #[tokio::test]
    async fn attach_without_database_fails() {
        catalog::reset();
        let engine = Engine::register(ZbzConfig::empty()).with_auth(Arc::new(AllowAll));
        let result = engine.attach::<Widget>();
        assert!(matches!(result, Err(EngineError::MissingDatabase)));
    }

    #[tokio::test]
    async fn full_lifecycle_registers_crud_and_system_routes() {
        catalog::reset();
        let db: Arc<dyn Database> = Arc::new(InMemoryDatabase::new());
        let engine = Engine::register(ZbzConfig::empty())
            .with_auth(Arc::new(AllowAll))
            .with_database(db);

        let engine = engine.attach::<Widget>().unwrap();
        let engine = engine.inject().await.unwrap();
        let table = engine.prime().unwrap().start();

        let created = TestRequest::post("/widget")
            .cookie("auth_token", "any")
            .json_body(serde_json::json!({ "name": "bolt" }))
            .send(&table)
            .await;
        assert_eq!(created.status(), StatusCode::CREATED);

        let docs = TestRequest::get("/openapi").send(&table).await;
        assert_eq!(docs.status(), StatusCode::OK);
    }
}
