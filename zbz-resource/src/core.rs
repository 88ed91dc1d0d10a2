//! `Core<T>` — wires one reflected model into a table's worth of CRUD SQL
//! contracts, then registers the four HTTP routes that drive them (C11,
//! §4.5).
//!
//! Every handler body operates on `serde_json::Map`/`zbz_data::Row`, never
//! a materialized `T` — the catalog's `Meta` already carries everything a
//! handler needs to validate, scope-filter, and column-map a payload, and
//! building a `T` would mean round-tripping through a second, redundant
//! deserialization path.

use std::marker::PhantomData;
use std::sync::Arc;

use chrono::Utc;
use serde_json::{Map, Value};
use uuid::Uuid;
use zbz_core::catalog::{self, Described, Meta};
use zbz_core::http::{
    auth_middleware, error_tail, AuthDriver, AuthMode, HandlerContract, HandlerFn, Method, ParamInfo, RequestContext,
    ResponseInfo, RouteTable, StatusCode,
};
use zbz_core::validation::scope::{check_write_permissions, serialize_scoped, ScopedField};
use zbz_core::validation::{validate_record, Rule};
use zbz_core::AppError;
use zbz_data::{create_table_contract, crud_contracts, Database, MacroContract, MacroEmbeds, Row};

use crate::error::ResourceError;

/// One model's CRUD surface: the prepared SQL contracts plus enough of its
/// reflected `Meta` to validate, scope, and route-map requests against it.
pub struct Core<T> {
    meta: Arc<Meta>,
    contracts: [MacroContract; 4],
    table_contract: MacroContract,
    db: Arc<dyn Database>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Described + 'static> Core<T> {
    /// Reflect `T`, validate its columns against the SQL identifier
    /// allow-list, and build its five contracts (four CRUD, one table
    /// creation). Does not touch `db` yet — see [`Core::inject`].
    pub fn new(db: Arc<dyn Database>) -> Result<Self, ResourceError> {
        let meta = catalog::select::<T>();
        let embed = build_embed(&meta)?;
        let ddl = zbz_data::build_table_ddl(&meta).map_err(ResourceError::from)?;
        let contracts = crud_contracts(&embed);
        let table_contract = create_table_contract(&embed, &ddl);
        Ok(Core {
            meta,
            contracts,
            table_contract,
            db,
            _marker: PhantomData,
        })
    }

    /// Prepare all five contracts against the driver, then run the table
    /// creation statement. Called once at boot, before `register`.
    pub async fn inject(&self) -> Result<(), ResourceError> {
        for contract in &self.contracts {
            self.db.prepare(contract).await.map_err(ResourceError::from)?;
        }
        self.db.prepare(&self.table_contract).await.map_err(ResourceError::from)?;
        self.db
            .execute_once(&self.table_contract.name, &Row::new())
            .await
            .map_err(ResourceError::from)?;
        Ok(())
    }

    /// Register the model's four REST routes (`POST /{model}`,
    /// `GET|PUT|DELETE /{model}/{id}`) against `table`, behind `driver`'s
    /// auth middleware. Field-level scope enforcement happens inside each
    /// handler (required permissions vary per field, not per route), so no
    /// `scope_middleware` layer is added here.
    pub fn register(&self, table: &mut RouteTable, driver: Arc<dyn AuthDriver>) {
        let lname = self.meta.name.to_lowercase();
        let layers = vec![auth_middleware(driver, AuthMode::RequireAuth), error_tail()];

        table.register(
            Method::POST,
            format!("/{lname}"),
            create_handler(self.meta.clone(), self.db.clone(), self.contracts[0].name.clone()),
            layers.clone(),
            HandlerContract {
                name: format!("create_{lname}"),
                description: format!("Create a {}", self.meta.name),
                tag: self.meta.name.clone(),
                method: Method::POST,
                path: format!("/{lname}"),
                parameters: vec![],
                query: vec![],
                request_body: Some(format!("{}Write", self.meta.name)),
                response: ResponseInfo { status: 201, type_ref: Some(self.meta.name.clone()), errors: vec![400, 403, 422] },
                auth: true,
                scope: None,
            },
        );

        table.register(
            Method::GET,
            format!("/{lname}/{{id}}"),
            read_handler(self.meta.clone(), self.db.clone(), self.contracts[1].name.clone()),
            layers.clone(),
            HandlerContract {
                name: format!("get_{lname}"),
                description: format!("Fetch a {} by id", self.meta.name),
                tag: self.meta.name.clone(),
                method: Method::GET,
                path: format!("/{lname}/{{id}}"),
                parameters: vec![ParamInfo { name: "id".to_string(), description: None, required: true }],
                query: vec![],
                request_body: None,
                response: ResponseInfo { status: 200, type_ref: Some(self.meta.name.clone()), errors: vec![404] },
                auth: true,
                scope: None,
            },
        );

        table.register(
            Method::PUT,
            format!("/{lname}/{{id}}"),
            update_handler(
                self.meta.clone(),
                self.db.clone(),
                self.contracts[1].name.clone(),
                self.contracts[2].name.clone(),
            ),
            layers.clone(),
            HandlerContract {
                name: format!("update_{lname}"),
                description: format!("Update a {}", self.meta.name),
                tag: self.meta.name.clone(),
                method: Method::PUT,
                path: format!("/{lname}/{{id}}"),
                parameters: vec![ParamInfo { name: "id".to_string(), description: None, required: true }],
                query: vec![],
                request_body: Some(format!("{}Write", self.meta.name)),
                response: ResponseInfo { status: 200, type_ref: Some(self.meta.name.clone()), errors: vec![400, 403, 404, 422] },
                auth: true,
                scope: None,
            },
        );

        table.register(
            Method::DELETE,
            format!("/{lname}/{{id}}"),
            delete_handler(self.db.clone(), self.contracts[3].name.clone()),
            layers,
            HandlerContract {
                name: format!("delete_{lname}"),
                description: format!("Delete a {}", self.meta.name),
                tag: self.meta.name.clone(),
                method: Method::DELETE,
                path: format!("/{lname}/{{id}}"),
                parameters: vec![ParamInfo { name: "id".to_string(), description: None, required: true }],
                query: vec![],
                request_body: None,
                response: ResponseInfo { status: 204, type_ref: None, errors: vec![404] },
                auth: true,
                scope: None,
            },
        );
    }

    pub fn meta(&self) -> &Arc<Meta> {
        &self.meta
    }
}

fn build_embed(meta: &Meta) -> Result<MacroEmbeds, ResourceError> {
    zbz_data::build_macro_embeds(meta).map_err(ResourceError::from)
}

fn permissions_of(ctx: &RequestContext) -> Vec<String> {
    ctx.bag()
        .get::<Vec<String>>(zbz_core::http::PERMISSIONS_KEY)
        .cloned()
        .unwrap_or_default()
}

fn scoped_fields(meta: &Meta) -> Vec<ScopedField<'_>> {
    meta.fields
        .iter()
        .map(|f| ScopedField {
            json_name: &f.json_field_name,
            scope: &f.scope_rules,
            redact: f.redaction.as_ref().map(|r| r.value.as_str()),
        })
        .collect()
}

fn rules_by_field(meta: &Meta) -> Vec<(String, Vec<Rule>)> {
    meta.fields
        .iter()
        .map(|f| (f.json_field_name.clone(), f.validation_rules.clone()))
        .collect()
}

/// json_field_name-keyed payload → database_column_name-keyed row. `id` is
/// always stored as its string form so `Row` equality checks in a driver
/// stay simple (no `Value` type mismatch between a stamped `Uuid` and a
/// queried string).
fn to_row(meta: &Meta, payload: &Map<String, Value>) -> Row {
    let mut row = Row::new();
    for field in &meta.fields {
        if field.database_column_name.is_empty() {
            continue;
        }
        if let Some(value) = payload.get(&field.json_field_name) {
            row.insert(field.database_column_name.clone(), value.clone());
        }
    }
    row
}

fn from_row(meta: &Meta, row: &Row) -> Map<String, Value> {
    let mut payload = Map::new();
    for field in &meta.fields {
        if field.database_column_name.is_empty() {
            continue;
        }
        if let Some(value) = row.get(&field.database_column_name) {
            payload.insert(field.json_field_name.clone(), value.clone());
        }
    }
    payload
}

fn respond_error(ctx: &mut RequestContext, err: ResourceError) {
    let app_err: AppError = err.into();
    let resp = zbz_core::http::IntoResponse::into_response(app_err);
    let status = resp.status();
    let body = resp.into_body();
    ctx.data(status, "application/json", body);
}

fn parse_body(ctx: &RequestContext) -> Result<Map<String, Value>, ResourceError> {
    let value: Value = serde_json::from_slice(ctx.body())
        .map_err(|err| ResourceError::BadRequest(format!("invalid JSON body: {err}")))?;
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(ResourceError::BadRequest("request body must be a JSON object".to_string())),
    }
}

fn create_handler(meta: Arc<Meta>, db: Arc<dyn Database>, contract_name: String) -> HandlerFn {
    Arc::new(move |mut ctx: RequestContext| {
        let meta = meta.clone();
        let db = db.clone();
        let contract_name = contract_name.clone();
        Box::pin(async move {
            if let Err(err) = create(&meta, db.as_ref(), &contract_name, &mut ctx).await {
                respond_error(&mut ctx, err);
            }
            ctx
        })
    })
}

async fn create(meta: &Meta, db: &dyn Database, contract_name: &str, ctx: &mut RequestContext) -> Result<(), ResourceError> {
    let mut payload = parse_body(ctx)?;
    let permissions = permissions_of(ctx);
    let fields = scoped_fields(meta);

    if let Some(field) = check_write_permissions(&payload, &fields, &permissions) {
        return Err(ResourceError::Forbidden(format!("not permitted to write field '{field}'")));
    }

    let validation = validate_record(&rules_by_field(meta), &payload);
    if !validation.is_empty() {
        return Err(ResourceError::Validation(validation));
    }

    let id = Uuid::new_v4().to_string();
    let now = Utc::now().to_rfc3339();
    payload.insert("id".to_string(), Value::String(id));
    payload.insert("created_at".to_string(), Value::String(now.clone()));
    payload.insert("updated_at".to_string(), Value::String(now));

    let row = to_row(meta, &payload);
    db.execute(contract_name, &row).await.map_err(ResourceError::from)?;

    let record = serialize_scoped(Value::Object(from_row(meta, &row)), &fields, &permissions);
    ctx.json(StatusCode::CREATED, &record);
    Ok(())
}

fn read_handler(meta: Arc<Meta>, db: Arc<dyn Database>, contract_name: String) -> HandlerFn {
    Arc::new(move |mut ctx: RequestContext| {
        let meta = meta.clone();
        let db = db.clone();
        let contract_name = contract_name.clone();
        Box::pin(async move {
            if let Err(err) = read(&meta, db.as_ref(), &contract_name, &mut ctx).await {
                respond_error(&mut ctx, err);
            }
            ctx
        })
    })
}

async fn read(meta: &Meta, db: &dyn Database, contract_name: &str, ctx: &mut RequestContext) -> Result<(), ResourceError> {
    let id = ctx.param("id").ok_or_else(|| ResourceError::BadRequest("missing id".to_string()))?.to_string();
    let permissions = permissions_of(ctx);
    let fields = scoped_fields(meta);

    let mut query = Row::new();
    query.insert("id".to_string(), Value::String(id.clone()));
    let rows = db.query(contract_name, &query).await.map_err(ResourceError::from)?;
    let row = rows.into_iter().next().ok_or_else(|| ResourceError::NotFound(id.clone()))?;

    let record = serialize_scoped(Value::Object(from_row(meta, &row)), &fields, &permissions);
    ctx.json(StatusCode::OK, &record);
    Ok(())
}

fn update_handler(meta: Arc<Meta>, db: Arc<dyn Database>, select_name: String, update_name: String) -> HandlerFn {
    Arc::new(move |mut ctx: RequestContext| {
        let meta = meta.clone();
        let db = db.clone();
        let select_name = select_name.clone();
        let update_name = update_name.clone();
        Box::pin(async move {
            if let Err(err) = update(&meta, db.as_ref(), &select_name, &update_name, &mut ctx).await {
                respond_error(&mut ctx, err);
            }
            ctx
        })
    })
}

async fn update(
    meta: &Meta,
    db: &dyn Database,
    select_name: &str,
    update_name: &str,
    ctx: &mut RequestContext,
) -> Result<(), ResourceError> {
    let id = ctx.param("id").ok_or_else(|| ResourceError::BadRequest("missing id".to_string()))?.to_string();
    let patch = parse_body(ctx)?;
    let permissions = permissions_of(ctx);
    let fields = scoped_fields(meta);

    if let Some(field) = check_write_permissions(&patch, &fields, &permissions) {
        return Err(ResourceError::Forbidden(format!("not permitted to write field '{field}'")));
    }

    let mut query = Row::new();
    query.insert("id".to_string(), Value::String(id.clone()));
    let rows = db.query(select_name, &query).await.map_err(ResourceError::from)?;
    let existing = rows.into_iter().next().ok_or_else(|| ResourceError::NotFound(id.clone()))?;

    let mut merged = from_row(meta, &existing);
    for (key, value) in patch {
        merged.insert(key, value);
    }
    merged.insert("updated_at".to_string(), Value::String(Utc::now().to_rfc3339()));

    let validation = validate_record(&rules_by_field(meta), &merged);
    if !validation.is_empty() {
        return Err(ResourceError::Validation(validation));
    }

    let row = to_row(meta, &merged);
    let affected = db.execute(update_name, &row).await.map_err(ResourceError::from)?;
    if affected == 0 {
        return Err(ResourceError::NotFound(id));
    }

    let record = serialize_scoped(Value::Object(from_row(meta, &row)), &fields, &permissions);
    ctx.json(StatusCode::OK, &record);
    Ok(())
}

fn delete_handler(db: Arc<dyn Database>, contract_name: String) -> HandlerFn {
    Arc::new(move |mut ctx: RequestContext| {
        let db = db.clone();
        let contract_name = contract_name.clone();
        Box::pin(async move {
            if let Err(err) = delete(db.as_ref(), &contract_name, &mut ctx).await {
                respond_error(&mut ctx, err);
            }
            ctx
        })
    })
}

async fn delete(db: &dyn Database, contract_name: &str, ctx: &mut RequestContext) -> Result<(), ResourceError> {
    let id = ctx.param("id").ok_or_else(|| ResourceError::BadRequest("missing id".to_string()))?.to_string();
    let mut row = Row::new();
    row.insert("id".to_string(), Value::String(id.clone()));
    let affected = db.execute(contract_name, &row).await.map_err(ResourceError::from)?;
    if affected == 0 {
        return Err(ResourceError::NotFound(id));
    }
    ctx.set_status(StatusCode::NO_CONTENT);
    Ok(())
}
