//! OpenAPI 3.1 spec generation and docs routes (C9, §4.6/§6).
//!
//! Unlike a JSON-Schema-derive-driven generator, this crate builds its spec
//! straight from the route table's own [`zbz_core::http::HandlerContract`]s —
//! nothing here needs a `#[derive(JsonSchema)]` on request/response types.
//! Component schemas come from a [`SchemaRegistry`] a caller populates ahead
//! of time (`zbz-resource` registers one schema per model, built from that
//! model's reflected field metadata).
//!
//! [`install`] wires the generated spec (served as YAML at `/openapi`) and a
//! bare documentation page (`/docs`) into a [`zbz_core::http::RouteTable`].

mod builder;
mod docs;
mod install;
pub mod schema;

pub use builder::{build_spec, OpenApiConfig};
pub use docs::{docs_html, to_yaml};
pub use install::install;
pub use schema::SchemaRegistry;
