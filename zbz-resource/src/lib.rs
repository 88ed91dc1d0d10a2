//! Per-model CRUD composition (component C11, §4.5).
//!
//! `Core<T>` is the glue between three already-built pieces: the catalog's
//! reflected [`zbz_core::catalog::Meta`], zbz-data's template-interpolated
//! SQL contracts, and zbz-core's framework-neutral HTTP kernel. Given a
//! `T: Described`, it builds that model's five SQL contracts, prepares and
//! injects them against a driver, and registers the four REST routes
//! (`POST /{model}`, `GET|PUT|DELETE /{model}/{id}`) that drive them —
//! reading and writing exclusively through `serde_json::Value`, so no
//! second, model-specific deserialization path is needed alongside the
//! catalog's own field reflection.

mod core;
mod error;
pub mod schema;

pub use core::Core;
pub use error::ResourceError;
pub use schema::{register_meta_schema, schema_for_meta, write_schema_for_meta};

/// Re-exports of the most commonly used resource types.
pub mod prelude {
    pub use crate::{register_meta_schema, schema_for_meta, write_schema_for_meta, Core, ResourceError};
}
