//! Core runtime for `zbz`: the metadata catalog, contract registry,
//! validation engine, structured logger, and framework-neutral HTTP kernel
//! that every other `zbz` crate builds on.
//!
//! Module initialization order follows the dependency chain the rest of
//! the workspace assumes: Logger → Catalog → HookBus → Storage → Watcher →
//! Validation → DB → HTTP/Auth → Core → Engine. There are no cycles.

pub mod catalog;
pub mod config;
pub mod error;
pub mod http;
pub mod log;
pub mod prelude;
pub mod registry;
pub mod validation;

pub use error::AppError;

#[doc(inline)]
pub use zbz_macros::Model;
