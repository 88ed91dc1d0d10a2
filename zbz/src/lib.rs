//! zbz — a framework-neutral REST kernel: a reflected model catalog, a
//! template-interpolated SQL layer, and a CRUD composition pipeline wired
//! together by a single boot-time [`Engine`].
//!
//! This facade crate re-exports every `zbz` sub-crate through one
//! dependency with feature flags. Import everything you need with:
//!
//! ```ignore
//! use zbz::prelude::*;
//! ```
//!
//! # Feature flags
//!
//! | Feature    | Default | Crate          |
//! |------------|---------|----------------|
//! | `hooks`    | **yes** | `zbz-hooks`    |
//! | `storage`  | **yes** | `zbz-storage`  |
//! | `data`     | **yes** | `zbz-data`     |
//! | `auth`     | **yes** | `zbz-auth`     |
//! | `openapi`  | **yes** | `zbz-openapi`  |
//! | `resource` | **yes** | `zbz-resource` (pulls in `data` + `openapi`) |
//! | `full`     | no      | All of the above |

mod engine;

// Re-export sub-crates as public modules so they're accessible as
// `zbz::zbz_hooks`, `zbz::zbz_data`, etc., and so proc macros resolved via
// `proc-macro-crate` see them whether a caller depends on `zbz` (facade) or
// the individual crates directly.
pub extern crate zbz_core;
pub extern crate zbz_macros;

#[cfg(feature = "hooks")]
pub extern crate zbz_hooks;

#[cfg(feature = "storage")]
pub use zbz_storage;

#[cfg(feature = "data")]
pub use zbz_data;

#[cfg(feature = "auth")]
pub use zbz_auth;

#[cfg(feature = "openapi")]
pub use zbz_openapi;

#[cfg(feature = "resource")]
pub use zbz_resource;

// Re-export everything from zbz-core at the top level for convenience.
pub use zbz_core::*;

pub use engine::{Engine, EngineError};

/// Unified prelude — import everything with `use zbz::prelude::*`.
pub mod prelude {
    pub use zbz_core::prelude::*;

    pub use crate::{Engine, EngineError};

    #[cfg(feature = "hooks")]
    pub use zbz_hooks::prelude::*;

    #[cfg(feature = "storage")]
    pub use zbz_storage::{configure as configure_storage, storage, StorageProvider};

    #[cfg(feature = "data")]
    pub use zbz_data::prelude::*;

    #[cfg(feature = "auth")]
    pub use zbz_auth::prelude::*;

    #[cfg(feature = "openapi")]
    pub use zbz_openapi::{OpenApiConfig, SchemaRegistry};

    #[cfg(feature = "resource")]
    pub use zbz_resource::prelude::*;
}
