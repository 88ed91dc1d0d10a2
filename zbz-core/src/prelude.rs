//! Common imports for crates and application code built on `zbz-core`.

pub use crate::catalog::{select, BaseModel, Described, FieldMetadata, Meta};
pub use crate::config::{ConfigError, ZbzConfig};
pub use crate::error::AppError;
pub use crate::http::{
    AuthDriver, AuthMode, HandlerContract, IntoResponse, Json, RequestContext, Response, RouteTable, StatusCode,
};
pub use crate::registry::{Contract, ContractKind, Provider, Registry, RegistryError};
pub use crate::validation::{FieldError, Rule, ScopeRules, ValidationErrorResponse};
pub use zbz_macros::Model;
