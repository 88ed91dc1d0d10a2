//! Template-interpolated SQL orchestrator (C8, §4.5).
//!
//! A `Meta` (from zbz-core's catalog) becomes a [`MacroEmbeds`] once its
//! column names clear the [`TrustedSQLIdentifier`] allow-list; the embeds
//! feed five [`MacroContract`]s (four CRUD plus table creation), each
//! prepared against a [`Database`] at injection and destroyed on shutdown.
//!
//! This crate never speaks to a concrete SQL engine — that's a driver
//! crate's job, implementing [`Database`] the way [`InMemoryDatabase`] does
//! for tests.

pub mod contract;
pub mod driver;
pub mod embeds;
pub mod error;
pub mod identifier;

pub use contract::{create_table_contract, crud_contracts, MacroContract};
pub use driver::{BoxFuture, Database, InMemoryDatabase, Row};
pub use embeds::{build_macro_embeds, build_table_ddl, MacroEmbeds};
pub use error::DataError;
pub use identifier::TrustedSQLIdentifier;

zbz_core::map_error! {
    DataError => Internal,
}

/// Re-exports of the most commonly used data types.
pub mod prelude {
    pub use crate::{
        build_macro_embeds, build_table_ddl, create_table_contract, crud_contracts, BoxFuture, Database, DataError,
        InMemoryDatabase, MacroContract, MacroEmbeds, Row, TrustedSQLIdentifier,
    };
}
