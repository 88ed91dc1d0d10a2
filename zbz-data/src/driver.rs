//! `Database` — the driver seam `MacroContract`s are prepared against, plus
//! an in-memory reference implementation.
//!
//! Concrete SQL dialects (Postgres, SQLite, ...) are out of scope here; a
//! real driver crate implements this trait the way a real `StorageProvider`
//! implements zbz-storage's trait.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::RwLock;

use serde_json::Value;

use crate::contract::{MacroContract, OP_CREATE_RECORD, OP_CREATE_TABLE, OP_DELETE_RECORD, OP_SELECT_RECORD, OP_UPDATE_RECORD};
use crate::error::DataError;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
pub type Row = HashMap<String, Value>;

/// A database a `MacroContract` can be prepared against and executed on.
///
/// `execute_once` is best-effort: it is not wrapped in a transaction, so a
/// failure partway through leaves no guaranteed rollback. Callers that need
/// atomicity retry the whole operation.
pub trait Database: Send + Sync + 'static {
    fn prepare<'a>(&'a self, contract: &'a MacroContract) -> BoxFuture<'a, Result<(), DataError>>;
    fn execute<'a>(&'a self, name: &'a str, params: &'a Row) -> BoxFuture<'a, Result<u64, DataError>>;
    fn query<'a>(&'a self, name: &'a str, params: &'a Row) -> BoxFuture<'a, Result<Vec<Row>, DataError>>;
    /// Run an ad hoc, already-interpolated statement by prepared-statement
    /// name with no transaction. See the trait docs for the rollback
    /// caveat.
    fn execute_once<'a>(&'a self, name: &'a str, params: &'a Row) -> BoxFuture<'a, Result<u64, DataError>>;
    fn destroy<'a>(&'a self, name: &'a str) -> BoxFuture<'a, ()>;
}

/// In-memory reference driver. Since it has no SQL parser, it recovers the
/// operation from the contract name's `.`-suffixed op (`create_record`,
/// `select_record`, `update_record`, `delete_record`, `create_table`) and
/// performs the equivalent operation directly against its own table map.
pub struct InMemoryDatabase {
    tables: RwLock<HashMap<String, Vec<Row>>>,
    statements: RwLock<HashMap<String, MacroContract>>,
}

impl InMemoryDatabase {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
            statements: RwLock::new(HashMap::new()),
        }
    }

    fn contract(&self, name: &str) -> Result<MacroContract, DataError> {
        self.statements
            .read()
            .expect("statement cache lock poisoned")
            .get(name)
            .cloned()
            .ok_or_else(|| DataError::UnknownContract(name.to_string()))
    }

    fn op(name: &str) -> &str {
        name.rsplit('.').next().unwrap_or(name)
    }
}

impl Default for InMemoryDatabase {
    fn default() -> Self {
        Self::new()
    }
}

impl Database for InMemoryDatabase {
    fn prepare<'a>(&'a self, contract: &'a MacroContract) -> BoxFuture<'a, Result<(), DataError>> {
        Box::pin(async move {
            self.statements
                .write()
                .expect("statement cache lock poisoned")
                .insert(contract.name.clone(), contract.clone());
            if Self::op(&contract.name) == OP_CREATE_TABLE {
                self.tables
                    .write()
                    .expect("table lock poisoned")
                    .entry(contract.embed.table.as_str().to_string())
                    .or_default();
            }
            Ok(())
        })
    }

    fn execute<'a>(&'a self, name: &'a str, params: &'a Row) -> BoxFuture<'a, Result<u64, DataError>> {
        Box::pin(async move {
            let contract = self.contract(name)?;
            let table = contract.embed.table.as_str();
            let mut tables = self.tables.write().expect("table lock poisoned");
            let rows = tables.entry(table.to_string()).or_default();

            match Self::op(name) {
                OP_CREATE_RECORD => {
                    rows.push(params.clone());
                    Ok(1)
                }
                OP_UPDATE_RECORD => {
                    let id = params.get("id");
                    let mut affected = 0;
                    for row in rows.iter_mut() {
                        if row.get("id") == id {
                            row.extend(params.clone());
                            affected += 1;
                        }
                    }
                    Ok(affected)
                }
                OP_DELETE_RECORD => {
                    let id = params.get("id");
                    let before = rows.len();
                    rows.retain(|row| row.get("id") != id);
                    Ok((before - rows.len()) as u64)
                }
                OP_CREATE_TABLE => Ok(0),
                other => Err(DataError::Other(format!("'{other}' is not an execute statement"))),
            }
        })
    }

    fn query<'a>(&'a self, name: &'a str, params: &'a Row) -> BoxFuture<'a, Result<Vec<Row>, DataError>> {
        Box::pin(async move {
            let contract = self.contract(name)?;
            if Self::op(name) != OP_SELECT_RECORD {
                return Err(DataError::Other(format!("'{name}' is not a query statement")));
            }
            let table = contract.embed.table.as_str();
            let tables = self.tables.read().expect("table lock poisoned");
            let rows = tables.get(table).cloned().unwrap_or_default();
            let id = params.get("id");
            Ok(rows.into_iter().filter(|row| row.get("id") == id).collect())
        })
    }

    fn execute_once<'a>(&'a self, name: &'a str, params: &'a Row) -> BoxFuture<'a, Result<u64, DataError>> {
        self.execute(name, params)
    }

    fn destroy<'a>(&'a self, name: &'a str) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            self.statements.write().expect("statement cache lock poisoned").remove(name);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::crud_contracts;
    use crate::embeds::build_macro_embeds;
    use zbz_core::catalog::meta::{FieldMetadata, Meta};
    use zbz_core::validation::ScopeRules;

    fn field(name: &str) -> FieldMetadata {
        FieldMetadata {
            name: name.to_string(),
            database_column_name: name.to_string(),
            json_field_name: name.to_string(),
            rust_type: "String".to_string(),
            database_type: "text".to_string(),
            description: None,
            example_value: None,
            is_required: true,
            validation_rules: Vec::new(),
            edit_type: None,
            scope_rules: ScopeRules::default(),
            encryption: None,
            redaction: None,
        }
    }

    fn user_meta() -> Meta {
        let fields = vec![field("id"), field("email")];
        let column_names = fields.iter().map(|f| f.database_column_name.clone()).collect();
        Meta {
            name: "User".to_string(),
            description: String::new(),
            fields,
            column_names,
        }
    }

    fn row(id: &str, email: &str) -> Row {
        let mut row = Row::new();
        row.insert("id".to_string(), Value::String(id.to_string()));
        row.insert("email".to_string(), Value::String(email.to_string()));
        row
    }

    #[tokio::test]
    async fn create_then_select_round_trips_a_row() {
        let embed = build_macro_embeds(&user_meta()).unwrap();
        let db = InMemoryDatabase::new();
        for contract in crud_contracts(&embed) {
            db.prepare(&contract).await.unwrap();
        }

        db.execute("user.create_record", &row("1", "a@b.com")).await.unwrap();
        let found = db.query("user.select_record", &row("1", "")).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].get("email").unwrap().as_str(), Some("a@b.com"));
    }

    #[tokio::test]
    async fn update_then_delete_affects_the_right_row() {
        let embed = build_macro_embeds(&user_meta()).unwrap();
        let db = InMemoryDatabase::new();
        for contract in crud_contracts(&embed) {
            db.prepare(&contract).await.unwrap();
        }
        db.execute("user.create_record", &row("1", "a@b.com")).await.unwrap();

        let affected = db.execute("user.update_record", &row("1", "new@b.com")).await.unwrap();
        assert_eq!(affected, 1);
        let found = db.query("user.select_record", &row("1", "")).await.unwrap();
        assert_eq!(found[0].get("email").unwrap().as_str(), Some("new@b.com"));

        let deleted = db.execute("user.delete_record", &row("1", "")).await.unwrap();
        assert_eq!(deleted, 1);
        let found = db.query("user.select_record", &row("1", "")).await.unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn executing_an_unprepared_name_fails() {
        let db = InMemoryDatabase::new();
        let err = db.execute("ghost.create_record", &Row::new()).await.unwrap_err();
        assert!(matches!(err, DataError::UnknownContract(_)));
    }

    #[tokio::test]
    async fn destroyed_contracts_can_no_longer_be_executed() {
        let embed = build_macro_embeds(&user_meta()).unwrap();
        let db = InMemoryDatabase::new();
        let contracts = crud_contracts(&embed);
        db.prepare(&contracts[0]).await.unwrap();
        db.destroy(&contracts[0].name).await;
        let err = db.execute(&contracts[0].name, &Row::new()).await.unwrap_err();
        assert!(matches!(err, DataError::UnknownContract(_)));
    }
}
