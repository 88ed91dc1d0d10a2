//! `MacroContract` — a named, template-interpolated SQL string plus the
//! embeds it was built from. Built at injection, prepared against a
//! [`crate::driver::Database`], destroyed on shutdown.

use crate::embeds::MacroEmbeds;

/// The four CRUD operations every injected model gets, plus table creation.
/// The contract name is `"{table}.{op}"`, which reference drivers use to
/// recover the operation kind without parsing the interpolated SQL text.
pub const OP_CREATE_RECORD: &str = "create_record";
pub const OP_SELECT_RECORD: &str = "select_record";
pub const OP_UPDATE_RECORD: &str = "update_record";
pub const OP_DELETE_RECORD: &str = "delete_record";
pub const OP_CREATE_TABLE: &str = "create_table";

const CREATE_RECORD_TEMPLATE: &str = "INSERT INTO {{table}} (id, {{columns}}) VALUES (:id, {{values}})";
const SELECT_RECORD_TEMPLATE: &str = "SELECT * FROM {{table}} WHERE id = :id";
const UPDATE_RECORD_TEMPLATE: &str = "UPDATE {{table}} SET {{updates}} WHERE id = :id";
const DELETE_RECORD_TEMPLATE: &str = "DELETE FROM {{table}} WHERE id = :id";

/// A prepared, named SQL template for one model.
#[derive(Debug, Clone)]
pub struct MacroContract {
    pub name: String,
    pub macro_template: String,
    pub embed: MacroEmbeds,
}

impl MacroContract {
    fn new(table: &str, op: &'static str, template: &'static str, embed: MacroEmbeds) -> Self {
        Self {
            name: format!("{table}.{op}"),
            macro_template: template.to_string(),
            embed,
        }
    }

    /// Splice `embed`'s identifiers into `macro_template`, producing the
    /// literal SQL text to hand a driver.
    pub fn interpolated_sql(&self) -> String {
        interpolate(&self.macro_template, &self.embed)
    }
}

/// Build the four canonical CRUD contracts for one model's `embed`.
pub fn crud_contracts(embed: &MacroEmbeds) -> [MacroContract; 4] {
    let table = embed.table.as_str().to_string();
    [
        MacroContract::new(&table, OP_CREATE_RECORD, CREATE_RECORD_TEMPLATE, embed.clone()),
        MacroContract::new(&table, OP_SELECT_RECORD, SELECT_RECORD_TEMPLATE, embed.clone()),
        MacroContract::new(&table, OP_UPDATE_RECORD, UPDATE_RECORD_TEMPLATE, embed.clone()),
        MacroContract::new(&table, OP_DELETE_RECORD, DELETE_RECORD_TEMPLATE, embed.clone()),
    ]
}

/// Build the table-creation contract. Unlike the CRUD four, its template is
/// a fully resolved DDL string (computed from the model's column/type
/// pairs), not one of the `{{...}}` macro slots — `interpolated_sql` still
/// works on it since a template with no `{{...}}` tokens interpolates to
/// itself unchanged.
pub fn create_table_contract(embed: &MacroEmbeds, columns_ddl: &str) -> MacroContract {
    let table = embed.table.as_str();
    MacroContract {
        name: format!("{table}.{OP_CREATE_TABLE}"),
        macro_template: format!("CREATE TABLE IF NOT EXISTS {table} (id uuid primary key, {columns_ddl})"),
        embed: embed.clone(),
    }
}

fn interpolate(template: &str, embed: &MacroEmbeds) -> String {
    template
        .replace("{{table}}", embed.table.as_str())
        .replace("{{columns}}", embed.columns.as_str())
        .replace("{{values}}", embed.values.as_str())
        .replace("{{updates}}", embed.updates.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifier::TrustedSQLIdentifier;

    fn sample_embed() -> MacroEmbeds {
        MacroEmbeds {
            table: TrustedSQLIdentifier::validate("user").unwrap(),
            columns: TrustedSQLIdentifier::validate("email").unwrap(),
            values: TrustedSQLIdentifier::join_with(&[TrustedSQLIdentifier::validate("email").unwrap()], ", ", |c| {
                format!(":{c}")
            }),
            updates: TrustedSQLIdentifier::join_with(&[TrustedSQLIdentifier::validate("email").unwrap()], ", ", |c| {
                format!("{c} = :{c}")
            }),
        }
    }

    #[test]
    fn create_record_interpolates_table_columns_and_values() {
        let embed = sample_embed();
        let contract = MacroContract::new("user", OP_CREATE_RECORD, CREATE_RECORD_TEMPLATE, embed);
        assert_eq!(contract.name, "user.create_record");
        assert_eq!(
            contract.interpolated_sql(),
            "INSERT INTO user (id, email) VALUES (:id, :email)"
        );
    }

    #[test]
    fn update_record_interpolates_updates_clause() {
        let embed = sample_embed();
        let contract = MacroContract::new("user", OP_UPDATE_RECORD, UPDATE_RECORD_TEMPLATE, embed);
        assert_eq!(contract.interpolated_sql(), "UPDATE user SET email = :email WHERE id = :id");
    }

    #[test]
    fn crud_contracts_produces_all_four_names() {
        let embed = sample_embed();
        let contracts = crud_contracts(&embed);
        let names: Vec<_> = contracts.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["user.create_record", "user.select_record", "user.update_record", "user.delete_record"]
        );
    }
}
