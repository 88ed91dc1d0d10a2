//! `MacroEmbeds` — the per-model identifier bundle built once after
//! validation and spliced into the four canonical CRUD templates.

use zbz_core::catalog::meta::Meta;

use crate::error::DataError;
use crate::identifier::TrustedSQLIdentifier;

/// Table and column identifiers for one model, pre-validated so the
/// template interpolator never has to escape anything.
///
/// `columns`/`values`/`updates` are all built from the model's database
/// columns excluding `id` (stamped separately by the resource pipeline) and
/// any field whose database column was suppressed with `db = "-"`.
#[derive(Debug, Clone)]
pub struct MacroEmbeds {
    pub table: TrustedSQLIdentifier,
    pub columns: TrustedSQLIdentifier,
    pub values: TrustedSQLIdentifier,
    pub updates: TrustedSQLIdentifier,
}

/// Build the embeds for `meta`, validating every column name against the
/// identifier allow-list. Aborts on the first invalid identifier — no
/// partial `MacroEmbeds` is ever returned.
pub fn build_macro_embeds(meta: &Meta) -> Result<MacroEmbeds, DataError> {
    let table = TrustedSQLIdentifier::validate(&meta.name.to_lowercase()).inspect_err(|_| {
        tracing::warn!(model = %meta.name, "model name fails the trusted-identifier allow-list, injection aborted");
    })?;

    let mut columns = Vec::with_capacity(meta.column_names.len());
    for column in &meta.column_names {
        if column == "id" {
            continue;
        }
        columns.push(TrustedSQLIdentifier::validate(column).inspect_err(|_| {
            tracing::warn!(model = %meta.name, column, "database column fails the trusted-identifier allow-list, injection aborted");
        })?);
    }

    let values = TrustedSQLIdentifier::join_with(&columns, ", ", |c| format!(":{c}"));
    let updates = TrustedSQLIdentifier::join_with(&columns, ", ", |c| format!("{c} = :{c}"));
    let columns = TrustedSQLIdentifier::join(&columns, ", ");

    Ok(MacroEmbeds {
        table,
        columns,
        values,
        updates,
    })
}

/// Build the `column type, column type, ...` DDL fragment for the
/// table-creation contract, reusing each field's already-computed
/// `database_type` (§4.2's closed Rust→SQL mapping). `id`/`created_at`/
/// `updated_at` go through the same allow-list as any other column.
pub fn build_table_ddl(meta: &Meta) -> Result<String, DataError> {
    let mut parts = Vec::new();
    for field in &meta.fields {
        if field.database_column_name.is_empty() || field.database_column_name == "id" {
            continue;
        }
        let column = TrustedSQLIdentifier::validate(&field.database_column_name)?;
        parts.push(format!("{column} {}", field.database_type));
    }
    Ok(parts.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use zbz_core::catalog::meta::{FieldMetadata, Meta};
    use zbz_core::validation::ScopeRules;

    fn field(name: &str, db: &str) -> FieldMetadata {
        FieldMetadata {
            name: name.to_string(),
            database_column_name: db.to_string(),
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

    fn meta_with(name: &str, fields: Vec<FieldMetadata>) -> Meta {
        let column_names = fields
            .iter()
            .filter(|f| !f.database_column_name.is_empty())
            .map(|f| f.database_column_name.clone())
            .collect();
        Meta {
            name: name.to_string(),
            description: String::new(),
            fields,
            column_names,
        }
    }

    #[test]
    fn excludes_id_and_dash_suppressed_columns() {
        let meta = meta_with(
            "User",
            vec![field("id", "id"), field("email", "email"), field("secret", "")],
        );
        let embeds = build_macro_embeds(&meta).unwrap();
        assert_eq!(embeds.table.as_str(), "user");
        assert_eq!(embeds.columns.as_str(), "email");
        assert_eq!(embeds.values.as_str(), ":email");
        assert_eq!(embeds.updates.as_str(), "email = :email");
    }

    #[test]
    fn invalid_column_name_aborts_the_whole_build() {
        let meta = meta_with("User", vec![field("bad", "bad; drop table users")]);
        assert!(matches!(build_macro_embeds(&meta), Err(DataError::InvalidIdentifier(_))));
    }

    #[test]
    fn table_ddl_pairs_each_column_with_its_sql_type() {
        let mut id = field("id", "id");
        id.rust_type = "Uuid".to_string();
        id.database_type = "uuid".to_string();
        let mut email = field("email", "email");
        email.database_type = "text".to_string();
        let meta = meta_with("User", vec![id, email]);
        assert_eq!(build_table_ddl(&meta).unwrap(), "email text");
    }
}
