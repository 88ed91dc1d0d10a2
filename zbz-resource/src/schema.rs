//! Translates a reflected [`zbz_core::catalog::Meta`] into an OpenAPI object
//! schema so each model can register itself with a [`zbz_openapi::SchemaRegistry`]
//! without a `#[derive(JsonSchema)]` anywhere in the model definition.

use serde_json::{json, Value};
use zbz_core::catalog::Meta;
use zbz_openapi::SchemaRegistry;

/// Maps a field's rendered Rust type (as captured by `#[derive(Model)]`,
/// e.g. `"Option<String>"`) to an OpenAPI `(type, format)` pair. Closed
/// table, same spirit as `catalog::meta::sql_type_for`.
fn openapi_type_for(rust_type: &str) -> (&'static str, Option<&'static str>) {
    match strip_option(rust_type) {
        "String" | "str" => ("string", None),
        "Uuid" => ("string", Some("uuid")),
        "i8" | "i16" | "i32" | "u8" | "u16" | "u32" | "i64" | "u64" | "isize" | "usize" => ("integer", None),
        "f32" | "f64" => ("number", None),
        "bool" => ("boolean", None),
        t if t.contains("DateTime") => ("string", Some("date-time")),
        _ => ("string", None),
    }
}

fn strip_option(rendered_ty: &str) -> &str {
    let trimmed = rendered_ty.trim();
    if let Some(inner) = trimmed
        .strip_prefix("Option <")
        .or_else(|| trimmed.strip_prefix("Option<"))
    {
        inner.trim().trim_end_matches('>').trim()
    } else {
        trimmed
    }
}

/// Builds an OpenAPI object schema for a model's full record shape (the one
/// returned from `GET`/`POST`/`PUT` handlers — `id`/`created_at`/`updated_at`
/// included).
pub fn schema_for_meta(meta: &Meta) -> Value {
    let mut properties = serde_json::Map::new();
    let mut required = Vec::new();

    for field in &meta.fields {
        let (ty, format) = openapi_type_for(&field.rust_type);
        let mut prop = json!({ "type": ty });
        if let Some(format) = format {
            prop["format"] = json!(format);
        }
        if let Some(description) = &field.description {
            prop["description"] = json!(description);
        }
        if let Some(example) = &field.example_value {
            prop["example"] = json!(example);
        }
        properties.insert(field.json_field_name.clone(), prop);
        if field.is_required {
            required.push(field.json_field_name.clone());
        }
    }

    json!({
        "type": "object",
        "properties": Value::Object(properties),
        "required": required,
    })
}

/// Builds the write-payload schema accepted by `POST`/`PUT` — same fields
/// minus `id`/`created_at`/`updated_at`, which the server stamps itself.
pub fn write_schema_for_meta(meta: &Meta) -> Value {
    let mut properties = serde_json::Map::new();
    let mut required = Vec::new();

    for field in &meta.fields {
        if matches!(field.json_field_name.as_str(), "id" | "created_at" | "updated_at") {
            continue;
        }
        let (ty, format) = openapi_type_for(&field.rust_type);
        let mut prop = json!({ "type": ty });
        if let Some(format) = format {
            prop["format"] = json!(format);
        }
        properties.insert(field.json_field_name.clone(), prop);
        if field.is_required {
            required.push(field.json_field_name.clone());
        }
    }

    json!({
        "type": "object",
        "properties": Value::Object(properties),
        "required": required,
    })
}

/// Register both of a model's schemas — the full record shape under its own
/// name, and the write-payload shape under `"{name}Write"` — with `registry`.
/// Called once per `Core<T>` at boot, before `zbz_openapi::install`.
pub fn register_meta_schema(registry: &mut SchemaRegistry, meta: &Meta) {
    registry.register(&meta.name, schema_for_meta(meta));
    registry.register(&format!("{}Write", meta.name), write_schema_for_meta(meta));
}

#[cfg(test)]
mod tests {
    use super::*;
    use zbz_core::catalog::FieldMetadata;
    use zbz_core::validation::ScopeRules;

    fn field(json_field_name: &str, rust_type: &str, is_required: bool) -> FieldMetadata {
        FieldMetadata {
            name: json_field_name.to_string(),
            database_column_name: json_field_name.to_string(),
            json_field_name: json_field_name.to_string(),
            rust_type: rust_type.to_string(),
            database_type: "text".to_string(),
            description: None,
            example_value: None,
            is_required,
            validation_rules: Vec::new(),
            edit_type: None,
            scope_rules: ScopeRules::default(),
            encryption: None,
            redaction: None,
        }
    }

    fn widget_meta() -> Meta {
        Meta {
            name: "Widget".to_string(),
            description: "A widget".to_string(),
            fields: vec![
                field("id", "Uuid", true),
                field("name", "String", true),
                field("weight", "Option<f64>", false),
            ],
            column_names: vec!["id".to_string(), "name".to_string(), "weight".to_string()],
        }
    }

    #[test]
    fn schema_marks_required_fields() {
        let schema = schema_for_meta(&widget_meta());
        assert_eq!(schema["properties"]["id"]["type"], "string");
        assert_eq!(schema["properties"]["id"]["format"], "uuid");
        assert!(schema["required"].as_array().unwrap().contains(&json!("name")));
        assert!(!schema["required"].as_array().unwrap().contains(&json!("weight")));
    }

    #[test]
    fn write_schema_drops_server_stamped_fields() {
        let schema = write_schema_for_meta(&widget_meta());
        assert!(schema["properties"].get("id").is_none());
        assert!(schema["properties"].get("name").is_some());
    }

    #[test]
    fn register_meta_schema_registers_both_shapes() {
        let mut registry = SchemaRegistry::new();
        register_meta_schema(&mut registry, &widget_meta());
        assert!(registry.contains("Widget"));
        assert!(registry.contains("WidgetWrite"));
    }
}
