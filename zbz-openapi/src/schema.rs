//! Collects JSON Schema definitions for OpenAPI `components/schemas`.
//!
//! Nothing here derives a schema from a Rust type — `zbz-resource` builds one
//! per model from its already-reflected [`zbz_core::catalog::meta::Meta`] and
//! registers it here before the spec is assembled.

use std::collections::HashMap;

use serde_json::{Map, Value};

#[derive(Default)]
pub struct SchemaRegistry {
    schemas: HashMap<String, Value>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        SchemaRegistry::default()
    }

    pub fn register(&mut self, name: &str, schema: Value) {
        self.schemas.insert(name.to_string(), schema);
    }

    /// Register a simple object schema with the given `(name, openapi_type)`
    /// fields, all marked required.
    pub fn register_object(&mut self, name: &str, fields: &[(&str, &str)]) {
        let mut properties = Map::new();
        let mut required = Vec::new();
        for (field_name, field_type) in fields {
            properties.insert(field_name.to_string(), serde_json::json!({ "type": field_type }));
            required.push(serde_json::json!(field_name));
        }
        self.schemas.insert(
            name.to_string(),
            serde_json::json!({
                "type": "object",
                "properties": properties,
                "required": required,
            }),
        );
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.schemas.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.schemas.contains_key(name)
    }

    pub fn into_schemas(self) -> HashMap<String, Value> {
        self.schemas
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_and_fetch() {
        let mut registry = SchemaRegistry::new();
        registry.register("Widget", serde_json::json!({"type": "object"}));
        assert!(registry.contains("Widget"));
        assert_eq!(registry.get("Widget").unwrap()["type"], "object");
    }

    #[test]
    fn register_object_marks_every_field_required() {
        let mut registry = SchemaRegistry::new();
        registry.register_object("Widget", &[("name", "string"), ("count", "integer")]);
        let schema = registry.get("Widget").unwrap();
        assert_eq!(schema["properties"]["name"]["type"], "string");
        assert_eq!(schema["required"], serde_json::json!(["name", "count"]));
    }

    #[test]
    fn missing_schema_is_none() {
        let registry = SchemaRegistry::new();
        assert!(registry.get("Ghost").is_none());
        assert!(!registry.contains("Ghost"));
    }

    #[test]
    fn into_schemas_yields_owned_map() {
        let mut registry = SchemaRegistry::new();
        registry.register("Widget", serde_json::json!({"type": "object"}));
        let schemas = registry.into_schemas();
        assert!(schemas.contains_key("Widget"));
    }
}
