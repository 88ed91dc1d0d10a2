//! Build an OpenAPI 3.1.0 document from the route table's own
//! [`HandlerContract`]s — no JSON-Schema derive macro involved. Component
//! schemas come from whatever a caller registered in a [`crate::SchemaRegistry`]
//! ahead of time; a referenced type with no registered schema falls back to a
//! generic object.

use serde_json::{json, Map, Value};
use zbz_core::http::{HandlerContract, Method, ParamInfo};

use crate::schema::SchemaRegistry;

/// Configuration for the generated OpenAPI document.
#[derive(Clone)]
pub struct OpenApiConfig {
    pub title: String,
    pub version: String,
    pub description: Option<String>,
}

impl OpenApiConfig {
    pub fn new(title: &str, version: &str) -> Self {
        OpenApiConfig {
            title: title.to_string(),
            version: version.to_string(),
            description: None,
        }
    }

    pub fn with_description(mut self, desc: &str) -> Self {
        self.description = Some(desc.to_string());
        self
    }
}

fn status_description(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No content",
        400 => "Bad request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not found",
        409 => "Conflict",
        422 => "Validation error",
        500 => "Internal error",
        _ => "Response",
    }
}

fn param_object(param: &ParamInfo, location: &str) -> Value {
    let mut obj = Map::new();
    obj.insert("name".into(), json!(param.name));
    obj.insert("in".into(), json!(location));
    obj.insert("required".into(), json!(param.required));
    if let Some(ref description) = param.description {
        obj.insert("description".into(), json!(description));
    }
    obj.insert("schema".into(), json!({ "type": "string" }));
    Value::Object(obj)
}

fn schema_ref_or_object(registry: &SchemaRegistry, type_name: &str) -> Value {
    match registry.get(type_name) {
        Some(schema) => schema.clone(),
        None => json!({ "type": "object" }),
    }
}

/// Build the full OpenAPI document for every contract registered with the
/// route table, resolving request/response schemas against `registry`.
pub fn build_spec(config: &OpenApiConfig, contracts: &[&HandlerContract], registry: &SchemaRegistry) -> Value {
    let mut paths: Map<String, Value> = Map::new();
    let mut schemas: Map<String, Value> = Map::new();

    for contract in contracts {
        let mut operation: Map<String, Value> = Map::new();
        operation.insert("operationId".into(), json!(contract.name));
        operation.insert("tags".into(), json!([contract.tag]));
        operation.insert("description".into(), json!(contract.description));

        let mut params: Vec<Value> = contract.parameters.iter().map(|p| param_object(p, "path")).collect();
        params.extend(contract.query.iter().map(|p| param_object(p, "query")));
        if !params.is_empty() {
            operation.insert("parameters".into(), json!(params));
        }

        if let Some(ref body_type) = contract.request_body {
            if !schemas.contains_key(body_type) {
                schemas.insert(body_type.clone(), schema_ref_or_object(registry, body_type));
            }
            operation.insert(
                "requestBody".into(),
                json!({
                    "required": true,
                    "content": {
                        "application/json": {
                            "schema": { "$ref": format!("#/components/schemas/{body_type}") }
                        }
                    }
                }),
            );
        }

        let mut responses: Map<String, Value> = Map::new();
        let status_key = contract.response.status.to_string();
        let status_desc = status_description(contract.response.status);
        match &contract.response.type_ref {
            Some(resp_type) if contract.response.status != 204 => {
                if !schemas.contains_key(resp_type) {
                    schemas.insert(resp_type.clone(), schema_ref_or_object(registry, resp_type));
                }
                responses.insert(
                    status_key,
                    json!({
                        "description": status_desc,
                        "content": {
                            "application/json": {
                                "schema": { "$ref": format!("#/components/schemas/{resp_type}") }
                            }
                        }
                    }),
                );
            }
            _ => {
                responses.insert(status_key, json!({ "description": status_desc }));
            }
        }
        for error_status in &contract.response.errors {
            responses
                .entry(error_status.to_string())
                .or_insert_with(|| json!({ "description": status_description(*error_status) }));
        }
        operation.insert("responses".into(), Value::Object(responses));

        if contract.auth {
            let scopes = contract.scope.as_ref().map(|s| vec![s.clone()]).unwrap_or_default();
            operation.insert("security".into(), json!([{ "bearerAuth": scopes }]));
        }

        let path_entry = paths.entry(contract.path.clone()).or_insert_with(|| json!({}));
        if let Some(obj) = path_entry.as_object_mut() {
            obj.insert(method_key(&contract.method), Value::Object(operation));
        }
    }

    let mut info: Map<String, Value> = Map::new();
    info.insert("title".into(), json!(config.title));
    info.insert("version".into(), json!(config.version));
    if let Some(ref desc) = config.description {
        info.insert("description".into(), json!(desc));
    }

    let mut components: Map<String, Value> = Map::new();
    components.insert(
        "securitySchemes".into(),
        json!({
            "bearerAuth": {
                "type": "http",
                "scheme": "bearer",
                "bearerFormat": "JWT"
            }
        }),
    );
    if !schemas.is_empty() {
        components.insert("schemas".into(), Value::Object(schemas));
    }

    json!({
        "openapi": "3.1.0",
        "info": info,
        "paths": paths,
        "components": components
    })
}

fn method_key(method: &Method) -> String {
    method.as_str().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use zbz_core::http::ResponseInfo;

    fn contract(method: Method, path: &str, name: &str) -> HandlerContract {
        HandlerContract {
            name: name.to_string(),
            description: format!("{name} description"),
            tag: "Test".to_string(),
            method,
            path: path.to_string(),
            parameters: vec![],
            query: vec![],
            request_body: None,
            response: ResponseInfo { status: 200, type_ref: None, errors: vec![] },
            auth: false,
            scope: None,
        }
    }

    fn config() -> OpenApiConfig {
        OpenApiConfig::new("Test API", "0.1.0")
    }

    #[test]
    fn empty_spec_has_no_paths() {
        let spec = build_spec(&config(), &[], &SchemaRegistry::new());
        assert!(spec["paths"].as_object().unwrap().is_empty());
        assert_eq!(spec["openapi"], "3.1.0");
    }

    #[test]
    fn single_route_is_documented() {
        let contract = contract(Method::GET, "/widgets", "list_widgets");
        let spec = build_spec(&config(), &[&contract], &SchemaRegistry::new());
        let op = &spec["paths"]["/widgets"]["get"];
        assert_eq!(op["operationId"], "list_widgets");
        assert_eq!(op["tags"], json!(["Test"]));
    }

    #[test]
    fn auth_route_carries_security_and_scope() {
        let mut contract = contract(Method::DELETE, "/widgets/{id}", "delete_widget");
        contract.auth = true;
        contract.scope = Some("widgets:delete".to_string());
        let spec = build_spec(&config(), &[&contract], &SchemaRegistry::new());
        let security = &spec["paths"]["/widgets/{id}"]["delete"]["security"][0]["bearerAuth"];
        assert_eq!(security, &json!(["widgets:delete"]));
    }

    #[test]
    fn request_body_references_registered_schema() {
        let mut registry = SchemaRegistry::new();
        registry.register("CreateWidget", json!({"type": "object", "properties": {"name": {"type": "string"}}}));
        let mut contract = contract(Method::POST, "/widgets", "create_widget");
        contract.request_body = Some("CreateWidget".to_string());
        let spec = build_spec(&config(), &[&contract], &registry);

        let req_body = &spec["paths"]["/widgets"]["post"]["requestBody"];
        assert_eq!(req_body["content"]["application/json"]["schema"]["$ref"], "#/components/schemas/CreateWidget");
        assert_eq!(spec["components"]["schemas"]["CreateWidget"]["properties"]["name"]["type"], "string");
    }

    #[test]
    fn unregistered_type_falls_back_to_generic_object() {
        let mut contract = contract(Method::POST, "/widgets", "create_widget");
        contract.request_body = Some("Unknown".to_string());
        let spec = build_spec(&config(), &[&contract], &SchemaRegistry::new());
        assert_eq!(spec["components"]["schemas"]["Unknown"], json!({"type": "object"}));
    }

    #[test]
    fn no_content_response_has_no_content_block() {
        let mut contract = contract(Method::DELETE, "/widgets/{id}", "delete_widget");
        contract.response = ResponseInfo { status: 204, type_ref: None, errors: vec![404] };
        let spec = build_spec(&config(), &[&contract], &SchemaRegistry::new());
        let responses = &spec["paths"]["/widgets/{id}"]["delete"]["responses"];
        assert_eq!(responses["204"]["description"], "No content");
        assert!(responses["204"].get("content").is_none());
        assert_eq!(responses["404"]["description"], "Not found");
    }

    #[test]
    fn path_and_query_params_are_distinguished() {
        let mut contract = contract(Method::GET, "/widgets/{id}", "get_widget");
        contract.parameters = vec![ParamInfo { name: "id".to_string(), description: None, required: true }];
        contract.query = vec![ParamInfo { name: "expand".to_string(), description: None, required: false }];
        let spec = build_spec(&config(), &[&contract], &SchemaRegistry::new());
        let params = spec["paths"]["/widgets/{id}"]["get"]["parameters"].as_array().unwrap();
        assert_eq!(params[0]["in"], "path");
        assert_eq!(params[1]["in"], "query");
    }
}
