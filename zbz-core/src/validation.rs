//! Tag-driven validation engine (component C7).
//!
//! Rules come from the `validate` tag string parsed by the catalog, not
//! from a second derive pass — this module is the grammar and the engine,
//! the catalog is the cache.

use std::collections::HashMap;

use serde::Serialize;

/// One parsed `validate` rule.
#[derive(Debug, Clone, PartialEq)]
pub enum Rule {
    Required,
    Min(f64),
    Max(f64),
    Email,
    OneOf(Vec<String>),
}

/// Parse a comma-separated `validate` tag (`"required,min=1"`,
/// `"oneof=a b c"`) into a rule list.
///
/// Unknown rule keys are a load-time error — silent acceptance of a typo'd
/// rule would make the field unvalidated without anyone noticing.
pub fn parse_rules(tag: &str) -> Result<Vec<Rule>, String> {
    tag.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|clause| {
            if let Some((key, value)) = clause.split_once('=') {
                match key {
                    "min" => value
                        .parse::<f64>()
                        .map(Rule::Min)
                        .map_err(|_| format!("invalid min value in rule '{clause}'")),
                    "max" => value
                        .parse::<f64>()
                        .map(Rule::Max)
                        .map_err(|_| format!("invalid max value in rule '{clause}'")),
                    "oneof" => Ok(Rule::OneOf(
                        value.split_whitespace().map(str::to_string).collect(),
                    )),
                    other => Err(format!("unknown validation rule '{other}' in tag '{tag}'")),
                }
            } else {
                match clause {
                    "required" => Ok(Rule::Required),
                    "email" => Ok(Rule::Email),
                    other => Err(format!("unknown validation rule '{other}' in tag '{tag}'")),
                }
            }
        })
        .collect()
}

/// One field-level validation failure.
#[derive(Debug, Clone, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
    pub rule: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub param: Option<String>,
}

/// The body of a 422 response (§6 error envelope).
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationErrorResponse {
    pub fields: HashMap<String, String>,
    pub details: Vec<FieldError>,
}

impl ValidationErrorResponse {
    pub fn is_empty(&self) -> bool {
        self.details.is_empty()
    }

    fn push(&mut self, err: FieldError) {
        self.fields.entry(err.field.clone()).or_insert_with(|| err.message.clone());
        self.details.push(err);
    }
}

/// Validate one field's JSON value against its parsed rules.
///
/// `value` is `None` when the field was entirely absent from the payload.
pub fn validate_field(rules: &[Rule], field: &str, value: Option<&serde_json::Value>) -> Vec<FieldError> {
    let mut errors = Vec::new();
    let is_present = value.is_some_and(|v| !v.is_null());

    for rule in rules {
        match rule {
            Rule::Required => {
                if !is_present {
                    errors.push(FieldError {
                        field: field.to_string(),
                        message: format!("{field} is required"),
                        rule: "required".to_string(),
                        param: None,
                    });
                }
            }
            Rule::Min(min) => {
                if let Some(v) = value {
                    if !satisfies_min(v, *min) {
                        errors.push(FieldError {
                            field: field.to_string(),
                            message: format!("{field} must be at least {min}"),
                            rule: "min".to_string(),
                            param: Some(min.to_string()),
                        });
                    }
                }
            }
            Rule::Max(max) => {
                if let Some(v) = value {
                    if !satisfies_max(v, *max) {
                        errors.push(FieldError {
                            field: field.to_string(),
                            message: format!("{field} must be at most {max}"),
                            rule: "max".to_string(),
                            param: Some(max.to_string()),
                        });
                    }
                }
            }
            Rule::Email => {
                if let Some(serde_json::Value::String(s)) = value {
                    if !is_valid_email(s) {
                        errors.push(FieldError {
                            field: field.to_string(),
                            message: format!("{field} must be a valid email address"),
                            rule: "email".to_string(),
                            param: None,
                        });
                    }
                }
            }
            Rule::OneOf(options) => {
                if let Some(serde_json::Value::String(s)) = value {
                    if !options.iter().any(|opt| opt == s) {
                        errors.push(FieldError {
                            field: field.to_string(),
                            message: format!("{field} must be one of: {}", options.join(", ")),
                            rule: "oneof".to_string(),
                            param: Some(options.join(" ")),
                        });
                    }
                }
            }
        }
    }
    errors
}

fn satisfies_min(value: &serde_json::Value, min: f64) -> bool {
    match value {
        serde_json::Value::Number(n) => n.as_f64().map(|v| v >= min).unwrap_or(false),
        serde_json::Value::String(s) => s.chars().count() as f64 >= min,
        _ => true,
    }
}

fn satisfies_max(value: &serde_json::Value, max: f64) -> bool {
    match value {
        serde_json::Value::Number(n) => n.as_f64().map(|v| v <= max).unwrap_or(false),
        serde_json::Value::String(s) => s.chars().count() as f64 <= max,
        _ => true,
    }
}

#[derive(garde::Validate)]
struct EmailShape<'a> {
    #[garde(email)]
    value: &'a str,
}

fn is_valid_email(value: &str) -> bool {
    use garde::Validate;
    EmailShape { value }.validate(&()).is_ok()
}

/// Collect validation errors for a whole record from its field rules.
pub fn validate_record(
    rules_by_field: &[(String, Vec<Rule>)],
    payload: &serde_json::Map<String, serde_json::Value>,
) -> ValidationErrorResponse {
    let mut resp = ValidationErrorResponse::default();
    for (field, rules) in rules_by_field {
        for err in validate_field(rules, field, payload.get(field)) {
            resp.push(err);
        }
    }
    resp
}

// ── Scope grammar (§4.2, §9 "Scope parsing") ────────────────────────────

/// The read/write permission sets required to access one field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScopeRules {
    pub read: Vec<String>,
    pub write: Vec<String>,
}

impl ScopeRules {
    pub fn readable_by(&self, permissions: &[String]) -> bool {
        self.read.is_empty() || self.read.iter().any(|p| permissions.iter().any(|g| g == p))
    }

    pub fn writable_by(&self, permissions: &[String]) -> bool {
        self.write.is_empty() || self.write.iter().any(|p| permissions.iter().any(|g| g == p))
    }
}

/// Parse a `scope` tag (`"read:user,write:admin"`) into read/write sets.
///
/// Accepts `read:perm`, bare `perm` (required for both read and write), and
/// `write|create|update:perm` for the write side. Any other prefix is an
/// ambiguous tag and is a load-time error rather than silently ignored.
pub fn parse_scope_rules(tag: &str) -> Result<ScopeRules, String> {
    let mut rules = ScopeRules::default();
    for clause in tag.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        match clause.split_once(':') {
            Some((prefix, perm)) => {
                let perm = perm.trim();
                if perm.is_empty() {
                    return Err(format!("empty permission in scope tag '{clause}'"));
                }
                match prefix {
                    "read" => rules.read.push(perm.to_string()),
                    "write" | "create" | "update" => rules.write.push(perm.to_string()),
                    other => return Err(format!("unrecognized scope prefix '{other}' in tag '{clause}'")),
                }
            }
            None => {
                rules.read.push(clause.to_string());
                rules.write.push(clause.to_string());
            }
        }
    }
    Ok(rules)
}

/// Scope-aware (de)serialization (§4.2, §4.5, §9 open question (c)).
///
/// Precedence: scope exclusion wins. A field the caller cannot read is
/// treated as entirely absent from the output; redaction only ever applies
/// to a field that *passed* the scope check. The two are never combined on
/// the same field in the same payload.
pub mod scope {
    use super::ScopeRules;
    use serde_json::{Map, Value};

    /// One field's scope and optional redaction policy, as needed to filter
    /// a serialized payload. Built from `catalog::FieldMetadata` by callers.
    pub struct ScopedField<'a> {
        pub json_name: &'a str,
        pub scope: &'a ScopeRules,
        /// `Some(literal)` when the field has a `redact` tag.
        pub redact: Option<&'a str>,
    }

    /// Filter an already-serialized record for the caller's permissions.
    ///
    /// A field failing the read-scope check is removed entirely. A field
    /// that passes the scope check but carries a `redact` tag has its value
    /// replaced with the literal redaction string.
    pub fn serialize_scoped(mut record: Value, fields: &[ScopedField], permissions: &[String]) -> Value {
        if let Value::Object(map) = &mut record {
            filter_object(map, fields, permissions);
        }
        record
    }

    fn filter_object(map: &mut Map<String, Value>, fields: &[ScopedField], permissions: &[String]) {
        for field in fields {
            if !field.scope.readable_by(permissions) {
                map.remove(field.json_name);
                continue;
            }
            if let Some(redacted) = field.redact {
                if map.contains_key(field.json_name) {
                    map.insert(field.json_name.to_string(), Value::String(redacted.to_string()));
                }
            }
        }
    }

    /// Verify every field present in an inbound payload is writable by the
    /// caller's permissions for the given operation (`create` or `update`).
    ///
    /// Returns the name of the first offending field, if any. Deserializing
    /// a scope-protected field without permission must fail loudly — it is
    /// never silently dropped.
    pub fn check_write_permissions<'a>(
        payload: &Map<String, Value>,
        fields: &'a [ScopedField],
        permissions: &[String],
    ) -> Option<&'a str> {
        fields
            .iter()
            .find(|f| payload.contains_key(f.json_name) && !f.scope.writable_by(permissions))
            .map(|f| f.json_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_rule_fails_on_absence() {
        let errors = validate_field(&[Rule::Required], "name", None);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].rule, "required");
    }

    #[test]
    fn required_rule_passes_when_present() {
        let value = serde_json::json!("a");
        let errors = validate_field(&[Rule::Required], "name", Some(&value));
        assert!(errors.is_empty());
    }

    #[test]
    fn min_rule_on_string_checks_length() {
        let value = serde_json::json!("");
        let errors = validate_field(&[Rule::Min(1.0)], "name", Some(&value));
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn email_rule_rejects_malformed_address() {
        let value = serde_json::json!("not-an-email");
        let errors = validate_field(&[Rule::Email], "email", Some(&value));
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn email_rule_accepts_well_formed_address() {
        let value = serde_json::json!("a@x.com");
        let errors = validate_field(&[Rule::Email], "email", Some(&value));
        assert!(errors.is_empty());
    }

    #[test]
    fn unknown_rule_key_is_a_parse_error() {
        assert!(parse_rules("bogus").is_err());
    }

    #[test]
    fn scope_bare_form_requires_both_read_and_write() {
        let rules = parse_scope_rules("admin").unwrap();
        assert_eq!(rules.read, vec!["admin".to_string()]);
        assert_eq!(rules.write, vec!["admin".to_string()]);
    }

    #[test]
    fn scope_unknown_prefix_is_ambiguous_and_errors() {
        assert!(parse_scope_rules("writ:admin").is_err());
    }

    #[test]
    fn scope_serialization_omits_unreadable_field() {
        use scope::{serialize_scoped, ScopedField};
        let record = serde_json::json!({ "name": "a", "email": "a@x.com" });
        let email_scope = parse_scope_rules("read:profile").unwrap();
        let fields = vec![ScopedField {
            json_name: "email",
            scope: &email_scope,
            redact: None,
        }];
        let filtered = serialize_scoped(record, &fields, &[]);
        assert!(filtered.get("email").is_none());
        assert!(filtered.get("name").is_some());
    }

    #[test]
    fn scope_write_check_flags_unwritable_field() {
        use scope::{check_write_permissions, ScopedField};
        let payload = serde_json::json!({ "ssn": "123-45-6789" });
        let payload = payload.as_object().unwrap();
        let ssn_scope = parse_scope_rules("write:admin").unwrap();
        let fields = vec![ScopedField {
            json_name: "ssn",
            scope: &ssn_scope,
            redact: None,
        }];
        let offender = check_write_permissions(payload, &fields, &["read:user".to_string()]);
        assert_eq!(offender, Some("ssn"));
    }
}
