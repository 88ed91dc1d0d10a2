//! Parsed model metadata (§3 `Meta`/`FieldMetadata`) and the lazy,
//! cache-once catalog (component C2, §4.2).

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};

use chrono::{DateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use super::raw::{RawField, RawMeta};
use crate::validation::{self, Rule, ScopeRules};

/// The `id`/`created_at`/`updated_at` triad every model embeds via
/// `BaseModel`. The catalog appends these three fields exactly once, never
/// read from `RawField`.
#[derive(Debug, Clone)]
pub struct BaseModel {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Default for BaseModel {
    fn default() -> Self {
        let now = Utc::now();
        BaseModel {
            id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Encryption classes a field may declare via `encrypt = "..."`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncryptionClass {
    Pii,
    Financial,
    Medical,
    Homomorphic,
}

#[derive(Debug, Clone)]
pub struct Encryption {
    pub class: EncryptionClass,
    pub algorithm: Option<String>,
    pub residency: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Redaction {
    /// The only strategy the source data model names — a literal
    /// replacement string supplied via the `redact` tag.
    pub value: String,
}

#[derive(Debug, Clone)]
pub struct FieldMetadata {
    pub name: String,
    pub database_column_name: String,
    pub json_field_name: String,
    pub rust_type: String,
    pub database_type: String,
    pub description: Option<String>,
    pub example_value: Option<String>,
    pub is_required: bool,
    pub validation_rules: Vec<Rule>,
    pub edit_type: Option<String>,
    pub scope_rules: ScopeRules,
    pub encryption: Option<Encryption>,
    pub redaction: Option<Redaction>,
}

#[derive(Debug, Clone)]
pub struct Meta {
    pub name: String,
    pub description: String,
    pub fields: Vec<FieldMetadata>,
    pub column_names: Vec<String>,
}

/// Types annotated with `#[derive(Model)]` implement this; the derive emits
/// the body, never hand-written.
pub trait Described: Any {
    fn raw_meta() -> RawMeta;
}

/// Closed type→SQL mapping (§4.2). Unknown Rust types fall through to
/// `text` with a warning — the table is intentionally not extensible at
/// runtime, matching the source's closed-table design.
fn sql_type_for(rust_type: &str) -> &'static str {
    match strip_option(rust_type) {
        "String" | "str" => "text",
        "i8" | "i16" | "i32" | "u8" | "u16" | "u32" => "integer",
        "i64" | "u64" | "isize" | "usize" => "bigint",
        "f32" => "real",
        "f64" => "double precision",
        "bool" => "boolean",
        t if t.contains("DateTime") => "timestamp with time zone",
        t if t == "Vec<u8>" || t == "Vec < u8 >" => "bytea",
        other => {
            warn!(rust_type = other, "unrecognized field type, defaulting to text column");
            "text"
        }
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

fn parse_encryption(field: &RawField) -> Result<Option<Encryption>, String> {
    let Some(class_str) = field.encrypt else {
        return Ok(None);
    };
    let class = match class_str {
        "pii" => EncryptionClass::Pii,
        "financial" => EncryptionClass::Financial,
        "medical" => EncryptionClass::Medical,
        "homomorphic" => EncryptionClass::Homomorphic,
        other => return Err(format!("unknown encrypt class '{other}' on field '{}'", field.rust_name)),
    };
    let residency = field
        .residency
        .map(|s| s.split(',').map(|p| p.trim().to_string()).collect())
        .unwrap_or_default();
    Ok(Some(Encryption {
        class,
        algorithm: field.encrypt_algo.map(str::to_string),
        residency,
    }))
}

fn base_field(name: &str, rust_type: &str) -> FieldMetadata {
    FieldMetadata {
        name: name.to_string(),
        database_column_name: name.to_string(),
        json_field_name: name.to_string(),
        rust_type: rust_type.to_string(),
        database_type: sql_type_for(rust_type).to_string(),
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

fn build_meta(raw: RawMeta) -> Result<Meta, String> {
    let mut fields = Vec::new();

    if raw.has_base {
        fields.push(base_field("id", "Uuid"));
        fields.push(base_field("created_at", "DateTime<Utc>"));
        fields.push(base_field("updated_at", "DateTime<Utc>"));
    }

    let mut seen_columns: HashMap<String, ()> = HashMap::new();
    for field in &raw.fields {
        let db_name = field.db.unwrap_or(field.rust_name);
        if db_name != "-" {
            if seen_columns.insert(db_name.to_string(), ()).is_some() {
                return Err(format!(
                    "duplicate database column '{db_name}' on model '{}'",
                    raw.type_name
                ));
            }
        }

        let validation_rules = match field.validate {
            Some(tag) => validation::parse_rules(tag)?,
            None => Vec::new(),
        };
        let scope_rules = match field.scope {
            Some(tag) => validation::parse_scope_rules(tag)?,
            None => ScopeRules::default(),
        };
        let redaction = field.redact.map(|value| Redaction {
            value: value.to_string(),
        });

        fields.push(FieldMetadata {
            name: field.rust_name.to_string(),
            database_column_name: if db_name == "-" { String::new() } else { db_name.to_string() },
            json_field_name: field.json.unwrap_or(field.rust_name).to_string(),
            rust_type: field.rust_type.to_string(),
            database_type: sql_type_for(field.rust_type).to_string(),
            description: field.desc.map(str::to_string),
            example_value: field.example.map(str::to_string),
            is_required: !field.is_option && validation_rules.contains(&Rule::Required),
            validation_rules,
            edit_type: field.edit.map(str::to_string),
            scope_rules,
            encryption: parse_encryption(field)?,
            redaction,
        });
    }

    let column_names = fields
        .iter()
        .filter(|f| !f.database_column_name.is_empty())
        .map(|f| f.database_column_name.clone())
        .collect();

    Ok(Meta {
        name: raw.type_name.to_string(),
        description: raw.description.to_string(),
        fields,
        column_names,
    })
}

struct CacheEntry {
    type_name: &'static str,
    meta: Arc<Meta>,
}

static CACHE: OnceLock<RwLock<HashMap<TypeId, CacheEntry>>> = OnceLock::new();

fn cache() -> &'static RwLock<HashMap<TypeId, CacheEntry>> {
    CACHE.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Reflect (or fetch the cached reflection of) `T`'s model metadata.
///
/// Reflection happens exactly once per type for the process lifetime; the
/// lock's write path is only taken on the first call for a given `T`.
pub fn select<T: Described + 'static>() -> Arc<Meta> {
    let id = TypeId::of::<T>();
    if let Some(entry) = cache().read().expect("catalog lock poisoned").get(&id) {
        return entry.meta.clone();
    }

    let mut guard = cache().write().expect("catalog lock poisoned");
    // Double-checked: another thread may have won the race to the write lock.
    if let Some(entry) = guard.get(&id) {
        return entry.meta.clone();
    }

    let raw = T::raw_meta();
    let type_name = raw.type_name;
    let meta = Arc::new(build_meta(raw).unwrap_or_else(|err| {
        panic!("invalid #[derive(Model)] metadata for '{type_name}': {err}")
    }));
    guard.insert(
        id,
        CacheEntry {
            type_name,
            meta: meta.clone(),
        },
    );
    meta
}

/// All type names reflected so far.
pub fn browse() -> Vec<&'static str> {
    cache()
        .read()
        .expect("catalog lock poisoned")
        .values()
        .map(|e| e.type_name)
        .collect()
}

/// The registered type name for `T`, reflecting it if needed.
pub fn type_name<T: Described + 'static>() -> &'static str {
    select::<T>();
    let id = TypeId::of::<T>();
    cache()
        .read()
        .expect("catalog lock poisoned")
        .get(&id)
        .map(|e| e.type_name)
        .expect("just inserted")
}

/// Test-only: clears the catalog cache so tests can observe a clean first
/// reflection (the production catalog is permanent for the process).
#[cfg(test)]
pub fn reset() {
    cache().write().expect("catalog lock poisoned").clear();
}
