//! The compile-time intermediate representation emitted by `#[derive(Model)]`.
//!
//! `zbz-macros` only extracts unparsed attribute strings — it never parses
//! validation grammar, scope grammar, or type→SQL mappings itself. That
//! parsing happens once, lazily, in [`super::meta`] on first [`super::Select`].
//! Keeping the macro this simple means the harder-to-verify code path (tag
//! grammar, SQL dialect mapping) lives in ordinary Rust, not in a proc-macro.

/// One field's raw, unparsed `#[model(...)]` attributes.
#[derive(Debug, Clone)]
pub struct RawField {
    pub rust_name: &'static str,
    pub rust_type: &'static str,
    pub is_option: bool,
    pub json: Option<&'static str>,
    pub db: Option<&'static str>,
    pub desc: Option<&'static str>,
    pub example: Option<&'static str>,
    pub validate: Option<&'static str>,
    pub scope: Option<&'static str>,
    pub encrypt: Option<&'static str>,
    pub encrypt_algo: Option<&'static str>,
    pub residency: Option<&'static str>,
    pub redact: Option<&'static str>,
    pub edit: Option<&'static str>,
}

/// The raw descriptor for one `#[derive(Model)]` type.
#[derive(Debug, Clone)]
pub struct RawMeta {
    pub type_name: &'static str,
    pub description: &'static str,
    /// Whether the struct embeds `BaseModel` — the catalog appends the
    /// `id`/`created_at`/`updated_at` triad exactly once when true.
    pub has_base: bool,
    pub fields: Vec<RawField>,
}
