//! Metadata catalog (component C2, §4.2).
//!
//! `select::<T>()` is the spec's `Select[T]()`: reflect `T` into a `Meta` on
//! first call, cache permanently, return the cached `Arc` on every
//! subsequent call from any thread.

pub mod meta;
pub mod raw;

pub use meta::{
    browse, reset, select, type_name, BaseModel, Described, Encryption, EncryptionClass, FieldMetadata, Meta,
    Redaction,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(dead_code)]
    struct User {
        base: BaseModel,
        name: String,
        email: String,
    }

    impl Described for User {
        fn raw_meta() -> raw::RawMeta {
            raw::RawMeta {
                type_name: "User",
                description: "a user account",
                has_base: true,
                fields: vec![
                    raw::RawField {
                        rust_name: "name",
                        rust_type: "String",
                        is_option: false,
                        json: Some("name"),
                        db: Some("name"),
                        desc: None,
                        example: None,
                        validate: Some("required,min=1"),
                        scope: None,
                        encrypt: None,
                        encrypt_algo: None,
                        residency: None,
                        redact: None,
                        edit: None,
                    },
                    raw::RawField {
                        rust_name: "email",
                        rust_type: "String",
                        is_option: false,
                        json: Some("email"),
                        db: Some("email"),
                        desc: None,
                        example: None,
                        validate: Some("required,email"),
                        scope: Some("read:user,write:admin"),
                        encrypt: None,
                        encrypt_algo: None,
                        residency: None,
                        redact: None,
                        edit: None,
                    },
                ],
            }
        }
    }

    #[test]
    fn select_appends_base_fields_exactly_once() {
        reset();
        let meta = select::<User>();
        let base_fields: Vec<_> = meta
            .fields
            .iter()
            .filter(|f| f.name == "id" || f.name == "created_at" || f.name == "updated_at")
            .collect();
        assert_eq!(base_fields.len(), 3);
    }

    #[test]
    fn select_is_idempotent_across_calls() {
        reset();
        let first = select::<User>();
        let second = select::<User>();
        assert!(std::sync::Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn select_parses_scope_tag_into_read_and_write_sets() {
        reset();
        let meta = select::<User>();
        let email = meta.fields.iter().find(|f| f.name == "email").unwrap();
        assert_eq!(email.scope_rules.read, vec!["user".to_string()]);
        assert_eq!(email.scope_rules.write, vec!["admin".to_string()]);
    }

    #[test]
    fn browse_lists_reflected_type_names() {
        reset();
        select::<User>();
        assert!(browse().contains(&"User"));
    }
}
