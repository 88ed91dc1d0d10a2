//! `TrustedSQLIdentifier` — an opaque, validator-constructed string safe to
//! interpolate into a macro template without further escaping.
//!
//! The allow-list matches the one `QueryBuilder::format_identifier_checked`
//! used against user-supplied column names: ASCII letters/digits/underscore,
//! not starting with a digit.

use crate::error::DataError;

/// A string that has passed [`validate`] and is therefore safe to splice
/// into a `{{table}}`/`{{columns}}`/`{{values}}`/`{{updates}}` macro slot.
///
/// The inner `String` is private: the only way to produce one is through
/// [`validate`] or the join helpers below, both of which re-derive from
/// already-validated pieces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustedSQLIdentifier(String);

impl TrustedSQLIdentifier {
    /// Validate a single bare identifier (a table or column name).
    pub fn validate(raw: &str) -> Result<Self, DataError> {
        if !is_valid_identifier(raw) {
            return Err(DataError::InvalidIdentifier(raw.to_string()));
        }
        Ok(Self(raw.to_string()))
    }

    /// Join already-validated identifiers with a literal separator. Safe
    /// because every piece going in was itself validated.
    pub fn join(parts: &[TrustedSQLIdentifier], sep: &str) -> Self {
        Self(parts.iter().map(|p| p.0.as_str()).collect::<Vec<_>>().join(sep))
    }

    /// Join already-validated identifiers through a formatting closure
    /// (e.g. `":{col}"` for a values list), then glue the results together.
    pub fn join_with(parts: &[TrustedSQLIdentifier], sep: &str, f: impl Fn(&str) -> String) -> Self {
        Self(parts.iter().map(|p| f(p.0.as_str())).collect::<Vec<_>>().join(sep))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TrustedSQLIdentifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

fn is_valid_identifier(ident: &str) -> bool {
    let mut chars = ident.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_letters_digits_underscore() {
        assert!(TrustedSQLIdentifier::validate("user_name_2").is_ok());
    }

    #[test]
    fn rejects_leading_digit() {
        assert!(TrustedSQLIdentifier::validate("2fast").is_err());
    }

    #[test]
    fn rejects_injection_attempt() {
        assert!(TrustedSQLIdentifier::validate("users; drop table users").is_err());
        assert!(TrustedSQLIdentifier::validate("name--").is_err());
    }

    #[test]
    fn rejects_empty_string() {
        assert!(TrustedSQLIdentifier::validate("").is_err());
    }

    #[test]
    fn join_glues_validated_pieces() {
        let a = TrustedSQLIdentifier::validate("id").unwrap();
        let b = TrustedSQLIdentifier::validate("name").unwrap();
        let joined = TrustedSQLIdentifier::join(&[a, b], ", ");
        assert_eq!(joined.as_str(), "id, name");
    }
}
