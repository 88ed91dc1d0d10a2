//! Errors surfaced by the macro-embed builder, the prepared-statement cache,
//! and database drivers.

#[derive(Debug)]
pub enum DataError {
    NotFound(String),
    /// A `FieldMetadata::database_column_name` (or a model's table name)
    /// failed the trusted-identifier allow-list. No `MacroContract` is
    /// built or prepared when this occurs.
    InvalidIdentifier(String),
    /// No `MacroContract` is registered under this name in the driver's
    /// prepared-statement cache.
    UnknownContract(String),
    Database(Box<dyn std::error::Error + Send + Sync>),
    Other(String),
}

impl DataError {
    /// Construct a `Database` variant from any error type, for drivers
    /// wrapping their own backend-specific failures.
    pub fn database(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        DataError::Database(Box::new(err))
    }
}

impl std::fmt::Display for DataError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataError::NotFound(msg) => write!(f, "not found: {msg}"),
            DataError::InvalidIdentifier(ident) => write!(f, "invalid identifier: {ident}"),
            DataError::UnknownContract(name) => write!(f, "no prepared contract named '{name}'"),
            DataError::Database(err) => write!(f, "database error: {err}"),
            DataError::Other(msg) => write!(f, "data error: {msg}"),
        }
    }
}

impl std::error::Error for DataError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DataError::Database(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}
