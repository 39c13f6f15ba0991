//! Error types for the DBMaker adapter.

use thiserror::Error;

use crate::codec::DecodeError;

/// Boxed error reported by the ODBC driver layer.
pub type DriverError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors surfaced by the adapter.
///
/// None of these are retried or swallowed inside the crate; they carry
/// enough context (statement, table, raw value) to log without
/// re-deriving it.
#[derive(Debug, Error)]
pub enum Error {
    /// A column-order bitmap could not be decoded.
    #[error("malformed column-order bitmap: {0}")]
    Decode(#[from] DecodeError),

    /// No type-mapping entry exists for a field kind.
    #[error("unknown field kind: {0}")]
    UnknownFieldKind(String),

    /// A lookup or connector name has no dialect rendering.
    #[error("unsupported {kind}: '{name}'")]
    UnknownLookup {
        /// What was being looked up ("date part", "lookup", "connector").
        kind: &'static str,
        /// The unrecognized name.
        name: String,
    },

    /// A catalog statement failed.
    #[error("catalog query failed for table '{table}': {source}\n  sql: {sql}")]
    CatalogQuery {
        /// The statement that failed.
        sql: String,
        /// The table being introspected.
        table: String,
        /// The driver error.
        #[source]
        source: DriverError,
    },

    /// A connection-level statement failed.
    #[error("statement failed: {source}\n  sql: {sql}")]
    Statement {
        /// The statement that failed.
        sql: String,
        /// The driver error.
        #[source]
        source: DriverError,
    },

    /// A required connection parameter is missing or invalid.
    #[error("improperly configured: {0}")]
    Configuration(String),

    /// A value does not fit the target column's declared precision.
    #[error("value {value} does not fit in {max_digits} digits with {decimal_places} decimal places")]
    ValueOutOfRange {
        /// The offending value as text.
        value: String,
        /// Declared precision.
        max_digits: u32,
        /// Declared scale.
        decimal_places: u32,
    },

    /// A value returned by the driver could not be converted.
    #[error("invalid {kind} value: '{value}'")]
    InvalidValue {
        /// What the value was expected to be (e.g. "uuid").
        kind: &'static str,
        /// The raw value.
        value: String,
    },
}

impl Error {
    /// Builds a [`Error::CatalogQuery`] from a driver failure.
    pub fn catalog(sql: impl Into<String>, table: impl Into<String>, source: DriverError) -> Self {
        Self::CatalogQuery {
            sql: sql.into(),
            table: table.into(),
            source,
        }
    }
}

/// Result type alias for adapter operations.
pub type Result<T> = std::result::Result<T, Error>;
