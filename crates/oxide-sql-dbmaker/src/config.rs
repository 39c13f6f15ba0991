//! Connection settings and backend options.
//!
//! Settings are read once, validated, and never mutated afterwards. Option
//! keys follow the names used in the `OPTIONS` mapping of a database entry.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Longest identifier (and database name) DBMaker accepts.
pub const MAX_NAME_LENGTH: usize = 128;

/// Backend options recognized in `OPTIONS`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseOptions {
    /// Multiple active result sets.
    #[serde(rename = "MARS_Connection")]
    pub mars_connection: bool,
    /// First day of the week (7 = Sunday).
    pub datefirst: u8,
    /// Ask the driver for unicode result strings.
    pub unicode_results: bool,
    /// Client character encoding.
    pub encoding: String,
    /// Whether the driver needs UTF-8 encoded statements.
    pub driver_needs_utf8: Option<bool>,
    /// Restrict table listing to the connected schema.
    pub limit_table_list: bool,
    /// Collation appended to every `LIKE` lookup.
    pub collation: Option<String>,
    /// Opening identifier quote.
    pub left_sql_quote: String,
    /// Closing identifier quote.
    pub right_sql_quote: String,
    /// ODBC driver name or absolute path.
    pub driver: Option<String>,
    /// ODBC data source name.
    pub dsn: Option<String>,
}

impl Default for DatabaseOptions {
    fn default() -> Self {
        Self {
            mars_connection: false,
            datefirst: 7,
            unicode_results: false,
            encoding: String::from("utf-8"),
            driver_needs_utf8: None,
            limit_table_list: false,
            collation: None,
            left_sql_quote: String::from("\""),
            right_sql_quote: String::from("\""),
            driver: None,
            dsn: None,
        }
    }
}

/// A database entry: connection parameters plus [`DatabaseOptions`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE", default)]
pub struct DatabaseSettings {
    /// Database name.
    pub name: Option<String>,
    /// Login user.
    pub user: Option<String>,
    /// Login password.
    pub password: Option<String>,
    /// Server host.
    pub host: Option<String>,
    /// Server port.
    pub port: Option<String>,
    /// Backend options.
    pub options: DatabaseOptions,
}

impl DatabaseSettings {
    /// Creates settings for the named database with default options.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Parses settings from a JSON object.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Configuration(e.to_string()))
    }

    /// Parses settings from an already decoded JSON value.
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| Error::Configuration(e.to_string()))
    }

    /// Checks the settings before any connection is attempted.
    pub fn validate(&self) -> Result<()> {
        let name = self.name.as_deref().unwrap_or_default();
        if name.is_empty() {
            return Err(Error::Configuration(String::from(
                "the database NAME is required; supply it in the database settings",
            )));
        }
        let len = name.chars().count();
        if len > MAX_NAME_LENGTH {
            return Err(Error::Configuration(format!(
                "the database name '{name}' ({len} characters) is longer than \
                 DBMaker's limit of {MAX_NAME_LENGTH} characters"
            )));
        }
        let options = &self.options;
        if options.left_sql_quote.is_empty() || options.right_sql_quote.is_empty() {
            return Err(Error::Configuration(String::from(
                "left_sql_quote and right_sql_quote must not be empty",
            )));
        }
        Ok(())
    }

    /// Returns the validated database name.
    pub fn database_name(&self) -> Result<&str> {
        self.validate()?;
        Ok(self.name.as_deref().unwrap_or_default())
    }
}
