//! SQL dialect description.
//!
//! The [`Dialect`] trait carries the identifier quoting a statement
//! builder needs; [`DbmakerDialect`] is the DBMaker instance of it.

/// Trait for SQL dialect-specific behavior.
pub trait Dialect {
    /// Returns the name of the dialect.
    fn name(&self) -> &'static str;

    /// Opening identifier quote.
    fn left_quote(&self) -> &str {
        "\""
    }

    /// Closing identifier quote.
    fn right_quote(&self) -> &str {
        "\""
    }

    /// Quotes an identifier. Names that are already quoted come back
    /// unchanged.
    fn quote_identifier(&self, name: &str) -> String {
        let (left, right) = (self.left_quote(), self.right_quote());
        if name.len() >= left.len() + right.len() && name.starts_with(left) && name.ends_with(right)
        {
            return name.to_string();
        }
        format!("{left}{name}{right}")
    }
}

/// DBMaker dialect with configurable identifier quotes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbmakerDialect {
    left_quote: String,
    right_quote: String,
}

impl DbmakerDialect {
    /// Creates a dialect quoting identifiers with `"`.
    #[must_use]
    pub fn new() -> Self {
        Self::with_quotes("\"", "\"")
    }

    /// Creates a dialect with custom identifier quotes.
    #[must_use]
    pub fn with_quotes(left: impl Into<String>, right: impl Into<String>) -> Self {
        Self {
            left_quote: left.into(),
            right_quote: right.into(),
        }
    }
}

impl Default for DbmakerDialect {
    fn default() -> Self {
        Self::new()
    }
}

impl Dialect for DbmakerDialect {
    fn name(&self) -> &'static str {
        "dbmaker"
    }

    fn left_quote(&self) -> &str {
        &self.left_quote
    }

    fn right_quote(&self) -> &str {
        &self.right_quote
    }
}
