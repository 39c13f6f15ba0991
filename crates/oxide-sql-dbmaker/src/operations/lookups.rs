//! Lookup operators and LIKE pattern handling.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Placeholder standing for the operand in operator templates.
pub const OPERAND: &str = "%s";

/// Abstract comparison operators used in filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LookupKind {
    /// `=`
    Exact,
    /// Case-insensitive `=`
    IExact,
    /// Substring match.
    Contains,
    /// Case-insensitive substring match.
    IContains,
    /// `>`
    Gt,
    /// `>=`
    Gte,
    /// `<`
    Lt,
    /// `<=`
    Lte,
    /// Prefix match.
    StartsWith,
    /// Suffix match.
    EndsWith,
    /// Case-insensitive prefix match.
    IStartsWith,
    /// Case-insensitive suffix match.
    IEndsWith,
    /// Regular expression, approximated with `LIKE`.
    Regex,
    /// Case-insensitive regular expression, approximated with `LIKE`.
    IRegex,
}

impl LookupKind {
    /// Every lookup kind.
    pub const ALL: &'static [Self] = &[
        Self::Exact,
        Self::IExact,
        Self::Contains,
        Self::IContains,
        Self::Gt,
        Self::Gte,
        Self::Lt,
        Self::Lte,
        Self::StartsWith,
        Self::EndsWith,
        Self::IStartsWith,
        Self::IEndsWith,
        Self::Regex,
        Self::IRegex,
    ];

    /// The lookup's name as used in filter expressions.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::IExact => "iexact",
            Self::Contains => "contains",
            Self::IContains => "icontains",
            Self::Gt => "gt",
            Self::Gte => "gte",
            Self::Lt => "lt",
            Self::Lte => "lte",
            Self::StartsWith => "startswith",
            Self::EndsWith => "endswith",
            Self::IStartsWith => "istartswith",
            Self::IEndsWith => "iendswith",
            Self::Regex => "regex",
            Self::IRegex => "iregex",
        }
    }

    /// Whether the column side must be upper-cased before comparison.
    #[must_use]
    pub const fn is_case_insensitive(self) -> bool {
        matches!(
            self,
            Self::IExact | Self::IContains | Self::IStartsWith | Self::IEndsWith
        )
    }

    /// Default operator template, with [`OPERAND`] marking the right-hand side.
    #[must_use]
    pub const fn template(self) -> &'static str {
        match self {
            Self::Exact => "= %s",
            Self::IExact => "= UPPER(%s)",
            Self::Contains | Self::StartsWith | Self::EndsWith => "LIKE %s ESCAPE '\\'",
            Self::IContains | Self::IStartsWith | Self::IEndsWith => {
                "LIKE UPPER(%s) ESCAPE '\\'"
            }
            Self::Gt => "> %s",
            Self::Gte => ">= %s",
            Self::Lt => "< %s",
            Self::Lte => "<= %s",
            Self::Regex | Self::IRegex => "LIKE %s",
        }
    }

    /// Template used when the right-hand side is an expression rather than
    /// a bound value. The `{}` marks the (already escaped) expression.
    #[must_use]
    pub const fn pattern_template(self) -> Option<&'static str> {
        Some(match self {
            Self::Contains => r"LIKE '%%' || {} || '%%' ESCAPE '\'",
            Self::IContains => r"LIKE '%%' || UPPER({}) || '%%' ESCAPE '\'",
            Self::StartsWith => r"LIKE {} || '%%' ESCAPE '\'",
            Self::IStartsWith => r"LIKE UPPER({}) || '%%' ESCAPE '\'",
            Self::EndsWith => r"LIKE '%%' || {} ESCAPE '\'",
            Self::IEndsWith => r"LIKE '%%' || UPPER({}) ESCAPE '\'",
            _ => return None,
        })
    }
}

impl fmt::Display for LookupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LookupKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.name() == s)
            .ok_or_else(|| Error::UnknownLookup {
                kind: "lookup",
                name: s.to_string(),
            })
    }
}

/// Lookup → SQL template mapping for one connection.
///
/// Built once when the connection is constructed and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatorTable {
    templates: HashMap<LookupKind, String>,
}

impl OperatorTable {
    /// The default, collation-neutral table.
    #[must_use]
    pub fn new() -> Self {
        let templates = LookupKind::ALL
            .iter()
            .map(|&k| (k, k.template().to_string()))
            .collect();
        Self { templates }
    }

    /// A table whose `LIKE` templates all end in `COLLATE <collation>`.
    #[must_use]
    pub fn with_collation(collation: &str) -> Self {
        let mut table = Self::new();
        for template in table.templates.values_mut() {
            if template.starts_with("LIKE ") {
                template.push_str(" COLLATE ");
                template.push_str(collation);
            }
        }
        table
    }

    /// Returns the template for `kind`.
    #[must_use]
    pub fn template(&self, kind: LookupKind) -> &str {
        self.templates
            .get(&kind)
            .map_or_else(|| kind.template(), String::as_str)
    }

    /// Renders `kind` with `operand` substituted for the placeholder.
    #[must_use]
    pub fn render(&self, kind: LookupKind, operand: &str) -> String {
        self.template(kind).replacen(OPERAND, operand, 1)
    }
}

impl Default for OperatorTable {
    fn default() -> Self {
        Self::new()
    }
}

/// SQL expression that escapes LIKE wildcards inside another expression.
#[must_use]
pub fn pattern_escape_sql(expression: &str) -> String {
    format!(r"REPLACE(REPLACE(REPLACE({expression}, '\', '\\'), '%%', '\%%'), '_', '\_')")
}

/// Renders a pattern lookup whose right-hand side is an SQL expression.
#[must_use]
pub fn pattern_lookup_sql(kind: LookupKind, rhs_expression: &str) -> Option<String> {
    kind.pattern_template()
        .map(|t| t.replacen("{}", &pattern_escape_sql(rhs_expression), 1))
}

/// Backslash-escapes the LIKE wildcards `%` and `_` in a value.
#[must_use]
pub fn prep_for_like_query(value: &str) -> String {
    value.replace('%', r"\%").replace('_', r"\_")
}

/// Builds the bound LIKE pattern for a pattern lookup.
///
/// Wildcards in `value` are escaped first; the value is not upper-cased,
/// case-insensitive lookups apply `UPPER` in SQL instead.
#[must_use]
pub fn like_pattern(kind: LookupKind, value: &str) -> Option<String> {
    let escaped = prep_for_like_query(value);
    match kind {
        LookupKind::Contains | LookupKind::IContains => Some(format!("%{escaped}%")),
        LookupKind::StartsWith | LookupKind::IStartsWith => Some(format!("{escaped}%")),
        LookupKind::EndsWith | LookupKind::IEndsWith => Some(format!("%{escaped}")),
        _ => None,
    }
}

/// Renders `value` as a LIKE clause with an escaped literal pattern.
///
/// ```
/// use oxide_sql_dbmaker::operations::lookups::escape_like;
///
/// assert_eq!(escape_like("50%_off"), r"LIKE '50\%\_off' ESCAPE '\'");
/// ```
#[must_use]
pub fn escape_like(value: &str) -> String {
    let pattern = prep_for_like_query(value).replace('\'', "''");
    format!(r"LIKE '{pattern}' ESCAPE '\'")
}
