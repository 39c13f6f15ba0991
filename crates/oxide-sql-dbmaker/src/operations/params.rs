//! Placeholder and parameter rewriting for the ODBC driver.
//!
//! Statements are built with `%s` placeholders and `%%` for a literal
//! percent sign; the driver expects qmark (`?`) parameters.

use crate::value::SqlValue;

/// Rewrites `%s` placeholders to `?` and `%%` to `%` in a single pass.
///
/// Any other `%` sequence is copied through untouched.
///
/// ```
/// use oxide_sql_dbmaker::operations::params::format_sql;
///
/// assert_eq!(
///     format_sql("SELECT * FROM t WHERE a = %s AND b LIKE '%%x'"),
///     "SELECT * FROM t WHERE a = ? AND b LIKE '%x'"
/// );
/// ```
#[must_use]
pub fn format_sql(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut chars = sql.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        match chars.peek() {
            Some('s') => {
                chars.next();
                out.push('?');
            }
            Some('%') => {
                chars.next();
                out.push('%');
            }
            _ => out.push('%'),
        }
    }
    out
}

/// Converts parameters to the forms the driver binds: booleans become
/// the integers `1` and `0`.
#[must_use]
pub fn format_params(params: Vec<SqlValue>) -> Vec<SqlValue> {
    params
        .into_iter()
        .map(|p| match p {
            SqlValue::Bool(b) => SqlValue::Int(i64::from(b)),
            other => other,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewrites_placeholders() {
        assert_eq!(format_sql("a = %s, b = %s"), "a = ?, b = ?");
    }

    #[test]
    fn unescapes_percent() {
        assert_eq!(format_sql("LIKE '%%' || %s"), "LIKE '%' || ?");
    }

    #[test]
    fn escaped_percent_before_s_is_literal() {
        assert_eq!(format_sql("'%%s'"), "'%s'");
    }

    #[test]
    fn lone_percent_is_kept() {
        assert_eq!(format_sql("50% off %d"), "50% off %d");
    }

    #[test]
    fn booleans_become_integers() {
        let params = format_params(vec![
            SqlValue::Bool(true),
            SqlValue::Bool(false),
            SqlValue::Text("x".into()),
        ]);
        assert_eq!(
            params,
            vec![SqlValue::Int(1), SqlValue::Int(0), SqlValue::Text("x".into())]
        );
    }
}
