//! SQL values exchanged with the DBMaker driver.
//!
//! The same type carries bound parameters, literal defaults and the cells
//! of catalog result rows.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use uuid::Uuid;

/// A SQL value that can be bound as a parameter or rendered inline.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// NULL value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Float value.
    Float(f64),
    /// Exact decimal value.
    Decimal(Decimal),
    /// Text value.
    Text(String),
    /// Binary blob value.
    Blob(Vec<u8>),
    /// Calendar date.
    Date(NaiveDate),
    /// Time of day.
    Time(NaiveTime),
    /// Date and time without zone.
    DateTime(NaiveDateTime),
    /// UUID, stored as 32 hex characters.
    Uuid(Uuid),
}

impl SqlValue {
    /// Returns the literal form used for inline defaults.
    ///
    /// Booleans become `1`/`0` since DBMaker stores them in `int` columns,
    /// and binary data becomes a hex literal.
    #[must_use]
    pub fn to_sql_inline(&self) -> String {
        match self {
            Self::Null => String::from("NULL"),
            Self::Bool(b) => String::from(if *b { "1" } else { "0" }),
            Self::Int(n) => n.to_string(),
            Self::Float(f) => f.to_string(),
            Self::Decimal(d) => d.to_string(),
            Self::Text(s) => {
                let escaped = s.replace('\'', "''");
                format!("'{escaped}'")
            }
            Self::Blob(b) => {
                let hex: String = b.iter().map(|byte| format!("{byte:02X}")).collect();
                format!("X'{hex}'")
            }
            Self::Date(d) => format!("'{d}'"),
            Self::Time(t) => format!("'{t}'"),
            Self::DateTime(dt) => format!("'{dt}'"),
            Self::Uuid(u) => format!("'{}'", u.simple()),
        }
    }

    /// Returns `true` for [`SqlValue::Null`].
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns the text content, if this is a text value.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the integer content, accepting booleans as `0`/`1`.
    #[must_use]
    pub const fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            Self::Bool(b) => Some(*b as i64),
            _ => None,
        }
    }

    /// Returns the raw bytes of a blob or text value.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Blob(b) => Some(b),
            Self::Text(s) => Some(s.as_bytes()),
            _ => None,
        }
    }
}

/// Trait for types that can be converted to SQL values.
pub trait ToSqlValue {
    /// Converts the value to a `SqlValue`.
    fn to_sql_value(self) -> SqlValue;
}

impl ToSqlValue for SqlValue {
    fn to_sql_value(self) -> SqlValue {
        self
    }
}

macro_rules! impl_to_sql_value {
    ($($ty:ty => |$v:ident| $body:expr;)+) => {
        $(
            impl ToSqlValue for $ty {
                fn to_sql_value(self) -> SqlValue {
                    let $v = self;
                    $body
                }
            }
        )+
    };
}

impl_to_sql_value! {
    bool => |v| SqlValue::Bool(v);
    i64 => |v| SqlValue::Int(v);
    i32 => |v| SqlValue::Int(i64::from(v));
    i16 => |v| SqlValue::Int(i64::from(v));
    u32 => |v| SqlValue::Int(i64::from(v));
    u16 => |v| SqlValue::Int(i64::from(v));
    f64 => |v| SqlValue::Float(v);
    f32 => |v| SqlValue::Float(f64::from(v));
    String => |v| SqlValue::Text(v);
    &str => |v| SqlValue::Text(String::from(v));
    Vec<u8> => |v| SqlValue::Blob(v);
    &[u8] => |v| SqlValue::Blob(v.to_vec());
    Decimal => |v| SqlValue::Decimal(v);
    NaiveDate => |v| SqlValue::Date(v);
    NaiveTime => |v| SqlValue::Time(v);
    NaiveDateTime => |v| SqlValue::DateTime(v);
    Uuid => |v| SqlValue::Uuid(v);
}

impl<T: ToSqlValue> ToSqlValue for Option<T> {
    fn to_sql_value(self) -> SqlValue {
        match self {
            Some(v) => v.to_sql_value(),
            None => SqlValue::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inline_scalars() {
        assert_eq!(SqlValue::Null.to_sql_inline(), "NULL");
        assert_eq!(SqlValue::Bool(true).to_sql_inline(), "1");
        assert_eq!(SqlValue::Bool(false).to_sql_inline(), "0");
        assert_eq!(SqlValue::Int(-100).to_sql_inline(), "-100");
        assert_eq!(
            SqlValue::Decimal(Decimal::new(1250, 2)).to_sql_inline(),
            "12.50"
        );
    }

    #[test]
    fn inline_text_doubles_quotes() {
        assert_eq!(
            SqlValue::Text(String::from("O'Brien")).to_sql_inline(),
            "'O''Brien'"
        );
    }

    #[test]
    fn inline_blob_is_hex_literal() {
        assert_eq!(
            SqlValue::Blob(vec![0x48, 0x45, 0x4C, 0x4C, 0x4F]).to_sql_inline(),
            "X'48454C4C4F'"
        );
    }

    #[test]
    fn inline_temporal_values_are_quoted() {
        let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        let time = NaiveTime::from_hms_opt(7, 5, 3).unwrap();
        assert_eq!(SqlValue::Date(date).to_sql_inline(), "'2024-02-29'");
        assert_eq!(SqlValue::Time(time).to_sql_inline(), "'07:05:03'");
        assert_eq!(
            SqlValue::DateTime(date.and_time(time)).to_sql_inline(),
            "'2024-02-29 07:05:03'"
        );
    }

    #[test]
    fn inline_uuid_uses_simple_form() {
        let u = Uuid::from_u128(0x0123_4567_89ab_cdef_0123_4567_89ab_cdef);
        assert_eq!(
            SqlValue::Uuid(u).to_sql_inline(),
            "'0123456789abcdef0123456789abcdef'"
        );
    }

    #[test]
    fn conversions() {
        assert_eq!(42_i32.to_sql_value(), SqlValue::Int(42));
        assert_eq!("hi".to_sql_value(), SqlValue::Text(String::from("hi")));
        assert_eq!(None::<i64>.to_sql_value(), SqlValue::Null);
        assert_eq!(SqlValue::Bool(true).as_i64(), Some(1));
    }
}
