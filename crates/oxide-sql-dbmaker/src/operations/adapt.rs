//! Value adaptation in both directions: Rust values to the forms the
//! DBMaker driver accepts, and driver results back to field values.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::types::FieldKind;
use crate::value::SqlValue;

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];
const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M:%S%.f";

/// Renders a value as an inline SQL literal (used for column defaults).
#[must_use]
pub fn quote_value(value: &SqlValue) -> String {
    value.to_sql_inline()
}

/// Formats a decimal for a `decimal(max_digits, decimal_places)` column.
///
/// The value is quantized to `decimal_places` (half-even rounding) within
/// a precision of `max_digits`, then printed with one fractional digit
/// more than the column scale; the DBMaker driver parses that form
/// reliably. Floats and integers skip quantization. Returns `None` for NULL.
pub fn adapt_decimal_value(
    value: &SqlValue,
    max_digits: u32,
    decimal_places: u32,
) -> Result<Option<String>> {
    let width = decimal_places as usize + 1;
    match value {
        SqlValue::Null => Ok(None),
        SqlValue::Decimal(d) => quantize(*d, max_digits, decimal_places)
            .map(|q| Some(format!("{q:.width$}"))),
        SqlValue::Text(s) => {
            let d: Decimal = s.trim().parse().map_err(|_| Error::InvalidValue {
                kind: "decimal",
                value: s.clone(),
            })?;
            quantize(d, max_digits, decimal_places).map(|q| Some(format!("{q:.width$}")))
        }
        #[allow(clippy::cast_precision_loss)]
        SqlValue::Int(n) => Ok(Some(format!("{:.width$}", *n as f64))),
        SqlValue::Float(f) => Ok(Some(format!("{f:.width$}"))),
        other => Err(Error::InvalidValue {
            kind: "decimal",
            value: other.to_sql_inline(),
        }),
    }
}

fn quantize(value: Decimal, max_digits: u32, decimal_places: u32) -> Result<Decimal> {
    let mut rounded =
        value.round_dp_with_strategy(decimal_places, RoundingStrategy::MidpointNearestEven);
    rounded.rescale(decimal_places);
    let digits = rounded.mantissa().unsigned_abs().to_string().len();
    if digits > max_digits as usize {
        return Err(Error::ValueOutOfRange {
            value: value.to_string(),
            max_digits,
            decimal_places,
        });
    }
    Ok(rounded)
}

/// Drops sub-second precision, which DBMaker timestamps cannot store.
#[must_use]
pub fn adapt_datetime_value(value: NaiveDateTime) -> NaiveDateTime {
    value.with_nanosecond(0).unwrap_or(value)
}

/// Converts an aware datetime to naive UTC without sub-seconds.
#[must_use]
pub fn adapt_aware_datetime_value<Tz: TimeZone>(value: &DateTime<Tz>) -> NaiveDateTime {
    adapt_datetime_value(value.with_timezone(&Utc).naive_utc())
}

/// Adapts a time value: sub-seconds are dropped and `HH:MM:SS` text is
/// accepted. Returns `None` for NULL.
pub fn adapt_time_value(value: &SqlValue) -> Result<Option<NaiveTime>> {
    match value {
        SqlValue::Null => Ok(None),
        SqlValue::Time(t) => Ok(Some(t.with_nanosecond(0).unwrap_or(*t))),
        SqlValue::DateTime(dt) => Ok(Some(adapt_datetime_value(*dt).time())),
        SqlValue::Text(s) => NaiveTime::parse_from_str(s, "%H:%M:%S")
            .map(Some)
            .map_err(|_| Error::InvalidValue {
                kind: "time",
                value: s.clone(),
            }),
        other => Err(Error::InvalidValue {
            kind: "time",
            value: other.to_sql_inline(),
        }),
    }
}

/// Converts a UUID column value (32 hex characters) into a [`Uuid`].
pub fn convert_uuid_value(value: &SqlValue) -> Result<Option<Uuid>> {
    match value {
        SqlValue::Null => Ok(None),
        SqlValue::Uuid(u) => Ok(Some(*u)),
        SqlValue::Text(s) => Uuid::parse_str(s.trim())
            .map(Some)
            .map_err(|_| Error::InvalidValue {
                kind: "uuid",
                value: s.clone(),
            }),
        other => Err(Error::InvalidValue {
            kind: "uuid",
            value: other.to_sql_inline(),
        }),
    }
}

/// Coerces a value returned by the driver into the shape expected for a
/// field of `kind`.
///
/// DBMaker may return temporal values as text, dates as midnight
/// datetimes and times as datetimes on `1900-01-01`.
pub fn convert_value(value: SqlValue, kind: Option<FieldKind>) -> Result<SqlValue> {
    let converted = match (kind, value) {
        (_, SqlValue::Null) => SqlValue::Null,
        (Some(FieldKind::DateTimeField), SqlValue::Text(s)) if !s.is_empty() => {
            SqlValue::DateTime(parse_datetime(&s)?)
        }
        (Some(FieldKind::DateField), SqlValue::DateTime(dt)) => SqlValue::Date(dt.date()),
        (Some(FieldKind::DateField), SqlValue::Text(s)) => SqlValue::Date(
            NaiveDate::parse_from_str(&s, DATE_FORMAT).map_err(|_| Error::InvalidValue {
                kind: "date",
                value: s.clone(),
            })?,
        ),
        (Some(FieldKind::TimeField), SqlValue::DateTime(dt)) if is_time_epoch(dt.date()) => {
            SqlValue::Time(dt.time())
        }
        (Some(FieldKind::TimeField), SqlValue::Text(s)) => SqlValue::Time(
            NaiveTime::parse_from_str(&s, TIME_FORMAT).map_err(|_| Error::InvalidValue {
                kind: "time",
                value: s.clone(),
            })?,
        ),
        (Some(FieldKind::UUIDField), v) => {
            convert_uuid_value(&v)?.map_or(SqlValue::Null, SqlValue::Uuid)
        }
        #[allow(clippy::cast_precision_loss)]
        (Some(FieldKind::FloatField), SqlValue::Int(n)) => SqlValue::Float(n as f64),
        (Some(FieldKind::FloatField), SqlValue::Decimal(d)) => match d.to_f64() {
            Some(f) => SqlValue::Float(f),
            None => SqlValue::Decimal(d),
        },
        // Dates selected through joins can arrive as midnight datetimes.
        (k, SqlValue::DateTime(dt))
            if dt.time() == NaiveTime::MIN
                && !matches!(k, Some(FieldKind::DateTimeField | FieldKind::TimeField)) =>
        {
            SqlValue::Date(dt.date())
        }
        (_, v) => v,
    };
    Ok(converted)
}

fn parse_datetime(s: &str) -> Result<NaiveDateTime> {
    DATETIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
        .ok_or_else(|| Error::InvalidValue {
            kind: "datetime",
            value: s.to_string(),
        })
}

fn is_time_epoch(date: NaiveDate) -> bool {
    NaiveDate::from_ymd_opt(1900, 1, 1) == Some(date)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    fn dec(s: &str) -> SqlValue {
        SqlValue::Decimal(s.parse().unwrap())
    }

    #[test]
    fn decimal_is_quantized_and_padded() {
        assert_eq!(
            adapt_decimal_value(&dec("12.345"), 5, 2).unwrap().as_deref(),
            Some("12.340")
        );
        assert_eq!(
            adapt_decimal_value(&dec("12.355"), 5, 2).unwrap().as_deref(),
            Some("12.360")
        );
        assert_eq!(
            adapt_decimal_value(&dec("7"), 4, 0).unwrap().as_deref(),
            Some("7.0")
        );
    }

    #[test]
    fn decimal_overflowing_precision_is_rejected() {
        let err = adapt_decimal_value(&dec("1234.5"), 4, 2).unwrap_err();
        assert!(matches!(err, Error::ValueOutOfRange { max_digits: 4, .. }));
    }

    #[test]
    fn non_decimal_numbers_skip_quantization() {
        assert_eq!(
            adapt_decimal_value(&SqlValue::Float(1.5), 3, 2).unwrap().as_deref(),
            Some("1.500")
        );
        assert_eq!(
            adapt_decimal_value(&SqlValue::Int(3), 3, 1).unwrap().as_deref(),
            Some("3.00")
        );
        assert_eq!(adapt_decimal_value(&SqlValue::Null, 3, 1).unwrap(), None);
    }

    #[test]
    fn datetimes_lose_subseconds_and_zone() {
        let offset = FixedOffset::east_opt(2 * 3600).unwrap();
        let aware = offset.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
            + chrono::Duration::milliseconds(250);
        let adapted = adapt_aware_datetime_value(&aware);
        assert_eq!(adapted.to_string(), "2024-05-01 10:00:00");
    }

    #[test]
    fn time_text_is_parsed() {
        assert_eq!(
            adapt_time_value(&SqlValue::Text("08:30:15".into())).unwrap(),
            NaiveTime::from_hms_opt(8, 30, 15)
        );
        assert!(adapt_time_value(&SqlValue::Text("8h30".into())).is_err());
    }

    #[test]
    fn converts_uuid_text() {
        let u = convert_uuid_value(&SqlValue::Text("0123456789abcdef0123456789abcdef".into()))
            .unwrap()
            .unwrap();
        assert_eq!(u.simple().to_string(), "0123456789abcdef0123456789abcdef");
        assert!(matches!(
            convert_uuid_value(&SqlValue::Text("nope".into())),
            Err(Error::InvalidValue { kind: "uuid", .. })
        ));
    }

    #[test]
    fn converts_temporal_results() {
        let dt = NaiveDate::from_ymd_opt(1900, 1, 1)
            .unwrap()
            .and_hms_opt(9, 15, 0)
            .unwrap();
        assert_eq!(
            convert_value(SqlValue::DateTime(dt), Some(FieldKind::TimeField)).unwrap(),
            SqlValue::Time(NaiveTime::from_hms_opt(9, 15, 0).unwrap())
        );
        assert_eq!(
            convert_value(
                SqlValue::Text("2024-01-02 03:04:05".into()),
                Some(FieldKind::DateTimeField)
            )
            .unwrap(),
            SqlValue::DateTime(
                NaiveDate::from_ymd_opt(2024, 1, 2)
                    .unwrap()
                    .and_hms_opt(3, 4, 5)
                    .unwrap()
            )
        );
        let midnight = NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(
            convert_value(SqlValue::DateTime(midnight), None).unwrap(),
            SqlValue::Date(midnight.date())
        );
        assert_eq!(
            convert_value(SqlValue::DateTime(midnight), Some(FieldKind::DateTimeField)).unwrap(),
            SqlValue::DateTime(midnight)
        );
    }

    #[test]
    fn float_fields_are_coerced() {
        assert_eq!(
            convert_value(SqlValue::Int(2), Some(FieldKind::FloatField)).unwrap(),
            SqlValue::Float(2.0)
        );
    }
}
