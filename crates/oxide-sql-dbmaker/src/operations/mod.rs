//! Dialect SQL fragments.
//!
//! [`DatabaseOperations`] renders the pieces of DBMaker SQL a query builder
//! cannot express portably: identifier quoting, date arithmetic, operator
//! combination, transaction statements and table flushing. Every method is
//! a pure string transform; fragments keep `%s` as the operand placeholder
//! and are rewritten for the driver by [`params::format_sql`].

pub mod adapt;
pub mod lookups;
pub mod params;

use std::fmt;
use std::str::FromStr;

use chrono::{FixedOffset, TimeDelta};

use crate::config::{DatabaseOptions, MAX_NAME_LENGTH};
use crate::dialect::{DbmakerDialect, Dialect};
use crate::error::{Error, Result};
use crate::introspection::Sequence;
use lookups::LookupKind;

/// Turns foreign-key checking off for the session.
pub const DISABLE_CONSTRAINT_CHECKING_SQL: &str = "CALL SETSYSTEMOPTION('FKCHK', '0');";
/// Turns foreign-key checking back on.
pub const ENABLE_CONSTRAINT_CHECKING_SQL: &str = "CALL SETSYSTEMOPTION('FKCHK', '1');";
/// Reads the serial value generated by the last insert on this connection.
pub const LAST_INSERT_ID_SQL: &str = "select LAST_SERIAL from SYSCONINFO";

/// Arithmetic and bitwise connectors of combined expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Connector {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%%`, the escaped modulo sign.
    Mod,
    /// `^`
    Pow,
    /// `&`
    BitAnd,
    /// `|`
    BitOr,
    /// `#`
    BitXor,
    /// `<<`
    LeftShift,
    /// `>>`
    RightShift,
}

impl Connector {
    const ALL: &'static [Self] = &[
        Self::Add,
        Self::Sub,
        Self::Mul,
        Self::Div,
        Self::Mod,
        Self::Pow,
        Self::BitAnd,
        Self::BitOr,
        Self::BitXor,
        Self::LeftShift,
        Self::RightShift,
    ];

    /// The connector as written in expressions.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%%",
            Self::Pow => "^",
            Self::BitAnd => "&",
            Self::BitOr => "|",
            Self::BitXor => "#",
            Self::LeftShift => "<<",
            Self::RightShift => ">>",
        }
    }

    /// Parses a connector symbol.
    pub fn from_symbol(symbol: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.symbol() == symbol)
            .ok_or_else(|| Error::UnknownLookup {
                kind: "connector",
                name: symbol.to_string(),
            })
    }
}

impl fmt::Display for Connector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Date and time components used by extract and truncate lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatePart {
    /// `year`
    Year,
    /// `quarter`
    Quarter,
    /// `month`
    Month,
    /// `week`
    Week,
    /// `week_day`, numbered 1 (Sunday) to 7 (Saturday).
    WeekDay,
    /// `day`
    Day,
    /// `hour`
    Hour,
    /// `minute`
    Minute,
    /// `second`
    Second,
}

impl DatePart {
    const ALL: &'static [Self] = &[
        Self::Year,
        Self::Quarter,
        Self::Month,
        Self::Week,
        Self::WeekDay,
        Self::Day,
        Self::Hour,
        Self::Minute,
        Self::Second,
    ];

    /// The lookup name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Year => "year",
            Self::Quarter => "quarter",
            Self::Month => "month",
            Self::Week => "week",
            Self::WeekDay => "week_day",
            Self::Day => "day",
            Self::Hour => "hour",
            Self::Minute => "minute",
            Self::Second => "second",
        }
    }
}

impl fmt::Display for DatePart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DatePart {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|p| p.name() == s)
            .ok_or_else(|| Error::UnknownLookup {
                kind: "date part",
                name: s.to_string(),
            })
    }
}

/// SQL fragment generator for one connection's quoting configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatabaseOperations {
    dialect: DbmakerDialect,
}

#[allow(clippy::unused_self)]
impl DatabaseOperations {
    /// Creates operations with the default `"` identifier quotes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates operations using the quotes configured in `options`.
    #[must_use]
    pub fn from_options(options: &DatabaseOptions) -> Self {
        Self {
            dialect: DbmakerDialect::with_quotes(
                options.left_sql_quote.as_str(),
                options.right_sql_quote.as_str(),
            ),
        }
    }

    /// The dialect these operations render for.
    #[must_use]
    pub const fn dialect(&self) -> &DbmakerDialect {
        &self.dialect
    }

    /// Quotes a table, index or column name unless it is already quoted.
    ///
    /// ```
    /// use oxide_sql_dbmaker::operations::DatabaseOperations;
    ///
    /// let ops = DatabaseOperations::new();
    /// assert_eq!(ops.quote_name("foo"), "\"foo\"");
    /// assert_eq!(ops.quote_name("\"foo\""), "\"foo\"");
    /// ```
    #[must_use]
    pub fn quote_name(&self, name: &str) -> String {
        self.dialect.quote_identifier(name)
    }

    /// Combines sub-expressions with `connector`.
    ///
    /// Modulo and power become function calls. Shifts are emulated as
    /// multiplication and division by `2 * n`, which only equals a real
    /// shift for `n = 1`; existing queries rely on that rendering.
    #[must_use]
    pub fn combine_expression<S: AsRef<str>>(
        &self,
        connector: Connector,
        sub_expressions: &[S],
    ) -> String {
        let parts: Vec<&str> = sub_expressions.iter().map(AsRef::as_ref).collect();
        match connector {
            Connector::Mod => format!("MOD({})", parts.join(",")),
            Connector::Pow => format!("POWER({})", parts.join(",")),
            Connector::LeftShift | Connector::RightShift => {
                let op = if connector == Connector::LeftShift { '*' } else { '/' };
                let mut iter = parts.into_iter();
                let first = iter.next().unwrap_or_default().to_string();
                iter.fold(first, |acc, rhs| format!("{acc} {op} (2 * {rhs})"))
            }
            _ => {
                let separator = format!(" {connector} ");
                parts.join(separator.as_str())
            }
        }
    }

    /// Extracts a date component from `field`.
    #[must_use]
    pub fn date_extract_sql(&self, part: DatePart, field: &str) -> String {
        let function = match part {
            DatePart::Year => "YEAR",
            DatePart::Quarter => "QUARTER",
            DatePart::Month => "MONTH",
            DatePart::Week => "WEEK",
            // DAYOFWEEK numbers Sunday as 1.
            DatePart::WeekDay => "DAYOFWEEK",
            DatePart::Day => "DAYOFMONTH",
            DatePart::Hour => "HOUR",
            DatePart::Minute => "MINUTE",
            DatePart::Second => "SECOND",
        };
        format!("{function}({field})")
    }

    /// Truncates a date to the start of its year, quarter, month or week.
    /// Other parts return `field` unchanged.
    ///
    /// ```
    /// use oxide_sql_dbmaker::operations::{DatabaseOperations, DatePart};
    ///
    /// let ops = DatabaseOperations::new();
    /// assert_eq!(
    ///     ops.date_trunc_sql(DatePart::Quarter, "col"),
    ///     "MDY(YEAR(col), (QUARTER(col)-1)*3+1, 1)"
    /// );
    /// ```
    #[must_use]
    pub fn date_trunc_sql(&self, part: DatePart, field: &str) -> String {
        match part {
            DatePart::Year => format!("TO_DATE(STRDATE({field},'start of year'), 'yyyy-mm-dd')"),
            DatePart::Month => {
                format!("TO_DATE(STRDATE({field}, 'start of month'), 'yyyy-mm-dd')")
            }
            DatePart::Quarter => format!("MDY(YEAR({field}), (QUARTER({field})-1)*3+1, 1)"),
            DatePart::Week => format!("TO_DATE(STRDATE({field}, 'start of week'), 'yyyy-mm-dd')"),
            _ => field.to_string(),
        }
    }

    /// Shifts a UTC timestamp column into the zone at `offset`.
    #[must_use]
    pub fn convert_field_to_tz(&self, field: &str, offset: Option<FixedOffset>) -> String {
        match offset.map(|o| o.local_minus_utc()) {
            Some(seconds) if seconds != 0 => format!("TIMESTAMPADD(s, {seconds}, {field})"),
            _ => field.to_string(),
        }
    }

    /// [`Self::date_extract_sql`] on a timestamp seen in the zone at `offset`.
    #[must_use]
    pub fn datetime_extract_sql(
        &self,
        part: DatePart,
        field: &str,
        offset: Option<FixedOffset>,
    ) -> String {
        self.date_extract_sql(part, &self.convert_field_to_tz(field, offset))
    }

    /// Casts a timestamp to its date.
    #[must_use]
    pub fn datetime_cast_date_sql(&self, field: &str, offset: Option<FixedOffset>) -> String {
        format!("DATEPART({})", self.convert_field_to_tz(field, offset))
    }

    /// Casts a timestamp to its time of day.
    #[must_use]
    pub fn datetime_cast_time_sql(&self, field: &str, offset: Option<FixedOffset>) -> String {
        format!("CAST({} AS TIME)", self.convert_field_to_tz(field, offset))
    }

    /// Truncates a timestamp, keeping the `TIMESTAMP` type.
    #[must_use]
    pub fn datetime_trunc_sql(
        &self,
        part: DatePart,
        field: &str,
        offset: Option<FixedOffset>,
    ) -> String {
        let field = self.convert_field_to_tz(field, offset);
        match part {
            DatePart::Quarter => {
                format!("CAST(MDY((QUARTER({field})-1)*3+1, 1, YEAR({field})) AS TIMESTAMP)")
            }
            DatePart::Year
            | DatePart::Month
            | DatePart::Day
            | DatePart::Hour
            | DatePart::Minute
            | DatePart::Week => {
                format!("CAST(STRDATETIME({field}, 'start of {part}') AS TIMESTAMP)")
            }
            DatePart::Second | DatePart::WeekDay => field,
        }
    }

    /// Truncates a time value to the hour or minute; other parts only drop
    /// the fractional seconds.
    #[must_use]
    pub fn time_trunc_sql(&self, part: DatePart, field: &str) -> String {
        match part {
            DatePart::Hour | DatePart::Minute => {
                format!("CAST(STRTIME({field}, 'start of {part}') AS TIME)")
            }
            _ => format!("CAST(STRTIME({field}) AS TIME)"),
        }
    }

    /// Renders an interval as its number of microseconds.
    pub fn date_interval_sql(&self, interval: TimeDelta) -> Result<String> {
        interval
            .num_microseconds()
            .map(|us| us.to_string())
            .ok_or_else(|| Error::InvalidValue {
                kind: "interval",
                value: interval.to_string(),
            })
    }

    /// Cast applied to a column before it is searched in a WHERE clause.
    #[must_use]
    pub fn field_cast_sql(&self, db_type: Option<&str>) -> &'static str {
        match db_type {
            Some(t) if t.eq_ignore_ascii_case("blob") => "CAST(%s as nvarchar)",
            _ => "%s",
        }
    }

    /// Cast applied to the column side of a lookup.
    #[must_use]
    pub fn lookup_cast(&self, lookup: LookupKind) -> &'static str {
        if lookup.is_case_insensitive() {
            "UPPER(%s)"
        } else {
            "%s"
        }
    }

    /// WHERE clause for a full-text search; the value binds to `%s`.
    #[must_use]
    pub fn fulltext_search_sql(&self, field: &str) -> String {
        format!("CONTAINS({field}, %s)")
    }

    /// Longest identifier the backend accepts.
    #[must_use]
    pub const fn max_name_length(&self) -> usize {
        MAX_NAME_LENGTH
    }

    /// Expression returning a random value.
    #[must_use]
    pub const fn random_function_sql(&self) -> &'static str {
        "RAND()"
    }

    /// The LIMIT value meaning "no limit". DBMaker has none.
    #[must_use]
    pub const fn no_limit_value(&self) -> Option<u64> {
        None
    }

    /// Multi-row `VALUES` list from rows of placeholders.
    ///
    /// ```
    /// use oxide_sql_dbmaker::operations::DatabaseOperations;
    ///
    /// let ops = DatabaseOperations::new();
    /// let rows = [["%s", "%s"], ["%s", "%s"]];
    /// assert_eq!(ops.bulk_insert_sql(&rows), "VALUES (%s, %s), (%s, %s)");
    /// ```
    #[must_use]
    pub fn bulk_insert_sql<R, S>(&self, placeholder_rows: &[R]) -> String
    where
        R: AsRef<[S]>,
        S: AsRef<str>,
    {
        let rows: Vec<String> = placeholder_rows
            .iter()
            .map(|row| {
                let cells: Vec<&str> = row.as_ref().iter().map(AsRef::as_ref).collect();
                format!("({})", cells.join(", "))
            })
            .collect();
        format!("VALUES {}", rows.join(", "))
    }

    /// Statement creating savepoint `sid`.
    #[must_use]
    pub fn savepoint_create_sql(&self, sid: &str) -> String {
        format!("SAVEPOINT {}", self.quote_name(sid))
    }

    /// Statement rolling back to savepoint `sid`.
    #[must_use]
    pub fn savepoint_rollback_sql(&self, sid: &str) -> String {
        format!("ROLLBACK TO SAVEPOINT {}", self.quote_name(sid))
    }

    /// DBMaker releases a savepoint with `REMOVE SAVEPOINT`.
    #[must_use]
    pub fn savepoint_commit_sql(&self, sid: &str) -> String {
        format!("REMOVE SAVEPOINT {}", self.quote_name(sid))
    }

    /// Statement opening an explicit transaction.
    #[must_use]
    pub const fn start_transaction_sql(&self) -> &'static str {
        "BEGIN TRANSACTION"
    }

    /// Tablespace clause appended to CREATE TABLE and CREATE INDEX.
    #[must_use]
    pub fn tablespace_sql(&self, tablespace: &str) -> String {
        format!("ON {}", self.quote_name(tablespace))
    }

    /// Statements that empty `tables` without dropping them.
    ///
    /// Foreign-key checking is suspended around the deletes so tables can be
    /// cleared in any order; it must be switched back on before the
    /// sequence resets run.
    #[must_use]
    pub fn sql_flush<S: AsRef<str>>(&self, tables: &[S], sequences: &[Sequence]) -> Vec<String> {
        if tables.is_empty() {
            return Vec::new();
        }
        let mut sql = Vec::with_capacity(tables.len() + 2);
        sql.push(DISABLE_CONSTRAINT_CHECKING_SQL.to_string());
        sql.extend(
            tables
                .iter()
                .map(|t| format!("DELETE FROM {};", self.quote_name(t.as_ref()))),
        );
        sql.push(ENABLE_CONSTRAINT_CHECKING_SQL.to_string());
        sql.extend(self.sequence_reset_by_name_sql(sequences));
        sql
    }

    /// Statements resetting identity counters. DELETE keeps DBMaker serial
    /// counters untouched and there is no reset statement, so this is empty.
    #[must_use]
    pub fn sequence_reset_by_name_sql(&self, _sequences: &[Sequence]) -> Vec<String> {
        Vec::new()
    }

    /// BETWEEN bounds for a year lookup; the backend has no sub-second
    /// precision, so the upper bound stops at the last whole second.
    #[must_use]
    pub fn year_lookup_bounds(&self, year: i32) -> [String; 2] {
        [
            format!("{year}-01-01 00:00:00"),
            format!("{year}-12-31 23:59:59"),
        ]
    }
}
