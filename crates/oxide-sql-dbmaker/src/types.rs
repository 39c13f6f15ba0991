//! Field-kind ↔ DBMaker column type mapping.
//!
//! The forward map renders the column type used in DDL; the reverse map
//! turns an ODBC type code reported by `SQLColumns` back into a field kind.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// ODBC SQL type codes reported by the DBMaker driver.
pub mod sql_type {
    /// `SQL_CHAR`
    pub const CHAR: i32 = 1;
    /// `SQL_NUMERIC`
    pub const NUMERIC: i32 = 2;
    /// `SQL_DECIMAL`
    pub const DECIMAL: i32 = 3;
    /// `SQL_INTEGER`
    pub const INTEGER: i32 = 4;
    /// `SQL_SMALLINT`
    pub const SMALLINT: i32 = 5;
    /// `SQL_FLOAT`
    pub const FLOAT: i32 = 6;
    /// `SQL_REAL`
    pub const REAL: i32 = 7;
    /// `SQL_DOUBLE`
    pub const DOUBLE: i32 = 8;
    /// `SQL_VARCHAR`
    pub const VARCHAR: i32 = 12;
    /// `SQL_TYPE_DATE`
    pub const TYPE_DATE: i32 = 91;
    /// `SQL_TYPE_TIME`
    pub const TYPE_TIME: i32 = 92;
    /// `SQL_TYPE_TIMESTAMP`
    pub const TYPE_TIMESTAMP: i32 = 93;
    /// `SQL_LONGVARCHAR`
    pub const LONGVARCHAR: i32 = -1;
    /// `SQL_BINARY`
    pub const BINARY: i32 = -2;
    /// `SQL_VARBINARY`
    pub const VARBINARY: i32 = -3;
    /// `SQL_LONGVARBINARY`
    pub const LONGVARBINARY: i32 = -4;
    /// `SQL_BIGINT`
    pub const BIGINT: i32 = -5;
    /// `SQL_TINYINT`
    pub const TINYINT: i32 = -6;
    /// `SQL_BIT`
    pub const BIT: i32 = -7;
    /// `SQL_WCHAR`
    pub const WCHAR: i32 = -8;
    /// `SQL_WVARCHAR`
    pub const WVARCHAR: i32 = -9;
    /// `SQL_WLONGVARCHAR`
    pub const WLONGVARCHAR: i32 = -10;
    /// `SQL_GUID`
    pub const GUID: i32 = -11;

    /// Pseudo-code assigned to columns detected as `SERIAL`.
    pub const AUTOFIELD: i32 = -777_555;
    /// Pseudo-code assigned to columns detected as `BIGSERIAL`.
    pub const BIG_AUTOFIELD: i32 = -777_556;
}

/// `nvarchar` columns shorter than this are introspected as short text.
pub const SHORT_TEXT_THRESHOLD: i32 = 4000;

macro_rules! field_kinds {
    ($($variant:ident),+ $(,)?) => {
        /// Abstract field kinds known to the mapping tables.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum FieldKind {
            $(
                #[allow(missing_docs)]
                $variant,
            )+
        }

        impl FieldKind {
            /// Every field kind, in declaration order.
            pub const ALL: &'static [FieldKind] = &[$(FieldKind::$variant),+];

            /// Returns the kind's canonical name.
            #[must_use]
            pub const fn name(self) -> &'static str {
                match self {
                    $(FieldKind::$variant => stringify!($variant),)+
                }
            }
        }

        impl FromStr for FieldKind {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                Self::ALL
                    .iter()
                    .copied()
                    .find(|kind| kind.name() == s)
                    .ok_or_else(|| Error::UnknownFieldKind(s.to_string()))
            }
        }
    };
}

field_kinds!(
    AutoField,
    BigAutoField,
    BigIntegerField,
    BinaryField,
    BooleanField,
    CharField,
    CommaSeparatedIntegerField,
    DateField,
    DateTimeField,
    DecimalField,
    DurationField,
    FileField,
    FilePathField,
    FloatField,
    ForeignKey,
    GenericIPAddressField,
    IntegerField,
    IPAddressField,
    ManyToManyField,
    NullBooleanField,
    OneToOneField,
    PositiveIntegerField,
    PositiveSmallIntegerField,
    SlugField,
    SmallIntegerField,
    TextField,
    TimeField,
    UUIDField,
);

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Values interpolated into templated column types.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldParams {
    /// `max_length` for character columns.
    pub max_length: Option<u32>,
    /// `max_digits` for decimal columns.
    pub max_digits: Option<u32>,
    /// `decimal_places` for decimal columns.
    pub decimal_places: Option<u32>,
}

impl FieldParams {
    /// Params for a character column.
    #[must_use]
    pub const fn with_max_length(max_length: u32) -> Self {
        Self {
            max_length: Some(max_length),
            max_digits: None,
            decimal_places: None,
        }
    }

    /// Params for a decimal column.
    #[must_use]
    pub const fn with_digits(max_digits: u32, decimal_places: u32) -> Self {
        Self {
            max_length: None,
            max_digits: Some(max_digits),
            decimal_places: Some(decimal_places),
        }
    }
}

/// Returns the raw column-type template for `kind`, or `None` when the
/// kind has no column of its own (relations resolve through their target).
#[must_use]
pub const fn type_template(kind: FieldKind) -> Option<&'static str> {
    use FieldKind as K;
    Some(match kind {
        K::AutoField => "serial",
        K::BigAutoField => "bigserial",
        K::BigIntegerField | K::DurationField => "bigint",
        K::BinaryField => "blob",
        K::BooleanField
        | K::IntegerField
        | K::NullBooleanField
        | K::OneToOneField
        | K::PositiveIntegerField => "int",
        K::CharField | K::CommaSeparatedIntegerField | K::FilePathField | K::SlugField => {
            "nvarchar(%(max_length)s)"
        }
        K::DateField => "date",
        K::DateTimeField => "timestamp",
        K::DecimalField => "decimal(%(max_digits)s, %(decimal_places)s)",
        K::FileField => "File",
        K::FloatField => "double",
        K::GenericIPAddressField => "nvarchar(39)",
        K::IPAddressField => "nvarchar(15)",
        K::PositiveSmallIntegerField | K::SmallIntegerField => "smallint",
        K::TextField => "nclob",
        K::TimeField => "time",
        K::UUIDField => "char(32)",
        K::ForeignKey | K::ManyToManyField => return None,
    })
}

/// Renders the DBMaker column type for `kind`.
///
/// ```
/// use oxide_sql_dbmaker::types::{db_type, FieldKind, FieldParams};
///
/// let sql = db_type(FieldKind::CharField, &FieldParams::with_max_length(80)).unwrap();
/// assert_eq!(sql, "nvarchar(80)");
/// ```
pub fn db_type(kind: FieldKind, params: &FieldParams) -> Result<String> {
    let template =
        type_template(kind).ok_or_else(|| Error::UnknownFieldKind(kind.name().to_string()))?;
    interpolate(template, kind, params)
}

/// Renders the column type for a field kind given by name.
pub fn db_type_for_name(kind: &str, params: &FieldParams) -> Result<String> {
    db_type(kind.parse()?, params)
}

/// CHECK expression attached to unsigned kinds, with `column` quoted by
/// the caller.
#[must_use]
pub fn check_constraint(kind: FieldKind, column: &str) -> Option<String> {
    match kind {
        FieldKind::PositiveIntegerField | FieldKind::PositiveSmallIntegerField => {
            Some(format!("{column} >= 0"))
        }
        _ => None,
    }
}

fn interpolate(template: &str, kind: FieldKind, params: &FieldParams) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("%(") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after
            .find(")s")
            .ok_or_else(|| Error::UnknownFieldKind(kind.name().to_string()))?;
        let key = &after[..end];
        let value = match key {
            "max_length" => params.max_length,
            "max_digits" => params.max_digits,
            "decimal_places" => params.decimal_places,
            _ => None,
        }
        .ok_or_else(|| {
            Error::UnknownFieldKind(format!("{} (missing parameter '{key}')", kind.name()))
        })?;
        out.push_str(&value.to_string());
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    Ok(out)
}

/// Maps an ODBC type code to a field kind.
///
/// The identity pseudo-codes take precedence over any literal mapping.
#[must_use]
pub const fn kind_for_code(code: i32) -> Option<FieldKind> {
    use sql_type as T;
    use FieldKind as K;
    Some(match code {
        T::AUTOFIELD => K::AutoField,
        T::BIG_AUTOFIELD => K::BigAutoField,
        T::BIGINT => K::BigIntegerField,
        T::BINARY | T::LONGVARBINARY | T::VARBINARY => K::BinaryField,
        T::BIT => K::NullBooleanField,
        T::CHAR | T::WCHAR => K::CharField,
        T::DECIMAL | T::NUMERIC => K::DecimalField,
        T::DOUBLE | T::FLOAT | T::REAL => K::FloatField,
        T::GUID => K::UUIDField,
        T::INTEGER => K::IntegerField,
        T::SMALLINT | T::TINYINT => K::SmallIntegerField,
        T::TYPE_DATE => K::DateField,
        T::TYPE_TIME => K::TimeField,
        T::TYPE_TIMESTAMP => K::DateTimeField,
        T::VARCHAR | T::WLONGVARCHAR | T::WVARCHAR => K::TextField,
        _ => return None,
    })
}

/// Applies the short-text narrowing: an `nvarchar` shorter than
/// [`SHORT_TEXT_THRESHOLD`] is reported as fixed-width wide char.
#[must_use]
pub fn narrow_code(code: i32, declared_length: Option<i32>) -> i32 {
    match declared_length {
        Some(len) if code == sql_type::WVARCHAR && len < SHORT_TEXT_THRESHOLD => sql_type::WCHAR,
        _ => code,
    }
}

/// Maps a column's type code and declared length to a field kind.
#[must_use]
pub fn kind_for_column(code: i32, declared_length: Option<i32>) -> Option<FieldKind> {
    kind_for_code(narrow_code(code, declared_length))
}

/// The ODBC type code DBMaker reports for a column created from `kind`.
#[must_use]
pub const fn native_code(kind: FieldKind) -> Option<i32> {
    use sql_type as T;
    use FieldKind as K;
    Some(match kind {
        K::AutoField => T::AUTOFIELD,
        K::BigAutoField => T::BIG_AUTOFIELD,
        K::BigIntegerField | K::DurationField => T::BIGINT,
        K::BinaryField => T::LONGVARBINARY,
        K::BooleanField
        | K::IntegerField
        | K::NullBooleanField
        | K::OneToOneField
        | K::PositiveIntegerField => T::INTEGER,
        K::CharField
        | K::CommaSeparatedIntegerField
        | K::FilePathField
        | K::GenericIPAddressField
        | K::IPAddressField
        | K::SlugField => T::WVARCHAR,
        K::DateField => T::TYPE_DATE,
        K::DateTimeField => T::TYPE_TIMESTAMP,
        K::DecimalField => T::DECIMAL,
        K::FloatField => T::DOUBLE,
        K::PositiveSmallIntegerField | K::SmallIntegerField => T::SMALLINT,
        K::TextField => T::WLONGVARCHAR,
        K::TimeField => T::TYPE_TIME,
        K::UUIDField => T::GUID,
        K::FileField | K::ForeignKey | K::ManyToManyField => return None,
    })
}
