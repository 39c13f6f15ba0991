//! Capability flags of the DBMaker backend.

use serde::Serialize;

/// What the backend supports, as consulted by statement builders and the
/// schema editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct DatabaseFeatures {
    /// Whether a cursor can be read in chunks while other statements run.
    pub can_use_chunked_reads: bool,
    /// Whether timestamps keep microseconds.
    pub supports_microsecond_precision: bool,
    /// Whether regex lookups support backreferences.
    pub supports_regex_backreferencing: bool,
    pub supports_subqueries_in_group_by: bool,
    pub supports_transactions: bool,
    pub allow_sliced_subqueries: bool,
    /// Whether `%(name)s` parameters are accepted.
    pub supports_paramstyle_pyformat: bool,
    pub has_bulk_insert: bool,
    /// Whether timestamp columns store a zone.
    pub supports_timezones: bool,
    pub supports_sequence_reset: bool,
    pub supports_tablespaces: bool,
    /// Whether unique constraints admit several NULLs.
    pub ignores_nulls_in_unique_constraints: bool,
    /// Whether identity columns are recognized by introspection.
    pub can_introspect_autofield: bool,
    /// Whether column defaults must be rendered inline rather than bound.
    pub requires_literal_defaults: bool,
}

impl DatabaseFeatures {
    /// The flags of every DBMaker server this crate targets.
    pub const DBMAKER: Self = Self {
        can_use_chunked_reads: false,
        supports_microsecond_precision: false,
        supports_regex_backreferencing: false,
        supports_subqueries_in_group_by: false,
        supports_transactions: true,
        allow_sliced_subqueries: false,
        supports_paramstyle_pyformat: false,
        has_bulk_insert: false,
        supports_timezones: false,
        supports_sequence_reset: false,
        supports_tablespaces: true,
        ignores_nulls_in_unique_constraints: false,
        can_introspect_autofield: true,
        requires_literal_defaults: false,
    };
}

impl Default for DatabaseFeatures {
    fn default() -> Self {
        Self::DBMAKER
    }
}
