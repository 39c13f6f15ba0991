//! Per-connection wrapper.
//!
//! [`DatabaseWrapper`] is built once from validated settings. Construction
//! derives the lookup operator table (with the configured collation) and
//! the quoting used by [`DatabaseOperations`]; nothing is mutated
//! afterwards, so a wrapper can be shared across threads once built.

use tracing::{debug, warn};

use crate::compiler::{SqlCompiler, StatementKind};
use crate::config::DatabaseSettings;
use crate::error::{Error, Result};
use crate::features::DatabaseFeatures;
use crate::introspection::Cursor;
use crate::operations::lookups::OperatorTable;
use crate::operations::params::{format_params, format_sql};
use crate::operations::{
    DatabaseOperations, DISABLE_CONSTRAINT_CHECKING_SQL, ENABLE_CONSTRAINT_CHECKING_SQL,
    LAST_INSERT_ID_SQL,
};
use crate::schema::DatabaseSchemaEditor;
use crate::value::SqlValue;

/// Sent on every new connection so `||` concatenates strings.
pub const INIT_CONNECTION_SQL: &str = "set string concat on";

const PING_SQL: &str = "SELECT 1";

/// Everything the adapter knows about one configured database.
#[derive(Debug, Clone)]
pub struct DatabaseWrapper {
    settings: DatabaseSettings,
    operators: OperatorTable,
    ops: DatabaseOperations,
    features: DatabaseFeatures,
}

impl DatabaseWrapper {
    /// Vendor name.
    pub const VENDOR: &'static str = "dbmaker";

    /// Validates `settings` and freezes the per-connection tables.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] when the database name is missing
    /// or too long, or a quote option is empty.
    pub fn new(settings: DatabaseSettings) -> Result<Self> {
        settings.validate()?;
        let options = &settings.options;
        let operators = match options.collation.as_deref() {
            Some(collation) if !collation.is_empty() => OperatorTable::with_collation(collation),
            _ => OperatorTable::new(),
        };
        let ops = DatabaseOperations::from_options(options);
        debug!(
            database = %settings.name.as_deref().unwrap_or_default(),
            collation = ?options.collation,
            "Configured DBMaker connection"
        );
        Ok(Self {
            settings,
            operators,
            ops,
            features: DatabaseFeatures::DBMAKER,
        })
    }

    #[must_use]
    pub const fn settings(&self) -> &DatabaseSettings {
        &self.settings
    }

    /// Lookup templates, collation applied.
    #[must_use]
    pub const fn operators(&self) -> &OperatorTable {
        &self.operators
    }

    #[must_use]
    pub const fn ops(&self) -> &DatabaseOperations {
        &self.ops
    }

    #[must_use]
    pub const fn features(&self) -> &DatabaseFeatures {
        &self.features
    }

    /// A compiler for a statement of `kind`.
    #[must_use]
    pub const fn compiler(&self, kind: StatementKind) -> SqlCompiler<'_> {
        SqlCompiler::new(kind, &self.ops, &self.operators)
    }

    #[must_use]
    pub const fn schema_editor(&self) -> DatabaseSchemaEditor<'_> {
        DatabaseSchemaEditor::new(&self.ops, &self.features)
    }

    /// Runs `sql` after rewriting placeholders and parameters for the driver.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Statement`] when the driver rejects the statement.
    pub fn execute<C: Cursor>(&self, cursor: &mut C, sql: &str, params: Vec<SqlValue>) -> Result<()> {
        let sql = format_sql(sql);
        let params = format_params(params);
        debug!(sql = %sql, params = params.len(), "Executing");
        cursor.execute(&sql, &params).map_err(|e| Error::Statement {
            sql,
            source: Box::new(e),
        })
    }

    /// Session setup sent on each new connection.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Statement`] when the driver rejects the statement.
    pub fn init_connection_state<C: Cursor>(&self, cursor: &mut C) -> Result<()> {
        self.execute(cursor, INIT_CONNECTION_SQL, Vec::new())
    }

    /// Suspends foreign-key checking. Returns `true` when checks were
    /// turned off and must be re-enabled.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Statement`] when the driver rejects the statement.
    pub fn disable_constraint_checking<C: Cursor>(&self, cursor: &mut C) -> Result<bool> {
        self.execute(cursor, DISABLE_CONSTRAINT_CHECKING_SQL, Vec::new())?;
        Ok(true)
    }

    /// Re-enables foreign-key checking.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Statement`] when the driver rejects the statement.
    pub fn enable_constraint_checking<C: Cursor>(&self, cursor: &mut C) -> Result<()> {
        self.execute(cursor, ENABLE_CONSTRAINT_CHECKING_SQL, Vec::new())
    }

    /// The serial value generated by the last insert on this connection.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Statement`] when the query fails.
    pub fn last_insert_id<C: Cursor>(&self, cursor: &mut C) -> Result<Option<i64>> {
        self.execute(cursor, LAST_INSERT_ID_SQL, Vec::new())?;
        let row = cursor.fetch_one().map_err(|e| Error::Statement {
            sql: LAST_INSERT_ID_SQL.to_string(),
            source: Box::new(e),
        })?;
        Ok(row.and_then(|r| r.first().and_then(SqlValue::as_i64)))
    }

    /// Whether the connection behind `cursor` still answers.
    pub fn is_usable<C: Cursor>(&self, cursor: &mut C) -> bool {
        match cursor.execute(PING_SQL, &[]) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Connection is no longer usable");
                false
            }
        }
    }
}
