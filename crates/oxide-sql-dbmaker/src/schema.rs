//! DDL generation for schema changes.
//!
//! DBMaker alters columns with `MODIFY COLUMN ... TO ...` rather than the
//! standard `ALTER COLUMN`, drops keys by name, and names the table in
//! `DROP INDEX`. Identity columns (`serial`, `bigserial`) never carry an
//! explicit `NULL`/`NOT NULL`.

use crate::error::{Error, Result};
use crate::features::DatabaseFeatures;
use crate::operations::adapt::quote_value;
use crate::operations::DatabaseOperations;
use crate::types::{check_constraint, db_type, FieldKind, FieldParams};
use crate::value::SqlValue;

/// Column types that manage their own nullability.
const IMPLICIT_NULLABILITY_TYPES: &[&str] = &["serial", "bigserial", "jsoncols"];

/// A column to create.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSpec {
    /// Column name.
    pub name: String,
    /// Field kind.
    pub kind: FieldKind,
    /// Type parameters.
    pub params: FieldParams,
    /// Whether NULL is allowed.
    pub null: bool,
    /// Whether this column is the primary key.
    pub primary_key: bool,
    /// Whether this column is unique.
    pub unique: bool,
    /// Default applied to existing and new rows.
    pub default: Option<SqlValue>,
    /// Tablespace of the column's implicit index.
    pub tablespace: Option<String>,
}

impl ColumnSpec {
    /// A NOT NULL column without constraints.
    #[must_use]
    pub fn new(name: &str, kind: FieldKind, params: FieldParams) -> Self {
        Self {
            name: name.to_string(),
            kind,
            params,
            null: false,
            primary_key: false,
            unique: false,
            default: None,
            tablespace: None,
        }
    }

    /// Allows NULL.
    #[must_use]
    pub const fn nullable(mut self) -> Self {
        self.null = true;
        self
    }

    /// Marks the column as primary key.
    #[must_use]
    pub const fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Marks the column as unique.
    #[must_use]
    pub const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Sets the default.
    #[must_use]
    pub fn default_value(mut self, value: SqlValue) -> Self {
        self.default = Some(value);
        self
    }

    /// Places the column's implicit index in `tablespace`.
    #[must_use]
    pub fn tablespace(mut self, tablespace: &str) -> Self {
        self.tablespace = Some(tablespace.to_string());
        self
    }
}

/// Renders DDL statements for one connection.
#[derive(Debug, Clone, Copy)]
pub struct DatabaseSchemaEditor<'a> {
    ops: &'a DatabaseOperations,
    features: &'a DatabaseFeatures,
}

impl<'a> DatabaseSchemaEditor<'a> {
    /// Creates an editor quoting names with `ops`.
    #[must_use]
    pub const fn new(ops: &'a DatabaseOperations, features: &'a DatabaseFeatures) -> Self {
        Self { ops, features }
    }

    fn quote(&self, name: &str) -> String {
        self.ops.quote_name(name)
    }

    /// Column definition for CREATE TABLE and ADD COLUMN, with the
    /// parameters it binds.
    ///
    /// Returns `None` for many-to-many fields, which have no column.
    /// Foreign keys must be described with the kind of the column they
    /// reference.
    pub fn column_sql(&self, column: &ColumnSpec) -> Result<Option<(String, Vec<SqlValue>)>> {
        if column.kind == FieldKind::ManyToManyField {
            return Ok(None);
        }
        let column_type = db_type(column.kind, &column.params)?;
        let quoted = self.quote(&column.name);
        let mut sql = format!("{quoted} {column_type}");
        let mut params = Vec::new();

        if let Some(check) = check_constraint(column.kind, &quoted) {
            sql.push_str(&format!(" CHECK ({check})"));
        }
        if let Some(default) = &column.default {
            if self.features.requires_literal_defaults {
                sql.push_str(&format!(" DEFAULT {}", quote_value(default)));
            } else {
                sql.push_str(" DEFAULT %s");
                params.push(default.clone());
            }
        }
        let lowered = column_type.to_lowercase();
        if !IMPLICIT_NULLABILITY_TYPES.contains(&lowered.as_str()) {
            sql.push_str(if column.null { " NULL" } else { " NOT NULL" });
        }
        if column.primary_key {
            sql.push_str(" PRIMARY KEY");
        } else if column.unique {
            sql.push_str(" UNIQUE");
            if let Some(tablespace) = &column.tablespace {
                if self.features.supports_tablespaces {
                    sql.push(' ');
                    sql.push_str(&self.ops.tablespace_sql(tablespace));
                }
            }
        }
        Ok(Some((sql, params)))
    }

    /// CREATE TABLE with one line per column.
    pub fn create_table(
        &self,
        table: &str,
        columns: &[ColumnSpec],
    ) -> Result<(String, Vec<SqlValue>)> {
        let mut definitions = Vec::with_capacity(columns.len());
        let mut params = Vec::new();
        for column in columns {
            if let Some((sql, column_params)) = self.column_sql(column)? {
                definitions.push(format!("    {sql}"));
                params.extend(column_params);
            }
        }
        if definitions.is_empty() {
            return Err(Error::InvalidValue {
                kind: "table definition",
                value: table.to_string(),
            });
        }
        let sql = format!(
            "CREATE TABLE {} (\n{}\n)",
            self.quote(table),
            definitions.join(",\n")
        );
        Ok((sql, params))
    }

    /// ALTER TABLE ... ADD COLUMN.
    pub fn add_column(
        &self,
        table: &str,
        column: &ColumnSpec,
    ) -> Result<Option<(String, Vec<SqlValue>)>> {
        Ok(self.column_sql(column)?.map(|(definition, params)| {
            (
                format!("ALTER TABLE {} ADD COLUMN {definition}", self.quote(table)),
                params,
            )
        }))
    }

    /// Changes a column's type.
    #[must_use]
    pub fn alter_column_type(&self, table: &str, column: &str, new_type: &str) -> String {
        format!(
            "ALTER TABLE {} MODIFY COLUMN {} TYPE TO {new_type}",
            self.quote(table),
            self.quote(column)
        )
    }

    /// Switches a column between NULL and NOT NULL.
    #[must_use]
    pub fn alter_column_null(&self, table: &str, column: &str, null: bool) -> String {
        let change = if null {
            "NOT NULL TO NULL"
        } else {
            "NULL TO NOT NULL"
        };
        format!(
            "ALTER TABLE {} MODIFY COLUMN {} {change}",
            self.quote(table),
            self.quote(column)
        )
    }

    /// Sets or drops a column default. Defaults are rendered inline.
    #[must_use]
    pub fn alter_column_default(
        &self,
        table: &str,
        column: &str,
        default: Option<&SqlValue>,
    ) -> String {
        let change = match default {
            Some(value) => format!("SET DEFAULT {}", quote_value(value)),
            None => String::from("DROP DEFAULT"),
        };
        format!(
            "ALTER TABLE {} MODIFY COLUMN {} {change}",
            self.quote(table),
            self.quote(column)
        )
    }

    #[must_use]
    pub fn rename_column(&self, table: &str, old: &str, new: &str) -> String {
        format!(
            "ALTER TABLE {} MODIFY {} NAME TO {}",
            self.quote(table),
            self.quote(old),
            self.quote(new)
        )
    }

    #[must_use]
    pub fn rename_table(&self, old: &str, new: &str) -> String {
        format!("ALTER TABLE {} RENAME TO {}", self.quote(old), self.quote(new))
    }

    #[must_use]
    pub fn retablespace_table(&self, table: &str, tablespace: &str) -> String {
        format!(
            "ALTER TABLE {} MOVE TABLESPACE {}",
            self.quote(table),
            self.quote(tablespace)
        )
    }

    /// Adds a named table-level CHECK.
    #[must_use]
    pub fn create_check(&self, table: &str, name: &str, check: &str) -> String {
        format!(
            "ALTER TABLE {} ADD CONSTRAINT {} CHECK ({check})",
            self.quote(table),
            self.quote(name)
        )
    }

    /// Drops the CHECK of a column. DBMaker checks are anonymous, so the
    /// column identifies the constraint.
    #[must_use]
    pub fn delete_check(&self, table: &str, column: &str) -> String {
        format!(
            "ALTER TABLE {} MODIFY {} DROP CONSTRAINT",
            self.quote(table),
            self.quote(column)
        )
    }

    /// Drops the UNIQUE constraint of a column.
    #[must_use]
    pub fn delete_unique(&self, table: &str, column: &str) -> String {
        self.delete_check(table, column)
    }

    #[must_use]
    pub fn delete_foreign_key(&self, table: &str, name: &str) -> String {
        format!(
            "ALTER TABLE {} DROP FOREIGN KEY {}",
            self.quote(table),
            self.quote(name)
        )
    }

    #[must_use]
    pub fn delete_primary_key(&self, table: &str, name: &str) -> String {
        format!(
            "ALTER TABLE {} DROP PRIMARY KEY {}",
            self.quote(table),
            self.quote(name)
        )
    }

    #[must_use]
    pub fn delete_index(&self, table: &str, name: &str) -> String {
        format!("DROP INDEX {} ON {}", self.quote(name), self.quote(table))
    }
}
