//! Schema introspection over the DBMaker system catalog.
//!
//! A [`Cursor`] is the driver seam: it runs statements and exposes the
//! ODBC `SQLColumns`/`SQLPrimaryKeys` metadata calls. [`DatabaseIntrospection`]
//! drives one cursor through the catalog queries for a table and assembles
//! columns, keys, relations and constraints.
//!
//! Per table the steps run in a fixed order: column descriptions, the
//! identity check of each column, primary key, foreign keys, indexes,
//! column-level checks, then table-level checks. The first failing
//! statement aborts the table with [`Error::CatalogQuery`]; nothing is
//! retried and no partial result is returned.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::Serialize;
use tracing::{debug, warn};

use crate::codec::decode_column_order;
use crate::constraint_text::{check_columns, substitute_value_keyword};
use crate::error::{Error, Result};
use crate::operations::params::format_sql;
use crate::types::{kind_for_code, narrow_code, sql_type, FieldKind};
use crate::value::SqlValue;

const TABLE_LIST_SQL: &str =
    "SELECT trim(TABLE_NAME), 't' FROM INFORMATION_SCHEMA.TABLES WHERE TABLE_TYPE = 'TABLE'";

const IDENTITY_SQL: &str = "SELECT TYPE_NAME FROM SYSCOLUMN WHERE TABLE_NAME = UPPER(%s) \
     AND COLUMN_NAME = %s AND TYPE_NAME IN ('SERIAL', 'BIGSERIAL')";

const KEY_COLUMNS_SQL: &str = "SELECT PK_COL_ORDER, TRIM(PK_TBL_NAME) AS referenced_table_name, \
     FK_COL_ORDER FROM SYSTEM.SYSFOREIGNKEY WHERE FK_TBL_NAME = Upper(%s)";

const FOREIGN_KEYS_SQL: &str = "SELECT fk_name, fk_col_order, TRIM(pk_tbl_name), pk_col_order \
     FROM system.sysforeignkey WHERE fk_tbl_name = upper(%s)";

const COLUMN_CHECKS_SQL: &str = "SELECT constr, column_name FROM system.syscolumn \
     WHERE table_name = upper(%s) AND BLOBLEN(CONSTR)>0";

const TABLE_CHECKS_SQL: &str =
    "SELECT constr FROM system.systable WHERE table_name = upper(%s) AND BLOBLEN(CONSTR)>0";

/// Index name DBMaker gives a table's primary key.
pub const PRIMARY_KEY_INDEX: &str = "PRIMARYKEY";

/// Driver access needed by the introspector.
///
/// Statements passed to [`Cursor::execute`] use `?` placeholders.
pub trait Cursor {
    /// Error reported by the driver.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Executes a statement with bound parameters.
    fn execute(&mut self, sql: &str, params: &[SqlValue]) -> std::result::Result<(), Self::Error>;

    /// Returns every remaining row of the last statement.
    fn fetch_all(&mut self) -> std::result::Result<Vec<Vec<SqlValue>>, Self::Error>;

    /// Returns the next row of the last statement, if any.
    fn fetch_one(&mut self) -> std::result::Result<Option<Vec<SqlValue>>, Self::Error>;

    /// Column metadata of `table` (ODBC `SQLColumns`), in ordinal order.
    fn columns(&mut self, table: &str) -> std::result::Result<Vec<RawColumn>, Self::Error>;

    /// Primary key column names of `table` (ODBC `SQLPrimaryKeys`).
    fn primary_keys(&mut self, table: &str) -> std::result::Result<Vec<String>, Self::Error>;
}

/// One row of `SQLColumns` output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawColumn {
    /// `COLUMN_NAME`
    pub column_name: String,
    /// `DATA_TYPE`, an ODBC type code.
    pub data_type: i32,
    /// `TYPE_NAME`
    pub type_name: String,
    /// `COLUMN_SIZE`
    pub column_size: Option<i32>,
    /// `DECIMAL_DIGITS`
    pub decimal_digits: Option<i32>,
    /// `NULLABLE`
    pub nullable: bool,
}

/// Whether a catalog entry is a base table or a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TableKind {
    /// Base table (`t`).
    Table,
    /// View (`v`).
    View,
}

/// An entry of the table list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableInfo {
    /// Lower-cased table name.
    pub name: String,
    /// Table or view.
    pub kind: TableKind,
}

/// A described column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnDescriptor {
    /// Column name.
    pub name: String,
    /// ODBC type code after the identity and short-text adjustments.
    pub type_code: i32,
    /// Declared length (character columns) or precision.
    pub declared_length: Option<i32>,
    /// Numeric precision.
    pub precision: Option<i32>,
    /// Numeric scale.
    pub scale: Option<i32>,
    /// Whether NULL is allowed.
    pub is_nullable: bool,
    /// Whether the column is a `SERIAL`/`BIGSERIAL` identity column.
    pub is_autofield: bool,
}

impl ColumnDescriptor {
    /// The field kind this column maps back to.
    #[must_use]
    pub const fn field_kind(&self) -> Option<FieldKind> {
        kind_for_code(self.type_code)
    }
}

/// Sort order of an index column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SortOrder {
    /// Ascending.
    Asc,
    /// Descending.
    Desc,
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        })
    }
}

/// Index structure. DBMaker only reports B-tree indexes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum IndexType {
    /// B-tree index.
    BTree,
}

impl fmt::Display for IndexType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BTREE")
    }
}

/// Target of a foreign key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ForeignKeyTarget {
    /// Referenced table.
    pub table: String,
    /// Referenced columns, parallel to the constraint's columns.
    pub columns: Vec<String>,
}

/// A key, index or check constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConstraintDescriptor {
    /// Covered columns in discovery order, without duplicates.
    pub columns: Vec<String>,
    pub primary_key: bool,
    pub unique: bool,
    pub foreign_key: Option<ForeignKeyTarget>,
    pub check: bool,
    pub index: bool,
    /// Sort order (indexes only).
    pub order: Option<SortOrder>,
    /// Index structure (indexes only).
    pub index_type: Option<IndexType>,
}

impl ConstraintDescriptor {
    fn push_column(&mut self, column: &str) {
        if !self.columns.iter().any(|c| c == column) {
            self.columns.push(column.to_string());
        }
    }

    fn check_on(columns: Vec<String>) -> Self {
        let mut descriptor = Self {
            check: true,
            ..Self::default()
        };
        for column in &columns {
            descriptor.push_column(column);
        }
        descriptor
    }
}

/// The referenced side of a relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelationEntry {
    /// Referenced column.
    pub referenced_column: String,
    /// Referenced table.
    pub referenced_table: String,
}

/// One `(local column, referenced table, referenced column)` triple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyColumn {
    pub column: String,
    pub referenced_table: String,
    pub referenced_column: String,
}

/// An identity column whose counter a flush may need to reset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Sequence {
    pub table: String,
    pub column: String,
}

/// Everything known about one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableIntrospection {
    /// The introspected table.
    pub table: String,
    /// Column descriptions in ordinal order.
    pub columns: Vec<ColumnDescriptor>,
    /// Primary key column names.
    pub primary_key: Vec<String>,
    /// Local column → referenced column and table.
    pub relations: BTreeMap<String, RelationEntry>,
    /// Constraint name → constraint.
    pub constraints: BTreeMap<String, ConstraintDescriptor>,
}

/// Reads the schema of one table at a time.
pub trait Introspect {
    /// Error type for introspection failures.
    type Error: std::error::Error;

    /// Introspects `table`.
    fn introspect(&mut self, table: &str) -> std::result::Result<TableIntrospection, Self::Error>;
}

/// Catalog introspection over a borrowed [`Cursor`].
///
/// Column name lists fetched through `SQLColumns` are cached for the
/// lifetime of this value; create a new one to observe schema changes.
pub struct DatabaseIntrospection<'c, C: Cursor> {
    cursor: &'c mut C,
    column_names: HashMap<String, Vec<String>>,
}

impl<'c, C: Cursor> DatabaseIntrospection<'c, C> {
    /// Wraps a cursor.
    pub fn new(cursor: &'c mut C) -> Self {
        Self {
            cursor,
            column_names: HashMap::new(),
        }
    }

    /// Lists the base tables of the current database.
    pub fn table_list(&mut self) -> Result<Vec<TableInfo>> {
        let rows = self.query(TABLE_LIST_SQL, &[], "")?;
        Ok(rows
            .iter()
            .filter_map(|row| {
                let name = text_at(row, 0)?;
                let kind = match text_at(row, 1).as_deref() {
                    Some("v") => TableKind::View,
                    _ => TableKind::Table,
                };
                Some(TableInfo {
                    name: name.to_lowercase(),
                    kind,
                })
            })
            .collect())
    }

    /// Describes the columns of `table`.
    ///
    /// With `identity_check`, every column is looked up in `SYSCOLUMN` and
    /// identity columns get the [`sql_type::AUTOFIELD`] or
    /// [`sql_type::BIG_AUTOFIELD`] pseudo-code. `nvarchar` columns shorter
    /// than 4000 are reported as `SQL_WCHAR`.
    pub fn table_description(
        &mut self,
        table: &str,
        identity_check: bool,
    ) -> Result<Vec<ColumnDescriptor>> {
        let raw = self.raw_columns(table)?;
        let mut described = Vec::with_capacity(raw.len());
        for column in raw {
            let identity = if identity_check {
                self.identity_code(table, &column.column_name)?
            } else {
                None
            };
            let type_code =
                identity.unwrap_or_else(|| narrow_code(column.data_type, column.column_size));
            described.push(ColumnDescriptor {
                name: column.column_name,
                type_code,
                declared_length: column.column_size,
                precision: column.column_size,
                scale: column.decimal_digits,
                is_nullable: column.nullable,
                is_autofield: identity.is_some(),
            });
        }
        Ok(described)
    }

    /// Primary key column names of `table`.
    pub fn primary_key_columns(&mut self, table: &str) -> Result<Vec<String>> {
        debug!(table = %table, "SQLPrimaryKeys");
        self.cursor
            .primary_keys(table)
            .map_err(|e| Error::catalog(format!("SQLPrimaryKeys({table})"), table, Box::new(e)))
    }

    /// Foreign key column triples of `table`.
    pub fn key_columns(&mut self, table: &str) -> Result<Vec<KeyColumn>> {
        let rows = self.query(KEY_COLUMNS_SQL, &[SqlValue::Text(table.to_string())], table)?;
        let mut keys = Vec::new();
        for row in rows {
            let pk_order = decode_at(&row, 0)?;
            let Some(referenced_table) = text_at(&row, 1) else {
                continue;
            };
            let fk_order = decode_at(&row, 2)?;
            let local = self.column_names(table)?;
            let referenced = self.column_names(&referenced_table)?;
            for (fk, pk) in fk_order.into_iter().zip(pk_order) {
                let (Some(column), Some(referenced_column)) = (local.get(fk), referenced.get(pk))
                else {
                    warn!(
                        table = %table,
                        referenced_table = %referenced_table,
                        fk,
                        pk,
                        "Foreign key refers to a column index past the column list"
                    );
                    continue;
                };
                keys.push(KeyColumn {
                    column: column.clone(),
                    referenced_table: referenced_table.clone(),
                    referenced_column: referenced_column.clone(),
                });
            }
        }
        Ok(keys)
    }

    /// Local column → referenced column and table for every foreign key
    /// column of `table`.
    pub fn relations(&mut self, table: &str) -> Result<BTreeMap<String, RelationEntry>> {
        Ok(self
            .key_columns(table)?
            .into_iter()
            .map(|k| {
                (
                    k.column,
                    RelationEntry {
                        referenced_column: k.referenced_column,
                        referenced_table: k.referenced_table,
                    },
                )
            })
            .collect())
    }

    /// Identity columns of `table`.
    pub fn sequences(&mut self, table: &str) -> Result<Vec<Sequence>> {
        Ok(self
            .table_description(table, true)?
            .into_iter()
            .filter(|c| c.is_autofield)
            .map(|c| Sequence {
                table: table.to_string(),
                column: c.name,
            })
            .collect())
    }

    /// Keys, indexes and check constraints of `table`, by name.
    ///
    /// Check constraints are anonymous in DBMaker and are named
    /// `__unnamed_constraint_N__`, with `N` counting column-level and then
    /// table-level checks of the table from 1. A check referencing none of
    /// the table's columns is dropped but still consumes its number.
    pub fn constraints(&mut self, table: &str) -> Result<BTreeMap<String, ConstraintDescriptor>> {
        let mut constraints = BTreeMap::new();
        self.collect_foreign_keys(table, &mut constraints)?;
        self.collect_indexes(table, &mut constraints)?;
        self.collect_checks(table, &mut constraints)?;
        Ok(constraints)
    }

    fn collect_foreign_keys(
        &mut self,
        table: &str,
        constraints: &mut BTreeMap<String, ConstraintDescriptor>,
    ) -> Result<()> {
        let rows = self.query(FOREIGN_KEYS_SQL, &[SqlValue::Text(table.to_string())], table)?;
        for row in rows {
            let (Some(name), Some(referenced_table)) = (text_at(&row, 0), text_at(&row, 2)) else {
                continue;
            };
            let fk_order = decode_at(&row, 1)?;
            let pk_order = decode_at(&row, 3)?;
            let local = self.column_names(table)?;
            let referenced = self.column_names(&referenced_table)?;

            let mut columns = Vec::with_capacity(fk_order.len());
            let mut referenced_columns = Vec::with_capacity(pk_order.len());
            for (fk, pk) in fk_order.into_iter().zip(pk_order) {
                match (local.get(fk), referenced.get(pk)) {
                    (Some(column), Some(referenced_column)) => {
                        columns.push(column.clone());
                        referenced_columns.push(referenced_column.clone());
                    }
                    _ => warn!(
                        table = %table,
                        constraint = %name,
                        fk,
                        pk,
                        "Foreign key refers to a column index past the column list"
                    ),
                }
            }

            let entry = constraints.entry(name).or_default();
            for column in &columns {
                entry.push_column(column);
            }
            entry.foreign_key = Some(ForeignKeyTarget {
                table: referenced_table,
                columns: referenced_columns,
            });
        }
        Ok(())
    }

    fn collect_indexes(
        &mut self,
        table: &str,
        constraints: &mut BTreeMap<String, ConstraintDescriptor>,
    ) -> Result<()> {
        // The literal goes through `format_sql`, so `%` is escaped as well.
        let literal = table.replace('\'', "''").replace('%', "%%");
        let sql = format!("call SHOWINDEX('sysadm', '{literal}')");
        let rows = self.query(&sql, &[], table)?;
        // Row layout: owner, table, non_unique, index, type, colseq, column, asc_or_desc.
        for row in rows {
            let (Some(index), Some(column)) = (text_at(&row, 3), text_at(&row, 6)) else {
                continue;
            };
            let non_unique = row.get(2).and_then(SqlValue::as_i64);
            let descending = text_at(&row, 7).is_some_and(|o| o != "A");

            let is_primary = index == PRIMARY_KEY_INDEX;
            let entry = constraints.entry(index).or_insert_with(|| ConstraintDescriptor {
                primary_key: is_primary,
                unique: non_unique == Some(0),
                index: !is_primary,
                order: Some(if descending {
                    SortOrder::Desc
                } else {
                    SortOrder::Asc
                }),
                ..ConstraintDescriptor::default()
            });
            entry.push_column(&column);
            entry.index_type = Some(IndexType::BTree);
        }
        Ok(())
    }

    fn collect_checks(
        &mut self,
        table: &str,
        constraints: &mut BTreeMap<String, ConstraintDescriptor>,
    ) -> Result<()> {
        let param = [SqlValue::Text(table.to_string())];
        let column_checks = self.query(COLUMN_CHECKS_SQL, &param, table)?;
        let table_checks = self.query(TABLE_CHECKS_SQL, &param, table)?;
        let columns = self.column_names(table)?;

        let texts = column_checks
            .iter()
            .map(|row| {
                let text = text_at(row, 0).unwrap_or_default();
                match text_at(row, 1) {
                    Some(column) => substitute_value_keyword(&text, &column),
                    None => text,
                }
            })
            .chain(table_checks.iter().map(|row| text_at(row, 0).unwrap_or_default()));

        for (number, text) in (1..).zip(texts) {
            let found = check_columns(&text, &columns);
            if found.is_empty() {
                debug!(table = %table, constraint = %text, "Check constraint names no column");
                continue;
            }
            constraints.insert(
                format!("__unnamed_constraint_{number}__"),
                ConstraintDescriptor::check_on(found),
            );
        }
        Ok(())
    }

    fn raw_columns(&mut self, table: &str) -> Result<Vec<RawColumn>> {
        debug!(table = %table, "SQLColumns");
        self.cursor
            .columns(table)
            .map_err(|e| Error::catalog(format!("SQLColumns({table})"), table, Box::new(e)))
    }

    fn column_names(&mut self, table: &str) -> Result<Vec<String>> {
        if let Some(names) = self.column_names.get(table) {
            return Ok(names.clone());
        }
        let names: Vec<String> = self
            .raw_columns(table)?
            .into_iter()
            .map(|c| c.column_name)
            .collect();
        self.column_names.insert(table.to_string(), names.clone());
        Ok(names)
    }

    fn identity_code(&mut self, table: &str, column: &str) -> Result<Option<i32>> {
        let sql = format_sql(IDENTITY_SQL);
        let params = [
            SqlValue::Text(table.to_string()),
            SqlValue::Text(column.to_string()),
        ];
        debug!(table = %table, sql = %sql, "Executing catalog query");
        let row = self
            .cursor
            .execute(&sql, &params)
            .and_then(|()| self.cursor.fetch_one())
            .map_err(|e| Error::catalog(sql.as_str(), table, Box::new(e)))?;
        Ok(row.and_then(|r| text_at(&r, 0)).map(|type_name| {
            if type_name.eq_ignore_ascii_case("BIGSERIAL") {
                sql_type::BIG_AUTOFIELD
            } else {
                sql_type::AUTOFIELD
            }
        }))
    }

    fn query(&mut self, sql: &str, params: &[SqlValue], table: &str) -> Result<Vec<Vec<SqlValue>>> {
        let sql = format_sql(sql);
        debug!(table = %table, sql = %sql, "Executing catalog query");
        self.cursor
            .execute(&sql, params)
            .and_then(|()| self.cursor.fetch_all())
            .map_err(|e| Error::catalog(sql.as_str(), table, Box::new(e)))
    }
}

impl<C: Cursor> Introspect for DatabaseIntrospection<'_, C> {
    type Error = Error;

    fn introspect(&mut self, table: &str) -> Result<TableIntrospection> {
        let columns = self.table_description(table, true)?;
        let primary_key = self.primary_key_columns(table)?;
        let constraints = self.constraints(table)?;

        let mut relations = BTreeMap::new();
        for constraint in constraints.values() {
            let Some(target) = &constraint.foreign_key else {
                continue;
            };
            for (column, referenced) in constraint.columns.iter().zip(&target.columns) {
                relations.insert(
                    column.clone(),
                    RelationEntry {
                        referenced_column: referenced.clone(),
                        referenced_table: target.table.clone(),
                    },
                );
            }
        }

        Ok(TableIntrospection {
            table: table.to_string(),
            columns,
            primary_key,
            relations,
            constraints,
        })
    }
}

/// Trimmed text of a cell; blobs are decoded as UTF-8.
fn text_at(row: &[SqlValue], index: usize) -> Option<String> {
    match row.get(index)? {
        SqlValue::Text(s) => Some(s.trim().to_string()),
        SqlValue::Blob(b) => Some(String::from_utf8_lossy(b).trim().to_string()),
        _ => None,
    }
}

fn decode_at(row: &[SqlValue], index: usize) -> Result<Vec<usize>> {
    let bytes = row.get(index).and_then(SqlValue::as_bytes).unwrap_or_default();
    Ok(decode_column_order(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_cells_are_trimmed() {
        let row = vec![
            SqlValue::Text("ORDERS   ".into()),
            SqlValue::Blob(b"qty >= 0".to_vec()),
            SqlValue::Int(3),
        ];
        assert_eq!(text_at(&row, 0).as_deref(), Some("ORDERS"));
        assert_eq!(text_at(&row, 1).as_deref(), Some("qty >= 0"));
        assert_eq!(text_at(&row, 2), None);
        assert_eq!(text_at(&row, 9), None);
    }

    #[test]
    fn missing_bitmap_decodes_empty() {
        assert!(decode_at(&[SqlValue::Null], 0).unwrap().is_empty());
        assert!(matches!(
            decode_at(&[SqlValue::Blob(vec![1])], 0),
            Err(Error::Decode(_))
        ));
    }

    #[test]
    fn duplicate_columns_are_merged() {
        let mut constraint = ConstraintDescriptor::check_on(vec!["a".into(), "b".into(), "a".into()]);
        constraint.push_column("b");
        assert_eq!(constraint.columns, vec!["a", "b"]);
        assert!(constraint.check);
    }

    #[test]
    fn column_kind_follows_type_code() {
        let column = ColumnDescriptor {
            name: "id".into(),
            type_code: sql_type::AUTOFIELD,
            declared_length: Some(10),
            precision: Some(10),
            scale: Some(0),
            is_nullable: false,
            is_autofield: true,
        };
        assert_eq!(column.field_kind(), Some(FieldKind::AutoField));
    }
}
