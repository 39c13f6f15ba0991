#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};

use oxide_sql_dbmaker::introspection::{Cursor, RawColumn};
use oxide_sql_dbmaker::types::sql_type;
use oxide_sql_dbmaker::SqlValue;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("fake driver error: {0}")]
pub struct FakeError(pub String);

/// In-memory cursor answering catalog statements from scripted rows.
///
/// Statements are matched by substring, first script wins. The identity
/// lookup is answered per column from `identities`.
#[derive(Debug, Default)]
pub struct FakeCursor {
    scripts: Vec<(String, Vec<Vec<SqlValue>>)>,
    tables: HashMap<String, Vec<RawColumn>>,
    primary_keys: HashMap<String, Vec<String>>,
    identities: HashMap<(String, String), String>,
    fail_on: Option<String>,
    pending: VecDeque<Vec<SqlValue>>,
    pub executed: Vec<(String, Vec<SqlValue>)>,
}

impl FakeCursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(mut self, pattern: &str, rows: Vec<Vec<SqlValue>>) -> Self {
        self.scripts.push((pattern.to_string(), rows));
        self
    }

    pub fn table(mut self, name: &str, columns: Vec<RawColumn>) -> Self {
        self.tables.insert(name.to_uppercase(), columns);
        self
    }

    pub fn primary_key(mut self, table: &str, columns: &[&str]) -> Self {
        self.primary_keys.insert(
            table.to_uppercase(),
            columns.iter().map(ToString::to_string).collect(),
        );
        self
    }

    pub fn identity(mut self, table: &str, column: &str, type_name: &str) -> Self {
        self.identities.insert(
            (table.to_uppercase(), column.to_string()),
            type_name.to_string(),
        );
        self
    }

    pub fn fail_on(mut self, pattern: &str) -> Self {
        self.fail_on = Some(pattern.to_string());
        self
    }

    pub fn executed_sql(&self) -> Vec<&str> {
        self.executed.iter().map(|(sql, _)| sql.as_str()).collect()
    }

    fn identity_rows(&self, params: &[SqlValue]) -> Vec<Vec<SqlValue>> {
        let (Some(table), Some(column)) = (
            params.first().and_then(SqlValue::as_str),
            params.get(1).and_then(SqlValue::as_str),
        ) else {
            return Vec::new();
        };
        self.identities
            .get(&(table.to_uppercase(), column.to_string()))
            .map(|type_name| vec![vec![SqlValue::Text(type_name.clone())]])
            .unwrap_or_default()
    }
}

impl Cursor for FakeCursor {
    type Error = FakeError;

    fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<(), FakeError> {
        self.executed.push((sql.to_string(), params.to_vec()));
        if let Some(pattern) = &self.fail_on {
            if sql.contains(pattern.as_str()) {
                return Err(FakeError(format!("rejected: {sql}")));
            }
        }
        let rows = if sql.contains("TYPE_NAME IN ('SERIAL'") {
            self.identity_rows(params)
        } else {
            self.scripts
                .iter()
                .find(|(pattern, _)| sql.contains(pattern.as_str()))
                .map(|(_, rows)| rows.clone())
                .unwrap_or_default()
        };
        self.pending = rows.into();
        Ok(())
    }

    fn fetch_all(&mut self) -> Result<Vec<Vec<SqlValue>>, FakeError> {
        Ok(self.pending.drain(..).collect())
    }

    fn fetch_one(&mut self) -> Result<Option<Vec<SqlValue>>, FakeError> {
        Ok(self.pending.pop_front())
    }

    fn columns(&mut self, table: &str) -> Result<Vec<RawColumn>, FakeError> {
        Ok(self
            .tables
            .get(&table.to_uppercase())
            .cloned()
            .unwrap_or_default())
    }

    fn primary_keys(&mut self, table: &str) -> Result<Vec<String>, FakeError> {
        Ok(self
            .primary_keys
            .get(&table.to_uppercase())
            .cloned()
            .unwrap_or_default())
    }
}

pub fn column(name: &str, data_type: i32, size: Option<i32>, nullable: bool) -> RawColumn {
    RawColumn {
        column_name: name.to_string(),
        data_type,
        type_name: String::new(),
        column_size: size,
        decimal_digits: None,
        nullable,
    }
}

pub fn int_column(name: &str) -> RawColumn {
    column(name, sql_type::INTEGER, Some(10), false)
}

/// Encodes 1-based column ordinals the way `SYSFOREIGNKEY` stores them.
pub fn column_order(ordinals: &[u16]) -> SqlValue {
    SqlValue::Blob(ordinals.iter().flat_map(|o| o.to_le_bytes()).collect())
}

pub fn text(s: &str) -> SqlValue {
    SqlValue::Text(s.to_string())
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}
