//! # oxide-sql-dbmaker
//!
//! DBMaker dialect adapter for ODBC connections.
//!
//! The crate renders the DBMaker-specific SQL an ORM needs (identifier
//! quoting, lookup operators, date arithmetic, DDL, flush statements),
//! maps field kinds to column types and back, and introspects tables
//! through the `SYSTEM` catalog. Statement execution is left to the
//! driver behind the [`Cursor`] trait.
//!
//! # How DBMaker differs from other dialects
//!
//! - **Placeholders**: the driver binds `?`; fragments are written with
//!   `%s` and rewritten by [`operations::params::format_sql`], which also
//!   turns the escaped `%%` back into `%`.
//! - **Booleans**: there is no boolean column type. Boolean fields are
//!   stored in `int` columns with a `CHECK (col IN (0,1))` constraint, and
//!   boolean parameters are bound as `1`/`0`.
//! - **Identity columns**: `SERIAL` and `BIGSERIAL` carry the sequence.
//!   The catalog reports them as plain integers, so introspection asks
//!   `SYSCOLUMN` for each column's declared type name.
//! - **Key columns**: `SYSFOREIGNKEY` stores the columns of a key as a
//!   packed array of column ordinals; see [`codec::decode_column_order`].
//! - **Check constraints** are anonymous, and a column-level check refers
//!   to its column as `value`.
//! - **ALTER TABLE** uses `MODIFY COLUMN c TYPE TO t` and
//!   `MODIFY c NAME TO n` instead of the standard forms.
//! - **Foreign-key checking** is a session option toggled through
//!   `CALL SETSYSTEMOPTION('FKCHK', ...)`.
//!
//! ## Example
//!
//! ```rust
//! use oxide_sql_dbmaker::compiler::{Aggregate, Node, StatementKind};
//! use oxide_sql_dbmaker::{DatabaseSettings, DatabaseWrapper};
//!
//! let wrapper = DatabaseWrapper::new(DatabaseSettings::new("shop")).unwrap();
//! let (sql, params) = wrapper
//!     .compiler(StatementKind::Aggregate)
//!     .as_sql(&Node::Aggregate(Aggregate::avg("price")));
//!
//! assert_eq!(sql, "AVG(CAST(price AS FLOAT))");
//! assert!(params.is_empty());
//! ```

pub mod codec;
pub mod compiler;
pub mod config;
pub mod connection;
pub mod constraint_text;
pub mod dialect;
pub mod error;
pub mod features;
pub mod introspection;
pub mod operations;
pub mod schema;
pub mod types;
pub mod value;

pub use compiler::{SqlCompiler, StatementKind};
pub use config::{DatabaseOptions, DatabaseSettings};
pub use connection::DatabaseWrapper;
pub use dialect::{DbmakerDialect, Dialect};
pub use error::{Error, Result};
pub use features::DatabaseFeatures;
pub use introspection::{Cursor, DatabaseIntrospection, Introspect, TableIntrospection};
pub use operations::DatabaseOperations;
pub use schema::{ColumnSpec, DatabaseSchemaEditor};
pub use types::{FieldKind, FieldParams};
pub use value::{SqlValue, ToSqlValue};
