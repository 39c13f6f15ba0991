//! Catalog introspection against a scripted cursor.
//!
//! The fixture models two tables: `customers(id serial, name)` and
//! `orders(id bigserial, customer_id, qty, code, note)` with a foreign
//! key from `orders.customer_id` to `customers.id`.

mod common;

use common::{column, column_order, init_tracing, int_column, text, FakeCursor};
use oxide_sql_dbmaker::introspection::{
    ForeignKeyTarget, IndexType, KeyColumn, RelationEntry, Sequence, SortOrder, TableKind,
};
use oxide_sql_dbmaker::types::{sql_type, FieldKind};
use oxide_sql_dbmaker::{DatabaseIntrospection, Error, Introspect, SqlValue};

// =============================================================================
// Fixture
// =============================================================================

fn show_index_row(non_unique: i64, index: &str, column: &str, order: &str) -> Vec<SqlValue> {
    vec![
        text("SYSADM"),
        text("ORDERS"),
        SqlValue::Int(non_unique),
        text(index),
        text("B"),
        SqlValue::Int(1),
        text(column),
        text(order),
    ]
}

fn shop() -> FakeCursor {
    FakeCursor::new()
        .table(
            "customers",
            vec![
                int_column("id"),
                column("name", sql_type::WVARCHAR, Some(40), false),
            ],
        )
        .table(
            "orders",
            vec![
                int_column("id"),
                int_column("customer_id"),
                int_column("qty"),
                column("code", sql_type::WVARCHAR, Some(20), true),
                column("note", sql_type::WVARCHAR, Some(8000), true),
            ],
        )
        .primary_key("orders", &["id"])
        .primary_key("customers", &["id"])
        .identity("orders", "id", "BIGSERIAL")
        .identity("customers", "id", "SERIAL")
        .script(
            "INFORMATION_SCHEMA.TABLES",
            vec![
                vec![text("ORDERS    "), text("t")],
                vec![text("CUSTOMERS "), text("t")],
            ],
        )
        .script(
            "FROM SYSTEM.SYSFOREIGNKEY",
            vec![vec![column_order(&[1]), text("CUSTOMERS"), column_order(&[2])]],
        )
        .script(
            "FROM system.sysforeignkey",
            vec![vec![
                text("FK_CUSTOMER"),
                column_order(&[2, 0]),
                text("CUSTOMERS  "),
                column_order(&[1, 0]),
            ]],
        )
        .script(
            "SHOWINDEX",
            vec![
                show_index_row(0, "PRIMARYKEY", "id", "A"),
                show_index_row(1, "IX_QTY", "qty", "D"),
                show_index_row(1, "FK_CUSTOMER", "customer_id", "A"),
            ],
        )
        .script(
            "FROM system.syscolumn",
            vec![vec![SqlValue::Blob(b"VALUE >= 0".to_vec()), text("qty")]],
        )
        .script(
            "FROM system.systable",
            vec![
                vec![text("(1 = 1)")],
                vec![text("(qty < 1000) and (customer_id > 0)")],
            ],
        )
}

// =============================================================================
// Table list and columns
// =============================================================================

#[test]
fn table_list_is_trimmed_and_lowercased() {
    let mut cursor = shop();
    let tables = DatabaseIntrospection::new(&mut cursor).table_list().unwrap();

    let names: Vec<&str> = tables.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["orders", "customers"]);
    assert!(tables.iter().all(|t| t.kind == TableKind::Table));
}

#[test]
fn identity_columns_get_pseudo_codes() {
    init_tracing();
    let mut cursor = shop();
    let columns = DatabaseIntrospection::new(&mut cursor)
        .table_description("orders", true)
        .unwrap();

    let kinds: Vec<Option<FieldKind>> = columns.iter().map(|c| c.field_kind()).collect();
    assert_eq!(
        kinds,
        vec![
            Some(FieldKind::BigAutoField),
            Some(FieldKind::IntegerField),
            Some(FieldKind::IntegerField),
            Some(FieldKind::CharField),
            Some(FieldKind::TextField),
        ]
    );
    assert!(columns[0].is_autofield);
    assert!(!columns[1].is_autofield);
    assert!(columns[3].is_nullable);
}

#[test]
fn identity_lookup_binds_table_and_column() {
    let mut cursor = shop();
    DatabaseIntrospection::new(&mut cursor)
        .table_description("customers", true)
        .unwrap();

    let (sql, params) = cursor
        .executed
        .iter()
        .find(|(sql, _)| sql.contains("FROM SYSCOLUMN"))
        .unwrap();
    assert!(sql.contains("TABLE_NAME = UPPER(?) AND COLUMN_NAME = ?"));
    assert!(!sql.contains("%s"));
    assert_eq!(params, &vec![text("customers"), text("id")]);
}

#[test]
fn description_without_identity_check_skips_lookup() {
    let mut cursor = shop();
    let columns = DatabaseIntrospection::new(&mut cursor)
        .table_description("orders", false)
        .unwrap();

    assert_eq!(columns[0].type_code, sql_type::INTEGER);
    assert!(cursor.executed.is_empty());
}

#[test]
fn sequences_list_identity_columns() {
    let mut cursor = shop();
    let sequences = DatabaseIntrospection::new(&mut cursor)
        .sequences("orders")
        .unwrap();

    assert_eq!(
        sequences,
        vec![Sequence {
            table: "orders".into(),
            column: "id".into(),
        }]
    );
}

// =============================================================================
// Keys and relations
// =============================================================================

#[test]
fn key_columns_resolve_ordinals_against_both_tables() {
    let mut cursor = shop();
    let keys = DatabaseIntrospection::new(&mut cursor)
        .key_columns("orders")
        .unwrap();

    assert_eq!(
        keys,
        vec![KeyColumn {
            column: "customer_id".into(),
            referenced_table: "CUSTOMERS".into(),
            referenced_column: "id".into(),
        }]
    );
}

#[test]
fn relations_map_local_column_to_target() {
    let mut cursor = shop();
    let relations = DatabaseIntrospection::new(&mut cursor)
        .relations("orders")
        .unwrap();

    assert_eq!(relations.len(), 1);
    assert_eq!(
        relations["customer_id"],
        RelationEntry {
            referenced_column: "id".into(),
            referenced_table: "CUSTOMERS".into(),
        }
    );
}

#[test]
fn primary_key_comes_from_driver_metadata() {
    let mut cursor = shop();
    let pk = DatabaseIntrospection::new(&mut cursor)
        .primary_key_columns("orders")
        .unwrap();
    assert_eq!(pk, vec!["id"]);
}

// =============================================================================
// Constraints
// =============================================================================

#[test]
fn constraints_cover_keys_indexes_and_checks() {
    init_tracing();
    let mut cursor = shop();
    let constraints = DatabaseIntrospection::new(&mut cursor)
        .constraints("orders")
        .unwrap();

    let names: Vec<&str> = constraints.keys().map(String::as_str).collect();
    assert_eq!(
        names,
        vec![
            "FK_CUSTOMER",
            "IX_QTY",
            "PRIMARYKEY",
            "__unnamed_constraint_1__",
            "__unnamed_constraint_3__",
        ]
    );

    let pk = &constraints["PRIMARYKEY"];
    assert!(pk.primary_key);
    assert!(pk.unique);
    assert!(!pk.index);
    assert_eq!(pk.columns, vec!["id"]);
    assert_eq!(pk.order, Some(SortOrder::Asc));

    let ix = &constraints["IX_QTY"];
    assert!(ix.index);
    assert!(!ix.unique);
    assert_eq!(ix.order, Some(SortOrder::Desc));
    assert_eq!(ix.index_type, Some(IndexType::BTree));
}

#[test]
fn index_pass_keeps_foreign_key_target() {
    let mut cursor = shop();
    let constraints = DatabaseIntrospection::new(&mut cursor)
        .constraints("orders")
        .unwrap();

    let fk = &constraints["FK_CUSTOMER"];
    assert_eq!(fk.columns, vec!["customer_id"]);
    assert_eq!(
        fk.foreign_key,
        Some(ForeignKeyTarget {
            table: "CUSTOMERS".into(),
            columns: vec!["id".into()],
        })
    );
    assert_eq!(fk.index_type, Some(IndexType::BTree));
    assert!(!fk.check);
}

#[test]
fn column_checks_substitute_value_keyword() {
    let mut cursor = shop();
    let constraints = DatabaseIntrospection::new(&mut cursor)
        .constraints("orders")
        .unwrap();

    let check = &constraints["__unnamed_constraint_1__"];
    assert!(check.check);
    assert_eq!(check.columns, vec!["qty"]);
}

#[test]
fn checks_without_columns_still_consume_a_number() {
    let mut cursor = shop();
    let constraints = DatabaseIntrospection::new(&mut cursor)
        .constraints("orders")
        .unwrap();

    assert!(!constraints.contains_key("__unnamed_constraint_2__"));
    let check = &constraints["__unnamed_constraint_3__"];
    assert_eq!(check.columns, vec!["qty", "customer_id"]);
}

#[test]
fn show_index_quotes_table_name() {
    let mut cursor = shop();
    DatabaseIntrospection::new(&mut cursor)
        .constraints("o'brien")
        .unwrap();

    assert!(cursor
        .executed_sql()
        .contains(&"call SHOWINDEX('sysadm', 'o''brien')"));
}

#[test]
fn show_index_keeps_percent_in_table_name() {
    let mut cursor = shop();
    DatabaseIntrospection::new(&mut cursor)
        .constraints("a%sb")
        .unwrap();

    let sql = cursor.executed_sql();
    assert!(sql.contains(&"call SHOWINDEX('sysadm', 'a%sb')"), "{sql:?}");
    assert!(!sql.iter().any(|s| s.contains("'a?b'")));
}

// =============================================================================
// Full introspection
// =============================================================================

#[test]
fn introspect_assembles_table() {
    let mut cursor = shop();
    let table = DatabaseIntrospection::new(&mut cursor)
        .introspect("orders")
        .unwrap();

    assert_eq!(table.table, "orders");
    assert_eq!(table.columns.len(), 5);
    assert_eq!(table.primary_key, vec!["id"]);
    assert_eq!(table.relations["customer_id"].referenced_table, "CUSTOMERS");
    assert_eq!(table.constraints.len(), 5);
}

#[test]
fn introspection_serializes_to_json() {
    let mut cursor = shop();
    let table = DatabaseIntrospection::new(&mut cursor)
        .introspect("orders")
        .unwrap();

    let json = serde_json::to_value(&table).unwrap();
    assert_eq!(json["constraints"]["IX_QTY"]["order"], "Desc");
    assert_eq!(json["relations"]["customer_id"]["referenced_column"], "id");
}

#[test]
fn failing_catalog_query_aborts_with_context() {
    let mut cursor = shop().fail_on("SHOWINDEX");
    let err = DatabaseIntrospection::new(&mut cursor)
        .introspect("orders")
        .unwrap_err();

    match err {
        Error::CatalogQuery { sql, table, .. } => {
            assert_eq!(sql, "call SHOWINDEX('sysadm', 'orders')");
            assert_eq!(table, "orders");
        }
        other => panic!("expected CatalogQuery, got {other:?}"),
    }
    // Nothing runs after the failing statement.
    assert!(!cursor
        .executed_sql()
        .iter()
        .any(|sql| sql.contains("system.syscolumn")));
}

#[test]
fn malformed_bitmap_is_reported() {
    let mut cursor = FakeCursor::new()
        .table("orders", vec![int_column("id")])
        .script(
            "FROM system.sysforeignkey",
            vec![vec![
                text("FK_BAD"),
                SqlValue::Blob(vec![1]),
                text("CUSTOMERS"),
                column_order(&[1]),
            ]],
        );
    let err = DatabaseIntrospection::new(&mut cursor)
        .constraints("orders")
        .unwrap_err();
    assert!(matches!(err, Error::Decode(_)));
}
