//! Expression compilation with DBMaker rewrites.
//!
//! [`SqlCompiler`] turns a small expression tree into SQL text plus bound
//! parameters. Before a node is rendered the compiler consults a fixed
//! side table of node kinds the dialect renders itself; everything else
//! goes through the default renderer. The same compiler serves every
//! statement kind, so the rewrite applies whether the expression sits in
//! a SELECT list, an UPDATE assignment or an aggregate query.

use std::fmt;

use tracing::trace;

use crate::operations::lookups::{like_pattern, LookupKind, OperatorTable, OPERAND};
use crate::operations::params::{format_params, format_sql};
use crate::operations::{Connector, DatabaseOperations, DatePart};
use crate::value::{SqlValue, ToSqlValue};

/// Stand-in for an operand while a wrapping template is rendered.
const OPERAND_SLOT: &str = "\u{0}";

/// The statement a compiler is building.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementKind {
    /// SELECT
    Select,
    /// INSERT
    Insert,
    /// UPDATE
    Update,
    /// DELETE
    Delete,
    /// SELECT over an aggregated subquery.
    Aggregate,
}

impl StatementKind {
    /// Every statement kind.
    pub const ALL: &'static [Self] = &[
        Self::Select,
        Self::Insert,
        Self::Update,
        Self::Delete,
        Self::Aggregate,
    ];
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Select => "SELECT",
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
            Self::Aggregate => "AGGREGATE",
        })
    }
}

/// An aggregate function over a column expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Aggregate {
    /// COUNT aggregate
    Count {
        /// Column to count, or "*" for all rows
        column: String,
        /// Whether to count only distinct values
        distinct: bool,
    },
    /// SUM aggregate
    Sum {
        /// Column to sum
        column: String,
    },
    /// AVG aggregate
    Avg {
        /// Column to average
        column: String,
    },
    /// MAX aggregate
    Max {
        /// Column to find maximum
        column: String,
    },
    /// MIN aggregate
    Min {
        /// Column to find minimum
        column: String,
    },
}

impl Aggregate {
    /// Creates a COUNT(*) aggregate.
    #[must_use]
    pub fn count_all() -> Self {
        Self::count("*")
    }

    /// Creates a COUNT(column) aggregate.
    #[must_use]
    pub fn count(column: &str) -> Self {
        Self::Count {
            column: column.to_string(),
            distinct: false,
        }
    }

    /// Creates a COUNT(DISTINCT column) aggregate.
    #[must_use]
    pub fn count_distinct(column: &str) -> Self {
        Self::Count {
            column: column.to_string(),
            distinct: true,
        }
    }

    /// Creates a SUM(column) aggregate.
    #[must_use]
    pub fn sum(column: &str) -> Self {
        Self::Sum {
            column: column.to_string(),
        }
    }

    /// Creates a AVG(column) aggregate.
    #[must_use]
    pub fn avg(column: &str) -> Self {
        Self::Avg {
            column: column.to_string(),
        }
    }

    /// Creates a MAX(column) aggregate.
    #[must_use]
    pub fn max(column: &str) -> Self {
        Self::Max {
            column: column.to_string(),
        }
    }

    /// Creates a MIN(column) aggregate.
    #[must_use]
    pub fn min(column: &str) -> Self {
        Self::Min {
            column: column.to_string(),
        }
    }

    /// The SQL function name.
    #[must_use]
    pub const fn function(&self) -> &'static str {
        match self {
            Self::Count { .. } => "COUNT",
            Self::Sum { .. } => "SUM",
            Self::Avg { .. } => "AVG",
            Self::Max { .. } => "MAX",
            Self::Min { .. } => "MIN",
        }
    }

    /// The aggregated column expression.
    #[must_use]
    pub fn column(&self) -> &str {
        match self {
            Self::Count { column, .. }
            | Self::Sum { column }
            | Self::Avg { column }
            | Self::Max { column }
            | Self::Min { column } => column,
        }
    }

    /// Returns the portable SQL representation of this aggregate.
    #[must_use]
    pub fn to_sql(&self) -> String {
        match self {
            Self::Count {
                column,
                distinct: true,
            } => format!("COUNT(DISTINCT {column})"),
            _ => format!("{}({})", self.function(), self.column()),
        }
    }
}

/// Expression tree accepted by [`SqlCompiler`].
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// A column, optionally qualified by its table.
    Column {
        /// Owning table or alias.
        table: Option<String>,
        /// Column name.
        name: String,
    },
    /// A bound value.
    Value(SqlValue),
    /// An aggregate function.
    Aggregate(Aggregate),
    /// Operands joined by an arithmetic or bitwise connector.
    Combined {
        /// The connector.
        connector: Connector,
        /// Operands, left to right.
        operands: Vec<Node>,
    },
    /// A filter comparison.
    Lookup {
        /// Left-hand side.
        lhs: Box<Node>,
        /// The comparison.
        lookup: LookupKind,
        /// Right-hand side value.
        value: SqlValue,
    },
    /// Extraction of a date component.
    DateExtract {
        /// Component to extract.
        part: DatePart,
        /// Date expression.
        expr: Box<Node>,
    },
    /// Truncation of a date.
    DateTrunc {
        /// Unit to truncate to.
        part: DatePart,
        /// Date expression.
        expr: Box<Node>,
    },
    /// Pre-rendered SQL with its parameters.
    Raw {
        /// SQL text using `%s` placeholders.
        sql: String,
        /// Parameters for the placeholders.
        params: Vec<SqlValue>,
    },
}

impl Node {
    /// Creates an unqualified column reference.
    #[must_use]
    pub fn column(name: &str) -> Self {
        Self::Column {
            table: None,
            name: name.to_string(),
        }
    }

    /// Creates a table-qualified column reference.
    #[must_use]
    pub fn qualified(table: &str, name: &str) -> Self {
        Self::Column {
            table: Some(table.to_string()),
            name: name.to_string(),
        }
    }

    /// Creates a lookup with `self` on the left.
    #[must_use]
    pub fn lookup(self, lookup: LookupKind, value: impl ToSqlValue) -> Self {
        Self::Lookup {
            lhs: Box::new(self),
            lookup,
            value: value.to_sql_value(),
        }
    }
}

/// Node kinds the dialect renders itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RewriteKind {
    /// `AVG` truncates to the argument's type; the argument is cast to FLOAT.
    Avg,
}

impl RewriteKind {
    /// Classifies `node`, returning `None` for nodes rendered by default.
    #[must_use]
    pub const fn of(node: &Node) -> Option<Self> {
        match node {
            Node::Aggregate(Aggregate::Avg { .. }) => Some(Self::Avg),
            _ => None,
        }
    }
}

type Renderer = fn(&Node) -> Option<String>;

const REWRITES: &[(RewriteKind, Renderer)] = &[(RewriteKind::Avg, render_float_avg)];

fn render_float_avg(node: &Node) -> Option<String> {
    match node {
        Node::Aggregate(aggregate) => Some(format!(
            "{}(CAST({} AS FLOAT))",
            aggregate.function(),
            aggregate.column()
        )),
        _ => None,
    }
}

fn rewrite_for(kind: RewriteKind) -> Option<Renderer> {
    REWRITES
        .iter()
        .find(|(k, _)| *k == kind)
        .map(|(_, renderer)| *renderer)
}

/// Compiles [`Node`] trees for one statement.
#[derive(Debug)]
pub struct SqlCompiler<'a> {
    kind: StatementKind,
    ops: &'a DatabaseOperations,
    operators: &'a OperatorTable,
    params: Vec<SqlValue>,
}

impl<'a> SqlCompiler<'a> {
    /// Creates a compiler for a statement of `kind`.
    #[must_use]
    pub const fn new(
        kind: StatementKind,
        ops: &'a DatabaseOperations,
        operators: &'a OperatorTable,
    ) -> Self {
        Self {
            kind,
            ops,
            operators,
            params: Vec::new(),
        }
    }

    /// The statement kind being compiled.
    #[must_use]
    pub const fn kind(&self) -> StatementKind {
        self.kind
    }

    /// Parameters collected so far.
    #[must_use]
    pub fn params(&self) -> &[SqlValue] {
        &self.params
    }

    /// Renders `node`, collecting its parameters. The returned SQL still
    /// uses `%s` placeholders.
    pub fn compile(&mut self, node: &Node) -> String {
        if let Some(kind) = RewriteKind::of(node) {
            if let Some(sql) = rewrite_for(kind).and_then(|render| render(node)) {
                trace!(statement = %self.kind, rewrite = ?kind, sql = %sql, "Dialect rewrite");
                return sql;
            }
        }
        self.compile_default(node)
    }

    /// Compiles `node` and returns driver-ready SQL and parameters.
    #[must_use]
    pub fn as_sql(mut self, node: &Node) -> (String, Vec<SqlValue>) {
        let sql = self.compile(node);
        self.finish(&sql)
    }

    /// Rewrites a statement assembled from compiled fragments for the
    /// driver, consuming the collected parameters.
    #[must_use]
    pub fn finish(self, sql: &str) -> (String, Vec<SqlValue>) {
        (format_sql(sql), format_params(self.params))
    }

    fn compile_default(&mut self, node: &Node) -> String {
        match node {
            Node::Column { table, name } => match table {
                Some(table) => format!("{}.{}", self.ops.quote_name(table), self.ops.quote_name(name)),
                None => self.ops.quote_name(name),
            },
            Node::Value(value) => {
                self.params.push(value.clone());
                OPERAND.to_string()
            }
            Node::Aggregate(aggregate) => aggregate.to_sql(),
            Node::Combined {
                connector,
                operands,
            } => {
                let parts: Vec<String> = operands.iter().map(|o| self.compile(o)).collect();
                self.ops.combine_expression(*connector, &parts)
            }
            Node::Lookup { lhs, lookup, value } => {
                let lhs = self.compile(lhs);
                let lhs = self.ops.lookup_cast(*lookup).replacen(OPERAND, &lhs, 1);
                let value = match value {
                    SqlValue::Text(text) => like_pattern(*lookup, text)
                        .map_or_else(|| value.clone(), SqlValue::Text),
                    other => other.clone(),
                };
                self.params.push(value);
                format!("{lhs} {}", self.operators.template(*lookup))
            }
            Node::DateExtract { part, expr } => {
                let ops = self.ops;
                self.compile_wrapped(expr, |field| ops.date_extract_sql(*part, field))
            }
            Node::DateTrunc { part, expr } => {
                let ops = self.ops;
                self.compile_wrapped(expr, |field| ops.date_trunc_sql(*part, field))
            }
            Node::Raw { sql, params } => {
                self.params.extend(params.iter().cloned());
                sql.clone()
            }
        }
    }

    /// Compiles `expr` into a template that may repeat it. The operand's
    /// parameters are bound once per occurrence so placeholders and
    /// parameters stay aligned.
    fn compile_wrapped(&mut self, expr: &Node, render: impl FnOnce(&str) -> String) -> String {
        let start = self.params.len();
        let operand = self.compile(expr);
        let operand_params = self.params.split_off(start);
        let template = render(OPERAND_SLOT);
        for _ in 0..template.matches(OPERAND_SLOT).count() {
            self.params.extend(operand_params.iter().cloned());
        }
        template.replace(OPERAND_SLOT, &operand)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(node: &Node) -> (String, Vec<SqlValue>) {
        let ops = DatabaseOperations::new();
        let operators = OperatorTable::new();
        SqlCompiler::new(StatementKind::Select, &ops, &operators).as_sql(node)
    }

    #[test]
    fn test_aggregate_sql() {
        assert_eq!(Aggregate::count_all().to_sql(), "COUNT(*)");
        assert_eq!(Aggregate::count_distinct("user_id").to_sql(), "COUNT(DISTINCT user_id)");
        assert_eq!(Aggregate::sum("amount").to_sql(), "SUM(amount)");
        assert_eq!(Aggregate::max("created_at").to_sql(), "MAX(created_at)");
        assert_eq!(Aggregate::min("created_at").to_sql(), "MIN(created_at)");
        assert_eq!(Aggregate::avg("amount").function(), "AVG");
    }

    #[test]
    fn avg_casts_to_float() {
        let (sql, params) = compile(&Node::Aggregate(Aggregate::avg("price")));
        assert_eq!(sql, "AVG(CAST(price AS FLOAT))");
        assert!(params.is_empty());
    }

    #[test]
    fn other_aggregates_are_untouched() {
        assert_eq!(compile(&Node::Aggregate(Aggregate::min("id"))).0, "MIN(id)");
        assert_eq!(RewriteKind::of(&Node::Aggregate(Aggregate::sum("x"))), None);
    }

    #[test]
    fn avg_rewrite_applies_to_every_statement_kind() {
        let ops = DatabaseOperations::new();
        let operators = OperatorTable::new();
        for &kind in StatementKind::ALL {
            let mut compiler = SqlCompiler::new(kind, &ops, &operators);
            assert_eq!(
                compiler.compile(&Node::Aggregate(Aggregate::avg("\"qty\""))),
                "AVG(CAST(\"qty\" AS FLOAT))",
                "{kind}"
            );
        }
    }

    #[test]
    fn case_insensitive_lookup() {
        let node = Node::qualified("customers", "name").lookup(LookupKind::IContains, "a_b");
        let (sql, params) = compile(&node);
        assert_eq!(
            sql,
            r#"UPPER("customers"."name") LIKE UPPER(?) ESCAPE '\'"#
        );
        assert_eq!(params, vec![SqlValue::Text(r"%a\_b%".into())]);
    }

    #[test]
    fn combined_expression_with_parameters() {
        let node = Node::Combined {
            connector: Connector::Mod,
            operands: vec![Node::column("qty"), Node::Value(SqlValue::Int(3))],
        };
        let (sql, params) = compile(&node);
        assert_eq!(sql, "MOD(\"qty\",?)");
        assert_eq!(params, vec![SqlValue::Int(3)]);
    }

    #[test]
    fn boolean_parameters_become_integers() {
        let node = Node::column("active").lookup(LookupKind::Exact, true);
        let (sql, params) = compile(&node);
        assert_eq!(sql, "\"active\" = ?");
        assert_eq!(params, vec![SqlValue::Int(1)]);
    }

    #[test]
    fn date_parts() {
        let node = Node::DateExtract {
            part: DatePart::WeekDay,
            expr: Box::new(Node::column("created")),
        };
        assert_eq!(compile(&node).0, "DAYOFWEEK(\"created\")");
        let node = Node::DateTrunc {
            part: DatePart::Quarter,
            expr: Box::new(Node::column("created")),
        };
        assert_eq!(
            compile(&node).0,
            "MDY(YEAR(\"created\"), (QUARTER(\"created\")-1)*3+1, 1)"
        );
    }

    #[test]
    fn repeated_operand_binds_its_parameter_per_occurrence() {
        let day = SqlValue::Text("2024-05-01".into());
        let node = Node::DateTrunc {
            part: DatePart::Quarter,
            expr: Box::new(Node::Value(day.clone())),
        };
        let (sql, params) = compile(&node);
        assert_eq!(sql, "MDY(YEAR(?), (QUARTER(?)-1)*3+1, 1)");
        assert_eq!(params, vec![day.clone(), day.clone()]);

        let node = Node::DateTrunc {
            part: DatePart::Year,
            expr: Box::new(Node::Value(day.clone())),
        };
        let (sql, params) = compile(&node);
        assert_eq!(sql.matches('?').count(), params.len());
        assert_eq!(params, vec![day]);
    }

    #[test]
    fn raw_sql_unescapes_percent() {
        let node = Node::Raw {
            sql: "note LIKE '100%%' AND id = %s".into(),
            params: vec![SqlValue::Int(7)],
        };
        let (sql, params) = compile(&node);
        assert_eq!(sql, "note LIKE '100%' AND id = ?");
        assert_eq!(params, vec![SqlValue::Int(7)]);
    }
}
