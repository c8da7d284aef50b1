//! Column scopes and WHERE evaluation
//!
//! A `Scope` lists the columns visible to a statement, keyed `table.column`, in the order
//! they appear in a (possibly merged) row. Conditions are resolved against a scope once and
//! then evaluated per row as a left-to-right fold.

use indexmap::IndexMap;
use tracing::trace;

use super::compare::compare;
use crate::catalog::{DataType, TableSchema};
use crate::error::{Error, Result};
use crate::sql::ast::{ColumnRef, CompareOp, Condition, LogicOp, Operand, Projection};
use crate::storage::Scalar;

/// A column visible in a scope
#[derive(Debug, Clone, PartialEq)]
pub struct ScopeColumn {
    pub table: String,
    pub column: String,
    pub data_type: DataType,
}

/// Columns visible to a statement, in merged-row order
#[derive(Debug, Clone, Default)]
pub struct Scope {
    columns: IndexMap<String, ScopeColumn>,
    tables: Vec<String>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scope over a single table
    pub fn single(schema: &TableSchema) -> Self {
        let mut scope = Self::new();
        scope.push_table(schema);
        scope
    }

    /// Append a table's columns after the ones already in scope
    pub fn push_table(&mut self, schema: &TableSchema) {
        for col in schema.columns() {
            self.columns.insert(
                format!("{}.{}", schema.table_name, col.name),
                ScopeColumn {
                    table: schema.table_name.clone(),
                    column: col.name.clone(),
                    data_type: col.data_type,
                },
            );
        }
        self.tables.push(schema.table_name.clone());
    }

    pub fn tables(&self) -> &[String] {
        &self.tables
    }

    pub fn contains_table(&self, table: &str) -> bool {
        self.tables.iter().any(|t| t == table)
    }

    /// Number of columns in a merged row
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn column(&self, index: usize) -> Option<&ScopeColumn> {
        self.columns.get_index(index).map(|(_, c)| c)
    }

    /// Position of a column reference in the merged row.
    ///
    /// A qualifier must name a table in scope. An unqualified name must match exactly one column.
    pub fn resolve(&self, column: &ColumnRef) -> Result<usize> {
        match &column.table {
            Some(table) => {
                if !self.contains_table(table) {
                    return Err(Error::UnknownTable(table.clone()));
                }
                self.columns
                    .get_index_of(&format!("{}.{}", table, column.column))
                    .ok_or_else(|| Error::ColumnNotFound(column.column.clone(), table.clone()))
            }
            None => {
                let mut matches = self
                    .columns
                    .values()
                    .enumerate()
                    .filter(|(_, c)| c.column == column.column)
                    .map(|(i, _)| i);

                match (matches.next(), matches.next()) {
                    (Some(i), None) => Ok(i),
                    (Some(_), Some(_)) => Err(Error::AmbiguousColumn(column.column.clone())),
                    (None, _) => Err(Error::ColumnNotFound(
                        column.column.clone(),
                        self.tables.join(", "),
                    )),
                }
            }
        }
    }

    /// Resolve a projection to positions and output labels.
    ///
    /// Named columns are labelled with the bare column name. `*` expands to every column in
    /// scope, labelled `table.column` when more than one table is in scope.
    pub fn projection(&self, projection: &Projection) -> Result<Vec<(usize, String)>> {
        match projection {
            Projection::Wildcard => Ok(self
                .columns
                .iter()
                .enumerate()
                .map(|(i, (key, col))| {
                    let label = if self.tables.len() > 1 {
                        key.clone()
                    } else {
                        col.column.clone()
                    };
                    (i, label)
                })
                .collect()),
            Projection::Columns(columns) => columns
                .iter()
                .map(|c| -> Result<(usize, String)> { Ok((self.resolve(c)?, c.column.clone())) })
                .collect(),
        }
    }
}

/// Project a merged row into `(label, value)` pairs
pub fn project(row: &[String], positions: &[(usize, String)]) -> Vec<(String, String)> {
    positions
        .iter()
        .map(|(i, label)| (label.clone(), row.get(*i).cloned().unwrap_or_default()))
        .collect()
}

#[derive(Debug, Clone)]
enum Rhs {
    Literal(Scalar),
    Column(usize),
}

#[derive(Debug, Clone)]
struct Term {
    left: usize,
    op: CompareOp,
    right: Rhs,
    logic_op: Option<LogicOp>,
}

impl Term {
    fn eval(&self, row: &[String]) -> bool {
        let left = match row.get(self.left) {
            Some(v) => Scalar::from_field(v),
            None => return false,
        };
        let right = match &self.right {
            Rhs::Literal(value) => value.clone(),
            Rhs::Column(i) => match row.get(*i) {
                Some(v) => Scalar::from_field(v),
                None => return false,
            },
        };
        compare(&left, self.op, &right)
    }
}

/// Conditions resolved against a scope
#[derive(Debug, Clone, Default)]
pub struct Predicate {
    terms: Vec<Term>,
}

impl Predicate {
    /// Resolve every column named by `conditions`
    pub fn compile(conditions: &[Condition], scope: &Scope) -> Result<Self> {
        let terms = conditions
            .iter()
            .map(|cond| -> Result<Term> {
                let right = match &cond.value {
                    Operand::Literal(value) => Rhs::Literal(Scalar::from_value(value)),
                    Operand::Column(column) => Rhs::Column(scope.resolve(column)?),
                };
                Ok(Term {
                    left: scope.resolve(&cond.column)?,
                    op: cond.op,
                    right,
                    logic_op: cond.logic_op,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { terms })
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Left-to-right fold; each term's logic op combines the running result with the next term.
    /// No conditions always matches.
    pub fn matches(&self, row: &[String]) -> bool {
        let mut terms = self.terms.iter();
        let first = match terms.next() {
            Some(t) => t,
            None => return true,
        };

        let mut result = first.eval(row);
        let mut link = first.logic_op;
        for term in terms {
            let value = term.eval(row);
            result = match link.unwrap_or(LogicOp::And) {
                LogicOp::And => result && value,
                LogicOp::Or => result || value,
            };
            link = term.logic_op;
        }

        trace!(?row, result, "evaluated conditions");
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Column;
    use crate::sql::ast::Value;

    fn schema(name: &str, cols: &[&str]) -> TableSchema {
        TableSchema::new(
            name,
            cols.iter().map(|c| Column::new(*c, DataType::Int)).collect(),
        )
    }

    fn row(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn cond(col: &str, value: i64, logic_op: Option<LogicOp>) -> Condition {
        Condition {
            column: ColumnRef::new(col),
            op: CompareOp::Eq,
            value: Operand::Literal(Value::Int(value)),
            logic_op,
        }
    }

    #[test]
    fn test_fold_is_left_to_right() {
        let scope = Scope::single(&schema("t", &["a", "b", "c"]));
        // a=1 OR b=2 AND c=3 folds as (a=1 OR b=2) AND c=3
        let conditions = vec![
            cond("a", 1, Some(LogicOp::Or)),
            cond("b", 2, Some(LogicOp::And)),
            cond("c", 3, None),
        ];
        let predicate = Predicate::compile(&conditions, &scope).unwrap();

        assert!(!predicate.matches(&row(&["1", "0", "0"])));
        assert!(predicate.matches(&row(&["1", "0", "3"])));
        assert!(predicate.matches(&row(&["0", "2", "3"])));
    }

    #[test]
    fn test_empty_predicate_matches() {
        let scope = Scope::single(&schema("t", &["a"]));
        let predicate = Predicate::compile(&[], &scope).unwrap();
        assert!(predicate.is_empty());
        assert!(predicate.matches(&row(&["anything"])));
    }

    #[test]
    fn test_resolve_exact_case() {
        let scope = Scope::single(&schema("t", &["id"]));
        assert_eq!(scope.resolve(&ColumnRef::new("id")).unwrap(), 0);
        assert_eq!(scope.resolve(&ColumnRef::qualified("t", "id")).unwrap(), 0);
        assert!(matches!(
            scope.resolve(&ColumnRef::new("ID")),
            Err(Error::ColumnNotFound(..))
        ));
        assert!(matches!(
            scope.resolve(&ColumnRef::qualified("T", "id")),
            Err(Error::UnknownTable(_))
        ));
    }

    #[test]
    fn test_resolve_across_tables() {
        let mut scope = Scope::single(&schema("t1", &["id", "x"]));
        scope.push_table(&schema("t2", &["id", "y"]));

        assert_eq!(scope.width(), 4);
        assert_eq!(scope.resolve(&ColumnRef::new("y")).unwrap(), 3);
        assert_eq!(scope.resolve(&ColumnRef::qualified("t2", "id")).unwrap(), 2);
        assert!(matches!(
            scope.resolve(&ColumnRef::new("id")),
            Err(Error::AmbiguousColumn(_))
        ));
    }

    #[test]
    fn test_projection_labels() {
        let mut scope = Scope::single(&schema("t1", &["id"]));
        let single = scope.projection(&Projection::Wildcard).unwrap();
        assert_eq!(single, vec![(0, "id".to_string())]);

        scope.push_table(&schema("t2", &["v"]));
        let merged = scope.projection(&Projection::Wildcard).unwrap();
        assert_eq!(
            merged,
            vec![(0, "t1.id".to_string()), (1, "t2.v".to_string())]
        );

        let explicit = scope
            .projection(&Projection::Columns(vec![
                ColumnRef::new("v"),
                ColumnRef::qualified("t1", "id"),
            ]))
            .unwrap();
        assert_eq!(
            project(&row(&["1", "a"]), &explicit),
            vec![
                ("v".to_string(), "a".to_string()),
                ("id".to_string(), "1".to_string())
            ]
        );
    }

    #[test]
    fn test_column_to_column_condition() {
        let scope = Scope::single(&schema("t", &["a", "b"]));
        let conditions = vec![Condition {
            column: ColumnRef::new("a"),
            op: CompareOp::Gt,
            value: Operand::Column(ColumnRef::new("b")),
            logic_op: None,
        }];
        let predicate = Predicate::compile(&conditions, &scope).unwrap();
        assert!(predicate.matches(&row(&["5", "3"])));
        assert!(!predicate.matches(&row(&["3", "5"])));
    }
}
