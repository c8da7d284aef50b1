//! Multi-table SELECT
//!
//! Tables are joined with a nested loop in FROM-list order. Equality conditions between
//! columns of two different FROM tables drive the join; every other condition is a filter
//! applied to the merged rows afterwards.

use tracing::debug;

use super::compare::compare_fields;
use super::filter::{project, Predicate, Scope};
use crate::catalog::TableSchema;
use crate::error::{Error, Result};
use crate::sql::ast::{CompareOp, Condition, Operand, Projection};
use crate::storage::TableData;

/// An equality between two columns of the merged row
#[derive(Debug, Clone, PartialEq)]
pub struct JoinCondition {
    left: usize,
    right: usize,
    /// FROM-list index of the later of the two tables; the condition is checked when it joins
    stage: usize,
}

/// Split conditions into join conditions and filter conditions
pub fn partition(conditions: &[Condition], tables: &[String]) -> (Vec<Condition>, Vec<Condition>) {
    conditions
        .iter()
        .cloned()
        .partition(|cond| is_join_condition(cond, tables))
}

fn is_join_condition(cond: &Condition, tables: &[String]) -> bool {
    if cond.op != CompareOp::Eq {
        return false;
    }
    let right = match &cond.value {
        Operand::Column(column) => column,
        Operand::Literal(_) => return false,
    };
    match (&cond.column.table, &right.table) {
        (Some(l), Some(r)) => l != r && tables.contains(l) && tables.contains(r),
        _ => false,
    }
}

/// Resolve join conditions against the merged scope
pub fn compile_joins(joins: &[Condition], scope: &Scope) -> Result<Vec<JoinCondition>> {
    joins
        .iter()
        .map(|cond| -> Result<JoinCondition> {
            let right_ref = match &cond.value {
                Operand::Column(column) => column,
                Operand::Literal(_) => {
                    return Err(Error::Internal(format!("'{}' is not a join condition", cond)))
                }
            };
            let stage = [&cond.column.table, &right_ref.table]
                .iter()
                .filter_map(|t| t.as_ref())
                .filter_map(|t| scope.tables().iter().position(|s| s == t))
                .max()
                .unwrap_or(0);

            Ok(JoinCondition {
                left: scope.resolve(&cond.column)?,
                right: scope.resolve(right_ref)?,
                stage,
            })
        })
        .collect()
}

/// Nested-loop join of `tables` in order, keeping merged rows that satisfy every join
/// condition in scope at each stage. No join conditions yields the cross product.
pub fn nested_loop_join(tables: &[TableData], joins: &[JoinCondition]) -> Vec<Vec<String>> {
    let mut tables = tables.iter();
    let mut acc: Vec<Vec<String>> = match tables.next() {
        Some(first) => first.rows.iter().map(|r| r.values().to_vec()).collect(),
        None => return Vec::new(),
    };

    for (stage, table) in tables.enumerate().map(|(i, t)| (i + 1, t)) {
        let applicable: Vec<&JoinCondition> = joins.iter().filter(|j| j.stage == stage).collect();
        let mut next = Vec::new();

        for left in &acc {
            for candidate in &table.rows {
                let mut merged = left.clone();
                merged.extend(candidate.values().iter().cloned());

                let keep = applicable.iter().all(|j| {
                    match (merged.get(j.left), merged.get(j.right)) {
                        (Some(l), Some(r)) => compare_fields(l, CompareOp::Eq, r),
                        _ => false,
                    }
                });
                if keep {
                    next.push(merged);
                }
            }
        }

        debug!(stage, conditions = applicable.len(), rows = next.len(), "joined table");
        acc = next;
    }

    acc
}

/// Rows of a multi-table SELECT: `(labels, projected rows)`
pub fn select(
    tables: &[(TableSchema, TableData)],
    columns: &Projection,
    conditions: &[Condition],
) -> Result<(Vec<String>, Vec<Vec<(String, String)>>)> {
    let mut scope = Scope::new();
    for (schema, _) in tables {
        if scope.contains_table(&schema.table_name) {
            return Err(Error::ExecutionError(format!(
                "table '{}' listed more than once",
                schema.table_name
            )));
        }
        scope.push_table(schema);
    }

    let (joins, filters) = partition(conditions, scope.tables());
    let joins = compile_joins(&joins, &scope)?;
    let filter = Predicate::compile(&filters, &scope)?;
    let positions = scope.projection(columns)?;

    let data: Vec<TableData> = tables.iter().map(|(_, d)| d.clone()).collect();
    let merged = nested_loop_join(&data, &joins);

    let rows: Vec<_> = merged
        .iter()
        .filter(|row| filter.matches(row))
        .map(|row| project(row, &positions))
        .collect();

    debug!(
        tables = ?scope.tables(),
        joins = joins.len(),
        filters = filters.len(),
        rows = rows.len(),
        "multi-table select"
    );

    let labels = positions.into_iter().map(|(_, label)| label).collect();
    Ok((labels, rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Column, DataType};
    use crate::sql::ast::{ColumnRef, LogicOp, Value};
    use crate::storage::Row;

    fn table(name: &str, cols: &[(&str, DataType)], rows: &[&[&str]]) -> (TableSchema, TableData) {
        let schema = TableSchema::new(
            name,
            cols.iter().map(|(c, t)| Column::new(*c, *t)).collect(),
        );
        let data = TableData {
            header: schema.column_names(),
            rows: rows
                .iter()
                .map(|r| Row::new(r.iter().map(|v| v.to_string()).collect()))
                .collect(),
        };
        (schema, data)
    }

    fn join_on(l: (&str, &str), r: (&str, &str)) -> Condition {
        Condition {
            column: ColumnRef::qualified(l.0, l.1),
            op: CompareOp::Eq,
            value: Operand::Column(ColumnRef::qualified(r.0, r.1)),
            logic_op: None,
        }
    }

    fn sample() -> Vec<(TableSchema, TableData)> {
        vec![
            table("t1", &[("id", DataType::Int)], &[&["1"], &["2"]]),
            table(
                "t2",
                &[("tid", DataType::Int), ("val", DataType::Char)],
                &[&["1", "a"], &["3", "b"]],
            ),
        ]
    }

    #[test]
    fn test_partition() {
        let tables = vec!["t1".to_string(), "t2".to_string()];
        let filter = Condition {
            column: ColumnRef::qualified("t2", "val"),
            op: CompareOp::Eq,
            value: Operand::Literal(Value::Str("a".into())),
            logic_op: None,
        };
        let same_table = join_on(("t1", "id"), ("t1", "id"));
        let conditions = vec![join_on(("t1", "id"), ("t2", "tid")), filter.clone(), same_table.clone()];

        let (joins, filters) = partition(&conditions, &tables);
        assert_eq!(joins.len(), 1);
        assert_eq!(filters, vec![filter, same_table]);
    }

    #[test]
    fn test_equi_join() {
        let tables = sample();
        let (labels, rows) = select(
            &tables,
            &Projection::Wildcard,
            &[join_on(("t1", "id"), ("t2", "tid"))],
        )
        .unwrap();

        assert_eq!(labels, vec!["t1.id", "t2.tid", "t2.val"]);
        assert_eq!(rows.len(), 1);
        assert_eq!(
            rows[0],
            vec![
                ("t1.id".to_string(), "1".to_string()),
                ("t2.tid".to_string(), "1".to_string()),
                ("t2.val".to_string(), "a".to_string()),
            ]
        );
    }

    #[test]
    fn test_cross_product_with_filter() {
        let tables = sample();
        let (_, all) = select(&tables, &Projection::Wildcard, &[]).unwrap();
        assert_eq!(all.len(), 4);

        let filter = Condition {
            column: ColumnRef::new("val"),
            op: CompareOp::Eq,
            value: Operand::Literal(Value::Str("b".into())),
            logic_op: None,
        };
        let (_, rows) = select(
            &tables,
            &Projection::Columns(vec![ColumnRef::new("id")]),
            &[filter],
        )
        .unwrap();
        assert_eq!(
            rows,
            vec![
                vec![("id".to_string(), "1".to_string())],
                vec![("id".to_string(), "2".to_string())],
            ]
        );
    }

    #[test]
    fn test_join_then_filter() {
        let mut tables = sample();
        tables[1].1.rows.push(Row::new(vec!["2".into(), "c".into()]));

        let mut join = join_on(("t1", "id"), ("t2", "tid"));
        join.logic_op = Some(LogicOp::And);
        let filter = Condition {
            column: ColumnRef::qualified("t2", "val"),
            op: CompareOp::NotEq,
            value: Operand::Literal(Value::Str("a".into())),
            logic_op: None,
        };

        let (_, rows) = select(
            &tables,
            &Projection::Columns(vec![ColumnRef::qualified("t2", "val")]),
            &[join, filter],
        )
        .unwrap();
        assert_eq!(rows, vec![vec![("val".to_string(), "c".to_string())]]);
    }

    #[test]
    fn test_duplicate_table_rejected() {
        let t = table("t", &[("a", DataType::Int)], &[]);
        let err = select(&[t.clone(), t], &Projection::Wildcard, &[]).unwrap_err();
        assert!(matches!(err, Error::ExecutionError(_)));
    }
}
