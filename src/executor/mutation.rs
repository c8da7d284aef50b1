//! UPDATE and DELETE planning
//!
//! Both statements are computed in full before anything is written: the result is the new
//! contents of the data file plus a report. The engine backs the table up and writes it.

use std::fmt::Write as _;

use tracing::debug;

use super::filter::{Predicate, Scope};
use crate::catalog::{DataType, TableSchema};
use crate::error::{Error, Result};
use crate::sql::ast::{format_float, ArithOp, Assignment, DeleteStatement, UpdateExpr, UpdateStatement, Value};
use crate::storage::{Row, TableData};

/// A computed change to one table
#[derive(Debug, Clone)]
pub struct Mutation {
    pub table: String,
    /// New data file contents; `None` when no row changed
    pub data: Option<TableData>,
    pub affected_rows: usize,
    pub message: String,
}

/// Check a literal against a column, reporting the 1-based column index
pub fn check_literal(index: usize, column: &str, data_type: DataType, value: &Value) -> Result<()> {
    if value.conforms_to(data_type) {
        return Ok(());
    }
    Err(Error::TypeMismatch {
        index: index + 1,
        column: column.to_string(),
        expected: data_type.name().to_string(),
        found: value.to_string(),
    })
}

/// How the new value of each matching row is produced
enum Setter {
    Literal(String),
    Arithmetic {
        source: usize,
        source_name: String,
        op: ArithOp,
        operand: f64,
        target_type: DataType,
    },
}

impl Setter {
    fn new(schema: &TableSchema, target: usize, assignment: &Assignment) -> Result<Self> {
        let target_col = &schema.columns()[target];
        match assignment {
            Assignment::Literal(value) => Ok(Setter::Literal(value.to_field())),
            Assignment::Arithmetic(UpdateExpr {
                source_column,
                op,
                operand,
            }) => {
                let source = schema.get_column_index(source_column).ok_or_else(|| {
                    Error::ColumnNotFound(source_column.clone(), schema.table_name.clone())
                })?;
                if !schema.columns()[source].data_type.is_numeric() {
                    return Err(Error::NotNumeric(source_column.clone()));
                }
                let operand = operand.as_f64().ok_or_else(|| Error::InvalidNumericValue {
                    column: source_column.clone(),
                    value: operand.to_field(),
                })?;
                if *op == ArithOp::Div && operand == 0.0 {
                    return Err(Error::DivisionByZero);
                }
                Ok(Setter::Arithmetic {
                    source,
                    source_name: source_column.clone(),
                    op: *op,
                    operand,
                    target_type: target_col.data_type,
                })
            }
        }
    }

    fn apply(&self, row: &Row) -> Result<String> {
        match self {
            Setter::Literal(text) => Ok(text.clone()),
            Setter::Arithmetic {
                source,
                source_name,
                op,
                operand,
                target_type,
            } => {
                let raw = row.get(*source).unwrap_or_default();
                let current: f64 = raw.trim().trim_matches('\'').parse().map_err(|_| {
                    Error::InvalidNumericValue {
                        column: source_name.clone(),
                        value: raw.to_string(),
                    }
                })?;

                let result = match op {
                    ArithOp::Add => current + operand,
                    ArithOp::Sub => current - operand,
                    ArithOp::Mul => current * operand,
                    ArithOp::Div => current / operand,
                };

                Ok(match target_type {
                    DataType::Int => (result.trunc() as i64).to_string(),
                    _ => format_float(result),
                })
            }
        }
    }
}

/// Compute an UPDATE against the current table contents
pub fn plan_update(schema: &TableSchema, mut data: TableData, stmt: &UpdateStatement) -> Result<Mutation> {
    let target = schema
        .get_column_index(&stmt.column)
        .ok_or_else(|| Error::ColumnNotFound(stmt.column.clone(), schema.table_name.clone()))?;
    let setter = Setter::new(schema, target, &stmt.value)?;

    let scope = Scope::single(schema);
    let predicate = Predicate::compile(&stmt.conditions, &scope)?;

    let mut changes = Vec::new();
    for (i, row) in data.rows.iter().enumerate() {
        if !predicate.matches(row.values()) {
            continue;
        }
        let new_value = setter.apply(row)?;
        if row.get(target) == Some(new_value.as_str()) {
            continue;
        }
        changes.push((i, new_value));
    }

    let mut message = format!("Updated {} row(s) in {}", changes.len(), schema.table_name);
    for (i, new_value) in &changes {
        let row = &mut data.rows[*i];
        let before = row.values().join(", ");
        row.set(target, new_value.clone());
        let _ = write!(message, "\n  [{}] -> [{}]", before, row.values().join(", "));
    }

    debug!(table = %schema.table_name, changed = changes.len(), "planned update");

    let affected_rows = changes.len();
    Ok(Mutation {
        table: schema.table_name.clone(),
        data: (affected_rows > 0).then_some(data),
        affected_rows,
        message,
    })
}

/// Compute a DELETE against the current table contents; kept rows keep their order
pub fn plan_delete(schema: &TableSchema, data: TableData, stmt: &DeleteStatement) -> Result<Mutation> {
    let scope = Scope::single(schema);
    let predicate = Predicate::compile(&stmt.conditions, &scope)?;

    let TableData { header, rows } = data;
    let (removed, kept): (Vec<Row>, Vec<Row>) =
        rows.into_iter().partition(|row| predicate.matches(row.values()));

    let mut message = format!("Deleted {} row(s) from {}", removed.len(), schema.table_name);
    for row in &removed {
        let _ = write!(message, "\n  [{}]", row.values().join(", "));
    }

    debug!(table = %schema.table_name, removed = removed.len(), kept = kept.len(), "planned delete");

    let affected_rows = removed.len();
    Ok(Mutation {
        table: schema.table_name.clone(),
        data: (affected_rows > 0).then_some(TableData { header, rows: kept }),
        affected_rows,
        message,
    })
}
