//! SQL Abstract Syntax Tree (AST)
//!
//! This module defines the statement tree produced by the parser.

use std::fmt;

use crate::catalog::{DataType, TableSchema};

/// A SQL statement
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// CREATE TABLE statement
    CreateTable(TableSchema),
    /// INSERT statement
    Insert(InsertStatement),
    /// SELECT statement
    Select(SelectStatement),
    /// UPDATE statement
    Update(UpdateStatement),
    /// DELETE statement
    Delete(DeleteStatement),
}

impl Statement {
    /// The single table a mutating statement writes to
    pub fn target_table(&self) -> Option<&str> {
        match self {
            Statement::CreateTable(schema) => Some(&schema.table_name),
            Statement::Insert(stmt) => Some(&stmt.table_name),
            Statement::Update(stmt) => Some(&stmt.table_name),
            Statement::Delete(stmt) => Some(&stmt.table_name),
            Statement::Select(_) => None,
        }
    }
}

/// INSERT statement
#[derive(Debug, Clone, PartialEq)]
pub struct InsertStatement {
    pub table_name: String,
    pub values: Vec<Value>,
}

/// SELECT statement
#[derive(Debug, Clone, PartialEq)]
pub struct SelectStatement {
    /// Projection, in the order written
    pub columns: Projection,
    /// FROM list, at least one table
    pub tables: Vec<String>,
    /// WHERE conditions in source order
    pub conditions: Vec<Condition>,
}

/// UPDATE statement
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateStatement {
    pub table_name: String,
    pub column: String,
    pub value: Assignment,
    pub conditions: Vec<Condition>,
}

/// DELETE statement
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteStatement {
    pub table_name: String,
    pub conditions: Vec<Condition>,
}

/// Column list of a SELECT
#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    /// `*`
    Wildcard,
    /// Explicit columns
    Columns(Vec<ColumnRef>),
}

/// A possibly table-qualified column reference
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnRef {
    pub table: Option<String>,
    pub column: String,
}

impl ColumnRef {
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            table: None,
            column: column.into(),
        }
    }

    pub fn qualified(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: Some(table.into()),
            column: column.into(),
        }
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.table {
            Some(table) => write!(f, "{}.{}", table, self.column),
            None => write!(f, "{}", self.column),
        }
    }
}

/// A literal produced by the parser
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Str(String),
}

impl Value {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(n) => Some(*n),
            Value::Str(_) => None,
        }
    }

    /// The literal as it is stored in a data file
    pub fn to_field(&self) -> String {
        match self {
            Value::Int(n) => n.to_string(),
            Value::Float(n) => format_float(*n),
            Value::Str(s) => s.clone(),
        }
    }

    /// Check this literal against a column type.
    ///
    /// INT takes integer literals or integer-looking strings without a decimal point,
    /// FLOAT takes float literals or strings with a decimal point, CHAR takes strings only.
    pub fn conforms_to(&self, data_type: DataType) -> bool {
        match (data_type, self) {
            (DataType::Int, Value::Int(_)) => true,
            (DataType::Int, Value::Str(s)) => !s.contains('.') && s.trim().parse::<i64>().is_ok(),
            (DataType::Float, Value::Float(_)) => true,
            (DataType::Float, Value::Str(s)) => s.contains('.') && s.trim().parse::<f64>().is_ok(),
            (DataType::Char, Value::Str(_)) => true,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(n) => write!(f, "{}", format_float(*n)),
            Value::Str(s) => write!(f, "'{}'", s),
        }
    }
}

/// Render a float with at least one fractional digit (`2.0`, `1.5`)
pub fn format_float(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e16 {
        format!("{:.1}", n)
    } else {
        format!("{}", n)
    }
}

/// Comparison operator of a condition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    NotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            CompareOp::Eq => "=",
            CompareOp::NotEq => "<>",
            CompareOp::Lt => "<",
            CompareOp::Gt => ">",
            CompareOp::LtEq => "<=",
            CompareOp::GtEq => ">=",
        };
        write!(f, "{}", symbol)
    }
}

/// Logical link between a condition and the next one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicOp {
    And,
    Or,
}

/// Right-hand side of a condition
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Literal(Value),
    Column(ColumnRef),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Literal(value) => write!(f, "{}", value),
            Operand::Column(column) => write!(f, "{}", column),
        }
    }
}

/// One WHERE condition. `logic_op` says how it combines with the *next* condition.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub column: ColumnRef,
    pub op: CompareOp,
    pub value: Operand,
    pub logic_op: Option<LogicOp>,
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.column, self.op, self.value)
    }
}

/// Arithmetic operator of an UPDATE expression
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl fmt::Display for ArithOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            ArithOp::Add => "+",
            ArithOp::Sub => "-",
            ArithOp::Mul => "*",
            ArithOp::Div => "/",
        };
        write!(f, "{}", symbol)
    }
}

/// `source_column op operand`, evaluated against each row
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateExpr {
    pub source_column: String,
    pub op: ArithOp,
    pub operand: Value,
}

/// Right-hand side of `SET column = ...`
#[derive(Debug, Clone, PartialEq)]
pub enum Assignment {
    Literal(Value),
    Arithmetic(UpdateExpr),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_to_field() {
        assert_eq!(Value::Int(-3).to_field(), "-3");
        assert_eq!(Value::Float(2.0).to_field(), "2.0");
        assert_eq!(Value::Float(1.25).to_field(), "1.25");
        assert_eq!(Value::Str("a,b".into()).to_field(), "a,b");
    }

    #[test]
    fn test_value_conforms_to() {
        assert!(Value::Int(1).conforms_to(DataType::Int));
        assert!(!Value::Float(1.5).conforms_to(DataType::Int));
        assert!(Value::Str("12".into()).conforms_to(DataType::Int));
        assert!(!Value::Str("1.0".into()).conforms_to(DataType::Int));

        assert!(Value::Float(5.0).conforms_to(DataType::Float));
        assert!(!Value::Int(5).conforms_to(DataType::Float));
        assert!(Value::Str("5.5".into()).conforms_to(DataType::Float));

        assert!(Value::Str("x".into()).conforms_to(DataType::Char));
        assert!(!Value::Int(1).conforms_to(DataType::Char));
    }

    #[test]
    fn test_column_ref_display() {
        assert_eq!(ColumnRef::qualified("t1", "id").to_string(), "t1.id");
        assert_eq!(ColumnRef::new("id").to_string(), "id");
    }
}
