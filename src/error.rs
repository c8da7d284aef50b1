//! Error types for csvdb
//!
//! This module defines all error types used throughout the query engine.

use serde::Serialize;
use thiserror::Error;

/// Coarse error taxonomy exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    Lex,
    Syntax,
    Type,
    Execution,
    Transaction,
}

/// The main error type for csvdb
#[derive(Error, Debug)]
pub enum Error {
    // ========== Lexer Errors ==========
    #[error("Lexer error: unexpected character '{0}' at position {1}")]
    UnexpectedCharacter(char, usize),

    #[error("Lexer error: unterminated string literal starting at position {0}")]
    UnterminatedString(usize),

    #[error("Lexer error: invalid number format at position {0}")]
    InvalidNumber(usize),

    #[error("Lexer error: keyword '{keyword}' cannot follow a number at position {position}")]
    KeywordAfterNumber { keyword: String, position: usize },

    // ========== Syntax Errors ==========
    #[error("Syntax error: unexpected token '{found}', expected {expected}")]
    UnexpectedToken { expected: String, found: String },

    #[error("Syntax error: unexpected end of input, expected {0}")]
    UnexpectedEof(String),

    // ========== Type Errors ==========
    #[error("Type error: unsupported data type '{0}'")]
    UnknownDataType(String),

    #[error("Type error: column {index} '{column}' expects {expected}, got {found}")]
    TypeMismatch {
        index: usize,
        column: String,
        expected: String,
        found: String,
    },

    #[error("Type error: column '{0}' is not numeric")]
    NotNumeric(String),

    #[error("Type error: value '{value}' in column '{column}' is not a number")]
    InvalidNumericValue { column: String, value: String },

    // ========== Execution Errors ==========
    #[error("Execution error: table '{0}' not found")]
    TableNotFound(String),

    #[error("Execution error: table '{0}' already exists")]
    TableAlreadyExists(String),

    #[error("Execution error: column '{0}' not found in table '{1}'")]
    ColumnNotFound(String, String),

    #[error("Execution error: table '{0}' is not in the FROM list")]
    UnknownTable(String),

    #[error("Execution error: column '{0}' is ambiguous")]
    AmbiguousColumn(String),

    #[error("Execution error: duplicate column '{0}' in table definition")]
    DuplicateColumn(String),

    #[error("Execution error: table '{table}' has {expected} columns but {found} values were supplied")]
    ColumnCountMismatch {
        table: String,
        expected: usize,
        found: usize,
    },

    #[error("Execution error: malformed schema for table '{0}'")]
    MalformedSchema(String),

    #[error("Execution error: malformed data file for table '{table}': {reason}")]
    MalformedData { table: String, reason: String },

    #[error("Execution error: division by zero")]
    DivisionByZero,

    #[error("Execution error: {0}")]
    ExecutionError(String),

    // ========== Transaction Errors ==========
    #[error("Transaction error: a transaction is already active")]
    TransactionAlreadyActive,

    #[error("Transaction error: no active transaction")]
    NoActiveTransaction,

    #[error("Transaction error: transaction {0} is already closed")]
    TransactionClosed(u64),

    // ========== I/O Errors ==========
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    // ========== Internal Errors ==========
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Map this error onto the caller-facing taxonomy
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::UnexpectedCharacter(..)
            | Error::UnterminatedString(_)
            | Error::InvalidNumber(_)
            | Error::KeywordAfterNumber { .. } => ErrorKind::Lex,
            Error::UnexpectedToken { .. } | Error::UnexpectedEof(_) => ErrorKind::Syntax,
            Error::UnknownDataType(_)
            | Error::TypeMismatch { .. }
            | Error::NotNumeric(_)
            | Error::InvalidNumericValue { .. } => ErrorKind::Type,
            Error::TransactionAlreadyActive
            | Error::NoActiveTransaction
            | Error::TransactionClosed(_) => ErrorKind::Transaction,
            _ => ErrorKind::Execution,
        }
    }
}

/// Result type alias for csvdb operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::TableNotFound("users".to_string());
        assert_eq!(err.to_string(), "Execution error: table 'users' not found");

        let err = Error::UnexpectedCharacter('@', 5);
        assert_eq!(
            err.to_string(),
            "Lexer error: unexpected character '@' at position 5"
        );
    }

    #[test]
    fn test_error_kind() {
        assert_eq!(Error::UnexpectedEof("identifier".into()).kind(), ErrorKind::Syntax);
        assert_eq!(Error::UnknownDataType("BLOB".into()).kind(), ErrorKind::Type);
        assert_eq!(Error::DivisionByZero.kind(), ErrorKind::Execution);
        assert_eq!(Error::NoActiveTransaction.kind(), ErrorKind::Transaction);

        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk");
        assert_eq!(Error::from(io).kind(), ErrorKind::Execution);
    }
}
