//! Structured statement outcome
//!
//! Every statement, successful or not, becomes an `Outcome` that front ends render as JSON.

use serde::Serialize;

use super::executor::QueryResult;
use crate::error::{Error, ErrorKind, Result};

/// Payload of an outcome
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Payload {
    /// DDL/DML message
    Message(String),
    /// SELECT rows, each an ordered list of `(column, value)` pairs
    Rows(Vec<Vec<(String, String)>>),
    /// Failure description
    Error { kind: ErrorKind, message: String },
}

/// Result of one statement
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outcome {
    pub success: bool,
    pub result: Payload,
}

impl Outcome {
    pub fn error(err: &Error) -> Self {
        Self {
            success: false,
            result: Payload::Error {
                kind: err.kind(),
                message: err.to_string(),
            },
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl From<QueryResult> for Outcome {
    fn from(result: QueryResult) -> Self {
        let payload = match result.message {
            Some(message) => Payload::Message(message),
            None => Payload::Rows(result.rows),
        };
        Self {
            success: true,
            result: payload,
        }
    }
}

impl From<Result<QueryResult>> for Outcome {
    fn from(result: Result<QueryResult>) -> Self {
        match result {
            Ok(result) => result.into(),
            Err(err) => Outcome::error(&err),
        }
    }
}
