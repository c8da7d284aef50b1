//! Row and scalar types for csvdb
//!
//! Stored rows are plain text. `Scalar` is the normalized form used when
//! fields and literals are compared.

use serde::Serialize;
use std::fmt;

use crate::sql::ast::Value;

/// One stored row, positionally aligned to the table schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Row {
    values: Vec<String>,
}

impl Row {
    pub fn new(values: Vec<String>) -> Self {
        Self { values }
    }

    /// Get all field values
    pub fn values(&self) -> &[String] {
        &self.values
    }

    /// Get a field by position
    pub fn get(&self, index: usize) -> Option<&str> {
        self.values.get(index).map(String::as_str)
    }

    /// Replace a field by position
    pub fn set(&mut self, index: usize, value: String) {
        if let Some(slot) = self.values.get_mut(index) {
            *slot = value;
        }
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl From<Vec<String>> for Row {
    fn from(values: Vec<String>) -> Self {
        Self::new(values)
    }
}

/// A comparable value: a field or literal after quote stripping and numeric coercion
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Int(i64),
    Float(f64),
    Text(String),
}

impl Scalar {
    /// Normalize stored text.
    ///
    /// Surrounding single quotes are stripped. All digits becomes `Int`, digits with exactly
    /// one decimal point becomes `Float`, anything else stays `Text`.
    pub fn from_field(raw: &str) -> Self {
        let text = raw.trim_matches('\'');

        let digits = text.chars().filter(|c| c.is_ascii_digit()).count();
        let dots = text.chars().filter(|c| *c == '.').count();
        let well_formed = digits > 0 && digits + dots == text.chars().count();

        if well_formed && dots == 0 {
            if let Ok(n) = text.parse::<i64>() {
                return Scalar::Int(n);
            }
        }
        if well_formed && dots == 1 {
            if let Ok(n) = text.parse::<f64>() {
                return Scalar::Float(n);
            }
        }
        Scalar::Text(text.to_string())
    }

    /// Normalize a parsed literal; string literals go through the same rules as stored text
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Int(n) => Scalar::Int(*n),
            Value::Float(n) => Scalar::Float(*n),
            Value::Str(s) => Scalar::from_field(s),
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Scalar::Int(_) | Scalar::Float(_))
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Int(n) => write!(f, "{}", n),
            Scalar::Float(n) => write!(f, "{}", crate::sql::ast::format_float(*n)),
            Scalar::Text(s) => write!(f, "{}", s),
        }
    }
}
