//! Value comparison shared by filters, joins, updates and deletes

use std::cmp::Ordering;

use crate::sql::ast::CompareOp;
use crate::storage::Scalar;

/// Tolerance for numeric equality
pub const EPSILON: f64 = 1e-10;

/// Compare two normalized values.
///
/// If either side is numeric both are read as floats from their text form; a side that does
/// not parse makes the comparison false. Otherwise the text is compared directly.
pub fn compare(left: &Scalar, op: CompareOp, right: &Scalar) -> bool {
    if left.is_numeric() || right.is_numeric() {
        let (l, r) = match (as_float(left), as_float(right)) {
            (Some(l), Some(r)) => (l, r),
            _ => return false,
        };
        return compare_floats(l, op, r);
    }

    let ordering = left.to_string().cmp(&right.to_string());
    match op {
        CompareOp::Eq => ordering == Ordering::Equal,
        CompareOp::NotEq => ordering != Ordering::Equal,
        CompareOp::Lt => ordering == Ordering::Less,
        CompareOp::Gt => ordering == Ordering::Greater,
        CompareOp::LtEq => ordering != Ordering::Greater,
        CompareOp::GtEq => ordering != Ordering::Less,
    }
}

/// Compare raw stored text after normalization
pub fn compare_fields(left: &str, op: CompareOp, right: &str) -> bool {
    compare(&Scalar::from_field(left), op, &Scalar::from_field(right))
}

fn as_float(value: &Scalar) -> Option<f64> {
    value.to_string().trim().parse::<f64>().ok()
}

fn compare_floats(l: f64, op: CompareOp, r: f64) -> bool {
    let equal = (l - r).abs() < EPSILON;
    match op {
        CompareOp::Eq => equal,
        CompareOp::NotEq => !equal,
        CompareOp::Lt => l < r && !equal,
        CompareOp::Gt => l > r && !equal,
        CompareOp::LtEq => l < r || equal,
        CompareOp::GtEq => l > r || equal,
    }
}
