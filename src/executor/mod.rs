//! Query execution module
//!
//! This module contains the execution engine and the pieces it is built from:
//! value comparison, WHERE evaluation, joins, and UPDATE/DELETE planning.

pub mod compare;
pub mod executor;
pub mod filter;
pub mod join;
pub mod mutation;
pub mod outcome;

pub use executor::{ExecutionEngine, QueryResult};
pub use outcome::{Outcome, Payload};
