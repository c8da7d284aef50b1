//! Catalog module
//!
//! This module contains the schema catalog, schema definitions, and data types.

pub mod catalog;
pub mod schema;
pub mod types;

pub use catalog::{Catalog, TableBuilder};
pub use schema::{Column, TableSchema};
pub use types::DataType;
