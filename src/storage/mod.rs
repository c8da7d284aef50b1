//! Storage module
//!
//! This module contains the on-disk table representation:
//! - Table directories with CSV schema and data files
//! - Row and scalar value types

pub mod disk;
pub mod tuple;

pub use disk::{DiskManager, TableData, DATA_FILE, SCHEMA_FILE};
pub use tuple::{Row, Scalar};
