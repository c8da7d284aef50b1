//! csvdb - A minimal relational query engine over CSV table directories
//!
//! This library provides the core components:
//! - SQL parsing (lexer, parser, AST)
//! - Storage (one directory per table with CSV schema and data files)
//! - Query execution (filters, joins, arithmetic updates)
//! - Schema catalog
//! - Backup-and-restore transactions and per-table locks

pub mod catalog;
pub mod config;
pub mod error;
pub mod executor;
pub mod sql;
pub mod storage;
pub mod transaction;

pub use config::Config;
pub use error::{Error, ErrorKind, Result};
pub use executor::{ExecutionEngine, Outcome, QueryResult};
