//! Transaction module
//!
//! This module contains the backup-and-restore transaction manager and the per-table lock manager.

pub mod lock;
pub mod transaction;

pub use lock::LockManager;
pub use transaction::{TableOperation, Transaction, TransactionManager, TransactionState};
