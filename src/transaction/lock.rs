//! Lock Manager
//!
//! One mutual-exclusion lock per table name, created lazily. The map of locks is guarded by
//! its own mutex; holding a table lock does not hold the map.
//!
//! No acquisition order across tables is defined. Callers lock a single table at a time.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::error::{Error, Result};

/// Lock Manager
#[derive(Debug, Default)]
pub struct LockManager {
    /// Locks: Table Name -> table mutex
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl LockManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the lock for `table`
    pub fn table_lock(&self, table: &str) -> Result<Arc<Mutex<()>>> {
        let mut locks = self
            .locks
            .lock()
            .map_err(|_| Error::Internal("lock table poisoned".to_string()))?;
        Ok(locks
            .entry(table.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone())
    }

    /// Run `f` while holding the lock of `table`
    pub fn with_table_lock<T>(&self, table: &str, f: impl FnOnce() -> Result<T>) -> Result<T> {
        let lock = self.table_lock(table)?;
        let _guard = lock
            .lock()
            .map_err(|_| Error::Internal(format!("lock for table '{}' poisoned", table)))?;
        debug!(table = %table, "acquired table lock");
        f()
    }

    /// Number of tables that have had a lock created
    pub fn len(&self) -> usize {
        self.locks.lock().map(|l| l.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
