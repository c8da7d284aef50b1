//! Transaction Manager
//!
//! Handles transaction lifecycle (Begin, Commit, Rollback). Every mutation records how to
//! undo itself: a created table is removed, a modified data file is restored from a copy
//! taken just before the write.

use std::fs;
use std::path::PathBuf;

use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::storage::DiskManager;

/// Transaction State
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Active,
    Committed,
    RolledBack,
}

/// One undoable step recorded against a transaction
#[derive(Debug, Clone, PartialEq)]
pub enum TableOperation {
    /// Table created by this transaction; rollback removes its directory
    Create { table: String },
    /// Rows inserted or updated; rollback restores `backup`
    Modify { table: String, backup: PathBuf },
    /// Rows deleted; rollback restores `backup`
    Delete { table: String, backup: PathBuf },
}

impl TableOperation {
    pub fn table(&self) -> &str {
        match self {
            TableOperation::Create { table }
            | TableOperation::Modify { table, .. }
            | TableOperation::Delete { table, .. } => table,
        }
    }

    fn backup(&self) -> Option<&PathBuf> {
        match self {
            TableOperation::Create { .. } => None,
            TableOperation::Modify { backup, .. } | TableOperation::Delete { backup, .. } => {
                Some(backup)
            }
        }
    }
}

/// Transaction Context
#[derive(Debug, Clone)]
pub struct Transaction {
    pub id: u64,
    state: TransactionState,
    operations: Vec<TableOperation>,
}

impl Transaction {
    fn new(id: u64) -> Self {
        Self {
            id,
            state: TransactionState::Active,
            operations: Vec::new(),
        }
    }

    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// Recorded operations in execution order
    pub fn operations(&self) -> &[TableOperation] {
        &self.operations
    }

    fn ensure_active(&self) -> Result<()> {
        if self.state != TransactionState::Active {
            return Err(Error::TransactionClosed(self.id));
        }
        Ok(())
    }

    /// Append an operation to the log
    pub fn add_operation(&mut self, operation: TableOperation) -> Result<()> {
        self.ensure_active()?;
        debug!(trans_id = self.id, ?operation, "recorded operation");
        self.operations.push(operation);
        Ok(())
    }

    /// Keep every mutation and discard the backups
    pub fn commit(&mut self) -> Result<()> {
        self.ensure_active()?;

        for op in &self.operations {
            if let Some(backup) = op.backup() {
                if let Err(e) = fs::remove_file(backup) {
                    warn!(trans_id = self.id, backup = %backup.display(), error = %e, "could not remove backup");
                }
            }
        }

        self.operations.clear();
        self.state = TransactionState::Committed;
        Ok(())
    }

    /// Undo the log in reverse order.
    ///
    /// Every step is attempted; the first failure is returned once all steps have run.
    pub fn rollback(&mut self, disk: &DiskManager) -> Result<()> {
        self.ensure_active()?;

        let mut first_error = None;
        for op in self.operations.iter().rev() {
            let step = match op {
                TableOperation::Create { table } => disk.remove_table(table),
                TableOperation::Modify { table, backup } | TableOperation::Delete { table, backup } => {
                    disk.restore_data(table, backup)
                        .and_then(|_| fs::remove_file(backup).map_err(Error::from))
                }
            };

            match step {
                Ok(()) => debug!(trans_id = self.id, table = op.table(), "undid operation"),
                Err(e) => {
                    warn!(trans_id = self.id, table = op.table(), error = %e, "rollback step failed");
                    first_error.get_or_insert(e);
                }
            }
        }

        self.operations.clear();
        self.state = TransactionState::RolledBack;

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Transaction Manager
///
/// At most one transaction is active at a time.
#[derive(Debug)]
pub struct TransactionManager {
    disk: DiskManager,
    /// Active Transaction
    current: Option<Transaction>,
    /// Next Transaction ID
    next_trans_id: u64,
}

impl TransactionManager {
    /// Create a new transaction manager
    pub fn new(disk: DiskManager) -> Self {
        Self {
            disk,
            current: None,
            next_trans_id: 1,
        }
    }

    /// Begin a new transaction
    pub fn begin(&mut self) -> Result<u64> {
        if self.current.is_some() {
            return Err(Error::TransactionAlreadyActive);
        }

        let trans_id = self.next_trans_id;
        self.next_trans_id += 1;
        self.current = Some(Transaction::new(trans_id));

        info!(trans_id, "transaction started");
        Ok(trans_id)
    }

    /// Commit the active transaction
    pub fn commit(&mut self) -> Result<u64> {
        let mut trans = self.current.take().ok_or(Error::NoActiveTransaction)?;
        trans.commit()?;
        info!(trans_id = trans.id, "transaction committed");
        Ok(trans.id)
    }

    /// Rollback the active transaction
    pub fn rollback(&mut self) -> Result<u64> {
        let mut trans = self.current.take().ok_or(Error::NoActiveTransaction)?;
        let undone = trans.operations().len();
        trans.rollback(&self.disk)?;
        info!(trans_id = trans.id, operations = undone, "transaction rolled back");
        Ok(trans.id)
    }

    /// Check if a transaction is active
    pub fn is_active(&self) -> bool {
        self.current.is_some()
    }

    /// The active transaction, if any
    pub fn current(&self) -> Option<&Transaction> {
        self.current.as_ref()
    }

    /// Record that `table` was created by the active transaction
    pub fn record_create(&mut self, table: &str) -> Result<()> {
        let trans = self.current.as_mut().ok_or(Error::NoActiveTransaction)?;
        trans.add_operation(TableOperation::Create {
            table: table.to_string(),
        })
    }

    /// Back up `table` before rows are inserted or updated
    pub fn record_modify(&mut self, table: &str) -> Result<()> {
        let backup = self.capture_backup(table)?;
        self.push(TableOperation::Modify {
            table: table.to_string(),
            backup,
        })
    }

    /// Back up `table` before rows are deleted
    pub fn record_delete(&mut self, table: &str) -> Result<()> {
        let backup = self.capture_backup(table)?;
        self.push(TableOperation::Delete {
            table: table.to_string(),
            backup,
        })
    }

    fn push(&mut self, operation: TableOperation) -> Result<()> {
        let trans = self.current.as_mut().ok_or(Error::NoActiveTransaction)?;
        trans.add_operation(operation)
    }

    fn capture_backup(&self, table: &str) -> Result<PathBuf> {
        let trans_id = self
            .current
            .as_ref()
            .map(|t| t.id)
            .ok_or(Error::NoActiveTransaction)?;

        self.disk.backup_data(table, &format!("data.csv.{}.", trans_id))
    }
}
