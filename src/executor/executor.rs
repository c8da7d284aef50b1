//! Query Executor for csvdb
//!
//! This module executes parsed statements against the table directory and returns results.

use serde::Serialize;
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::filter::{project, Predicate, Scope};
use super::join;
use super::mutation::{check_literal, plan_delete, plan_update, Mutation};
use crate::catalog::{Catalog, TableSchema};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::sql::ast::*;
use crate::sql::parse_sql;
use crate::storage::{DiskManager, Row, TableData};
use crate::transaction::{LockManager, TransactionManager};

/// Query result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    /// Column names
    pub columns: Vec<String>,
    /// Result rows, each an ordered list of `(column, value)` pairs
    pub rows: Vec<Vec<(String, String)>>,
    /// Number of affected rows (for INSERT/UPDATE/DELETE)
    pub affected_rows: usize,
    /// Message
    pub message: Option<String>,
}

impl QueryResult {
    /// Create a new empty result
    pub fn empty() -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
            affected_rows: 0,
            message: None,
        }
    }

    /// Create a result with a message
    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::empty()
        }
    }

    /// Create a result with affected rows count
    pub fn with_affected_rows(count: usize, message: impl Into<String>) -> Self {
        Self {
            affected_rows: count,
            message: Some(message.into()),
            ..Self::empty()
        }
    }

    /// Create a SELECT result
    pub fn rows(columns: Vec<String>, rows: Vec<Vec<(String, String)>>) -> Self {
        Self {
            columns,
            rows,
            ..Self::empty()
        }
    }
}

/// Execution Engine
pub struct ExecutionEngine {
    config: Config,
    /// Schema catalog
    catalog: Catalog,
    /// Transaction Manager
    transactions: TransactionManager,
    /// Per-table locks, shareable between engines
    locks: Arc<LockManager>,
}

impl ExecutionEngine {
    /// Create a new execution engine, creating the data root if missing
    pub fn new(config: Config) -> Result<Self> {
        Self::with_lock_manager(config, Arc::new(LockManager::new()))
    }

    /// Create an engine that shares table locks with other engines
    pub fn with_lock_manager(config: Config, locks: Arc<LockManager>) -> Result<Self> {
        let disk = DiskManager::open(&config.data_dir)?;
        info!(data_dir = %config.data_dir.display(), "execution engine ready");

        Ok(Self {
            catalog: Catalog::new(disk.clone()),
            transactions: TransactionManager::new(disk),
            locks,
            config,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn lock_manager(&self) -> Arc<LockManager> {
        Arc::clone(&self.locks)
    }

    /// Lex, parse and execute one SQL statement
    pub fn execute_sql(&mut self, sql: &str) -> Result<QueryResult> {
        let stmt = parse_sql(sql)?;
        self.execute(stmt)
    }

    /// Execute a statement
    pub fn execute(&mut self, stmt: Statement) -> Result<QueryResult> {
        if let Some(table) = stmt.target_table().map(str::to_string) {
            let locks = Arc::clone(&self.locks);
            return locks.with_table_lock(&table, || self.execute_mutation(stmt));
        }

        match stmt {
            Statement::Select(select) => self.execute_select(&select),
            _ => Err(Error::Internal("statement without a target table".to_string())),
        }
    }

    /// Run a mutating statement inside the active transaction, or an implicit one
    fn execute_mutation(&mut self, stmt: Statement) -> Result<QueryResult> {
        let implicit = !self.transactions.is_active();
        if implicit {
            self.transactions.begin()?;
        }

        let result = self.apply_mutation(stmt);

        if implicit {
            match &result {
                Ok(_) => {
                    self.transactions.commit()?;
                }
                Err(e) => {
                    debug!(error = %e, "statement failed, rolling back implicit transaction");
                    if let Err(rollback_err) = self.transactions.rollback() {
                        warn!(error = %rollback_err, "implicit rollback failed");
                    }
                }
            }
        }

        result
    }

    fn apply_mutation(&mut self, stmt: Statement) -> Result<QueryResult> {
        match stmt {
            Statement::CreateTable(schema) => self.execute_create_table(&schema),
            Statement::Insert(insert) => self.execute_insert(&insert),
            Statement::Update(update) => {
                let (schema, data) = self.load_table(&update.table_name)?;
                let mutation = plan_update(&schema, data, &update)?;
                self.apply(mutation, false)
            }
            Statement::Delete(delete) => {
                let (schema, data) = self.load_table(&delete.table_name)?;
                let mutation = plan_delete(&schema, data, &delete)?;
                self.apply(mutation, true)
            }
            Statement::Select(_) => Err(Error::Internal("SELECT is not a mutation".to_string())),
        }
    }

    fn execute_create_table(&mut self, schema: &TableSchema) -> Result<QueryResult> {
        self.catalog.create_table(schema)?;
        self.transactions.record_create(&schema.table_name)?;
        Ok(QueryResult::with_message(format!(
            "Table {} created",
            schema.table_name
        )))
    }

    fn execute_insert(&mut self, insert: &InsertStatement) -> Result<QueryResult> {
        let schema = self.catalog.get_schema(&insert.table_name)?;

        if insert.values.len() != schema.column_count() {
            return Err(Error::ColumnCountMismatch {
                table: insert.table_name.clone(),
                expected: schema.column_count(),
                found: insert.values.len(),
            });
        }

        for (i, (value, column)) in insert.values.iter().zip(schema.columns()).enumerate() {
            check_literal(i, &column.name, column.data_type, value)?;
        }

        let row = Row::new(insert.values.iter().map(Value::to_field).collect());
        self.transactions.record_modify(&insert.table_name)?;
        self.catalog.disk().append_row(&insert.table_name, &row)?;

        info!(table = %insert.table_name, "inserted 1 row");
        Ok(QueryResult::with_affected_rows(
            1,
            format!("Inserted 1 row into {}", insert.table_name),
        ))
    }

    /// Back up and write a planned UPDATE/DELETE
    fn apply(&mut self, mutation: Mutation, deleting: bool) -> Result<QueryResult> {
        if let Some(data) = &mutation.data {
            if deleting {
                self.transactions.record_delete(&mutation.table)?;
            } else {
                self.transactions.record_modify(&mutation.table)?;
            }
            self.catalog.disk().write_rows(&mutation.table, data)?;
        }

        info!(table = %mutation.table, rows = mutation.affected_rows, deleting, "applied mutation");
        Ok(QueryResult::with_affected_rows(
            mutation.affected_rows,
            mutation.message,
        ))
    }

    fn execute_select(&self, select: &SelectStatement) -> Result<QueryResult> {
        if select.tables.len() > 1 {
            let tables = select
                .tables
                .iter()
                .map(|t| self.load_table(t))
                .collect::<Result<Vec<_>>>()?;
            let (columns, rows) = join::select(&tables, &select.columns, &select.conditions)?;
            return Ok(QueryResult::rows(columns, rows));
        }

        let table = select
            .tables
            .first()
            .ok_or_else(|| Error::ExecutionError("SELECT without a table".to_string()))?;
        let (schema, data) = self.load_table(table)?;

        let scope = Scope::single(&schema);
        let predicate = Predicate::compile(&select.conditions, &scope)?;
        let positions = scope.projection(&select.columns)?;

        let rows: Vec<_> = data
            .rows
            .iter()
            .filter(|row| predicate.matches(row.values()))
            .map(|row| project(row.values(), &positions))
            .collect();

        debug!(table = %table, rows = rows.len(), "select");
        let columns = positions.into_iter().map(|(_, label)| label).collect();
        Ok(QueryResult::rows(columns, rows))
    }

    /// Read a table's schema and rows, checking that the data file agrees with the schema
    fn load_table(&self, table: &str) -> Result<(TableSchema, TableData)> {
        let schema = self.catalog.get_schema(table)?;
        let data = self.catalog.disk().read_rows(table)?;

        if data.header != schema.column_names() {
            return Err(Error::MalformedData {
                table: table.to_string(),
                reason: "header does not match schema".to_string(),
            });
        }

        Ok((schema, data))
    }

    // ========== Transactions ==========

    /// Start an explicit transaction
    pub fn begin_transaction(&mut self) -> Result<u64> {
        self.transactions.begin()
    }

    /// Commit the explicit transaction
    pub fn commit(&mut self) -> Result<u64> {
        self.transactions.commit()
    }

    /// Undo everything recorded by the explicit transaction
    pub fn rollback(&mut self) -> Result<u64> {
        self.transactions.rollback()
    }

    pub fn in_transaction(&self) -> bool {
        self.transactions.is_active()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use tempfile::TempDir;

    fn create_test_engine() -> (TempDir, ExecutionEngine) {
        let dir = TempDir::new().unwrap();
        let engine = ExecutionEngine::new(Config::new().data_dir(dir.path())).unwrap();
        (dir, engine)
    }

    fn pairs(row: &[(&str, &str)]) -> Vec<(String, String)> {
        row.iter().map(|(c, v)| (c.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_create_table() {
        let (_dir, mut engine) = create_test_engine();

        let result = engine
            .execute_sql("CREATE TABLE users (id INT, name CHAR)")
            .unwrap();
        assert!(result.message.unwrap().contains("created"));
        assert!(!engine.in_transaction());

        let err = engine.execute_sql("CREATE TABLE users (x INT)").unwrap_err();
        assert!(matches!(err, Error::TableAlreadyExists(_)));
    }

    #[test]
    fn test_insert_and_select() {
        let (_dir, mut engine) = create_test_engine();

        engine.execute_sql("CREATE TABLE t (a INT, b CHAR)").unwrap();
        let result = engine.execute_sql("INSERT INTO t VALUES (1, 'x')").unwrap();
        assert_eq!(result.affected_rows, 1);

        let result = engine.execute_sql("SELECT * FROM t").unwrap();
        assert_eq!(result.columns, vec!["a", "b"]);
        assert_eq!(result.rows, vec![pairs(&[("a", "1"), ("b", "x")])]);
        assert!(result.message.is_none());
    }

    #[test]
    fn test_projection_order() {
        let (_dir, mut engine) = create_test_engine();

        engine.execute_sql("CREATE TABLE t (a INT, b CHAR, c FLOAT)").unwrap();
        engine.execute_sql("INSERT INTO t VALUES (1, 'x', 2.0)").unwrap();

        let result = engine.execute_sql("SELECT c, t.a FROM t").unwrap();
        assert_eq!(result.rows, vec![pairs(&[("c", "2.0"), ("a", "1")])]);

        let err = engine.execute_sql("SELECT A FROM t").unwrap_err();
        assert!(matches!(err, Error::ColumnNotFound(ref c, _) if c == "A"));
    }

    #[test]
    fn test_insert_validation() {
        let (_dir, mut engine) = create_test_engine();
        engine.execute_sql("CREATE TABLE t (a INT, f FLOAT)").unwrap();

        let err = engine.execute_sql("INSERT INTO t VALUES (1)").unwrap_err();
        assert!(matches!(err, Error::ColumnCountMismatch { expected: 2, found: 1, .. }));

        let err = engine.execute_sql("INSERT INTO t VALUES (1, 5)").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Type);
        assert!(err.to_string().contains("column 2 'f'"));

        let result = engine.execute_sql("SELECT * FROM t").unwrap();
        assert!(result.rows.is_empty());
    }

    #[test]
    fn test_failed_statement_leaves_no_backup() {
        let (dir, mut engine) = create_test_engine();
        engine.execute_sql("CREATE TABLE t (a INT)").unwrap();
        engine.execute_sql("INSERT INTO t VALUES (1)").unwrap();
        engine.execute_sql("UPDATE t SET a = a / 0").unwrap_err();

        let files = std::fs::read_dir(dir.path().join("t")).unwrap().count();
        assert_eq!(files, 2);
    }

    #[test]
    fn test_explicit_transaction_rollback() {
        let (_dir, mut engine) = create_test_engine();
        engine.execute_sql("CREATE TABLE t (a INT)").unwrap();
        engine.execute_sql("INSERT INTO t VALUES (1)").unwrap();

        engine.begin_transaction().unwrap();
        engine.execute_sql("INSERT INTO t VALUES (2)").unwrap();
        engine.execute_sql("UPDATE t SET a = 9 WHERE a = 1").unwrap();
        engine.execute_sql("CREATE TABLE u (b CHAR)").unwrap();
        engine.rollback().unwrap();

        let result = engine.execute_sql("SELECT a FROM t").unwrap();
        assert_eq!(result.rows, vec![pairs(&[("a", "1")])]);
        assert!(!engine.catalog().table_exists("u").unwrap());
    }

    #[test]
    fn test_shared_lock_manager() {
        let dir = TempDir::new().unwrap();
        let config = Config::new().data_dir(dir.path());
        let mut a = ExecutionEngine::new(config.clone()).unwrap();
        let mut b = ExecutionEngine::with_lock_manager(config, a.lock_manager()).unwrap();

        a.execute_sql("CREATE TABLE t (a INT)").unwrap();
        b.execute_sql("INSERT INTO t VALUES (3)").unwrap();

        let result = a.execute_sql("SELECT * FROM t").unwrap();
        assert_eq!(result.rows.len(), 1);
        assert_eq!(a.lock_manager().len(), 1);
    }
}
