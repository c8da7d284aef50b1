use csvdb::{Config, ErrorKind, ExecutionEngine};
use tempfile::TempDir;

fn engine() -> (TempDir, ExecutionEngine) {
    let dir = TempDir::new().unwrap();
    let engine = ExecutionEngine::new(Config::new().data_dir(dir.path())).unwrap();
    (dir, engine)
}

#[test]
fn test_transaction_lifecycle() {
    let (_dir, mut engine) = engine();

    // BEGIN
    let id = engine.begin_transaction().unwrap();
    assert!(engine.in_transaction());

    // COMMIT
    assert_eq!(engine.commit().unwrap(), id);
    assert!(!engine.in_transaction());

    // BEGIN & ROLLBACK
    let next = engine.begin_transaction().unwrap();
    assert!(next > id);
    assert_eq!(engine.rollback().unwrap(), next);
    assert!(!engine.in_transaction());
}

#[test]
fn test_rollback_removes_created_table() {
    let (dir, mut engine) = engine();

    engine.begin_transaction().unwrap();
    engine.execute_sql("CREATE TABLE t3 (a INT)").unwrap();
    assert!(dir.path().join("t3").is_dir());

    let err = engine.execute_sql("INSERT INTO t3 VALUES ('x')").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Type);
    assert!(engine.in_transaction());

    engine.rollback().unwrap();
    assert!(!dir.path().join("t3").exists());
}

#[test]
fn test_commit_keeps_changes() {
    let (dir, mut engine) = engine();

    engine.begin_transaction().unwrap();
    engine.execute_sql("CREATE TABLE t (a INT)").unwrap();
    engine.execute_sql("INSERT INTO t VALUES (1)").unwrap();
    engine.execute_sql("INSERT INTO t VALUES (2)").unwrap();
    engine.execute_sql("DELETE FROM t WHERE a = 1").unwrap();
    engine.commit().unwrap();

    let result = engine.execute_sql("SELECT a FROM t").unwrap();
    assert_eq!(result.rows.len(), 1);
    assert_eq!(result.rows[0][0].1, "2");

    // only the schema and data files remain
    let files = std::fs::read_dir(dir.path().join("t")).unwrap().count();
    assert_eq!(files, 2);
}

#[test]
fn test_transaction_misuse() {
    let (_dir, mut engine) = engine();

    assert_eq!(engine.commit().unwrap_err().kind(), ErrorKind::Transaction);
    assert_eq!(engine.rollback().unwrap_err().kind(), ErrorKind::Transaction);

    engine.begin_transaction().unwrap();
    assert_eq!(
        engine.begin_transaction().unwrap_err().kind(),
        ErrorKind::Transaction
    );
}

#[test]
fn test_autocommit_failure_leaves_prior_statements() {
    let (_dir, mut engine) = engine();

    engine.execute_sql("CREATE TABLE t (a INT)").unwrap();
    engine.execute_sql("INSERT INTO t VALUES (1)").unwrap();
    assert!(engine.execute_sql("INSERT INTO t VALUES (1.5)").is_err());
    assert!(!engine.in_transaction());

    let result = engine.execute_sql("SELECT * FROM t").unwrap();
    assert_eq!(result.rows.len(), 1);
}
