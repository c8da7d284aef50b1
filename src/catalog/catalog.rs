//! Schema Catalog for csvdb
//!
//! The catalog owns table metadata. Every lookup goes to the schema file on disk, so two
//! engines sharing a data directory always see the same set of tables.

use std::fmt::Write as _;

use tracing::info;

use super::schema::{Column, TableSchema};
use super::types::DataType;
use crate::error::{Error, Result};
use crate::storage::DiskManager;

/// Schema Catalog - reads and writes table definitions
#[derive(Debug, Clone)]
pub struct Catalog {
    disk: DiskManager,
}

impl Catalog {
    /// Create a catalog over a disk manager
    pub fn new(disk: DiskManager) -> Self {
        Self { disk }
    }

    /// Underlying disk manager
    pub fn disk(&self) -> &DiskManager {
        &self.disk
    }

    /// Create a new table.
    ///
    /// Duplicate column names are rejected before anything touches disk.
    pub fn create_table(&self, schema: &TableSchema) -> Result<()> {
        if let Some(dup) = schema.duplicate_column() {
            return Err(Error::DuplicateColumn(dup.to_string()));
        }
        if schema.column_count() == 0 {
            return Err(Error::ExecutionError(format!(
                "table '{}' must have at least one column",
                schema.table_name
            )));
        }

        self.disk.create_table(schema)?;
        info!(table = %schema.table_name, "table created");
        Ok(())
    }

    /// Get a table schema by exact name
    pub fn get_schema(&self, name: &str) -> Result<TableSchema> {
        self.disk.read_schema(name)
    }

    /// Check if a table exists
    pub fn table_exists(&self, name: &str) -> Result<bool> {
        self.disk.table_exists(name)
    }

    /// List all table names, sorted
    pub fn list_tables(&self) -> Result<Vec<String>> {
        self.disk.list_tables()
    }

    /// Get table schema info as a formatted string (for .schema command)
    pub fn describe(&self, name: &str) -> Result<String> {
        let schema = self.get_schema(name)?;
        let mut info = format!("Table: {}\n", schema.table_name);
        info.push_str("Columns:\n");

        for col in schema.columns() {
            let _ = writeln!(info, "  {} {}", col.name, col.data_type);
        }

        let rows = self.disk.row_count(name)?;
        let _ = writeln!(info, "Rows: {}", rows);

        Ok(info)
    }
}

/// Builder for creating tables
pub struct TableBuilder {
    name: String,
    columns: Vec<Column>,
}

impl TableBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
        }
    }

    pub fn column(mut self, name: impl Into<String>, data_type: DataType) -> Self {
        self.columns.push(Column::new(name, data_type));
        self
    }

    /// Finish the schema without creating anything
    pub fn schema(self) -> TableSchema {
        TableSchema::new(self.name, self.columns)
    }

    pub fn build(self, catalog: &Catalog) -> Result<TableSchema> {
        let schema = self.schema();
        catalog.create_table(&schema)?;
        Ok(schema)
    }
}
