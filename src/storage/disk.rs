//! Disk manager for csvdb
//!
//! Each table is a directory under the data root holding `schema.csv`
//! (`column_name,data_type` plus one row per column) and `data.csv`
//! (a header of column names followed by the stored rows).

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::tuple::Row;
use crate::catalog::{Column, DataType, TableSchema};
use crate::error::{Error, Result};

/// Schema file name inside a table directory
pub const SCHEMA_FILE: &str = "schema.csv";
/// Data file name inside a table directory
pub const DATA_FILE: &str = "data.csv";

const SCHEMA_HEADER: [&str; 2] = ["column_name", "data_type"];

/// Full contents of a data file
#[derive(Debug, Clone, PartialEq)]
pub struct TableData {
    /// Column names from the header row
    pub header: Vec<String>,
    /// Stored rows in file order
    pub rows: Vec<Row>,
}

/// Disk manager
#[derive(Debug, Clone)]
pub struct DiskManager {
    /// Directory holding one sub-directory per table
    data_dir: PathBuf,
}

impl DiskManager {
    /// Open the data root, creating it if missing
    pub fn open(data_dir: impl AsRef<Path>) -> Result<Self> {
        let data_dir = data_dir.as_ref().to_path_buf();
        fs::create_dir_all(&data_dir)?;
        Ok(Self { data_dir })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn table_dir(&self, table: &str) -> PathBuf {
        self.data_dir.join(table)
    }

    pub fn schema_path(&self, table: &str) -> PathBuf {
        self.table_dir(table).join(SCHEMA_FILE)
    }

    pub fn data_path(&self, table: &str) -> PathBuf {
        self.table_dir(table).join(DATA_FILE)
    }

    /// Case-sensitive scan of the data root.
    ///
    /// `Path::exists` would match `T` against `t` on case-insensitive file systems.
    pub fn table_exists(&self, table: &str) -> Result<bool> {
        for entry in fs::read_dir(&self.data_dir)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() && entry.file_name().to_str() == Some(table) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Names of all table directories that carry a schema file, sorted
    pub fn list_tables(&self) -> Result<Vec<String>> {
        let mut tables = Vec::new();
        for entry in fs::read_dir(&self.data_dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if entry.path().join(SCHEMA_FILE).is_file() {
                    tables.push(name.to_string());
                }
            }
        }
        tables.sort();
        Ok(tables)
    }

    /// Create the table directory with its schema and an empty data file.
    ///
    /// A partially created directory is removed before the error is returned.
    pub fn create_table(&self, schema: &TableSchema) -> Result<()> {
        self.create_table_with(schema, |schema| self.write_table_files(schema))
    }

    fn create_table_with<F>(&self, schema: &TableSchema, write_files: F) -> Result<()>
    where
        F: FnOnce(&TableSchema) -> Result<()>,
    {
        let table = &schema.table_name;
        if self.table_exists(table)? {
            return Err(Error::TableAlreadyExists(table.clone()));
        }

        let dir = self.table_dir(table);
        fs::create_dir(&dir)?;

        if let Err(e) = write_files(schema) {
            warn!(table = %table, error = %e, "table creation failed, removing directory");
            if let Err(cleanup) = fs::remove_dir_all(&dir) {
                warn!(table = %table, error = %cleanup, "could not remove partial table directory");
            }
            return Err(e);
        }

        debug!(table = %table, columns = schema.column_count(), "created table files");
        Ok(())
    }

    fn write_table_files(&self, schema: &TableSchema) -> Result<()> {
        let mut writer = csv::Writer::from_path(self.schema_path(&schema.table_name))?;
        writer.write_record(SCHEMA_HEADER)?;
        for column in schema.columns() {
            writer.write_record([column.name.as_str(), column.data_type.name()])?;
        }
        writer.flush()?;

        let mut writer = csv::Writer::from_path(self.data_path(&schema.table_name))?;
        writer.write_record(schema.columns().iter().map(|c| c.name.as_str()))?;
        writer.flush()?;
        Ok(())
    }

    /// Remove a table directory and everything in it
    pub fn remove_table(&self, table: &str) -> Result<()> {
        let dir = self.table_dir(table);
        if dir.is_dir() {
            fs::remove_dir_all(&dir)?;
        }
        Ok(())
    }

    /// Read the ordered column list of a table
    pub fn read_schema(&self, table: &str) -> Result<TableSchema> {
        if !self.table_exists(table)? {
            return Err(Error::TableNotFound(table.to_string()));
        }

        let path = self.schema_path(table);
        if !path.is_file() {
            return Err(Error::MalformedSchema(table.to_string()));
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(&path)?;

        let mut records = reader.records();
        match records.next() {
            Some(header) => {
                let header = header?;
                if header.iter().ne(SCHEMA_HEADER) {
                    return Err(Error::MalformedSchema(table.to_string()));
                }
            }
            None => return Err(Error::MalformedSchema(table.to_string())),
        }

        let mut columns = Vec::new();
        for record in records {
            let record = record?;
            if record.len() != 2 {
                return Err(Error::MalformedSchema(table.to_string()));
            }
            let data_type: DataType = record[1].parse()?;
            columns.push(Column::new(&record[0], data_type));
        }

        if columns.is_empty() {
            return Err(Error::MalformedSchema(table.to_string()));
        }

        Ok(TableSchema::new(table, columns))
    }

    /// Read the whole data file
    pub fn read_rows(&self, table: &str) -> Result<TableData> {
        let path = self.data_path(table);
        if !path.is_file() {
            return Err(Error::TableNotFound(table.to_string()));
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(&path)?;

        let mut records = reader.records();
        let header: Vec<String> = match records.next() {
            Some(record) => record?.iter().map(String::from).collect(),
            None => {
                return Err(Error::MalformedData {
                    table: table.to_string(),
                    reason: "missing header row".to_string(),
                })
            }
        };

        let mut rows = Vec::new();
        for (i, record) in records.enumerate() {
            let record = record?;
            if record.len() != header.len() {
                return Err(Error::MalformedData {
                    table: table.to_string(),
                    reason: format!(
                        "row {} has {} fields, expected {}",
                        i + 1,
                        record.len(),
                        header.len()
                    ),
                });
            }
            rows.push(Row::new(record.iter().map(String::from).collect()));
        }

        Ok(TableData { header, rows })
    }

    /// Replace the data file with `data`.
    ///
    /// The new contents go to a sibling file first and are renamed over the live file.
    pub fn write_rows(&self, table: &str, data: &TableData) -> Result<()> {
        let path = self.data_path(table);
        let tmp = path.with_extension("csv.tmp");

        {
            let mut writer = csv::Writer::from_path(&tmp)?;
            writer.write_record(&data.header)?;
            for row in &data.rows {
                writer.write_record(row.values())?;
            }
            writer.flush()?;
        }

        fs::rename(&tmp, &path)?;
        debug!(table = %table, rows = data.rows.len(), "rewrote data file");
        Ok(())
    }

    /// Append one row to the data file
    pub fn append_row(&self, table: &str, row: &Row) -> Result<()> {
        let file = OpenOptions::new().append(true).open(self.data_path(table))?;
        let mut writer = csv::Writer::from_writer(file);
        writer.write_record(row.values())?;
        writer.flush()?;
        Ok(())
    }

    /// Copy the live data file to a new `<prefix>*.bak` file inside the table directory.
    ///
    /// The name is unique within the directory, so engines sharing a data root never
    /// overwrite each other's backups.
    pub fn backup_data(&self, table: &str, prefix: &str) -> Result<PathBuf> {
        let (_, backup) = tempfile::Builder::new()
            .prefix(prefix)
            .suffix(".bak")
            .tempfile_in(self.table_dir(table))?
            .keep()
            .map_err(|e| Error::from(e.error))?;

        if let Err(e) = fs::copy(self.data_path(table), &backup) {
            let _ = fs::remove_file(&backup);
            return Err(e.into());
        }
        debug!(table = %table, backup = %backup.display(), "backed up data file");
        Ok(backup)
    }

    /// Copy a backup over the live data file
    pub fn restore_data(&self, table: &str, backup: &Path) -> Result<()> {
        let tmp = self.data_path(table).with_extension("csv.restore");
        fs::copy(backup, &tmp)?;
        fs::rename(&tmp, self.data_path(table))?;
        Ok(())
    }

    /// Number of stored rows, header excluded
    pub fn row_count(&self, table: &str) -> Result<usize> {
        let file = File::open(self.data_path(table))?;
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(file);
        Ok(reader.records().count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use tempfile::TempDir;

    fn schema() -> TableSchema {
        TableSchema::new(
            "t",
            vec![
                Column::new("a", DataType::Int),
                Column::new("b", DataType::Char),
            ],
        )
    }

    fn row(a: &str, b: &str) -> Row {
        Row::new(vec![a.to_string(), b.to_string()])
    }

    #[test]
    fn test_create_table_layout() {
        let dir = TempDir::new().unwrap();
        let disk = DiskManager::open(dir.path()).unwrap();

        disk.create_table(&schema()).unwrap();

        let schema_text = fs::read_to_string(disk.schema_path("t")).unwrap();
        assert_eq!(schema_text, "column_name,data_type\na,INT\nb,CHAR\n");
        let data_text = fs::read_to_string(disk.data_path("t")).unwrap();
        assert_eq!(data_text, "a,b\n");

        assert_eq!(disk.read_schema("t").unwrap(), schema());
    }

    #[test]
    fn test_failed_create_removes_directory() {
        let dir = TempDir::new().unwrap();
        let disk = DiskManager::open(dir.path()).unwrap();

        let err = disk
            .create_table_with(&schema(), |schema| {
                disk.write_table_files(schema)?;
                Err(Error::Internal("disk full".to_string()))
            })
            .unwrap_err();
        assert!(matches!(err, Error::Internal(_)));
        assert!(!disk.table_dir("t").exists());

        disk.create_table(&schema()).unwrap();
        assert!(disk.table_exists("t").unwrap());
    }

    #[test]
    fn test_create_duplicate_table() {
        let dir = TempDir::new().unwrap();
        let disk = DiskManager::open(dir.path()).unwrap();

        disk.create_table(&schema()).unwrap();
        let err = disk.create_table(&schema()).unwrap_err();
        assert!(matches!(err, Error::TableAlreadyExists(_)));
    }

    #[test]
    fn test_table_lookup_is_case_sensitive() {
        let dir = TempDir::new().unwrap();
        let disk = DiskManager::open(dir.path()).unwrap();
        disk.create_table(&schema()).unwrap();

        assert!(disk.table_exists("t").unwrap());
        assert!(!disk.table_exists("T").unwrap());
        let err = disk.read_schema("T").unwrap_err();
        assert!(matches!(err, Error::TableNotFound(_)));
    }

    #[test]
    fn test_append_and_rewrite_rows() {
        let dir = TempDir::new().unwrap();
        let disk = DiskManager::open(dir.path()).unwrap();
        disk.create_table(&schema()).unwrap();

        disk.append_row("t", &row("1", "x")).unwrap();
        disk.append_row("t", &row("2", "has,comma")).unwrap();

        let mut data = disk.read_rows("t").unwrap();
        assert_eq!(data.header, vec!["a", "b"]);
        assert_eq!(data.rows, vec![row("1", "x"), row("2", "has,comma")]);

        data.rows.remove(0);
        disk.write_rows("t", &data).unwrap();
        assert_eq!(disk.read_rows("t").unwrap().rows, vec![row("2", "has,comma")]);
        assert_eq!(disk.row_count("t").unwrap(), 1);
    }

    #[test]
    fn test_backup_and_restore() {
        let dir = TempDir::new().unwrap();
        let disk = DiskManager::open(dir.path()).unwrap();
        disk.create_table(&schema()).unwrap();
        disk.append_row("t", &row("1", "x")).unwrap();

        let backup = disk.backup_data("t", "data.csv.1.").unwrap();
        let second = disk.backup_data("t", "data.csv.1.").unwrap();
        assert_ne!(backup, second);
        let name = backup.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("data.csv.1.") && name.ends_with(".bak"));

        disk.append_row("t", &row("2", "y")).unwrap();
        assert_eq!(disk.row_count("t").unwrap(), 2);

        disk.restore_data("t", &backup).unwrap();
        assert_eq!(disk.read_rows("t").unwrap().rows, vec![row("1", "x")]);
    }

    #[test]
    fn test_malformed_schema() {
        let dir = TempDir::new().unwrap();
        let disk = DiskManager::open(dir.path()).unwrap();
        fs::create_dir(disk.table_dir("bad")).unwrap();
        fs::write(disk.schema_path("bad"), "column_name,data_type\n").unwrap();

        let err = disk.read_schema("bad").unwrap_err();
        assert!(matches!(err, Error::MalformedSchema(_)));

        fs::write(disk.schema_path("bad"), "column_name,data_type\na,TEXT\n").unwrap();
        let err = disk.read_schema("bad").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Type);
    }

    #[test]
    fn test_list_tables() {
        let dir = TempDir::new().unwrap();
        let disk = DiskManager::open(dir.path()).unwrap();
        disk.create_table(&TableSchema::new("zeta", schema().columns().to_vec()))
            .unwrap();
        disk.create_table(&schema()).unwrap();
        fs::create_dir(disk.table_dir("not_a_table")).unwrap();

        assert_eq!(disk.list_tables().unwrap(), vec!["t", "zeta"]);
    }
}
