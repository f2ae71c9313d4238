//! Bulk transfer service - CSV streams in and out of tables via COPY

use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;

use crate::adapters::duckdb::DuckDbRepository;
use crate::domain::result::{Error, Result};
use crate::ports::{Table, TableSchema};

/// Moves whole datasets between header-prefixed CSV and a table
///
/// DuckDB's `COPY` reads and writes files, so streams are spooled through a
/// private temporary directory that is removed when the call returns.
pub struct BulkTransferService {
    repository: Arc<DuckDbRepository>,
}

impl BulkTransferService {
    pub fn new(repository: Arc<DuckDbRepository>) -> Self {
        Self { repository }
    }

    /// Load a CSV stream (header line, then data lines) into an existing table
    ///
    /// The header must list the table's columns in declared order. Any
    /// malformed row aborts the whole load.
    pub fn load<S: TableSchema, R: Read>(&self, mut input: R, table: &Table<S>) -> Result<()> {
        let (_spool, path) = spool_file(table)?;

        {
            let mut file = BufWriter::new(File::create(&path)?);
            io::copy(&mut input, &mut file)?;
            file.flush()?;
        }

        self.check_header(table, &path)?;
        self.repository.copy_from_csv(table.name(), &path)?;

        tracing::info!(table = table.name(), "bulk load complete");
        Ok(())
    }

    /// Unload a whole table as CSV (header line, then one line per row)
    pub fn unload<S: TableSchema, W: Write>(&self, table: &Table<S>, mut output: W) -> Result<()> {
        let (_spool, path) = spool_file(table)?;

        self.repository.copy_to_csv(table.name(), &path)?;

        let mut file = File::open(&path)?;
        let bytes = io::copy(&mut file, &mut output)?;
        output.flush()?;

        tracing::info!(table = table.name(), bytes, "bulk unload complete");
        Ok(())
    }

    fn check_header<S: TableSchema>(&self, table: &Table<S>, path: &Path) -> Result<()> {
        let columns = self.repository.table_columns(table.name())?;
        if columns.is_empty() {
            return Err(Error::bulk_transfer(format!(
                "table {} does not exist",
                table.name()
            )));
        }

        let mut reader = csv::Reader::from_path(path)?;
        let header: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

        if header != columns {
            return Err(Error::bulk_transfer(format!(
                "header [{}] does not match columns of {} [{}]",
                header.join(","),
                table.name(),
                columns.join(",")
            )));
        }
        Ok(())
    }
}

/// Private directory plus the CSV path inside it; the file is created later
fn spool_file<S: TableSchema>(table: &Table<S>) -> Result<(TempDir, PathBuf)> {
    let dir = tempfile::Builder::new().prefix("bookings-report-").tempdir()?;
    let path = dir.path().join(format!("{}.csv", table.name()));
    Ok((dir, path))
}
