//! DuckDB repository implementation

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use duckdb::{params, Connection, Transaction};

use crate::domain::result::{Error, Result};
use crate::domain::{Booking, ReportRow};
use crate::ports::{validate_identifier, CreateMode, Table, TableSchema};

/// Maximum number of retries when database file is locked
const MAX_RETRIES: u32 = 5;

/// Initial retry delay in milliseconds (doubles each retry: 50, 100, 200, 400, 800ms)
const INITIAL_RETRY_DELAY_MS: u64 = 50;

/// Options shared by every CSV `COPY` in both directions
const CSV_COPY_OPTIONS: &str = "FORMAT CSV, HEADER TRUE, DELIMITER ',', QUOTE '\"', ESCAPE '\"'";

/// Check if an error message indicates a file locking issue that should be retried
fn is_retryable_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    // Windows error messages
    lower.contains("being used by another process")
        || lower.contains("cannot access the file")
        // Unix/macOS error messages
        || lower.contains("resource temporarily unavailable")
        || lower.contains("database is locked")
        || lower.contains("file is already open")
        || lower.contains("could not set lock on file")
}

/// Quote a filesystem path as a SQL string literal
fn sql_path_literal(path: &Path) -> String {
    format!("'{}'", path.display().to_string().replace('\'', "''"))
}

/// DuckDB repository implementation
///
/// One repository wraps one connection; it is constructed once per run and
/// handed to every service.
pub struct DuckDbRepository {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl DuckDbRepository {
    /// Open (or create) the database at `db_path`
    ///
    /// For encrypted databases, uses DuckDB's ATTACH with ENCRYPTION_KEY.
    ///
    /// Includes retry logic with exponential backoff for file locking errors,
    /// which occur when another run holds the same database file.
    pub fn new(db_path: &Path, encryption_key: Option<&str>) -> Result<Self> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            match Self::try_open_connection(db_path, encryption_key) {
                Ok(conn) => {
                    tracing::debug!(path = %db_path.display(), "opened database");
                    return Ok(Self {
                        conn: Mutex::new(conn),
                        db_path: db_path.to_path_buf(),
                    });
                }
                Err(e) => {
                    let err_msg = e.to_string();
                    if is_retryable_error(&err_msg) && attempt < MAX_RETRIES - 1 {
                        let delay =
                            Duration::from_millis(INITIAL_RETRY_DELAY_MS * 2u64.pow(attempt));
                        tracing::warn!(
                            "Database busy, retrying in {}ms (attempt {}/{}): {}",
                            delay.as_millis(),
                            attempt + 1,
                            MAX_RETRIES,
                            err_msg
                        );
                        thread::sleep(delay);
                        last_error = Some(e);
                        continue;
                    }
                    return Err(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            Error::database(format!("Failed to open database after {} retries", MAX_RETRIES))
        }))
    }

    /// Attempt to open a database connection (called by new() with retry logic)
    fn try_open_connection(db_path: &Path, encryption_key: Option<&str>) -> Result<Connection> {
        // Extension autoloading stays off: everything needed is in the bundled build
        let config = duckdb::Config::default().enable_autoload_extension(false)?;

        let conn = if let Some(key) = encryption_key {
            // Encrypted database: open in-memory first, then ATTACH encrypted file
            let conn = Connection::open_in_memory_with_flags(config)?;
            conn.execute(
                &format!(
                    "ATTACH {} AS main_db (ENCRYPTION_KEY '{}')",
                    sql_path_literal(db_path),
                    key.replace('\'', "''")
                ),
                [],
            )?;
            conn.execute("USE main_db", [])?;
            conn
        } else {
            Connection::open_with_flags(db_path, config)?
        };

        Ok(conn)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| Error::database(format!("Lock poisoned: {}", e)))
    }

    // === Table lifecycle ===

    /// Create a table from its schema
    pub fn create_table<S: TableSchema>(&self, table: &Table<S>, mode: CreateMode) -> Result<()> {
        let conn = self.lock()?;
        conn.execute_batch(&table.create_sql(mode))?;
        Ok(())
    }

    /// Drop a table if it exists
    pub fn drop_table(&self, table_name: &str) -> Result<()> {
        validate_identifier(table_name)?;
        let conn = self.lock()?;
        conn.execute_batch(&format!("DROP TABLE IF EXISTS {}", table_name))?;
        Ok(())
    }

    /// Check if a table exists (temporary tables included)
    pub fn table_exists(&self, table_name: &str) -> Result<bool> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM information_schema.tables WHERE table_name = ?",
            [table_name],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Names of all visible tables, temporary ones included
    pub fn table_names(&self) -> Result<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt =
            conn.prepare("SELECT table_name FROM information_schema.tables ORDER BY table_name")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(names)
    }

    /// Column names of a table, in declared order
    pub fn table_columns(&self, table_name: &str) -> Result<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT column_name FROM information_schema.columns
             WHERE table_name = ?
             ORDER BY ordinal_position",
        )?;
        let columns = stmt
            .query_map([table_name], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(columns)
    }

    pub fn count_rows(&self, table_name: &str) -> Result<i64> {
        validate_identifier(table_name)?;
        let conn = self.lock()?;
        let count: i64 =
            conn.query_row(&format!("SELECT COUNT(*) FROM {}", table_name), [], |row| {
                row.get(0)
            })?;
        Ok(count)
    }

    /// Run raw SQL statements (fixtures, maintenance)
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        let conn = self.lock()?;
        conn.execute_batch(sql)?;
        Ok(())
    }

    // === Bulk copy ===

    /// `COPY <table> FROM <csv file>`; the file starts with a header line
    pub fn copy_from_csv(&self, table_name: &str, csv_path: &Path) -> Result<()> {
        validate_identifier(table_name)?;
        let conn = self.lock()?;
        conn.execute(
            &format!(
                "COPY {} FROM {} ({})",
                table_name,
                sql_path_literal(csv_path),
                CSV_COPY_OPTIONS
            ),
            [],
        )
        .map_err(|e| Error::bulk_transfer(format!("load into {}: {}", table_name, e)))?;
        Ok(())
    }

    /// `COPY <table> TO <csv file>`, header line first
    pub fn copy_to_csv(&self, table_name: &str, csv_path: &Path) -> Result<()> {
        validate_identifier(table_name)?;
        let conn = self.lock()?;
        conn.execute(
            &format!(
                "COPY {} TO {} ({})",
                table_name,
                sql_path_literal(csv_path),
                CSV_COPY_OPTIONS
            ),
            [],
        )
        .map_err(|e| Error::bulk_transfer(format!("unload from {}: {}", table_name, e)))?;
        Ok(())
    }

    // === Transactions ===

    /// Run `f` inside one transaction
    ///
    /// Commits when `f` returns `Ok`. On `Err`, or if `f` panics, the
    /// transaction is dropped uncommitted and DuckDB rolls it back.
    pub fn with_transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T>,
    {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction()
            .map_err(|e| Error::transaction(format!("cannot begin: {}", e)))?;

        let value = f(&tx)?;

        tx.commit()
            .map_err(|e| Error::transaction(format!("commit failed: {}", e)))?;
        Ok(value)
    }

    // === Typed records ===

    /// Insert bookings row by row in one transaction
    ///
    /// Only meant for small fixtures; runs load bookings through `COPY`.
    pub fn insert_bookings(&self, table: &Table<Booking>, bookings: &[Booking]) -> Result<usize> {
        let sql = format!(
            "INSERT INTO {} VALUES (CAST(? AS UUID), CAST(? AS UUID), ?, CAST(? AS UUID), ?,
                                   CAST(? AS DECIMAL(12, 2)), ?, ?, CAST(? AS DATE), ?)",
            table.name()
        );

        self.with_transaction(|tx| {
            let mut stmt = tx.prepare(&sql)?;
            for booking in bookings {
                stmt.execute(params![
                    booking.booking_id,
                    booking.restaurant_id,
                    booking.restaurant_name,
                    booking.client_id,
                    booking.client_name,
                    booking.amount.to_string(),
                    booking.currency.symbol().to_string(),
                    booking.guests,
                    booking.date.to_string(),
                    booking.country,
                ])?;
            }
            Ok(bookings.len())
        })
    }

    /// All report rows, ordered by `(restaurant_id, month)`
    pub fn get_report_rows(&self, table: &Table<ReportRow>) -> Result<Vec<ReportRow>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT CAST(restaurant_id AS VARCHAR), restaurant_name, country, \"month\",
                    number_of_bookings, number_of_guests, amount
             FROM {}
             ORDER BY restaurant_id, \"month\"",
            table.name()
        ))?;

        let rows = stmt
            .query_map([], |row| {
                Ok(ReportRow {
                    restaurant_id: row.get(0)?,
                    restaurant_name: row.get(1)?,
                    country: row.get(2)?,
                    month: row.get(3)?,
                    number_of_bookings: row.get(4)?,
                    number_of_guests: row.get(5)?,
                    amount: row.get(6)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open(dir: &TempDir) -> DuckDbRepository {
        DuckDbRepository::new(&dir.path().join("test.duckdb"), None).unwrap()
    }

    #[test]
    fn test_retryable_errors() {
        assert!(is_retryable_error("IO Error: Could not set lock on file \"x.duckdb\""));
        assert!(is_retryable_error("The process cannot access the file"));
        assert!(is_retryable_error("database is locked"));
        assert!(!is_retryable_error("Catalog Error: Table with name foo does not exist"));
    }

    #[test]
    fn test_sql_path_literal_escapes_quotes() {
        assert_eq!(sql_path_literal(Path::new("/tmp/o'brien.csv")), "'/tmp/o''brien.csv'");
    }

    #[test]
    fn test_create_and_drop_temporary_table() {
        let dir = TempDir::new().unwrap();
        let repo = open(&dir);
        let table = Table::<Booking>::new("bookings_tmp").unwrap();

        repo.create_table(&table, CreateMode::Temporary).unwrap();
        assert!(repo.table_exists("bookings_tmp").unwrap());
        assert_eq!(repo.table_columns("bookings_tmp").unwrap(), Booking::column_names());

        repo.drop_table("bookings_tmp").unwrap();
        assert!(!repo.table_exists("bookings_tmp").unwrap());

        // Dropping again is a no-op
        repo.drop_table("bookings_tmp").unwrap();
    }

    #[test]
    fn test_create_if_not_exists_keeps_rows() {
        let dir = TempDir::new().unwrap();
        let repo = open(&dir);
        let table = Table::<ReportRow>::new("report").unwrap();

        repo.create_table(&table, CreateMode::IfNotExists).unwrap();
        repo.execute_batch(
            "INSERT INTO report VALUES
             ('00000000-0000-0000-0000-000000000001', 'r', 'c', '2020-01', 1, 2, '£1.00')",
        )
        .unwrap();
        repo.create_table(&table, CreateMode::IfNotExists).unwrap();

        assert_eq!(repo.count_rows("report").unwrap(), 1);
        let rows = repo.get_report_rows(&table).unwrap();
        assert_eq!(rows[0].restaurant_id, "00000000-0000-0000-0000-000000000001");
        assert_eq!(rows[0].amount, "£1.00");
    }

    #[test]
    fn test_transaction_rolls_back_on_error() {
        let dir = TempDir::new().unwrap();
        let repo = open(&dir);
        repo.execute_batch("CREATE TABLE t (v INTEGER); INSERT INTO t VALUES (1)")
            .unwrap();

        let result: Result<()> = repo.with_transaction(|tx| {
            tx.execute("DELETE FROM t", [])?;
            Err(Error::integrity("forced"))
        });

        assert!(matches!(result, Err(Error::AggregationIntegrity(_))));
        assert_eq!(repo.count_rows("t").unwrap(), 1);
    }

    #[test]
    fn test_transaction_commits_on_success() {
        let dir = TempDir::new().unwrap();
        let repo = open(&dir);
        repo.execute_batch("CREATE TABLE t (v INTEGER)").unwrap();

        repo.with_transaction(|tx| {
            tx.execute("INSERT INTO t VALUES (1), (2)", [])?;
            Ok(())
        })
        .unwrap();

        assert_eq!(repo.count_rows("t").unwrap(), 2);
    }

    #[test]
    fn test_rejects_unsafe_table_names() {
        let dir = TempDir::new().unwrap();
        let repo = open(&dir);

        assert!(matches!(
            repo.drop_table("t; DROP TABLE x"),
            Err(Error::InvalidTableName(_))
        ));
        assert!(matches!(
            repo.count_rows("bad name"),
            Err(Error::InvalidTableName(_))
        ));
    }
}
