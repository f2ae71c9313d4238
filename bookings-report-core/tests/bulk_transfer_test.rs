//! Bulk transfer tests against a real DuckDB file
//!
//! Run with: cargo test --test bulk_transfer_test -- --nocapture

use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use tempfile::TempDir;

use bookings_report_core::adapters::duckdb::DuckDbRepository;
use bookings_report_core::ports::{Column, CreateMode, Table, TableSchema};
use bookings_report_core::services::BulkTransferService;
use bookings_report_core::Error;

// ============================================================================
// Test Helpers
// ============================================================================

/// Three text columns, no key
struct Abc;

impl TableSchema for Abc {
    const COLUMNS: &'static [Column] = &[
        Column::new("a", "VARCHAR"),
        Column::new("b", "VARCHAR"),
        Column::new("c", "VARCHAR"),
    ];
    const PRIMARY_KEY: &'static [&'static str] = &[];
}

/// Typed columns: integer key, text, date and fixed-point amount
struct Ledger;

impl TableSchema for Ledger {
    const COLUMNS: &'static [Column] = &[
        Column::new("id", "INTEGER"),
        Column::new("label", "VARCHAR"),
        Column::new("day", "DATE"),
        Column::new("amount", "DECIMAL(12, 2)"),
    ];
    const PRIMARY_KEY: &'static [&'static str] = &["id"];
}

fn create_test_repo(temp_dir: &TempDir) -> Arc<DuckDbRepository> {
    let db_path = temp_dir.path().join("test.duckdb");
    Arc::new(DuckDbRepository::new(&db_path, None).expect("Failed to create repository"))
}

fn create_abc_table(repo: &DuckDbRepository, name: &str) -> Table<Abc> {
    let table = Table::<Abc>::new(name).unwrap();
    repo.create_table(&table, CreateMode::IfNotExists).unwrap();
    table
}

fn abc_csv(rows: usize) -> String {
    let mut csv = String::from("a,b,c\n");
    for i in 0..rows {
        csv.push_str(&format!("a{i},b{i},c{i}\n"));
    }
    csv
}

/// Amounts always carry two decimals, as the store writes DECIMAL(12, 2)
fn ledger_csv(rows: usize) -> String {
    let start = NaiveDate::from_ymd_opt(2015, 1, 1).unwrap();
    let mut csv = String::from("id,label,day,amount\n");
    for i in 0..rows {
        let day = start + Duration::days((i % 3650) as i64);
        csv.push_str(&format!(
            "{},label {},{},{}.{:02}\n",
            i,
            i,
            day.format("%Y-%m-%d"),
            i * 7,
            i % 100
        ));
    }
    csv
}

// ============================================================================
// Round Trip Tests
// ============================================================================

#[test]
fn test_load_then_unload_is_byte_identical() {
    let temp_dir = TempDir::new().unwrap();
    let repo = create_test_repo(&temp_dir);
    let service = BulkTransferService::new(Arc::clone(&repo));
    let table = create_abc_table(&repo, "abc");

    let input = abc_csv(50_000);
    service.load(input.as_bytes(), &table).unwrap();
    assert_eq!(repo.count_rows("abc").unwrap(), 50_000);

    let mut output = Vec::new();
    service.unload(&table, &mut output).unwrap();

    assert_eq!(output.len(), input.len());
    assert!(output == input.as_bytes(), "unloaded CSV differs from loaded CSV");
}

#[test]
fn test_typed_load_then_unload_is_byte_identical() {
    let temp_dir = TempDir::new().unwrap();
    let repo = create_test_repo(&temp_dir);
    let service = BulkTransferService::new(Arc::clone(&repo));
    let table = Table::<Ledger>::new("ledger").unwrap();
    repo.create_table(&table, CreateMode::IfNotExists).unwrap();

    let input = ledger_csv(50_000);
    service.load(input.as_bytes(), &table).unwrap();
    assert_eq!(repo.count_rows("ledger").unwrap(), 50_000);

    let mut output = Vec::new();
    service.unload(&table, &mut output).unwrap();
    let output = String::from_utf8(output).unwrap();

    assert_eq!(output.lines().nth(1), Some("0,label 0,2015-01-01,0.00"));
    assert_eq!(output.lines().count(), 50_001);
    assert!(output == input, "unloaded CSV differs from loaded CSV");
}

#[test]
fn test_unload_empty_table_writes_header() {
    let temp_dir = TempDir::new().unwrap();
    let repo = create_test_repo(&temp_dir);
    let service = BulkTransferService::new(Arc::clone(&repo));
    let table = create_abc_table(&repo, "abc");

    let mut output = Vec::new();
    service.unload(&table, &mut output).unwrap();

    assert_eq!(String::from_utf8(output).unwrap(), "a,b,c\n");
}

#[test]
fn test_quoted_values_survive_round_trip() {
    let temp_dir = TempDir::new().unwrap();
    let repo = create_test_repo(&temp_dir);
    let service = BulkTransferService::new(Arc::clone(&repo));
    let table = create_abc_table(&repo, "abc");

    let input = "a,b,c\n\"1,01 €\",\"say \"\"hi\"\"\",plain\n";
    service.load(input.as_bytes(), &table).unwrap();

    let mut output = Vec::new();
    service.unload(&table, &mut output).unwrap();

    assert_eq!(String::from_utf8(output).unwrap(), input);
}

// ============================================================================
// Failure Tests
// ============================================================================

#[test]
fn test_header_mismatch_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let repo = create_test_repo(&temp_dir);
    let service = BulkTransferService::new(Arc::clone(&repo));
    let table = create_abc_table(&repo, "abc");

    let err = service
        .load("a,c,b\nx,y,z\n".as_bytes(), &table)
        .unwrap_err();

    assert!(matches!(err, Error::BulkTransfer(_)), "got {:?}", err);
    assert_eq!(repo.count_rows("abc").unwrap(), 0);
}

#[test]
fn test_malformed_row_aborts_whole_load() {
    let temp_dir = TempDir::new().unwrap();
    let repo = create_test_repo(&temp_dir);
    let service = BulkTransferService::new(Arc::clone(&repo));
    let table = create_abc_table(&repo, "abc");

    let err = service
        .load("a,b,c\n1,2,3\n4,5\n".as_bytes(), &table)
        .unwrap_err();

    assert!(matches!(err, Error::BulkTransfer(_)), "got {:?}", err);
    assert_eq!(repo.count_rows("abc").unwrap(), 0);
}

#[test]
fn test_load_into_missing_table_fails() {
    let temp_dir = TempDir::new().unwrap();
    let repo = create_test_repo(&temp_dir);
    let service = BulkTransferService::new(Arc::clone(&repo));
    let table = Table::<Abc>::new("never_created").unwrap();

    let err = service.load(abc_csv(1).as_bytes(), &table).unwrap_err();
    assert!(matches!(err, Error::BulkTransfer(_)));
}
