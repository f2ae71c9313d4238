//! Aggregation tests against a real DuckDB file
//!
//! Run with: cargo test --test aggregate_test -- --nocapture

use std::str::FromStr;
use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tempfile::TempDir;
use uuid::Uuid;

use bookings_report_core::adapters::duckdb::DuckDbRepository;
use bookings_report_core::ports::{CreateMode, Table};
use bookings_report_core::services::AggregationService;
use bookings_report_core::{Booking, Currency, Error, ReportRow};

const RESTAURANT_1: &str = "00000000-0000-4000-8000-000000000001";
const RESTAURANT_2: &str = "00000000-0000-4000-8000-000000000002";

// ============================================================================
// Test Helpers
// ============================================================================

struct Fixture {
    _temp_dir: TempDir,
    repo: Arc<DuckDbRepository>,
    service: AggregationService,
    staging: Table<Booking>,
    report: Table<ReportRow>,
}

fn setup() -> Fixture {
    let temp_dir = TempDir::new().unwrap();
    let repo = Arc::new(
        DuckDbRepository::new(&temp_dir.path().join("test.duckdb"), None)
            .expect("Failed to create repository"),
    );

    let staging = Table::<Booking>::new("bookings_test").unwrap();
    let report = Table::<ReportRow>::new("monthly_restaurant_report").unwrap();
    repo.create_table(&staging, CreateMode::Temporary).unwrap();
    repo.create_table(&report, CreateMode::IfNotExists).unwrap();

    Fixture {
        service: AggregationService::new(Arc::clone(&repo)),
        _temp_dir: temp_dir,
        repo,
        staging,
        report,
    }
}

fn booking(restaurant_id: &str, amount: &str, currency: Currency, guests: u32, date: &str) -> Booking {
    let name = if restaurant_id == RESTAURANT_1 { "restaurant 1" } else { "restaurant 2" };
    Booking {
        booking_id: Uuid::new_v4().to_string(),
        restaurant_id: restaurant_id.to_string(),
        restaurant_name: name.to_string(),
        client_id: Uuid::new_v4().to_string(),
        client_name: "client".to_string(),
        amount: Decimal::from_str(amount).unwrap(),
        currency,
        guests,
        date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
        country: "country".to_string(),
    }
}

fn seed_report_row(fx: &Fixture) {
    fx.repo
        .execute_batch(&format!(
            "INSERT INTO {} VALUES ('{}', 'seeded', 'country', '1999-12', 1, 1, '£0.01')",
            fx.report.name(),
            RESTAURANT_2
        ))
        .unwrap();
}

fn assert_only_seeded_row(fx: &Fixture) {
    let rows = fx.repo.get_report_rows(&fx.report).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].restaurant_name, "seeded");
    assert_eq!(rows[0].month, "1999-12");
    assert_eq!(rows[0].amount, "£0.01");
}

// ============================================================================
// Grouping Tests
// ============================================================================

#[test]
fn test_groups_by_restaurant_and_month() {
    let fx = setup();
    let bookings = vec![
        booking(RESTAURANT_1, "1.01", Currency::Euro, 1, "2020-01-14"),
        booking(RESTAURANT_1, "2.02", Currency::Euro, 2, "2020-01-12"),
        booking(RESTAURANT_1, "3.03", Currency::Euro, 3, "2020-02-01"),
        booking(RESTAURANT_1, "4.04", Currency::Euro, 4, "2020-02-28"),
        booking(RESTAURANT_2, "5.55", Currency::Pound, 5, "2020-01-01"),
        booking(RESTAURANT_2, "6.66", Currency::Pound, 6, "2020-01-15"),
        booking(RESTAURANT_2, "7.77", Currency::Pound, 7, "2020-01-31"),
        booking(RESTAURANT_2, "8.88", Currency::Pound, 8, "2020-02-02"),
    ];
    fx.repo.insert_bookings(&fx.staging, &bookings).unwrap();

    let result = fx.service.aggregate(&fx.staging, &fx.report).unwrap();
    assert_eq!(result.report_rows, 4);

    let rows = fx.repo.get_report_rows(&fx.report).unwrap();
    let summary: Vec<(&str, &str, i64, i64, &str)> = rows
        .iter()
        .map(|r| {
            (
                r.restaurant_id.as_str(),
                r.month.as_str(),
                r.number_of_bookings,
                r.number_of_guests,
                r.amount.as_str(),
            )
        })
        .collect();

    assert_eq!(
        summary,
        vec![
            (RESTAURANT_1, "2020-01", 2, 3, "3,03 €"),
            (RESTAURANT_1, "2020-02", 2, 7, "7,07 €"),
            (RESTAURANT_2, "2020-01", 3, 18, "£19.98"),
            (RESTAURANT_2, "2020-02", 1, 8, "£8.88"),
        ]
    );
    assert_eq!(rows[0].restaurant_name, "restaurant 1");
    assert_eq!(rows[0].country, "country");
}

#[test]
fn test_rerun_replaces_previous_report() {
    let fx = setup();
    seed_report_row(&fx);
    fx.repo
        .insert_bookings(
            &fx.staging,
            &[booking(RESTAURANT_1, "1.50", Currency::Pound, 2, "2021-06-30")],
        )
        .unwrap();

    fx.service.aggregate(&fx.staging, &fx.report).unwrap();
    fx.service.aggregate(&fx.staging, &fx.report).unwrap();

    let rows = fx.repo.get_report_rows(&fx.report).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].month, "2021-06");
    assert_eq!(rows[0].amount, "£1.50");
}

#[test]
fn test_empty_source_empties_report() {
    let fx = setup();
    seed_report_row(&fx);

    let result = fx.service.aggregate(&fx.staging, &fx.report).unwrap();

    assert_eq!(result.report_rows, 0);
    assert_eq!(fx.repo.count_rows(fx.report.name()).unwrap(), 0);
}

// ============================================================================
// Atomicity Tests
// ============================================================================

#[test]
fn test_unknown_currency_keeps_previous_report() {
    let fx = setup();
    seed_report_row(&fx);
    fx.repo
        .insert_bookings(
            &fx.staging,
            &[booking(RESTAURANT_1, "1.00", Currency::Euro, 1, "2020-01-01")],
        )
        .unwrap();
    fx.repo
        .execute_batch(&format!(
            "INSERT INTO {} VALUES ('{}', '{}', 'restaurant 2', '{}', 'client', 9.99, '$', 1, DATE '2020-01-02', 'country')",
            fx.staging.name(),
            Uuid::new_v4(),
            RESTAURANT_2,
            Uuid::new_v4()
        ))
        .unwrap();

    let err = fx.service.aggregate(&fx.staging, &fx.report).unwrap_err();

    assert!(matches!(err, Error::AggregationIntegrity(_)), "got {:?}", err);
    assert!(err.to_string().contains('$'));
    assert_only_seeded_row(&fx);
}

#[test]
fn test_currency_collision_keeps_previous_report() {
    let fx = setup();
    seed_report_row(&fx);
    fx.repo
        .insert_bookings(
            &fx.staging,
            &[
                booking(RESTAURANT_1, "1.00", Currency::Euro, 1, "2020-03-01"),
                booking(RESTAURANT_1, "2.00", Currency::Pound, 1, "2020-03-02"),
            ],
        )
        .unwrap();

    let err = fx.service.aggregate(&fx.staging, &fx.report).unwrap_err();

    assert!(matches!(err, Error::AggregationIntegrity(_)), "got {:?}", err);
    assert_only_seeded_row(&fx);
}

#[test]
fn test_missing_source_is_transaction_error() {
    let fx = setup();
    seed_report_row(&fx);
    let missing = Table::<Booking>::new("no_such_bookings").unwrap();

    let err = fx.service.aggregate(&missing, &fx.report).unwrap_err();

    assert!(matches!(err, Error::Transaction(_)), "got {:?}", err);
    assert_only_seeded_row(&fx);
}
