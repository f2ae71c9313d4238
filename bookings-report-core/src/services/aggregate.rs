//! Aggregation service - monthly restaurant rollup
//!
//! Replaces the whole report table with a fresh rollup of a bookings table.
//! The delete, the grouping query and the inserts share one transaction, so
//! readers only ever see the previous report or the new one.

use std::collections::HashSet;
use std::str::FromStr;
use std::sync::Arc;

use duckdb::{params, Transaction};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::adapters::duckdb::DuckDbRepository;
use crate::domain::result::{Error, Result};
use crate::domain::{Booking, Currency, ReportRow};
use crate::ports::Table;

/// One `(restaurant, month, currency)` group as returned by the store
#[derive(Debug)]
struct MonthlyGroup {
    restaurant_id: String,
    restaurant_name: String,
    country: String,
    month: String,
    currency: String,
    /// Exact decimal sum, as text
    amount: String,
    number_of_bookings: i64,
    number_of_guests: i64,
}

impl MonthlyGroup {
    /// Render the group's amount in its currency
    fn into_report_row(self) -> Result<ReportRow> {
        let currency = Currency::from_symbol(&self.currency).ok_or_else(|| {
            Error::integrity(format!(
                "unrecognized currency '{}' for restaurant {} in {}",
                self.currency, self.restaurant_id, self.month
            ))
        })?;

        let amount = Decimal::from_str(&self.amount).map_err(|e| {
            Error::integrity(format!(
                "invalid summed amount '{}' for restaurant {} in {}: {}",
                self.amount, self.restaurant_id, self.month, e
            ))
        })?;

        Ok(ReportRow {
            restaurant_id: self.restaurant_id,
            restaurant_name: self.restaurant_name,
            country: self.country,
            month: self.month,
            number_of_bookings: self.number_of_bookings,
            number_of_guests: self.number_of_guests,
            amount: currency.render(&amount),
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AggregationResult {
    /// Rows now in the report table
    pub report_rows: usize,
}

/// Aggregation service
pub struct AggregationService {
    repository: Arc<DuckDbRepository>,
}

impl AggregationService {
    pub fn new(repository: Arc<DuckDbRepository>) -> Self {
        Self { repository }
    }

    /// Replace `destination` with the monthly rollup of `source`
    ///
    /// On any error the transaction rolls back and `destination` keeps its
    /// previous content.
    pub fn aggregate(
        &self,
        source: &Table<Booking>,
        destination: &Table<ReportRow>,
    ) -> Result<AggregationResult> {
        let result = self.repository.with_transaction(|tx| {
            tx.execute(&format!("DELETE FROM {}", destination.name()), [])
                .map_err(write_error)?;

            let groups = query_monthly_groups(tx, source)?;
            let rows = groups
                .into_iter()
                .map(MonthlyGroup::into_report_row)
                .collect::<Result<Vec<_>>>()?;

            check_unique_keys(&rows)?;
            insert_report_rows(tx, destination, &rows)?;

            Ok(AggregationResult {
                report_rows: rows.len(),
            })
        });

        match &result {
            Ok(r) => tracing::info!(
                source = source.name(),
                destination = destination.name(),
                rows = r.report_rows,
                "report replaced"
            ),
            Err(e) => tracing::warn!(
                destination = destination.name(),
                "aggregation rolled back: {}",
                e
            ),
        }

        result
    }
}

fn query_monthly_groups(tx: &Transaction<'_>, source: &Table<Booking>) -> Result<Vec<MonthlyGroup>> {
    let sql = format!(
        "SELECT CAST(restaurant_id AS VARCHAR) AS restaurant_id,
                restaurant_name,
                country,
                strftime(\"date\", '%Y-%m') AS \"month\",
                currency,
                CAST(SUM(amount) AS VARCHAR) AS amount,
                COUNT(*) AS number_of_bookings,
                CAST(SUM(guests) AS BIGINT) AS number_of_guests
         FROM {}
         GROUP BY 1, 2, 3, 4, 5
         ORDER BY 1, 4, 5",
        source.name()
    );

    let mut stmt = tx.prepare(&sql).map_err(read_error)?;
    let groups = stmt
        .query_map([], |row| {
            Ok(MonthlyGroup {
                restaurant_id: row.get(0)?,
                restaurant_name: row.get(1)?,
                country: row.get(2)?,
                month: row.get(3)?,
                currency: row.get(4)?,
                amount: row.get(5)?,
                number_of_bookings: row.get(6)?,
                number_of_guests: row.get(7)?,
            })
        })
        .map_err(read_error)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(read_error)?;

    Ok(groups)
}

/// The report holds one amount per `(restaurant_id, month)`: two currencies
/// for the same restaurant and month cannot be represented.
fn check_unique_keys(rows: &[ReportRow]) -> Result<()> {
    let mut seen = HashSet::with_capacity(rows.len());
    for row in rows {
        if !seen.insert(row.key()) {
            return Err(Error::integrity(format!(
                "restaurant {} has more than one report row for {} (mixed currencies or names)",
                row.restaurant_id, row.month
            )));
        }
    }
    Ok(())
}

fn insert_report_rows(
    tx: &Transaction<'_>,
    destination: &Table<ReportRow>,
    rows: &[ReportRow],
) -> Result<()> {
    let columns: Vec<String> = destination
        .column_names()
        .iter()
        .map(|c| format!("\"{}\"", c))
        .collect();

    let mut stmt = tx
        .prepare(&format!(
            "INSERT INTO {} ({}) VALUES (CAST(? AS UUID), ?, ?, ?, ?, ?, ?)",
            destination.name(),
            columns.join(", ")
        ))
        .map_err(write_error)?;

    for row in rows {
        stmt.execute(params![
            row.restaurant_id,
            row.restaurant_name,
            row.country,
            row.month,
            row.number_of_bookings,
            row.number_of_guests,
            row.amount,
        ])
        .map_err(write_error)?;
    }
    Ok(())
}

fn read_error(err: duckdb::Error) -> Error {
    Error::transaction(err.to_string())
}

/// Constraint failures on the report are integrity violations; anything else
/// is a plain transaction failure
fn write_error(err: duckdb::Error) -> Error {
    let msg = err.to_string();
    if msg.contains("Constraint Error") {
        Error::integrity(msg)
    } else {
        Error::transaction(msg)
    }
}
