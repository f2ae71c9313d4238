//! Monthly report domain model

use serde::{Deserialize, Serialize};

use crate::ports::{Column, TableSchema};

/// One row of the monthly restaurant report
///
/// Keyed by `(restaurant_id, month)`. `amount` is already rendered for
/// display in the restaurant's currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRow {
    pub restaurant_id: String,
    pub restaurant_name: String,
    pub country: String,
    /// `YYYY-MM`
    pub month: String,
    pub number_of_bookings: i64,
    pub number_of_guests: i64,
    pub amount: String,
}

impl ReportRow {
    pub fn key(&self) -> (&str, &str) {
        (&self.restaurant_id, &self.month)
    }
}

impl TableSchema for ReportRow {
    const COLUMNS: &'static [Column] = &[
        Column::new("restaurant_id", "UUID"),
        Column::new("restaurant_name", "VARCHAR"),
        Column::new("country", "VARCHAR"),
        Column::new("month", "VARCHAR"),
        Column::new("number_of_bookings", "BIGINT"),
        Column::new("number_of_guests", "BIGINT"),
        Column::new("amount", "VARCHAR"),
    ];

    const PRIMARY_KEY: &'static [&'static str] = &["restaurant_id", "month"];
}
