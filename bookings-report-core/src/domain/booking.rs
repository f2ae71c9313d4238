//! Booking domain model

use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::currency::{parse_amount_and_currency, Currency};
use super::result::{Error, Result};
use crate::ports::{Column, TableSchema};

/// Date formats accepted in raw booking files, tried in order (day first)
const DATE_FORMATS: [&str; 2] = ["%d-%m-%Y", "%d/%m/%Y"];

/// A normalized booking, as stored in the staging table
///
/// Field order matches the staging table's column order, which is also the
/// order used when the record is serialized to CSV for bulk loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub booking_id: String,
    pub restaurant_id: String,
    pub restaurant_name: String,
    pub client_id: String,
    pub client_name: String,
    pub amount: Decimal,
    pub currency: Currency,
    pub guests: u32,
    pub date: NaiveDate,
    pub country: String,
}

/// A booking as found in the input file, before amount and date parsing
#[derive(Debug, Clone, Deserialize)]
pub struct RawBooking {
    pub booking_id: String,
    pub restaurant_id: String,
    pub restaurant_name: String,
    pub client_id: String,
    pub client_name: String,
    pub amount: String,
    /// Overwritten by the currency parsed out of `amount`
    #[serde(default)]
    pub currency: Option<String>,
    pub guests: u32,
    pub date: String,
    pub country: String,
}

impl TryFrom<RawBooking> for Booking {
    type Error = Error;

    fn try_from(raw: RawBooking) -> Result<Self> {
        let (amount, currency) = parse_amount_and_currency(&raw.amount)?;
        let date = parse_date(&raw.date)?;

        Ok(Self {
            booking_id: raw.booking_id,
            restaurant_id: raw.restaurant_id,
            restaurant_name: raw.restaurant_name,
            client_id: raw.client_id,
            client_name: raw.client_name,
            amount,
            currency,
            guests: raw.guests,
            date,
            country: raw.country,
        })
    }
}

impl TableSchema for Booking {
    const COLUMNS: &'static [Column] = &[
        Column::new("booking_id", "UUID"),
        Column::new("restaurant_id", "UUID"),
        Column::new("restaurant_name", "VARCHAR"),
        Column::new("client_id", "UUID"),
        Column::new("client_name", "VARCHAR"),
        Column::new("amount", "DECIMAL(12, 2)"),
        Column::new("currency", "VARCHAR"),
        Column::new("guests", "UINTEGER"),
        Column::new("date", "DATE"),
        Column::new("country", "VARCHAR"),
    ];

    const PRIMARY_KEY: &'static [&'static str] = &["booking_id"];
}

/// Parse `21-03-2015` and `21/03/2015` formatted dates indifferently
///
/// The year must have exactly four digits; chrono alone would read `21-03-15`
/// as the year 15.
pub fn parse_date(raw_date: &str) -> Result<NaiveDate> {
    static DATE_SHAPE: OnceLock<Regex> = OnceLock::new();
    let shape = DATE_SHAPE.get_or_init(|| {
        Regex::new(r"^\d{1,2}[-/]\d{1,2}[-/]\d{4}$").expect("date pattern is valid")
    });

    let raw = raw_date.trim();
    if !shape.is_match(raw) {
        return Err(Error::UnrecognizedDate(raw.to_string()));
    }

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .ok_or_else(|| Error::UnrecognizedDate(raw.to_string()))
}
