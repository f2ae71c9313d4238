//! Core domain entities
//!
//! Booking and report records, the closed currency set, and the pure field
//! parsers that turn raw CSV text into typed values. No I/O happens here.

mod booking;
pub mod currency;
mod report;
pub mod result;

pub use booking::{parse_date, Booking, RawBooking};
pub use currency::{parse_amount_and_currency, Currency};
pub use report::ReportRow;
