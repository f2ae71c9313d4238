//! Record normalization - raw booking CSV to staging-ready CSV

use std::io::{Read, Write};

use crate::domain::result::{Error, Result};
use crate::domain::{Booking, RawBooking};
use crate::ports::TableSchema;

/// Normalize a raw bookings CSV stream
///
/// Rows are matched by header name, so the input columns may come in any
/// order. The output starts with the staging table's header followed by one
/// line per booking in staging column order. Returns the number of bookings
/// written. Stops at the first invalid record.
pub fn normalize_bookings<R: Read, W: Write>(input: R, output: W) -> Result<usize> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::Headers)
        .from_reader(input);
    let headers = reader.headers()?.clone();

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(output);
    writer.write_record(Booking::column_names())?;

    let mut record = csv::StringRecord::new();
    let mut count = 0;
    while reader.read_record(&mut record)? {
        // Data lines are numbered from 1, the header excluded
        let line = record
            .position()
            .map(|p| p.line().saturating_sub(1))
            .unwrap_or(count as u64 + 1);

        let booking = record
            .deserialize::<RawBooking>(Some(&headers))
            .map_err(Error::from)
            .and_then(Booking::try_from)
            .map_err(|e| Error::InvalidRecord {
                line,
                source: Box::new(e),
            })?;

        writer.serialize(&booking)?;
        count += 1;
    }

    writer.flush()?;
    Ok(count)
}
