//! Show command - print the current report

use std::path::Path;

use anyhow::Result;
use colored::Colorize;

use super::{get_config, get_context};
use crate::output;

pub fn run(conf: &Path, json: bool) -> Result<()> {
    let ctx = get_context(get_config(conf)?)?;
    let rows = ctx.current_report()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    if rows.is_empty() {
        output::info("The report is empty. Refresh it with `bookings-report run <file>`.");
        return Ok(());
    }

    println!(
        "{}",
        format!(
            "Report {} in {}",
            ctx.report_table(),
            ctx.repository.db_path().display()
        )
        .bold()
    );
    println!();

    let mut table = output::create_table();
    table.set_header(vec![
        "Restaurant",
        "Name",
        "Country",
        "Month",
        "Bookings",
        "Guests",
        "Amount",
    ]);

    for row in &rows {
        table.add_row(vec![
            row.restaurant_id.clone(),
            row.restaurant_name.clone(),
            row.country.clone(),
            row.month.clone(),
            row.number_of_bookings.to_string(),
            row.number_of_guests.to_string(),
            row.amount.clone(),
        ]);
    }

    println!("{}", table);
    Ok(())
}
