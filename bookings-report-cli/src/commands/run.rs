//! Run command - refresh the report from a bookings file

use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;
use comfy_table::Table;

use super::{get_config, get_context, get_logger, log_event};
use crate::output;
use bookings_report_core::services::{events, LogEvent};
use bookings_report_core::{Error, RunSummary};

const COMMAND: &str = "run";

pub fn run(conf: &Path, bookings_file: &Path, out: Option<&Path>, json: bool) -> Result<()> {
    let config = get_config(conf)?;
    let logger = get_logger(&config);

    log_event(
        &logger,
        LogEvent::new(events::RUN_STARTED)
            .with_command(COMMAND)
            .with_input_file(bookings_file),
    );

    let result = get_context(config).and_then(|ctx| {
        ctx.pipeline
            .run(bookings_file, out)
            .with_context(|| format!("Failed to process {}", bookings_file.display()))
    });

    let summary = match result {
        Ok(summary) => {
            log_event(
                &logger,
                LogEvent::new(events::RUN_COMPLETED)
                    .with_command(COMMAND)
                    .with_input_file(bookings_file)
                    .with_counts(summary.bookings_loaded, summary.report_rows),
            );
            summary
        }
        Err(e) => {
            log_event(
                &logger,
                LogEvent::new(events::RUN_FAILED)
                    .with_command(COMMAND)
                    .with_input_file(bookings_file)
                    .with_error(e.root_cause().to_string())
                    .with_error_details(format!("{:#}", e)),
            );
            if e.downcast_ref::<Error>().is_some_and(Error::is_validation) {
                output::warning("The bookings file was rejected; the database was not modified.");
            }
            return Err(e);
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    print_summary(&summary);
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    output::success("Report refreshed");
    println!();

    let mut table = output::create_table();
    table.add_row(vec!["Bookings loaded", &summary.bookings_loaded.to_string()]);
    table.add_row(vec!["Report rows", &summary.report_rows.to_string()]);
    table.add_row(vec!["Staging table", &summary.staging_table]);
    add_output_row(&mut table, summary);
    println!("{}", table);

    if summary.bookings_loaded == 0 {
        println!();
        output::warning("The bookings file had no data lines; the report is now empty.");
    }
}

fn add_output_row(table: &mut Table, summary: &RunSummary) {
    let value = match &summary.output {
        Some(path) => path.display().to_string(),
        None => "(not exported)".dimmed().to_string(),
    };
    table.add_row(vec!["Output".to_string(), value]);
}
