//! Logs command - view the run journal

use std::path::Path;

use anyhow::{anyhow, Result};
use chrono::{Duration, Utc};
use colored::Colorize;

use super::{get_config, get_logger};
use crate::output;
use bookings_report_core::services::LogEntry;

fn format_timestamp(entry: &LogEntry) -> String {
    entry
        .time()
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| entry.timestamp.to_string())
}

fn format_count(count: Option<i64>) -> String {
    count.map(|c| c.to_string()).unwrap_or_default()
}

pub fn run(
    conf: &Path,
    limit: usize,
    errors: bool,
    prune_older_than_days: Option<u32>,
    json: bool,
) -> Result<()> {
    let config = get_config(conf)?;
    let service = get_logger(&config)
        .ok_or_else(|| anyhow!("Run journal unavailable in {}", config.data_dir().display()))?;

    if let Some(days) = prune_older_than_days {
        let cutoff = Duration::try_days(i64::from(days))
            .and_then(|age| Utc::now().checked_sub_signed(age))
            .ok_or_else(|| anyhow!("--prune-older-than-days {} is out of range", days))?;
        let deleted = service.delete_before(cutoff.timestamp_millis())?;

        if json {
            println!("{}", serde_json::json!({ "deleted": deleted }));
        } else {
            output::success(&format!("Deleted {} log entries older than {} days", deleted, days));
        }
        return Ok(());
    }

    let entries = if errors {
        service.get_errors(limit)?
    } else {
        service.get_recent(limit)?
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("No log entries found.");
        return Ok(());
    }

    let mut table = output::create_table();
    table.set_header(vec!["Time", "Event", "Command", "Input", "Bookings", "Rows", "Error"]);

    for entry in &entries {
        let event = if entry.error_message.is_some() {
            entry.event.red().to_string()
        } else {
            entry.event.clone()
        };

        table.add_row(vec![
            format_timestamp(entry),
            event,
            entry.command.clone().unwrap_or_default(),
            entry.input_file.clone().unwrap_or_default(),
            format_count(entry.bookings),
            format_count(entry.report_rows),
            entry.error_message.clone().unwrap_or_default(),
        ]);
    }

    println!("{}", table);
    println!();
    println!(
        "{}",
        format!(
            "Showing {} of {} entries. Journal: {}",
            entries.len(),
            service.count()?,
            service.db_path().display()
        )
        .dimmed()
    );

    Ok(())
}
