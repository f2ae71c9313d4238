//! CLI command implementations

pub mod logs;
pub mod run;
pub mod show;

use std::path::Path;

use anyhow::{Context, Result};
use bookings_report_core::config::Config;
use bookings_report_core::services::{LogEvent, LoggingService};
use bookings_report_core::ReportContext;

/// Load settings, with environment overrides applied
pub fn get_config(conf: &Path) -> Result<Config> {
    Config::load(conf).with_context(|| format!("Failed to load settings from {}", conf.display()))
}

/// Open the configured database
pub fn get_context(config: Config) -> Result<ReportContext> {
    let db_path = config.database.path.clone();
    ReportContext::new(config)
        .with_context(|| format!("Failed to open database {}", db_path.display()))
}

/// Run journal next to the database
///
/// Returns None if the journal cannot be opened; journaling never blocks a run.
pub fn get_logger(config: &Config) -> Option<LoggingService> {
    let dir = config.data_dir();
    std::fs::create_dir_all(&dir).ok()?;
    match LoggingService::new(&dir, env!("CARGO_PKG_VERSION")) {
        Ok(service) => Some(service),
        Err(e) => {
            tracing::warn!("run journal unavailable: {}", e);
            None
        }
    }
}

/// Log an event, ignoring any errors
pub fn log_event(logger: &Option<LoggingService>, event: LogEvent) {
    if let Some(l) = logger {
        if let Err(e) = l.log(event) {
            tracing::warn!("failed to write run journal: {}", e);
        }
    }
}
