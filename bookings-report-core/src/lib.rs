//! Bookings Report Core - monthly restaurant bookings rollup
//!
//! This crate follows a hexagonal layout:
//!
//! - **domain**: Booking and report records, currencies, field parsers
//! - **ports**: Table schemas and typed table handles
//! - **services**: Bulk transfer, aggregation, pipeline, run journal
//! - **adapters**: The DuckDB repository

pub mod adapters;
pub mod config;
pub mod domain;
mod log_migrations;
pub mod ports;
pub mod services;

use std::sync::Arc;

use adapters::duckdb::DuckDbRepository;
use config::Config;
use ports::{CreateMode, Table};
use services::ReportPipeline;

// Re-export commonly used types at crate root
pub use domain::result::{Error, Result};
pub use domain::{Booking, Currency, ReportRow};
pub use services::RunSummary;

/// Main context for report operations
///
/// Holds the configuration, the database connection and the pipeline wired
/// to the configured tables. One context serves one run.
pub struct ReportContext {
    pub config: Config,
    pub repository: Arc<DuckDbRepository>,
    pub pipeline: ReportPipeline,
}

impl ReportContext {
    /// Open the configured database and build the pipeline
    pub fn new(config: Config) -> Result<Self> {
        if let Some(parent) = config.database.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let repository = Arc::new(DuckDbRepository::new(
            &config.database.path,
            config.database.encryption_key.as_deref(),
        )?);

        let report_table = Table::<ReportRow>::new(config.report.table.as_str())?;
        let pipeline = ReportPipeline::new(
            Arc::clone(&repository),
            report_table,
            config.staging.table_prefix.as_str(),
        );

        Ok(Self {
            config,
            repository,
            pipeline,
        })
    }

    pub fn report_table(&self) -> &Table<ReportRow> {
        self.pipeline.report_table()
    }

    /// Current report content, ordered by restaurant and month
    ///
    /// A database that never completed a run yields an empty report.
    pub fn current_report(&self) -> Result<Vec<ReportRow>> {
        self.repository
            .create_table(self.report_table(), CreateMode::IfNotExists)?;
        self.repository.get_report_rows(self.report_table())
    }
}
