//! Report pipeline - parse, stage, aggregate, export

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use super::aggregate::AggregationService;
use super::bulk_transfer::BulkTransferService;
use super::transform::normalize_bookings;
use crate::adapters::duckdb::DuckDbRepository;
use crate::domain::result::Result;
use crate::domain::{Booking, ReportRow};
use crate::ports::{CreateMode, Table};

/// Hex characters of the random staging table suffix
pub const STAGING_SUFFIX_LEN: usize = 10;

/// Outcome of one pipeline run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub staging_table: String,
    pub bookings_loaded: usize,
    pub report_rows: usize,
    pub output: Option<PathBuf>,
}

/// Run-scoped staging table, dropped when the guard goes out of scope
struct StagingTable {
    repository: Arc<DuckDbRepository>,
    table: Table<Booking>,
}

impl StagingTable {
    fn create(repository: Arc<DuckDbRepository>, prefix: &str) -> Result<Self> {
        let suffix = Uuid::new_v4().simple().to_string();
        let table = Table::new(format!("{}_{}", prefix, &suffix[..STAGING_SUFFIX_LEN]))?;

        repository.create_table(&table, CreateMode::Temporary)?;
        tracing::info!(table = table.name(), "created staging table");

        Ok(Self { repository, table })
    }
}

impl Drop for StagingTable {
    fn drop(&mut self) {
        match self.repository.drop_table(self.table.name()) {
            Ok(()) => tracing::info!(table = self.table.name(), "dropped staging table"),
            Err(e) => tracing::warn!(
                table = self.table.name(),
                "failed to drop staging table: {}",
                e
            ),
        }
    }
}

/// Sequences one full report refresh
pub struct ReportPipeline {
    repository: Arc<DuckDbRepository>,
    bulk: BulkTransferService,
    aggregation: AggregationService,
    report_table: Table<ReportRow>,
    staging_prefix: String,
}

impl ReportPipeline {
    pub fn new(
        repository: Arc<DuckDbRepository>,
        report_table: Table<ReportRow>,
        staging_prefix: impl Into<String>,
    ) -> Self {
        Self {
            bulk: BulkTransferService::new(Arc::clone(&repository)),
            aggregation: AggregationService::new(Arc::clone(&repository)),
            repository,
            report_table,
            staging_prefix: staging_prefix.into(),
        }
    }

    pub fn report_table(&self) -> &Table<ReportRow> {
        &self.report_table
    }

    /// Run the pipeline on a bookings file, optionally exporting the report
    pub fn run(&self, bookings_path: &Path, output_path: Option<&Path>) -> Result<RunSummary> {
        let input = BufReader::new(File::open(bookings_path)?);

        // The report is buffered so a failed run never leaves a partial file
        let mut report = Vec::new();
        let mut summary = self.run_with(input, output_path.map(|_| &mut report))?;

        if let Some(path) = output_path {
            let mut file = BufWriter::new(File::create(path)?);
            file.write_all(&report)?;
            file.flush()?;
            summary.output = Some(path.to_path_buf());
        }

        Ok(summary)
    }

    /// Run the pipeline on any reader; the report is unloaded to `output`
    /// when one is given
    pub fn run_with<R: Read, W: Write>(&self, input: R, output: Option<W>) -> Result<RunSummary> {
        // Parse everything before touching the database
        let mut normalized = Vec::new();
        let bookings_loaded = normalize_bookings(input, &mut normalized)?;
        tracing::info!(bookings = bookings_loaded, "parsed bookings");

        let staging = StagingTable::create(Arc::clone(&self.repository), &self.staging_prefix)?;

        self.bulk.load(normalized.as_slice(), &staging.table)?;

        self.repository
            .create_table(&self.report_table, CreateMode::IfNotExists)?;

        let aggregation = self.aggregation.aggregate(&staging.table, &self.report_table)?;

        if let Some(output) = output {
            self.bulk.unload(&self.report_table, output)?;
        }

        Ok(RunSummary {
            staging_table: staging.table.name().to_string(),
            bookings_loaded,
            report_rows: aggregation.report_rows,
            output: None,
        })
    }
}
