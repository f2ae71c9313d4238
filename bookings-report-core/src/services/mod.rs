//! Service layer - pipeline orchestration
//!
//! Services share one `Arc<DuckDbRepository>` and each cover one stage of a
//! report run.

mod aggregate;
mod bulk_transfer;
pub mod logging;
mod pipeline;
mod transform;

pub use aggregate::{AggregationResult, AggregationService};
pub use bulk_transfer::BulkTransferService;
pub use logging::{events, LogEntry, LogEvent, LoggingService};
pub use pipeline::{ReportPipeline, RunSummary, STAGING_SUFFIX_LEN};
pub use transform::normalize_bookings;
