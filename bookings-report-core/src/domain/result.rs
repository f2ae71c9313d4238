//! Result and error types for the core library

use thiserror::Error;

/// Core library error type
#[derive(Error, Debug)]
pub enum Error {
    #[error("Cannot parse amount '{0}': unrecognized currency")]
    UnrecognizedCurrency(String),

    #[error("Cannot parse amount '{raw}': unrecognized amount '{amount}'")]
    UnrecognizedAmount { raw: String, amount: String },

    #[error("Cannot parse date '{0}' as '%d-%m-%Y' or '%d/%m/%Y'")]
    UnrecognizedDate(String),

    #[error("Invalid booking on line {line}: {source}")]
    InvalidRecord {
        line: u64,
        #[source]
        source: Box<Error>,
    },

    #[error("Bulk transfer failed: {0}")]
    BulkTransfer(String),

    #[error("Aggregation integrity violation: {0}")]
    AggregationIntegrity(String),

    #[error("Transaction failed: {0}")]
    Transaction(String),

    #[error("Invalid table name: '{0}'")]
    InvalidTableName(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a database error
    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    /// Create a bulk transfer error
    pub fn bulk_transfer(msg: impl Into<String>) -> Self {
        Self::BulkTransfer(msg.into())
    }

    /// Create an aggregation integrity error
    pub fn integrity(msg: impl Into<String>) -> Self {
        Self::AggregationIntegrity(msg.into())
    }

    /// Create a transaction error
    pub fn transaction(msg: impl Into<String>) -> Self {
        Self::Transaction(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether this error is an input validation failure (bad CSV content)
    pub fn is_validation(&self) -> bool {
        match self {
            Self::UnrecognizedCurrency(_)
            | Self::UnrecognizedAmount { .. }
            | Self::UnrecognizedDate(_) => true,
            Self::InvalidRecord { source, .. } => source.is_validation(),
            _ => false,
        }
    }
}

impl From<duckdb::Error> for Error {
    fn from(err: duckdb::Error) -> Self {
        Self::Database(err.to_string())
    }
}

/// Core library result type
pub type Result<T> = std::result::Result<T, Error>;
