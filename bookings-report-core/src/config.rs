//! Configuration management
//!
//! Settings live in a JSON file:
//! ```json
//! {
//!   "database": { "path": "bookings.duckdb", "encryptionKey": null },
//!   "report": { "table": "monthly_restaurant_report" },
//!   "staging": { "tablePrefix": "bookings" }
//! }
//! ```
//! Every section and field is optional.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::result::{Error, Result};
use crate::ports::validate_identifier;
use crate::services::STAGING_SUFFIX_LEN;

/// Overrides the database path
pub const ENV_DB_PATH: &str = "BOOKINGS_REPORT_DB";
/// Overrides the database encryption key
pub const ENV_DB_KEY: &str = "BOOKINGS_REPORT_DB_KEY";

const DEFAULT_DB_PATH: &str = "bookings.duckdb";
const DEFAULT_REPORT_TABLE: &str = "monthly_restaurant_report";
const DEFAULT_STAGING_PREFIX: &str = "bookings";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DatabaseSettings {
    pub path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encryption_key: Option<String>,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_DB_PATH),
            encryption_key: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReportSettings {
    pub table: String,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            table: DEFAULT_REPORT_TABLE.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StagingSettings {
    pub table_prefix: String,
}

impl Default for StagingSettings {
    fn default() -> Self {
        Self {
            table_prefix: DEFAULT_STAGING_PREFIX.to_string(),
        }
    }
}

/// Bookings report configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub database: DatabaseSettings,
    pub report: ReportSettings,
    pub staging: StagingSettings,
}

impl Config {
    /// Load settings from `settings_path`, then apply environment overrides
    ///
    /// A missing file yields the defaults. A file that exists but cannot be
    /// parsed is an error. A relative database path resolves against the
    /// directory holding the settings file.
    pub fn load(settings_path: &Path) -> Result<Self> {
        Self::load_with_overrides(
            settings_path,
            std::env::var(ENV_DB_PATH).ok(),
            std::env::var(ENV_DB_KEY).ok(),
        )
    }

    /// `load` with explicit override values instead of the environment
    ///
    /// Only the path from the file is resolved against the settings
    /// directory; an overriding path is used as given.
    pub fn load_with_overrides(
        settings_path: &Path,
        db_path: Option<String>,
        db_key: Option<String>,
    ) -> Result<Self> {
        let mut config = if settings_path.exists() {
            let content = std::fs::read_to_string(settings_path)?;
            serde_json::from_str::<Config>(&content).map_err(|e| {
                Error::config(format!("{}: {}", settings_path.display(), e))
            })?
        } else {
            tracing::debug!(path = %settings_path.display(), "no settings file, using defaults");
            Config::default()
        };

        let base = settings_path.parent().unwrap_or_else(|| Path::new(""));
        config.resolve_paths(base);
        config.apply_overrides(db_path, db_key);
        config.validate()?;

        Ok(config)
    }

    /// Apply override values, typically read from the environment
    pub fn apply_overrides(&mut self, db_path: Option<String>, db_key: Option<String>) {
        if let Some(path) = db_path.filter(|p| !p.is_empty()) {
            self.database.path = PathBuf::from(path);
        }
        if let Some(key) = db_key.filter(|k| !k.is_empty()) {
            self.database.encryption_key = Some(key);
        }
    }

    /// Make a relative database path relative to `base`
    pub fn resolve_paths(&mut self, base: &Path) {
        if self.database.path.is_relative() {
            self.database.path = base.join(&self.database.path);
        }
    }

    /// Table names end up in SQL, so they are checked up front
    pub fn validate(&self) -> Result<()> {
        validate_identifier(&self.report.table)
            .map_err(|_| Error::config(format!("invalid report table '{}'", self.report.table)))?;
        // Staging tables are named <prefix>_<suffix>, so the full name must fit
        let staging_name = format!(
            "{}_{}",
            self.staging.table_prefix,
            "0".repeat(STAGING_SUFFIX_LEN)
        );
        validate_identifier(&staging_name).map_err(|_| {
            Error::config(format!(
                "invalid staging table prefix '{}'",
                self.staging.table_prefix
            ))
        })?;
        Ok(())
    }

    /// Directory holding the database; the run journal lives there too
    pub fn data_dir(&self) -> PathBuf {
        match self.database.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }
}
