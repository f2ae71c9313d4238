//! Table port - explicit schemas and typed table handles
//!
//! Each record kind (bookings, report rows) declares its columns once through
//! [`TableSchema`]. A [`Table`] pairs such a schema with a concrete,
//! validated table name so that several physical tables (a run-scoped staging
//! table, the persistent report) can share one definition.

use std::fmt;
use std::marker::PhantomData;
use std::sync::OnceLock;

use regex::Regex;

use crate::domain::result::{Error, Result};

/// A column definition: name and DuckDB type. All columns are NOT NULL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub sql_type: &'static str,
}

impl Column {
    pub const fn new(name: &'static str, sql_type: &'static str) -> Self {
        Self { name, sql_type }
    }
}

/// Static schema of a record type
pub trait TableSchema {
    /// Columns in declared order. Bulk transfers rely on this order.
    const COLUMNS: &'static [Column];

    /// Primary key column names
    const PRIMARY_KEY: &'static [&'static str];

    fn column_names() -> Vec<&'static str> {
        Self::COLUMNS.iter().map(|c| c.name).collect()
    }
}

/// How a table is created
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateMode {
    /// Connection-scoped table, fails if the name is taken
    Temporary,
    /// Persistent table, left untouched if it already exists
    IfNotExists,
}

/// A named table holding records of type `S`
pub struct Table<S> {
    name: String,
    _schema: PhantomData<fn() -> S>,
}

impl<S: TableSchema> Table<S> {
    /// Create a handle for `name`, which must be a plain SQL identifier
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        validate_identifier(&name)?;
        Ok(Self {
            name,
            _schema: PhantomData,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn column_names(&self) -> Vec<&'static str> {
        S::column_names()
    }

    /// `CREATE TABLE` statement for this table
    pub fn create_sql(&self, mode: CreateMode) -> String {
        let prefix = match mode {
            CreateMode::Temporary => "CREATE TEMPORARY TABLE",
            CreateMode::IfNotExists => "CREATE TABLE IF NOT EXISTS",
        };

        let mut defs: Vec<String> = S::COLUMNS
            .iter()
            .map(|c| format!("\"{}\" {} NOT NULL", c.name, c.sql_type))
            .collect();

        if !S::PRIMARY_KEY.is_empty() {
            let key: Vec<String> = S::PRIMARY_KEY.iter().map(|k| format!("\"{}\"", k)).collect();
            defs.push(format!("PRIMARY KEY ({})", key.join(", ")));
        }

        format!("{} {} (\n    {}\n)", prefix, self.name, defs.join(",\n    "))
    }
}

impl<S> Clone for Table<S> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            _schema: PhantomData,
        }
    }
}

impl<S> fmt::Debug for Table<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Table").field("name", &self.name).finish()
    }
}

impl<S> fmt::Display for Table<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Table names are interpolated into SQL, so only plain identifiers pass
pub fn validate_identifier(name: &str) -> Result<()> {
    static IDENTIFIER: OnceLock<Regex> = OnceLock::new();
    let re = IDENTIFIER.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,62}$").expect("identifier pattern is valid")
    });

    if re.is_match(name) {
        Ok(())
    } else {
        Err(Error::InvalidTableName(name.to_string()))
    }
}
