//! Port definitions
//!
//! Ports define the shapes the services work against. Table schemas are
//! declared here once per record kind and shared by every table of that kind.

mod table;

pub use table::{validate_identifier, Column, CreateMode, Table, TableSchema};
