//! Adapter implementations
//!
//! Adapters bind the ports to concrete technologies. The only store is an
//! embedded DuckDB database file.

pub mod duckdb;
