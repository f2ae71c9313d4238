//! Run journal migrations - embedded SQL files
//!
//! Compiled into the binary with include_str! and applied in name order.

/// All log migrations as (filename, sql_content)
///
/// When adding a migration, create `NNN_description.sql` and append it here.
pub const LOG_MIGRATIONS: &[(&str, &str)] = &[
    ("000_migrations.sql", include_str!("000_migrations.sql")),
    (
        "001_initial_schema.sql",
        include_str!("001_initial_schema.sql"),
    ),
];
