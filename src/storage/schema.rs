//! Database schema definitions
//!
//! This module contains the SQL schema for the A11y-Scout history database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- One row per finished scan
CREATE TABLE IF NOT EXISTS scan_results (
    id TEXT PRIMARY KEY,
    task TEXT NOT NULL,
    url TEXT NOT NULL,
    ruleset TEXT NOT NULL,
    date TEXT NOT NULL,
    full_scan INTEGER NOT NULL,
    status TEXT NOT NULL,
    total_pages INTEGER NOT NULL,
    pages_scanned INTEGER NOT NULL,
    error_count INTEGER NOT NULL,
    warning_count INTEGER NOT NULL,
    notice_count INTEGER NOT NULL,
    error TEXT,
    pages TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_scan_results_date ON scan_results(date);
CREATE INDEX IF NOT EXISTS idx_scan_results_task ON scan_results(task);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
