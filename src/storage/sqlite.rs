//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the ResultStore trait.
//! Page results are stored as a JSON column next to the summary columns.

use crate::state::ScanId;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{ResultStore, StorageError, StorageResult};
use crate::storage::{ScanResult, ScanStatus};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

const SELECT_COLUMNS: &str = "SELECT id, url, ruleset, date, full_scan, status, total_pages, \
     pages_scanned, error_count, warning_count, notice_count, error, pages FROM scan_results";

/// SQLite storage backend
#[derive(Debug)]
pub struct SqliteResultStore {
    conn: Mutex<Connection>,
}

impl SqliteResultStore {
    /// Opens or creates the database at `path`
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn query_results(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> StorageResult<Vec<ScanResult>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
            .query_map(params, StoredRow::read)?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter().map(StoredRow::into_result).collect()
    }
}

impl ResultStore for SqliteResultStore {
    fn insert(&self, result: &ScanResult) -> StorageResult<()> {
        let pages = serde_json::to_string(&result.pages)?;
        let date = result.date.to_rfc3339_opts(SecondsFormat::Micros, true);

        let inserted = self.conn().execute(
            "INSERT INTO scan_results (id, task, url, ruleset, date, full_scan, status,
             total_pages, pages_scanned, error_count, warning_count, notice_count, error, pages)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                result.id.to_string(),
                result.task(),
                result.url,
                result.ruleset,
                date,
                result.full_scan,
                result.status.to_db_string(),
                result.total_pages as i64,
                result.pages_scanned as i64,
                result.error_count as i64,
                result.warning_count as i64,
                result.notice_count as i64,
                result.error,
                pages,
            ],
        );

        match inserted {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
                Err(StorageError::Duplicate(result.id))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn find_all(&self) -> StorageResult<Vec<ScanResult>> {
        self.query_results(
            &format!("{} ORDER BY date DESC, rowid DESC", SELECT_COLUMNS),
            [],
        )
    }

    fn find_by_id(&self, id: &ScanId) -> StorageResult<Option<ScanResult>> {
        let row = {
            let conn = self.conn();
            conn.query_row(
                &format!("{} WHERE id = ?1", SELECT_COLUMNS),
                params![id.to_string()],
                StoredRow::read,
            )
            .optional()?
        };

        row.map(StoredRow::into_result).transpose()
    }

    fn find_by_task(&self, task: &str) -> StorageResult<Vec<ScanResult>> {
        self.query_results(
            &format!(
                "{} WHERE task = ?1 ORDER BY date DESC, rowid DESC",
                SELECT_COLUMNS
            ),
            params![task.to_lowercase()],
        )
    }

    fn delete_all(&self) -> StorageResult<u64> {
        let deleted = self.conn().execute("DELETE FROM scan_results", [])?;
        Ok(deleted as u64)
    }

    fn delete_by_id(&self, id: &ScanId) -> StorageResult<u64> {
        let deleted = self.conn().execute(
            "DELETE FROM scan_results WHERE id = ?1",
            params![id.to_string()],
        )?;
        Ok(deleted as u64)
    }

    fn count(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn()
            .query_row("SELECT COUNT(*) FROM scan_results", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

/// A row as read from SQLite, before decoding
struct StoredRow {
    id: String,
    url: String,
    ruleset: String,
    date: String,
    full_scan: bool,
    status: String,
    total_pages: i64,
    pages_scanned: i64,
    error_count: i64,
    warning_count: i64,
    notice_count: i64,
    error: Option<String>,
    pages: String,
}

impl StoredRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            url: row.get(1)?,
            ruleset: row.get(2)?,
            date: row.get(3)?,
            full_scan: row.get(4)?,
            status: row.get(5)?,
            total_pages: row.get(6)?,
            pages_scanned: row.get(7)?,
            error_count: row.get(8)?,
            warning_count: row.get(9)?,
            notice_count: row.get(10)?,
            error: row.get(11)?,
            pages: row.get(12)?,
        })
    }

    fn into_result(self) -> StorageResult<ScanResult> {
        let corrupt = |message: String| StorageError::Corrupt {
            id: self.id.clone(),
            message,
        };

        let id = self
            .id
            .parse::<ScanId>()
            .map_err(|e| corrupt(format!("invalid id: {}", e)))?;
        let date = DateTime::parse_from_rfc3339(&self.date)
            .map_err(|e| corrupt(format!("invalid date: {}", e)))?
            .with_timezone(&Utc);
        let status = ScanStatus::from_db_string(&self.status)
            .ok_or_else(|| corrupt(format!("unknown status '{}'", self.status)))?;
        let pages = serde_json::from_str(&self.pages)?;

        Ok(ScanResult {
            id,
            url: self.url,
            ruleset: self.ruleset,
            date,
            full_scan: self.full_scan,
            status,
            total_pages: self.total_pages.max(0) as usize,
            pages_scanned: self.pages_scanned.max(0) as usize,
            error_count: self.error_count.max(0) as usize,
            warning_count: self.warning_count.max(0) as usize,
            notice_count: self.notice_count.max(0) as usize,
            pages,
            error: self.error,
        })
    }
}
