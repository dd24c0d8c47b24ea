//! SQLite-backed review state store.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::types::{ReviewDecision, ReviewError, ReviewRecord, ReviewStateStore};

/// SQLite-backed store for review decisions and the task-to-campaign map.
pub struct SqliteReviewStore {
    conn: Mutex<Connection>,
}

impl SqliteReviewStore {
    /// Create a new review store, creating the database file and tables
    /// if needed.
    pub fn new(path: &Path) -> Result<Self, ReviewError> {
        let conn = Connection::open(path).map_err(|e| ReviewError::Storage(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory review store (useful for testing).
    pub fn in_memory() -> Result<Self, ReviewError> {
        let conn =
            Connection::open_in_memory().map_err(|e| ReviewError::Storage(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), ReviewError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS task_reviews (
                task_id TEXT PRIMARY KEY,
                decision TEXT NOT NULL,
                reason TEXT,
                decided_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS task_campaigns (
                task_id TEXT PRIMARY KEY,
                campaign_id TEXT NOT NULL
            );
            "#,
        )
        .map_err(|e| ReviewError::Storage(e.to_string()))?;

        Ok(())
    }
}

impl ReviewStateStore for SqliteReviewStore {
    fn mark(
        &self,
        task_id: &str,
        decision: ReviewDecision,
        reason: Option<&str>,
    ) -> Result<(), ReviewError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR REPLACE INTO task_reviews (task_id, decision, reason, decided_at) \
             VALUES (?, ?, ?, ?)",
            params![task_id, decision.as_str(), reason, Utc::now().to_rfc3339()],
        )
        .map_err(|e| ReviewError::Storage(e.to_string()))?;
        Ok(())
    }

    fn get(&self, task_id: &str) -> Result<Option<ReviewRecord>, ReviewError> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT decision, reason, decided_at FROM task_reviews WHERE task_id = ?",
            params![task_id],
            |row| {
                let decision_str: String = row.get(0)?;
                let reason: Option<String> = row.get(1)?;
                let decided_at_str: String = row.get(2)?;
                Ok((decision_str, reason, decided_at_str))
            },
        )
        .optional()
        .map_err(|e| ReviewError::Storage(e.to_string()))?
        .map(|(decision_str, reason, decided_at_str)| {
            let decision = ReviewDecision::parse(&decision_str)
                .ok_or_else(|| ReviewError::Storage(format!("bad decision: {}", decision_str)))?;
            let decided_at = DateTime::parse_from_rfc3339(&decided_at_str)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now());
            Ok(ReviewRecord {
                task_id: task_id.to_string(),
                decision,
                reason,
                decided_at,
            })
        })
        .transpose()
    }

    fn remove(&self, task_id: &str) -> Result<(), ReviewError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "DELETE FROM task_reviews WHERE task_id = ?",
            params![task_id],
        )
        .map_err(|e| ReviewError::Storage(e.to_string()))?;
        Ok(())
    }

    fn remember_task(&self, task_id: &str, campaign_id: &str) -> Result<(), ReviewError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR REPLACE INTO task_campaigns (task_id, campaign_id) VALUES (?, ?)",
            params![task_id, campaign_id],
        )
        .map_err(|e| ReviewError::Storage(e.to_string()))?;
        Ok(())
    }

    fn campaign_for_task(&self, task_id: &str) -> Result<Option<String>, ReviewError> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT campaign_id FROM task_campaigns WHERE task_id = ?",
            params![task_id],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| ReviewError::Storage(e.to_string()))
    }
}
