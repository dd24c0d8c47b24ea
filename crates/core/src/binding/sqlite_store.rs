//! SQLite-backed binding store implementation.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use crate::content::{ContentKind, ContentRef};
use crate::marketplace::CampaignStatus;

use super::{
    BindingError, BindingFilter, BindingPatch, BindingStore, CampaignBinding, RemotePair,
};

/// SQLite-backed binding store.
pub struct SqliteBindingStore {
    conn: Mutex<Connection>,
}

impl SqliteBindingStore {
    /// Create a new SQLite binding store, creating the database file and
    /// tables if needed.
    pub fn new(path: &Path) -> Result<Self, BindingError> {
        let conn = Connection::open(path).map_err(|e| BindingError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite binding store (useful for testing).
    pub fn in_memory() -> Result<Self, BindingError> {
        let conn =
            Connection::open_in_memory().map_err(|e| BindingError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), BindingError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS bindings (
                entity_kind TEXT NOT NULL,
                website_id TEXT NOT NULL,
                entity_id TEXT NOT NULL,
                desired_enabled INTEGER NOT NULL DEFAULT 0,
                campaign_id TEXT,
                template_id TEXT,
                target_positions INTEGER NOT NULL,
                remote_status TEXT NOT NULL,
                last_synced_at TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (entity_kind, website_id, entity_id)
            );

            CREATE INDEX IF NOT EXISTS idx_bindings_enabled ON bindings(desired_enabled);
            CREATE INDEX IF NOT EXISTS idx_bindings_campaign ON bindings(campaign_id);
            "#,
        )
        .map_err(|e| BindingError::Database(e.to_string()))?;

        Ok(())
    }

    fn row_to_binding(row: &rusqlite::Row) -> rusqlite::Result<CampaignBinding> {
        let kind_str: String = row.get(0)?;
        let website_id: String = row.get(1)?;
        let entity_id: String = row.get(2)?;
        let desired_enabled: bool = row.get(3)?;
        let campaign_id: Option<String> = row.get(4)?;
        let template_id: Option<String> = row.get(5)?;
        let target_positions: u32 = row.get(6)?;
        let remote_status_str: String = row.get(7)?;
        let last_synced_at_str: Option<String> = row.get(8)?;
        let created_at_str: String = row.get(9)?;
        let updated_at_str: String = row.get(10)?;

        let kind = ContentKind::parse(&kind_str).unwrap_or(ContentKind::Page);

        let remote_status = serde_json::from_str::<CampaignStatus>(&format!(
            "\"{}\"",
            remote_status_str
        ))
        .unwrap_or(CampaignStatus::Unknown);

        let parse_ts = |s: &str| {
            DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now())
        };

        Ok(CampaignBinding {
            entity: ContentRef::new(kind, website_id, entity_id),
            desired_enabled,
            campaign_id,
            template_id,
            target_positions,
            remote_status,
            last_synced_at: last_synced_at_str.as_deref().map(parse_ts),
            created_at: parse_ts(&created_at_str),
            updated_at: parse_ts(&updated_at_str),
        })
    }

    fn build_where_clause(filter: &BindingFilter) -> (String, Vec<Box<dyn rusqlite::ToSql>>) {
        let mut conditions = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(enabled) = filter.enabled {
            conditions.push("desired_enabled = ?");
            params.push(Box::new(enabled));
        }

        if let Some(kind) = filter.kind {
            conditions.push("entity_kind = ?");
            params.push(Box::new(kind.as_str().to_string()));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        (where_clause, params)
    }

    const SELECT_COLUMNS: &'static str = "entity_kind, website_id, entity_id, desired_enabled, \
         campaign_id, template_id, target_positions, remote_status, \
         last_synced_at, created_at, updated_at";
}

impl BindingStore for SqliteBindingStore {
    fn get(&self, entity: &ContentRef) -> Result<Option<CampaignBinding>, BindingError> {
        let conn = self.conn.lock().unwrap();
        let sql = format!(
            "SELECT {} FROM bindings WHERE entity_kind = ? AND website_id = ? AND entity_id = ?",
            Self::SELECT_COLUMNS
        );
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| BindingError::Database(e.to_string()))?;

        let mut rows = stmt
            .query_map(
                params![entity.kind.as_str(), entity.website_id, entity.entity_id],
                Self::row_to_binding,
            )
            .map_err(|e| BindingError::Database(e.to_string()))?;

        match rows.next() {
            Some(row) => Ok(Some(row.map_err(|e| BindingError::Database(e.to_string()))?)),
            None => Ok(None),
        }
    }

    fn get_or_create(
        &self,
        entity: &ContentRef,
        positions: u32,
    ) -> Result<CampaignBinding, BindingError> {
        if let Some(existing) = self.get(entity)? {
            return Ok(existing);
        }

        let now = Utc::now();
        let binding = CampaignBinding {
            entity: entity.clone(),
            desired_enabled: false,
            campaign_id: None,
            template_id: None,
            target_positions: positions,
            remote_status: CampaignStatus::Unknown,
            last_synced_at: None,
            created_at: now,
            updated_at: now,
        };

        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR IGNORE INTO bindings (entity_kind, website_id, entity_id, desired_enabled, \
             campaign_id, template_id, target_positions, remote_status, last_synced_at, \
             created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                entity.kind.as_str(),
                entity.website_id,
                entity.entity_id,
                false,
                Option::<String>::None,
                Option::<String>::None,
                positions,
                binding.remote_status.as_str(),
                Option::<String>::None,
                now.to_rfc3339(),
                now.to_rfc3339(),
            ],
        )
        .map_err(|e| BindingError::Database(e.to_string()))?;

        Ok(binding)
    }

    fn list(&self, filter: &BindingFilter) -> Result<Vec<CampaignBinding>, BindingError> {
        let conn = self.conn.lock().unwrap();
        let (where_clause, mut sql_params) = Self::build_where_clause(filter);

        let sql = format!(
            "SELECT {} FROM bindings {} ORDER BY updated_at DESC LIMIT ? OFFSET ?",
            Self::SELECT_COLUMNS,
            where_clause
        );
        sql_params.push(Box::new(filter.limit));
        sql_params.push(Box::new(filter.offset));

        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| BindingError::Database(e.to_string()))?;

        let rows = stmt
            .query_map(
                rusqlite::params_from_iter(sql_params.iter().map(|p| p.as_ref())),
                Self::row_to_binding,
            )
            .map_err(|e| BindingError::Database(e.to_string()))?;

        let mut bindings = Vec::new();
        for row in rows {
            bindings.push(row.map_err(|e| BindingError::Database(e.to_string()))?);
        }
        Ok(bindings)
    }

    fn count(&self, filter: &BindingFilter) -> Result<i64, BindingError> {
        let conn = self.conn.lock().unwrap();
        let (where_clause, sql_params) = Self::build_where_clause(filter);

        let sql = format!("SELECT COUNT(*) FROM bindings {}", where_clause);
        let count: i64 = conn
            .query_row(
                &sql,
                rusqlite::params_from_iter(sql_params.iter().map(|p| p.as_ref())),
                |row| row.get(0),
            )
            .map_err(|e| BindingError::Database(e.to_string()))?;

        Ok(count)
    }

    fn apply(
        &self,
        entity: &ContentRef,
        patch: BindingPatch,
    ) -> Result<CampaignBinding, BindingError> {
        if !patch.is_empty() {
            let mut sets: Vec<&str> = Vec::new();
            let mut values: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

            if let Some(enabled) = patch.desired_enabled {
                sets.push("desired_enabled = ?");
                values.push(Box::new(enabled));
            }
            if let Some(ref pair) = patch.remote_pair {
                sets.push("campaign_id = ?");
                sets.push("template_id = ?");
                match pair {
                    Some(p) => {
                        values.push(Box::new(p.campaign_id.clone()));
                        values.push(Box::new(p.template_id.clone()));
                    }
                    None => {
                        values.push(Box::new(Option::<String>::None));
                        values.push(Box::new(Option::<String>::None));
                    }
                }
            }
            if let Some(positions) = patch.target_positions {
                sets.push("target_positions = ?");
                values.push(Box::new(positions));
            }
            if let Some(status) = patch.remote_status {
                sets.push("remote_status = ?");
                values.push(Box::new(status.as_str().to_string()));
            }
            if let Some(at) = patch.last_synced_at {
                sets.push("last_synced_at = ?");
                values.push(Box::new(at.to_rfc3339()));
            }

            sets.push("updated_at = ?");
            values.push(Box::new(Utc::now().to_rfc3339()));

            values.push(Box::new(entity.kind.as_str().to_string()));
            values.push(Box::new(entity.website_id.clone()));
            values.push(Box::new(entity.entity_id.clone()));

            let sql = format!(
                "UPDATE bindings SET {} WHERE entity_kind = ? AND website_id = ? AND entity_id = ?",
                sets.join(", ")
            );

            let conn = self.conn.lock().unwrap();
            let changed = conn
                .execute(
                    &sql,
                    rusqlite::params_from_iter(values.iter().map(|p| p.as_ref())),
                )
                .map_err(|e| BindingError::Database(e.to_string()))?;

            if changed == 0 {
                return Err(BindingError::NotFound(entity.key()));
            }
        }

        self.get(entity)?
            .ok_or_else(|| BindingError::NotFound(entity.key()))
    }
}
