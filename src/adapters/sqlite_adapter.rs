//! SQLite snapshot store.
//!
//! One row per instrument holding the JSON-encoded series and its expiry as
//! a unix timestamp.

use crate::domain::error::StocksimError;
use crate::domain::price_series::PriceSeries;
use crate::ports::config_port::ConfigPort;
use crate::ports::snapshot_port::{SnapshotPort, DEFAULT_TTL_DAYS};
use chrono::{Duration, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension};

pub struct SqliteAdapter {
    pool: Pool<SqliteConnectionManager>,
    ttl: Duration,
}

fn query_error(e: rusqlite::Error) -> StocksimError {
    StocksimError::DatabaseQuery {
        reason: e.to_string(),
    }
}

impl SqliteAdapter {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, StocksimError> {
        let db_path =
            config
                .get_string("store", "path")
                .ok_or_else(|| StocksimError::ConfigMissing {
                    section: "store".into(),
                    key: "path".into(),
                })?;

        let pool_size = config.get_int("store", "pool_size", 4) as u32;
        let ttl_days = config.get_int("store", "ttl_days", DEFAULT_TTL_DAYS);

        let manager = SqliteConnectionManager::file(&db_path);
        let pool =
            Pool::builder()
                .max_size(pool_size)
                .build(manager)
                .map_err(|e: r2d2::Error| StocksimError::Database {
                    reason: e.to_string(),
                })?;

        let adapter = Self {
            pool,
            ttl: Duration::days(ttl_days),
        };
        adapter.initialize_schema()?;
        Ok(adapter)
    }

    pub fn in_memory() -> Result<Self, StocksimError> {
        Self::in_memory_with_ttl(Duration::days(DEFAULT_TTL_DAYS))
    }

    pub fn in_memory_with_ttl(ttl: Duration) -> Result<Self, StocksimError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|e: r2d2::Error| StocksimError::Database {
                reason: e.to_string(),
            })?;

        let adapter = Self { pool, ttl };
        adapter.initialize_schema()?;
        Ok(adapter)
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, StocksimError> {
        self.pool
            .get()
            .map_err(|e: r2d2::Error| StocksimError::Database {
                reason: e.to_string(),
            })
    }

    pub fn initialize_schema(&self) -> Result<(), StocksimError> {
        self.conn()?
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS snapshots (
                    instrument TEXT PRIMARY KEY NOT NULL,
                    payload TEXT NOT NULL,
                    expires_at INTEGER NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_snapshots_expires ON snapshots(expires_at);",
            )
            .map_err(query_error)
    }

    /// Drop every expired row. Returns how many were removed.
    pub fn purge_expired(&self) -> Result<usize, StocksimError> {
        self.conn()?
            .execute(
                "DELETE FROM snapshots WHERE expires_at <= ?1",
                params![Utc::now().timestamp()],
            )
            .map_err(query_error)
    }
}

impl SnapshotPort for SqliteAdapter {
    fn save(&self, series: &PriceSeries) -> Result<(), StocksimError> {
        let payload = serde_json::to_string(series)?;
        let expires_at = (Utc::now() + self.ttl).timestamp();

        self.conn()?
            .execute(
                "INSERT OR REPLACE INTO snapshots (instrument, payload, expires_at)
                 VALUES (?1, ?2, ?3)",
                params![series.instrument(), payload, expires_at],
            )
            .map_err(query_error)?;
        Ok(())
    }

    fn load(&self, instrument: &str) -> Result<Option<PriceSeries>, StocksimError> {
        let payload: Option<String> = self
            .conn()?
            .query_row(
                "SELECT payload FROM snapshots WHERE instrument = ?1 AND expires_at > ?2",
                params![instrument, Utc::now().timestamp()],
                |row| row.get(0),
            )
            .optional()
            .map_err(query_error)?;

        match payload {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn delete(&self, instrument: &str) -> Result<(), StocksimError> {
        if instrument.is_empty() {
            return Err(StocksimError::EmptyKey);
        }
        self.conn()?
            .execute(
                "DELETE FROM snapshots WHERE instrument = ?1",
                params![instrument],
            )
            .map_err(query_error)?;
        Ok(())
    }

    fn list(&self) -> Result<Vec<String>, StocksimError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT instrument FROM snapshots WHERE expires_at > ?1 ORDER BY instrument")
            .map_err(query_error)?;

        let rows = stmt
            .query_map(params![Utc::now().timestamp()], |row| row.get(0))
            .map_err(query_error)?;

        let mut names = Vec::new();
        for row in rows {
            names.push(row.map_err(query_error)?);
        }
        Ok(names)
    }
}
