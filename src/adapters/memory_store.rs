//! In-process snapshot store.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Duration, Utc};

use crate::domain::error::StocksimError;
use crate::domain::price_series::PriceSeries;
use crate::ports::snapshot_port::{SnapshotPort, DEFAULT_TTL_DAYS};

struct Entry {
    series: PriceSeries,
    expires_at: DateTime<Utc>,
}

pub struct MemorySnapshotStore {
    ttl: Duration,
    entries: RwLock<HashMap<String, Entry>>,
}

impl Default for MemorySnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::with_ttl(Duration::days(DEFAULT_TTL_DAYS))
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    fn poisoned() -> StocksimError {
        StocksimError::Database {
            reason: "snapshot store lock poisoned".into(),
        }
    }
}

impl SnapshotPort for MemorySnapshotStore {
    fn save(&self, series: &PriceSeries) -> Result<(), StocksimError> {
        let mut entries = self.entries.write().map_err(|_| Self::poisoned())?;
        entries.insert(
            series.instrument().to_string(),
            Entry {
                series: series.clone(),
                expires_at: Utc::now() + self.ttl,
            },
        );
        Ok(())
    }

    fn load(&self, instrument: &str) -> Result<Option<PriceSeries>, StocksimError> {
        let entries = self.entries.read().map_err(|_| Self::poisoned())?;
        let now = Utc::now();
        Ok(entries
            .get(instrument)
            .filter(|e| e.expires_at > now)
            .map(|e| e.series.clone()))
    }

    fn delete(&self, instrument: &str) -> Result<(), StocksimError> {
        if instrument.is_empty() {
            return Err(StocksimError::EmptyKey);
        }
        let mut entries = self.entries.write().map_err(|_| Self::poisoned())?;
        entries.remove(instrument);
        Ok(())
    }

    fn list(&self) -> Result<Vec<String>, StocksimError> {
        let entries = self.entries.read().map_err(|_| Self::poisoned())?;
        let now = Utc::now();
        let mut names: Vec<String> = entries
            .iter()
            .filter(|(_, e)| e.expires_at > now)
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        Ok(names)
    }
}
