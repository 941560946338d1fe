//! Price series snapshot store port.

use crate::domain::error::StocksimError;
use crate::domain::price_series::PriceSeries;

/// Default lifetime of a saved snapshot.
pub const DEFAULT_TTL_DAYS: i64 = 7;

/// Persists loaded series by instrument name with an expiry.
///
/// Expired snapshots behave exactly like missing ones.
pub trait SnapshotPort {
    fn save(&self, series: &PriceSeries) -> Result<(), StocksimError>;

    fn load(&self, instrument: &str) -> Result<Option<PriceSeries>, StocksimError>;

    /// Fails with [`StocksimError::EmptyKey`] if `instrument` is empty.
    fn delete(&self, instrument: &str) -> Result<(), StocksimError>;

    /// Names of every live snapshot, sorted.
    fn list(&self) -> Result<Vec<String>, StocksimError>;
}
