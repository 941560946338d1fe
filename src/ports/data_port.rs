//! Raw price history provider port.

use crate::domain::error::StocksimError;
use crate::domain::price_series::Observation;

pub trait DataPort {
    /// Ordered observations for `instrument` covering `period` at `interval`
    /// granularity (e.g. `"7d"` of `"1m"` bars).
    ///
    /// Fails with [`StocksimError::DataUnavailable`] when the source has
    /// nothing for the request.
    fn load(
        &self,
        instrument: &str,
        period: &str,
        interval: &str,
    ) -> Result<Vec<Observation>, StocksimError>;
}
