//! Market data retrieval port trait.

use crate::domain::error::TickerCompareError;
use crate::domain::ohlcv::{Interval, Period, PriceTable};

/// Provider of historical price tables.
///
/// An empty table is a valid answer; the normalizer turns it into a
/// "no data" failure envelope.
pub trait MarketDataPort {
    fn fetch_table(
        &self,
        symbol: &str,
        period: Period,
        interval: Interval,
    ) -> Result<PriceTable, TickerCompareError>;
}
