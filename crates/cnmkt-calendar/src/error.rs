use std::fmt;

use chrono::NaiveDate;
use cnmkt_cache::CacheError;

#[derive(Debug)]
pub enum CalendarError {
    /// The cache location cannot be read or written at all.
    Storage(CacheError),
    /// The backward walk found no trading day within the lookback window.
    NoTradingDay { from: NaiveDate, lookback_days: u32 },
}

impl fmt::Display for CalendarError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CalendarError::Storage(e) => write!(f, "trading-day storage failure: {e}"),
            CalendarError::NoTradingDay {
                from,
                lookback_days,
            } => write!(
                f,
                "no trading day within {lookback_days} days on or before {from}"
            ),
        }
    }
}

impl std::error::Error for CalendarError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CalendarError::Storage(e) => Some(e),
            CalendarError::NoTradingDay { .. } => None,
        }
    }
}

impl From<CacheError> for CalendarError {
    fn from(e: CacheError) -> Self {
        CalendarError::Storage(e)
    }
}
