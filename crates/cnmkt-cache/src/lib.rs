//! cnmkt-cache
//!
//! Durable year-keyed store of A-share trading days.
//!
//! # Contract
//! - A year is either present with its complete set of `MMDD` markers or
//!   absent entirely. There is no partial-year entry.
//! - The persisted file is replaced wholesale on every save; there is no
//!   incremental patching.
//! - Single writer per process. Concurrent processes writing the same file
//!   may clobber each other; callers are expected to serialize writes.

mod index;
mod store;

pub use index::{day_marker, is_valid_marker, TradingDayIndex};
pub use store::{CacheError, HolidayCacheStore, CACHE_FILE_NAME};
