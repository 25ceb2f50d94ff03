//! cnmkt-fetch
//!
//! Batch retrieval of A-share trading days from a remote provider.
//!
//! # Batch contract
//! - One provider request per requested year.
//! - At most `max_concurrency` requests in flight; the rest queue on a
//!   semaphore until a permit frees.
//! - Each request is bounded by `request_timeout`.
//! - A failed year (transport, non-2xx, bad body, timeout) contributes
//!   nothing; the batch carries on and the caller sees the year absent.
//! - The driver awaits the whole batch once, then merges and (for
//!   [`HolidayFetcher`]) rewrites the cache file wholesale.

pub mod provider;

use std::collections::BTreeSet;
use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Datelike, Local};
use cnmkt_cache::{CacheError, HolidayCacheStore, TradingDayIndex};
use futures_util::future::join_all;
use tokio::sync::Semaphore;
use tracing::{info, warn};

pub use provider::{parse_markers, ProviderError, TonghuashunProvider, TradingDayProvider};

/// `start_year..=` the current local calendar year.
pub fn default_year_range(start_year: i32) -> RangeInclusive<i32> {
    start_year..=Local::now().year()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchSettings {
    pub max_concurrency: usize,
    pub request_timeout: Duration,
}

/// Fetch every year in `years` and union the successes into one index.
///
/// Never fails: per-year errors are logged and dropped.
pub async fn fetch_years(
    provider: &dyn TradingDayProvider,
    years: &BTreeSet<i32>,
    settings: FetchSettings,
) -> TradingDayIndex {
    // A zero-permit semaphore would park every request forever.
    let permits = Arc::new(Semaphore::new(settings.max_concurrency.max(1)));

    let tasks = years.iter().copied().map(|year| {
        let permits = Arc::clone(&permits);
        async move {
            let outcome = match permits.acquire_owned().await {
                Ok(_permit) => {
                    match tokio::time::timeout(settings.request_timeout, provider.fetch_year(year))
                        .await
                    {
                        Ok(res) => res,
                        Err(_) => Err(ProviderError::Timeout(settings.request_timeout)),
                    }
                }
                Err(closed) => Err(ProviderError::Transport(closed.to_string())),
            };
            (year, outcome)
        }
    });

    let mut index = TradingDayIndex::new();
    let mut failed = 0usize;
    for (year, outcome) in join_all(tasks).await {
        match outcome {
            Ok(markers) => {
                info!(year, days = markers.len(), source = provider.source_name(), "trading days fetched");
                index.insert_year(year, markers);
            }
            Err(e) => {
                failed += 1;
                warn!(year, source = provider.source_name(), error = %e, "trading days fetch failed");
            }
        }
    }

    info!(
        requested = years.len(),
        fetched = index.len(),
        failed,
        "trading-day fetch batch complete"
    );
    index
}

// ---------------------------------------------------------------------------
// HolidayFetcher
// ---------------------------------------------------------------------------

/// Provider + cache store: fetches a batch and persists the result.
#[derive(Clone)]
pub struct HolidayFetcher {
    provider: Arc<dyn TradingDayProvider>,
    store: HolidayCacheStore,
    settings: FetchSettings,
    start_year: i32,
}

impl std::fmt::Debug for HolidayFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HolidayFetcher")
            .field("provider", &self.provider.source_name())
            .field("store", &self.store)
            .field("settings", &self.settings)
            .field("start_year", &self.start_year)
            .finish()
    }
}

impl HolidayFetcher {
    pub fn new(
        provider: Arc<dyn TradingDayProvider>,
        store: HolidayCacheStore,
        settings: FetchSettings,
        start_year: i32,
    ) -> Self {
        Self {
            provider,
            store,
            settings,
            start_year,
        }
    }

    pub fn start_year(&self) -> i32 {
        self.start_year
    }

    pub fn store(&self) -> &HolidayCacheStore {
        &self.store
    }

    /// Fetch `years` and replace the cache file with exactly what came back.
    ///
    /// Only a storage failure is an error; failed years are simply absent.
    pub async fn fetch_years(&self, years: &BTreeSet<i32>) -> Result<TradingDayIndex, CacheError> {
        let index = fetch_years(self.provider.as_ref(), years, self.settings).await;
        if let Some(lost) = self.years_lost_to_empty_batch(&index) {
            warn!(
                lost_years = lost,
                requested = years.len(),
                "every year failed; replacing a populated trading-day cache with an empty one"
            );
        }
        self.store.save(&index)?;
        Ok(index)
    }

    /// Fetch `years` and merge them over `base` before saving, keeping the
    /// cached years that were not re-requested.
    pub async fn fetch_years_merged(
        &self,
        years: &BTreeSet<i32>,
        mut base: TradingDayIndex,
    ) -> Result<TradingDayIndex, CacheError> {
        let fetched = fetch_years(self.provider.as_ref(), years, self.settings).await;
        base.merge(fetched);
        self.store.save(&base)?;
        Ok(base)
    }

    /// Forced refresh of `start..=end`. `None` bounds default to the configured
    /// start year and the current calendar year.
    pub async fn fetch_all_holiday_days(
        &self,
        start_year: Option<i32>,
        end_year: Option<i32>,
    ) -> Result<TradingDayIndex, CacheError> {
        let default_range = default_year_range(self.start_year);
        let start = start_year.unwrap_or(*default_range.start());
        let end = end_year.unwrap_or(*default_range.end());
        let years: BTreeSet<i32> = (start..=end).collect();
        self.fetch_years(&years).await
    }

    /// Number of cached years an empty `next` would wipe out, if any.
    fn years_lost_to_empty_batch(&self, next: &TradingDayIndex) -> Option<usize> {
        if !next.is_empty() {
            return None;
        }
        match self.store.load() {
            Ok(prev) if !prev.is_empty() => Some(prev.len()),
            _ => None,
        }
    }
}
