use std::collections::BTreeSet;
use std::sync::{Mutex, PoisonError};

use chrono::{Datelike, Local, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use cnmkt_cache::{CacheError, HolidayCacheStore, TradingDayIndex};
use cnmkt_config::{CalendarConfig, RefetchScope};
use cnmkt_fetch::{default_year_range, HolidayFetcher};
use tracing::{debug, info, warn};

use crate::error::CalendarError;

/// Reference point for [`TradingCalendar::latest_trading_day_at`].
///
/// A bare date means midnight of that date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceInstant {
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl ReferenceInstant {
    pub fn to_datetime(self) -> NaiveDateTime {
        match self {
            ReferenceInstant::Date(d) => d.and_time(NaiveTime::MIN),
            ReferenceInstant::DateTime(dt) => dt,
        }
    }
}

impl From<NaiveDate> for ReferenceInstant {
    fn from(d: NaiveDate) -> Self {
        ReferenceInstant::Date(d)
    }
}

impl From<NaiveDateTime> for ReferenceInstant {
    fn from(dt: NaiveDateTime) -> Self {
        ReferenceInstant::DateTime(dt)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OracleSettings {
    /// Before this hour, today is not yet the latest trading day.
    pub cutoff_hour: u32,
    /// Bound on the backward walk, in calendar days from the reference date.
    pub lookback_days: u32,
    pub refetch_scope: RefetchScope,
}

impl From<&CalendarConfig> for OracleSettings {
    fn from(config: &CalendarConfig) -> Self {
        Self {
            cutoff_hour: config.cutoff_hour,
            lookback_days: config.lookback_days,
            refetch_scope: config.refetch_scope,
        }
    }
}

/// Cache-first trading-day oracle.
///
/// Every query reloads the cache file wholesale. A year missing from a
/// readable cache triggers at most one fetch per process; later misses for
/// the same year answer "not a trading day" straight away until
/// [`TradingCalendar::fetch_all_holiday_days`] is called. A cache file that
/// is gone or unparseable is re-fetched regardless.
#[derive(Debug)]
pub struct TradingCalendar {
    store: HolidayCacheStore,
    fetcher: HolidayFetcher,
    settings: OracleSettings,
    attempted: Mutex<BTreeSet<i32>>,
}

impl TradingCalendar {
    pub fn new(fetcher: HolidayFetcher, settings: OracleSettings) -> Self {
        Self {
            store: fetcher.store().clone(),
            fetcher,
            settings,
            attempted: Mutex::new(BTreeSet::new()),
        }
    }

    pub fn settings(&self) -> OracleSettings {
        self.settings
    }

    pub async fn is_trading_day(&self, date: NaiveDate) -> Result<bool, CalendarError> {
        let index = self.index_covering(date.year()).await?;
        match index.lookup(date) {
            Some(trading) => Ok(trading),
            None => {
                debug!(%date, "year unavailable; treating as non-trading");
                Ok(false)
            }
        }
    }

    /// Latest trading day relative to the current local time.
    pub async fn latest_trading_day(&self) -> Result<NaiveDate, CalendarError> {
        self.latest_trading_day_at(Local::now().naive_local()).await
    }

    /// Latest trading day on or before `reference`. If the reference falls
    /// before the cutoff hour and its own date is a trading day, that date
    /// is skipped and the walk continues from the day before.
    pub async fn latest_trading_day_at(
        &self,
        reference: impl Into<ReferenceInstant>,
    ) -> Result<NaiveDate, CalendarError> {
        let now = reference.into().to_datetime();
        let today = now.date();

        let mut latest = self.walk_back(today, today).await?;
        if now.hour() < self.settings.cutoff_hour && latest == today {
            let before = today.pred_opt().ok_or(CalendarError::NoTradingDay {
                from: today,
                lookback_days: self.settings.lookback_days,
            })?;
            latest = self.walk_back(before, today).await?;
        }
        Ok(latest)
    }

    /// Forced refresh; replaces the cache with the fetched years and clears
    /// the per-process miss memo.
    pub async fn fetch_all_holiday_days(
        &self,
        start_year: Option<i32>,
        end_year: Option<i32>,
    ) -> Result<TradingDayIndex, CalendarError> {
        self.attempted_years().clear();
        Ok(self
            .fetcher
            .fetch_all_holiday_days(start_year, end_year)
            .await?)
    }

    async fn walk_back(&self, from: NaiveDate, origin: NaiveDate) -> Result<NaiveDate, CalendarError> {
        let exhausted = CalendarError::NoTradingDay {
            from: origin,
            lookback_days: self.settings.lookback_days,
        };
        let mut day = from;
        loop {
            if (origin - day).num_days() > i64::from(self.settings.lookback_days) {
                return Err(exhausted);
            }
            if self.is_trading_day(day).await? {
                return Ok(day);
            }
            day = match day.pred_opt() {
                Some(prev) => prev,
                None => return Err(exhausted),
            };
        }
    }

    /// Load the cache; fetch if `year` is absent and has not been tried yet.
    async fn index_covering(&self, year: i32) -> Result<TradingDayIndex, CalendarError> {
        let cached = match self.store.load() {
            Ok(index) => Some(index),
            Err(e @ CacheError::Missing { .. }) => {
                info!(error = %e, "no trading-day cache yet");
                None
            }
            Err(e @ CacheError::Corrupt { .. }) => {
                warn!(error = %e, "discarding corrupt trading-day cache");
                None
            }
            Err(e) => return Err(CalendarError::Storage(e)),
        };

        // The memo only short-circuits a readable cache that lacks the year.
        // A missing or corrupt file is always re-fetched.
        if let Some(index) = cached.as_ref() {
            if index.contains_year(year) || self.attempted_years().contains(&year) {
                return Ok(index.clone());
            }
        }

        let index = match self.settings.refetch_scope {
            RefetchScope::FullRange => {
                let years: BTreeSet<i32> = default_year_range(self.fetcher.start_year()).collect();
                info!(
                    year,
                    from = ?years.first(),
                    to = ?years.last(),
                    "trading-day cache miss; fetching full range"
                );
                self.mark_attempted(years.iter().copied().chain([year]));
                self.fetcher.fetch_years(&years).await?
            }
            RefetchScope::MissingYears => {
                info!(year, "trading-day cache miss; fetching missing year");
                self.mark_attempted([year]);
                let years = BTreeSet::from([year]);
                self.fetcher
                    .fetch_years_merged(&years, cached.unwrap_or_default())
                    .await?
            }
        };
        Ok(index)
    }

    fn mark_attempted(&self, years: impl IntoIterator<Item = i32>) {
        self.attempted_years().extend(years);
    }

    fn attempted_years(&self) -> std::sync::MutexGuard<'_, BTreeSet<i32>> {
        // The memo holds no invariant a panicking holder could break.
        self.attempted.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
