//! Shared fixture: an in-process provider serving a weekday calendar with a
//! small set of known A-share closures, plus a calendar wired to a temp dir.

#![allow(dead_code)]

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{Datelike, NaiveDate, Weekday};
use cnmkt_cache::{day_marker, HolidayCacheStore, TradingDayIndex};
use cnmkt_calendar::{build_calendar_with_provider, TradingCalendar};
use cnmkt_config::{CalendarConfig, LoadedConfig, RefetchScope};
use cnmkt_fetch::{ProviderError, TradingDayProvider};

/// Weekday closures used by the fixture (`YYYYMMDD`).
pub const CLOSURES: &[&str] = &[
    "20230102", // New Year (observed)
    "20240101", // New Year
    "20240209", // Spring Festival 2024: Fri 02-09 .. Fri 02-16
    "20240212",
    "20240213",
    "20240214",
    "20240215",
    "20240216",
];

pub fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

pub fn dt(y: i32, m: u32, day: u32, h: u32, min: u32) -> chrono::NaiveDateTime {
    d(y, m, day).and_hms_opt(h, min, 0).unwrap()
}

/// All weekdays of `year` minus [`CLOSURES`].
pub fn fixture_year(year: i32) -> BTreeSet<String> {
    let closures: BTreeSet<NaiveDate> = CLOSURES
        .iter()
        .map(|s| NaiveDate::parse_from_str(s, "%Y%m%d").unwrap())
        .collect();
    d(year, 1, 1)
        .iter_days()
        .take_while(|day| day.year() == year)
        .filter(|day| !matches!(day.weekday(), Weekday::Sat | Weekday::Sun))
        .filter(|day| !closures.contains(day))
        .map(day_marker)
        .collect()
}

pub fn fixture_index(years: impl IntoIterator<Item = i32>) -> TradingDayIndex {
    years.into_iter().map(|y| (y, fixture_year(y))).collect()
}

#[derive(Default)]
pub struct FixtureProvider {
    pub failing: BTreeSet<i32>,
    pub calls: AtomicUsize,
}

impl FixtureProvider {
    pub fn failing_all() -> Self {
        Self {
            failing: (1000..=3000).collect(),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl TradingDayProvider for FixtureProvider {
    fn source_name(&self) -> &'static str {
        "fixture"
    }

    async fn fetch_year(&self, year: i32) -> Result<BTreeSet<String>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(&year) {
            return Err(ProviderError::Transport("connection refused".to_string()));
        }
        Ok(fixture_year(year))
    }
}

pub fn config(dir: &Path, start_year: i32, scope: RefetchScope) -> CalendarConfig {
    CalendarConfig {
        cache_dir: Some(dir.to_path_buf()),
        start_year,
        refetch_scope: scope,
        ..CalendarConfig::default()
    }
}

pub fn calendar(cfg: &CalendarConfig, provider: &Arc<FixtureProvider>) -> TradingCalendar {
    let loaded = LoadedConfig::from_config(cfg.clone()).unwrap();
    build_calendar_with_provider(&loaded, provider.clone()).unwrap()
}

/// Seed the cache file directly, bypassing the provider.
pub fn seed_cache(dir: &Path, index: &TradingDayIndex) {
    HolidayCacheStore::new(dir).unwrap().save(index).unwrap();
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .with_test_writer()
        .try_init();
}
