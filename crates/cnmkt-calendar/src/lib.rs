//! cnmkt-calendar
//!
//! A-share trading-day oracle: "is this date a trading day" and "what is the
//! latest trading day", answered from the local cache and backed by the
//! remote provider on a cache miss.
//!
//! Data gaps never surface as errors: a year the provider cannot supply
//! answers "not a trading day". Only a broken cache location (cannot read or
//! write at all) is reported, as [`CalendarError::Storage`].

mod error;
mod oracle;

pub use error::CalendarError;
pub use oracle::{OracleSettings, ReferenceInstant, TradingCalendar};

use std::sync::Arc;

use anyhow::{Context, Result};
use cnmkt_cache::HolidayCacheStore;
use cnmkt_config::LoadedConfig;
use cnmkt_fetch::{FetchSettings, HolidayFetcher, TonghuashunProvider, TradingDayProvider};
use tracing::info;

/// Wire a [`TradingCalendar`] against the 10jqka provider.
pub fn build_calendar(loaded: &LoadedConfig) -> Result<TradingCalendar> {
    let config = &loaded.config;
    let provider = TonghuashunProvider::new(
        config.provider_base_url.clone(),
        &config.user_agent,
        config.request_timeout(),
    )
    .context("build trading-day provider")?;
    build_calendar_with_provider(loaded, Arc::new(provider))
}

/// Same as [`build_calendar`] with an injected provider.
pub fn build_calendar_with_provider(
    loaded: &LoadedConfig,
    provider: Arc<dyn TradingDayProvider>,
) -> Result<TradingCalendar> {
    let config = &loaded.config;
    config.validate()?;
    let cache_dir = config.resolve_cache_dir()?;
    let store = HolidayCacheStore::new(&cache_dir)
        .with_context(|| format!("init trading-day cache dir: {}", cache_dir.display()))?;

    info!(
        cache = %store.path().display(),
        source = provider.source_name(),
        start_year = config.start_year,
        refetch_scope = ?config.refetch_scope,
        config_hash = %loaded.config_hash,
        "trading calendar ready"
    );

    let fetcher = HolidayFetcher::new(
        provider,
        store,
        FetchSettings {
            max_concurrency: config.max_concurrency,
            request_timeout: config.request_timeout(),
        },
        config.start_year,
    );

    Ok(TradingCalendar::new(fetcher, OracleSettings::from(config)))
}
