//! cnmkt-config
//!
//! Runtime configuration for the A-share trading-day calendar.
//!
//! # Contract
//! - Config is loaded once from layered YAML (earlier docs are base, later
//!   docs override) and deserialized into [`CalendarConfig`].
//! - Every field has a default, so an empty document is a valid config.
//! - Unknown keys are rejected; a typo must not silently fall back to a default.
//! - The only environment reads are `HOME` / `USERPROFILE`, done in
//!   [`home_dir_from_env`] when no explicit `cache_dir` is configured.
//!   Callers resolve the directory once and pass it into constructors.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Directory (under the user's home) holding the trading-day cache.
pub const DEFAULT_CACHE_SUBDIR: &str = "pytrade";

pub const DEFAULT_PROVIDER_BASE_URL: &str = "https://vaserviece.10jqka.com.cn/mobilecfxf/data";

/// Browser-like client signature. The provider rejects non-browser agents.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
AppleWebKit/537.36 (KHTML, like Gecko) Chrome/141.0.0.0 Safari/537.36";

pub const DEFAULT_START_YEAR: i32 = 1990;
pub const DEFAULT_MAX_CONCURRENCY: usize = 3;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_CUTOFF_HOUR: u32 = 9;
pub const DEFAULT_LOOKBACK_DAYS: u32 = 366;

// ---------------------------------------------------------------------------
// CalendarConfig
// ---------------------------------------------------------------------------

/// What the oracle re-fetches when a queried year is missing from the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RefetchScope {
    /// Fetch `start_year..=current year` and replace the whole cache file.
    #[default]
    FullRange,
    /// Fetch only the missing year and merge it into the cached years.
    MissingYears,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CalendarConfig {
    /// Explicit cache directory. `None` resolves to `<home>/pytrade`.
    pub cache_dir: Option<PathBuf>,
    /// Base URL; the provider appends `/json_{year}.txt`.
    pub provider_base_url: String,
    pub user_agent: String,
    pub request_timeout_secs: u64,
    /// Upper bound on in-flight provider requests per batch.
    pub max_concurrency: usize,
    /// First year of the default fetch range (inclusive).
    pub start_year: i32,
    /// Hour of day before which "today" is not yet the latest trading day.
    pub cutoff_hour: u32,
    /// Max calendar days the latest-trading-day walk may step back.
    pub lookback_days: u32,
    pub refetch_scope: RefetchScope,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            provider_base_url: DEFAULT_PROVIDER_BASE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            start_year: DEFAULT_START_YEAR,
            cutoff_hour: DEFAULT_CUTOFF_HOUR,
            lookback_days: DEFAULT_LOOKBACK_DAYS,
            refetch_scope: RefetchScope::FullRange,
        }
    }
}

impl CalendarConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Reject values the fetcher/oracle cannot honour.
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrency == 0 {
            bail!("CONFIG_INVALID max_concurrency must be >= 1");
        }
        if self.request_timeout_secs == 0 {
            bail!("CONFIG_INVALID request_timeout_secs must be >= 1");
        }
        if self.cutoff_hour >= 24 {
            bail!(
                "CONFIG_INVALID cutoff_hour must be in 0..24, got {}",
                self.cutoff_hour
            );
        }
        if self.lookback_days == 0 {
            bail!("CONFIG_INVALID lookback_days must be >= 1");
        }
        if self.provider_base_url.trim().is_empty() {
            bail!("CONFIG_INVALID provider_base_url is empty");
        }
        Ok(())
    }

    /// Resolve the cache directory: explicit `cache_dir`, else `<home>/pytrade`.
    pub fn resolve_cache_dir(&self) -> Result<PathBuf> {
        match &self.cache_dir {
            Some(dir) => Ok(dir.clone()),
            None => default_cache_dir(),
        }
    }
}

/// `<home>/pytrade`.
pub fn default_cache_dir() -> Result<PathBuf> {
    let home = home_dir_from_env()
        .context("cannot locate home directory: neither HOME nor USERPROFILE is set")?;
    Ok(home.join(DEFAULT_CACHE_SUBDIR))
}

/// `HOME`, falling back to `USERPROFILE`. Empty values count as unset.
pub fn home_dir_from_env() -> Option<PathBuf> {
    ["HOME", "USERPROFILE"]
        .iter()
        .filter_map(|k| std::env::var_os(k))
        .find(|v| !v.is_empty())
        .map(PathBuf::from)
}

// ---------------------------------------------------------------------------
// Layered YAML loading
// ---------------------------------------------------------------------------

/// A validated config plus the sha256 of its canonical JSON form.
///
/// The hash covers the effective values (defaults filled in), so a layered
/// load and a programmatic config with the same values hash identically.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: CalendarConfig,
    pub config_hash: String,
    pub canonical_json: String,
}

impl LoadedConfig {
    pub fn from_config(config: CalendarConfig) -> Result<Self> {
        config.validate()?;
        let canonical_json =
            serde_json::to_string(&config).context("canonical json serialize failed")?;
        let config_hash = sha256_hex(canonical_json.as_bytes());
        Ok(Self {
            config,
            config_hash,
            canonical_json,
        })
    }
}

pub fn load_layered_yaml(paths: &[&str]) -> Result<LoadedConfig> {
    let mut docs: Vec<String> = Vec::new();
    for p in paths {
        let raw =
            fs::read_to_string(p).with_context(|| format!("failed to read yaml path: {p}"))?;
        docs.push(raw);
    }

    let doc_refs: Vec<&str> = docs.iter().map(|s| s.as_str()).collect();
    load_layered_yaml_from_strings(&doc_refs)
}

pub fn load_layered_yaml_from_strings(yaml_docs: &[&str]) -> Result<LoadedConfig> {
    let mut merged = serde_json::json!({});
    for raw in yaml_docs {
        let v_yaml: serde_yaml::Value = serde_yaml::from_str(raw).context("invalid yaml")?;
        // An empty document parses as null; treat it as "no overrides".
        if v_yaml.is_null() {
            continue;
        }
        let v_json = serde_json::to_value(v_yaml).context("yaml->json conversion failed")?;
        merged = deep_merge(merged, v_json);
    }

    let config: CalendarConfig =
        serde_json::from_value(merged).context("invalid calendar config")?;
    LoadedConfig::from_config(config)
}

fn deep_merge(a: Value, b: Value) -> Value {
    match (a, b) {
        (Value::Object(mut a_map), Value::Object(b_map)) => {
            for (k, b_val) in b_map {
                let a_val = a_map.remove(&k).unwrap_or(Value::Null);
                a_map.insert(k, deep_merge(a_val, b_val));
            }
            Value::Object(a_map)
        }
        (_, b_other) => b_other,
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}
