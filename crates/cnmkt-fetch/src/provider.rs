//! Provider boundary for per-year trading-day data.
//!
//! One request per year; the response is the complete list of that year's
//! trading days as `MMDD` markers. Implementations do not retry and do not
//! touch the cache. Failures are reported as [`ProviderError`] and the
//! batch layer decides what to do with them.

use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;

use cnmkt_cache::is_valid_marker;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum ProviderError {
    /// Network or transport failure.
    Transport(String),
    /// Non-2xx HTTP status.
    Http { status: u16 },
    /// The body was not a JSON list of `MMDD` markers.
    Decode(String),
    /// No response within the per-request bound.
    Timeout(Duration),
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderError::Transport(msg) => write!(f, "transport error: {msg}"),
            ProviderError::Http { status } => write!(f, "http error status={status}"),
            ProviderError::Decode(msg) => write!(f, "decode error: {msg}"),
            ProviderError::Timeout(d) => write!(f, "timed out after {}ms", d.as_millis()),
        }
    }
}

impl std::error::Error for ProviderError {}

// ---------------------------------------------------------------------------
// Provider trait
// ---------------------------------------------------------------------------

/// Remote source of trading-day markers, one year per call.
#[async_trait::async_trait]
pub trait TradingDayProvider: Send + Sync {
    /// Human-readable name identifying this provider (e.g. `"10jqka"`).
    fn source_name(&self) -> &'static str;

    async fn fetch_year(&self, year: i32) -> Result<BTreeSet<String>, ProviderError>;
}

// ---------------------------------------------------------------------------
// Tonghuashun (10jqka) provider
// ---------------------------------------------------------------------------

/// `GET {base_url}/json_{year}.txt` with a browser-like User-Agent.
#[derive(Debug, Clone)]
pub struct TonghuashunProvider {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl TonghuashunProvider {
    pub fn new(
        base_url: impl Into<String>,
        user_agent: &str,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::Transport(format!("http client build failed: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            timeout,
        })
    }

    pub fn year_url(&self, year: i32) -> String {
        format!("{}/json_{year}.txt", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait::async_trait]
impl TradingDayProvider for TonghuashunProvider {
    fn source_name(&self) -> &'static str {
        "10jqka"
    }

    async fn fetch_year(&self, year: i32) -> Result<BTreeSet<String>, ProviderError> {
        let resp = self
            .http
            .get(self.year_url(year))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(self.timeout)
                } else {
                    ProviderError::Transport(e.to_string())
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ProviderError::Http {
                status: status.as_u16(),
            });
        }

        // The endpoint serves `text/plain`; decode from bytes rather than
        // relying on the content type.
        let body = resp
            .bytes()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;
        parse_markers(&body)
    }
}

/// Decode a JSON array of `MMDD` strings into a sorted marker set.
pub fn parse_markers(body: &[u8]) -> Result<BTreeSet<String>, ProviderError> {
    let markers: Vec<String> =
        serde_json::from_slice(body).map_err(|e| ProviderError::Decode(e.to_string()))?;
    if let Some(bad) = markers.iter().find(|m| !is_valid_marker(m)) {
        return Err(ProviderError::Decode(format!("invalid marker {bad:?}")));
    }
    Ok(markers.into_iter().collect())
}
