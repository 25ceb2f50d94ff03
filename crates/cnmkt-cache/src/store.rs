use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::index::TradingDayIndex;

/// File name of the persisted cache inside the cache directory.
pub const CACHE_FILE_NAME: &str = "holiday_days.json";

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum CacheError {
    /// No cache file exists yet.
    Missing { path: PathBuf },
    /// The file exists but is not a valid trading-day index.
    Corrupt { path: PathBuf, reason: String },
    /// Filesystem failure other than "not found".
    Io {
        path: PathBuf,
        op: &'static str,
        source: io::Error,
    },
}

impl CacheError {
    /// `Missing` and `Corrupt` are data gaps the caller recovers from by
    /// re-fetching; `Io` means the storage itself is broken.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, CacheError::Missing { .. } | CacheError::Corrupt { .. })
    }
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheError::Missing { path } => write!(f, "cache missing: {}", path.display()),
            CacheError::Corrupt { path, reason } => {
                write!(f, "cache corrupt: {}: {reason}", path.display())
            }
            CacheError::Io { path, op, source } => {
                write!(f, "cache io error ({op}) {}: {source}", path.display())
            }
        }
    }
}

impl std::error::Error for CacheError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CacheError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// JSON-file backed [`TradingDayIndex`] store.
///
/// The cache directory is created once, in [`HolidayCacheStore::new`];
/// `load`/`save` never create directories.
#[derive(Debug, Clone)]
pub struct HolidayCacheStore {
    dir: PathBuf,
    path: PathBuf,
}

impl HolidayCacheStore {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let dir = cache_dir.into();
        fs::create_dir_all(&dir).map_err(|source| CacheError::Io {
            path: dir.clone(),
            op: "create_dir",
            source,
        })?;
        let path = dir.join(CACHE_FILE_NAME);
        Ok(Self { dir, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<TradingDayIndex, CacheError> {
        let raw = match fs::read(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(CacheError::Missing {
                    path: self.path.clone(),
                })
            }
            Err(source) => {
                return Err(CacheError::Io {
                    path: self.path.clone(),
                    op: "read",
                    source,
                })
            }
        };

        let index: TradingDayIndex =
            serde_json::from_slice(&raw).map_err(|e| self.corrupt(e.to_string()))?;
        if let Some((year, marker)) = index.first_invalid_marker() {
            return Err(self.corrupt(format!("year {year}: invalid marker {marker:?}")));
        }

        debug!(path = %self.path.display(), years = index.len(), "trading-day cache loaded");
        Ok(index)
    }

    /// Atomically replace the persisted index: write a sibling temp file,
    /// then rename it over the target.
    pub fn save(&self, index: &TradingDayIndex) -> Result<(), CacheError> {
        let json = serde_json::to_string_pretty(index).map_err(|e| CacheError::Io {
            path: self.path.clone(),
            op: "serialize",
            source: io::Error::new(io::ErrorKind::InvalidData, e),
        })?;

        let mut tmp = NamedTempFile::new_in(&self.dir).map_err(|source| self.io("create_temp", source))?;
        write_and_sync(&mut tmp, json.as_bytes()).map_err(|source| self.io("write", source))?;
        tmp.persist(&self.path)
            .map_err(|e| self.io("rename", e.error))?;

        info!(path = %self.path.display(), years = index.len(), "trading-day cache saved");
        Ok(())
    }

    fn corrupt(&self, reason: String) -> CacheError {
        CacheError::Corrupt {
            path: self.path.clone(),
            reason,
        }
    }

    fn io(&self, op: &'static str, source: io::Error) -> CacheError {
        CacheError::Io {
            path: self.path.clone(),
            op,
            source,
        }
    }
}

fn write_and_sync(tmp: &mut NamedTempFile, body: &[u8]) -> io::Result<()> {
    tmp.write_all(body)?;
    tmp.write_all(b"\n")?;
    tmp.as_file().sync_all()
}
