//! Flat-file cache store.
//!
//! Reads are fail-open: a missing artifact, an unreadable file, a malformed
//! metadata record or an expired timestamp all come back as "absent". Writes
//! are best-effort: any failure is logged and reported as skipped, never
//! raised to the caller.
//!
//! Within a process, reads and writes of one digest are serialized through a
//! fixed set of striped locks, so the body and metadata of an entry always
//! come from the same save; the last save wins. Across processes there is no
//! locking. Each artifact goes through a uniquely named temporary file and a
//! rename, so readers never see a half-written file, and a failed write
//! removes its temporary file.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::Mutex;

use super::digest::digest_of;
use crate::Error;

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Number of lock stripes shared by all digests.
const LOCK_STRIPES: usize = 64;

/// A cached upstream response.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub status: u16,
    pub content_type: String,
    /// Seconds since the Unix epoch at which the entry was written.
    pub timestamp: f64,
    pub body: Vec<u8>,
}

/// Metadata record persisted next to each body blob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheMeta {
    pub timestamp: f64,
    pub status: u16,
    pub content_type: String,
}

impl CacheMeta {
    /// Reject records that parse but cannot describe a real response.
    pub fn validate(&self) -> Result<(), Error> {
        if !self.timestamp.is_finite() {
            return Err(Error::CacheCorrupt(format!("timestamp {} is not finite", self.timestamp)));
        }
        if !(100..=599).contains(&self.status) {
            return Err(Error::CacheCorrupt(format!("status {} out of range", self.status)));
        }
        Ok(())
    }

    /// An entry is fresh while its age does not exceed the TTL.
    pub fn is_fresh(&self, ttl: Duration, now: f64) -> bool {
        now - self.timestamp <= ttl.as_secs_f64()
    }
}

/// Result of a best-effort save.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Stored,
    Skipped,
}

/// Paths of the two artifacts backing one cache entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub body: PathBuf,
    pub meta: PathBuf,
}

/// Cache store rooted at a single directory.
#[derive(Debug, Clone)]
pub struct CacheStore {
    dir: PathBuf,
    locks: Arc<[Mutex<()>]>,
}

impl CacheStore {
    /// Create a store over `dir` without touching the filesystem.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let locks = (0..LOCK_STRIPES).map(|_| Mutex::new(())).collect::<Vec<_>>();
        Self { dir: dir.into(), locks: Arc::from(locks) }
    }

    /// Create the cache directory if needed and return a store over it.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, Error> {
        let store = Self::new(dir);
        fs::create_dir_all(&store.dir).await?;
        Ok(store)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Derive the artifact file names for a URL.
    pub fn artifact_paths(&self, url: &str) -> ArtifactPaths {
        self.paths_for(&digest_of(url))
    }

    fn paths_for(&self, digest: &str) -> ArtifactPaths {
        ArtifactPaths { body: self.dir.join(format!("{digest}.bin")), meta: self.dir.join(format!("{digest}.json")) }
    }

    fn stripe(&self, digest: &str) -> &Mutex<()> {
        let index = digest.get(..2).and_then(|prefix| usize::from_str_radix(prefix, 16).ok()).unwrap_or(0);
        &self.locks[index % self.locks.len()]
    }

    /// Look up a fresh entry for `url`.
    pub async fn load(&self, url: &str, ttl: Duration) -> Option<CacheEntry> {
        self.load_at(url, ttl, now_secs()).await
    }

    /// Look up an entry for `url` as if the current time were `now`.
    pub async fn load_at(&self, url: &str, ttl: Duration, now: f64) -> Option<CacheEntry> {
        match self.read_entry(url, ttl, now).await {
            Ok(entry) => entry,
            Err(e) => {
                tracing::debug!(url, error = %e, "unreadable cache entry treated as miss");
                None
            }
        }
    }

    /// Persist a response for `url`, stamped with the current time.
    pub async fn save(&self, url: &str, status: u16, content_type: &str, body: &[u8]) -> SaveOutcome {
        self.save_at(url, status, content_type, body, now_secs()).await
    }

    /// Persist a response for `url`, stamped with `now`.
    pub async fn save_at(&self, url: &str, status: u16, content_type: &str, body: &[u8], now: f64) -> SaveOutcome {
        match self.write_entry(url, status, content_type, body, now).await {
            Ok(()) => {
                tracing::debug!(url, bytes = body.len(), "stored cache entry");
                SaveOutcome::Stored
            }
            Err(e) => {
                tracing::warn!(url, error = %e, "failed to store cache entry");
                SaveOutcome::Skipped
            }
        }
    }

    async fn read_entry(&self, url: &str, ttl: Duration, now: f64) -> Result<Option<CacheEntry>, Error> {
        let digest = digest_of(url);
        let _guard = self.stripe(&digest).lock().await;
        let paths = self.paths_for(&digest);
        if !fs::try_exists(&paths.body).await? || !fs::try_exists(&paths.meta).await? {
            return Ok(None);
        }

        let meta: CacheMeta = serde_json::from_slice(&fs::read(&paths.meta).await?)?;
        meta.validate()?;

        if !meta.is_fresh(ttl, now) {
            tracing::debug!(url, age_secs = now - meta.timestamp, "cache entry expired");
            return Ok(None);
        }

        let body = fs::read(&paths.body).await?;

        Ok(Some(CacheEntry { status: meta.status, content_type: meta.content_type, timestamp: meta.timestamp, body }))
    }

    async fn write_entry(&self, url: &str, status: u16, content_type: &str, body: &[u8], now: f64) -> Result<(), Error> {
        let digest = digest_of(url);
        let _guard = self.stripe(&digest).lock().await;
        let paths = self.paths_for(&digest);
        write_atomic(&paths.body, body).await?;

        let meta = CacheMeta { timestamp: now, status, content_type: content_type.to_string() };
        write_atomic(&paths.meta, &serde_json::to_vec(&meta)?).await?;

        Ok(())
    }
}

/// Current time as fractional seconds since the Unix epoch.
pub fn now_secs() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), Error> {
    let temp = temp_path(path);
    let written = fs::write(&temp, bytes).await;
    commit_temp(&temp, path, written).await
}

/// Rename a written temporary file into place, or remove it if either the
/// write or the rename failed.
async fn commit_temp(temp: &Path, path: &Path, written: io::Result<()>) -> Result<(), Error> {
    let committed = match written {
        Ok(()) => fs::rename(temp, path).await,
        Err(e) => Err(e),
    };
    if let Err(e) = committed {
        let _ = fs::remove_file(temp).await;
        return Err(e.into());
    }
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(format!(".{}-{}.tmp", std::process::id(), TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)));
    path.with_file_name(name)
}
