// src/api/cache.rs
//! Disk-based response cache for content API calls.
//!
//! Search responses are stored as typed JSON under a namespace directory
//! (`query/` or `cursor/`), each stamped with the moment it was written. A
//! hit goes through the same document mapper as a live response.

use super::query::DocumentQuery;
use super::responses::SearchResponse;
use super::ContentRepository;
use crate::error::AppError;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::collections::HashSet;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

// ---------------------------------------------------------------------------
// Disk cache
// ---------------------------------------------------------------------------

/// The kind of request a cached response answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSpace {
    Query,
    Cursor,
}

impl CacheSpace {
    const ALL: [CacheSpace; 2] = [CacheSpace::Query, CacheSpace::Cursor];

    fn dir_name(self) -> &'static str {
        match self {
            CacheSpace::Query => "query",
            CacheSpace::Cursor => "cursor",
        }
    }
}

/// A value together with the time it was written.
#[derive(Serialize, Deserialize)]
struct Stamped<T> {
    stored_at: DateTime<Utc>,
    value: T,
}

/// Only the stamp, for sweeping without decoding the value.
#[derive(Deserialize)]
struct StampOnly {
    stored_at: DateTime<Utc>,
}

fn is_fresh(stored_at: DateTime<Utc>, ttl: Duration, now: DateTime<Utc>) -> bool {
    match (now - stored_at).to_std() {
        Ok(age) => age <= ttl,
        // stamped in the future: the clock moved back
        Err(_) => true,
    }
}

/// Typed, TTL-bounded file cache.
///
/// Every operation is best-effort: an unreadable or unwritable entry reads
/// as a miss and never fails the request it belongs to.
pub struct DiskCache {
    root: PathBuf,
    ttl: Duration,
}

impl DiskCache {
    /// Opens the cache in `$XDG_CACHE_HOME/spacetraveling` (or `~/.cache/spacetraveling`).
    pub async fn open_default(ttl: Duration) -> std::io::Result<Self> {
        Self::open(default_cache_root(), ttl).await
    }

    /// Opens a cache rooted at `root`, sweeping out whatever has expired.
    pub async fn open(root: impl Into<PathBuf>, ttl: Duration) -> std::io::Result<Self> {
        let cache = Self {
            root: root.into(),
            ttl,
        };
        for space in CacheSpace::ALL {
            tokio::fs::create_dir_all(cache.space_dir(space)).await?;
        }
        let removed = cache.sweep().await;
        if removed > 0 {
            log::debug!("Swept {} expired cache entries", removed);
        }
        Ok(cache)
    }

    /// Reads a fresh entry. Stale entries are deleted on the way.
    pub async fn load<T: DeserializeOwned>(&self, space: CacheSpace, key: &str) -> Option<T> {
        let path = self.entry_path(space, key);
        let bytes = tokio::fs::read(&path).await.ok()?;

        let stamped: Stamped<T> = match serde_json::from_slice(&bytes) {
            Ok(stamped) => stamped,
            Err(e) => {
                log::warn!("Discarding unreadable cache entry {}: {}", path.display(), e);
                self.invalidate(space, key).await;
                return None;
            }
        };

        if !is_fresh(stamped.stored_at, self.ttl, Utc::now()) {
            self.invalidate(space, key).await;
            return None;
        }
        Some(stamped.value)
    }

    /// Writes an entry stamped with the current time.
    pub async fn save<T: Serialize>(&self, space: CacheSpace, key: &str, value: &T) {
        self.save_stamped(space, key, value, Utc::now()).await
    }

    async fn save_stamped<T: Serialize>(
        &self,
        space: CacheSpace,
        key: &str,
        value: &T,
        stored_at: DateTime<Utc>,
    ) {
        let path = self.entry_path(space, key);
        match serde_json::to_vec(&Stamped { stored_at, value }) {
            Ok(bytes) => {
                if let Err(e) = tokio::fs::write(&path, bytes).await {
                    log::debug!("Could not write cache entry {}: {}", path.display(), e);
                }
            }
            Err(e) => log::debug!("Could not encode cache entry {}: {}", key, e),
        }
    }

    /// Drops one entry, fresh or not.
    pub async fn invalidate(&self, space: CacheSpace, key: &str) {
        let _ = tokio::fs::remove_file(self.entry_path(space, key)).await;
    }

    /// Deletes expired and unreadable entries in every namespace, returning
    /// how many were removed.
    async fn sweep(&self) -> usize {
        let now = Utc::now();
        let mut removed = 0;

        for space in CacheSpace::ALL {
            let Ok(mut entries) = tokio::fs::read_dir(self.space_dir(space)).await else {
                continue;
            };
            while let Ok(Some(entry)) = entries.next_entry().await {
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) != Some("json") {
                    continue;
                }
                if !is_fresh_on_disk(&path, self.ttl, now).await {
                    let _ = tokio::fs::remove_file(&path).await;
                    removed += 1;
                }
            }
        }

        removed
    }

    fn space_dir(&self, space: CacheSpace) -> PathBuf {
        self.root.join(space.dir_name())
    }

    fn entry_path(&self, space: CacheSpace, key: &str) -> PathBuf {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        self.space_dir(space)
            .join(format!("{:x}.json", hasher.finish()))
    }
}

async fn is_fresh_on_disk(path: &Path, ttl: Duration, now: DateTime<Utc>) -> bool {
    let Ok(bytes) = tokio::fs::read(path).await else {
        return false;
    };
    serde_json::from_slice::<StampOnly>(&bytes)
        .map(|stamp| is_fresh(stamp.stored_at, ttl, now))
        .unwrap_or(false)
}

fn default_cache_root() -> PathBuf {
    std::env::var_os("XDG_CACHE_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".cache")))
        .unwrap_or_else(std::env::temp_dir)
        .join("spacetraveling")
}

// ---------------------------------------------------------------------------
// Cached content client
// ---------------------------------------------------------------------------

/// A [`ContentRepository`] that answers repeated searches from disk.
///
/// Queries carrying a preview ref always go to the inner repository, and so
/// does every cursor reached from one: draft content changes between
/// requests.
pub struct CachedContentClient {
    inner: Arc<dyn ContentRepository>,
    cache: DiskCache,
    preview_cursors: Mutex<HashSet<String>>,
}

impl CachedContentClient {
    /// Wraps a repository with a disk cache in the default location.
    pub async fn new(inner: Arc<dyn ContentRepository>, ttl_secs: u64) -> Result<Self, AppError> {
        let cache = DiskCache::open_default(Duration::from_secs(ttl_secs))
            .await
            .map_err(|e| AppError::InternalError {
                message: format!("Failed to initialize disk cache: {}", e),
                source: None,
            })?;
        Ok(Self::with_cache(inner, cache))
    }

    /// Wraps a repository with an already opened cache.
    pub fn with_cache(inner: Arc<dyn ContentRepository>, cache: DiskCache) -> Self {
        Self {
            inner,
            cache,
            preview_cursors: Mutex::new(HashSet::new()),
        }
    }

    fn is_preview_cursor(&self, cursor: &str) -> bool {
        self.preview_cursors.lock().contains(cursor)
    }

    /// Remembers the cursor a preview response hands out, so the page it
    /// leads to is fetched live as well.
    fn track_preview(&self, response: SearchResponse) -> SearchResponse {
        if let Some(next) = &response.next_page {
            self.preview_cursors.lock().insert(next.clone());
        }
        response
    }

    async fn read_through<F>(
        &self,
        space: CacheSpace,
        key: &str,
        fetch: F,
    ) -> Result<SearchResponse, AppError>
    where
        F: std::future::Future<Output = Result<SearchResponse, AppError>>,
    {
        if let Some(response) = self.cache.load::<SearchResponse>(space, key).await {
            log::debug!("Cache hit: {}", key);
            return Ok(response);
        }

        log::debug!("Cache miss: {}", key);
        let response = fetch.await?;
        self.cache.save(space, key, &response).await;
        Ok(response)
    }
}

#[async_trait::async_trait]
impl ContentRepository for CachedContentClient {
    async fn query(&self, query: &DocumentQuery) -> Result<SearchResponse, AppError> {
        if query.preview_ref.is_some() {
            let response = self.inner.query(query).await?;
            return Ok(self.track_preview(response));
        }

        self.read_through(CacheSpace::Query, &query.cache_key(), self.inner.query(query))
            .await
    }

    async fn follow_cursor(&self, cursor: &str) -> Result<SearchResponse, AppError> {
        if self.is_preview_cursor(cursor) {
            let response = self.inner.follow_cursor(cursor).await?;
            return Ok(self.track_preview(response));
        }

        self.read_through(CacheSpace::Cursor, cursor, self.inner.follow_cursor(cursor))
            .await
    }
}
