//! Content-addressed response cache.
//!
//! Keys hash the full request fingerprint, protocol kind included, so a
//! chat-style answer is never served for a responses-style request. Keys
//! are disjoint per request, which makes unsynchronized concurrent access
//! safe; the only shared state is the hit/miss counters.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::protocol::RequestSpec;

/// Deterministic key over (normalized content, model, temperature, token
/// ceiling, protocol kind, instructions hash).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn for_spec(spec: &RequestSpec) -> Self {
        let instructions_digest = hex::encode(Sha256::digest(spec.instructions.as_bytes()));

        let mut hasher = Sha256::new();
        for chunk in normalize_whitespace(&spec.content) {
            hasher.update(chunk.as_bytes());
            hasher.update(b" ");
        }
        hasher.update(b"\x00");
        hasher.update(spec.model.as_bytes());
        hasher.update(b"\x00");
        hasher.update(format!("{:.4}", spec.temperature).as_bytes());
        hasher.update(b"\x00");
        hasher.update(spec.max_output_tokens.to_be_bytes());
        hasher.update(b"\x00");
        hasher.update(spec.protocol.as_str().as_bytes());
        hasher.update(b"\x00");
        hasher.update(instructions_digest.as_bytes());

        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn normalize_whitespace(text: &str) -> impl Iterator<Item = &str> {
    text.split_whitespace()
}

#[derive(Serialize, Deserialize)]
struct CacheEntry {
    created_at_ms: u128,
    ttl_secs: u64,
    response: String,
}

impl CacheEntry {
    fn is_expired(&self, now_ms: u128) -> bool {
        let age_ms = now_ms.saturating_sub(self.created_at_ms);
        age_ms >= u128::from(self.ttl_secs) * 1000
    }
}

pub struct DiskCache {
    dir: PathBuf,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

#[derive(Debug, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

impl DiskCache {
    pub fn new(dir: PathBuf, ttl: Duration) -> Self {
        Self {
            dir,
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(format!("{}.json", key.as_str()))
    }

    /// Look up a key. Expired, missing, or unreadable entries are all
    /// misses; a corrupt entry is never fatal.
    pub async fn get(&self, key: &CacheKey) -> Option<String> {
        let path = self.path_for(key);
        let bytes = match tokio::fs::read(&path).await {
            Ok(b) => b,
            Err(_) => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                return None;
            }
        };

        let entry: CacheEntry = match serde_json::from_slice(&bytes) {
            Ok(e) => e,
            Err(e) => {
                tracing::debug!(key = key.as_str(), "unreadable cache entry: {e}");
                self.misses.fetch_add(1, Ordering::Relaxed);
                return None;
            }
        };

        if entry.is_expired(now_ms()) {
            self.misses.fetch_add(1, Ordering::Relaxed);
            return None;
        }

        self.hits.fetch_add(1, Ordering::Relaxed);
        Some(entry.response)
    }

    /// Write an entry. Called only after a successful provider call —
    /// errors are never cached. Write failures are logged and swallowed;
    /// the response has already been obtained.
    pub async fn put(&self, key: &CacheKey, response: &str) {
        if let Err(e) = self.write_entry(key, response).await {
            tracing::warn!(key = key.as_str(), "cache write failed: {e}");
        }
    }

    async fn write_entry(&self, key: &CacheKey, response: &str) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let entry = CacheEntry {
            created_at_ms: now_ms(),
            ttl_secs: self.ttl.as_secs(),
            response: response.to_string(),
        };
        let json = serde_json::to_string(&entry).map_err(std::io::Error::other)?;

        // Atomic write: temp file + rename prevents partial reads
        let path = self.path_for(key);
        let tmp_path = path.with_extension("tmp");
        tokio::fs::write(&tmp_path, json.as_bytes()).await?;
        if let Err(e) = tokio::fs::rename(&tmp_path, &path).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(e);
        }
        Ok(())
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

fn now_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
}
