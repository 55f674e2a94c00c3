//! Flat key → bytes persistence on local disk.
//!
//! # Responsibilities
//! - Persist full origin responses, one file per [`CacheKey`]
//! - Guarantee every stored entry ends with CRLFCRLF
//! - Report absent entries as [`CacheError::Miss`]
//!
//! # Design Decisions
//! - No index or manifest; the filename is the only metadata
//! - No expiry, no eviction, no delete path
//! - Writes land in a temporary sibling first and are renamed into place

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;

use crate::cache::key::CacheKey;
use crate::http::request::HEADER_TERMINATOR;

/// Suffix source for staging file names.
static STAGING_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Errors raised by the cache store.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Nothing stored under this key.
    #[error("no cache entry for {0}")]
    Miss(CacheKey),

    /// Key cannot be used as a file name.
    #[error("cache key {0:?} is not a usable file name")]
    InvalidKey(CacheKey),

    #[error("cache I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Directory-backed cache of raw HTTP responses.
#[derive(Debug, Clone)]
pub struct CacheStore {
    root: PathBuf,
}

impl CacheStore {
    /// Open (and create if needed) a store rooted at `root`.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await.map_err(|source| CacheError::Io {
            path: root.clone(),
            source,
        })?;
        tracing::debug!(root = %root.display(), "Cache store opened");
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Location of the entry for `key`.
    pub fn path_for(&self, key: &CacheKey) -> Result<PathBuf, CacheError> {
        match key.as_str() {
            "" | "." | ".." => Err(CacheError::InvalidKey(key.clone())),
            name if name.contains(['/', '\\', '\0']) => Err(CacheError::InvalidKey(key.clone())),
            name => Ok(self.root.join(name)),
        }
    }

    /// Return the full stored bytes for `key`.
    pub async fn read(&self, key: &CacheKey) -> Result<Vec<u8>, CacheError> {
        let path = self.path_for(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(CacheError::Miss(key.clone())),
            Err(source) => Err(CacheError::Io { path, source }),
        }
    }

    /// Store `bytes` under `key`, replacing any previous entry.
    pub async fn write(&self, key: &CacheKey, bytes: &[u8]) -> Result<(), CacheError> {
        let path = self.path_for(key)?;
        let staging = self.staging_path();

        let entry = terminated(bytes);
        tokio::fs::write(&staging, &entry)
            .await
            .map_err(|source| CacheError::Io {
                path: staging.clone(),
                source,
            })?;
        if let Err(source) = tokio::fs::rename(&staging, &path).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(CacheError::Io { path, source });
        }

        tracing::debug!(key = %key, bytes = entry.len(), "Cache entry written");
        Ok(())
    }

    /// A fresh staging name whose length does not depend on the key.
    fn staging_path(&self) -> PathBuf {
        let n = STAGING_COUNTER.fetch_add(1, Ordering::Relaxed);
        self.root.join(format!(".partial-{}-{n}", std::process::id()))
    }
}

/// `bytes` followed by exactly one CRLFCRLF.
pub fn terminated(bytes: &[u8]) -> Vec<u8> {
    let mut entry = bytes.to_vec();
    if !entry.ends_with(HEADER_TERMINATOR) {
        entry.extend_from_slice(HEADER_TERMINATOR);
    }
    entry
}
