//! Hit/miss decision for a resolved request.
//!
//! # Responsibilities
//! - Gate methods: only GET and POST get past this point
//! - GET: serve from the store when possible
//! - POST, and GET misses: fetch from origin, write through, re-read
//!
//! # Design Decisions
//! - The bytes served on a miss are read back from the store, never the
//!   in-flight copy, so the cache and the client always agree
//! - POST responses land under the same key a GET would use

use crate::cache::key::CacheKey;
use crate::cache::store::{CacheError, CacheStore};
use crate::http::error::ProxyError;
use crate::http::request::ProxyRequest;
use crate::http::response;
use crate::observability::metrics;
use crate::origin::OriginClient;

/// Methods the proxy understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    /// Case-sensitive, as HTTP methods are.
    pub fn parse(method: &str) -> Option<Self> {
        match method {
            "GET" => Some(Method::Get),
            "POST" => Some(Method::Post),
            _ => None,
        }
    }
}

/// How a response was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Hit,
    Miss,
    /// POST, forwarded without a lookup.
    Forwarded,
    MethodNotAllowed,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Hit => "hit",
            Outcome::Miss => "miss",
            Outcome::Forwarded => "forwarded",
            Outcome::MethodNotAllowed => "method_not_allowed",
        }
    }
}

/// Response bytes ready to relay, and how they were produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub outcome: Outcome,
    pub bytes: Vec<u8>,
}

impl Resolved {
    /// The canned 405, produced without touching the store or the origin.
    pub fn method_not_allowed() -> Self {
        Self {
            outcome: Outcome::MethodNotAllowed,
            bytes: response::method_not_allowed(),
        }
    }
}

/// Orchestrates the cache store and the origin client.
#[derive(Debug, Clone)]
pub struct CacheResolver {
    store: CacheStore,
    origin: OriginClient,
}

impl CacheResolver {
    pub fn new(store: CacheStore, origin: OriginClient) -> Self {
        Self { store, origin }
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    pub async fn resolve(&self, request: &ProxyRequest) -> Result<Resolved, ProxyError> {
        let Some(method) = Method::parse(request.method()) else {
            tracing::info!(method = %request.method(), "Method not allowed");
            return Ok(Resolved::method_not_allowed());
        };

        let key = CacheKey::derive(&request.host, &request.path);

        if method == Method::Post {
            let bytes = self.fill(&key, request).await?;
            tracing::info!(key = %key, "POST forwarded to origin");
            return Ok(Resolved {
                outcome: Outcome::Forwarded,
                bytes,
            });
        }

        match self.store.read(&key).await {
            Ok(bytes) => {
                metrics::record_cache_lookup(true);
                tracing::info!(key = %key, bytes = bytes.len(), "Cache hit");
                return Ok(Resolved {
                    outcome: Outcome::Hit,
                    bytes,
                });
            }
            Err(CacheError::Miss(_)) => {}
            Err(e) => tracing::warn!(key = %key, error = %e, "Cache entry unreadable, refetching"),
        }

        metrics::record_cache_lookup(false);
        let bytes = self.fill(&key, request).await?;
        tracing::info!(key = %key, bytes = bytes.len(), "Cache miss filled from origin");
        Ok(Resolved {
            outcome: Outcome::Miss,
            bytes,
        })
    }

    /// Fetch from origin, persist under `key`, and return the stored bytes.
    async fn fill(&self, key: &CacheKey, request: &ProxyRequest) -> Result<Vec<u8>, ProxyError> {
        let fetched = self.origin.fetch(request).await?;
        self.store.write(key, &fetched).await?;
        Ok(self.store.read(key).await?)
    }
}
