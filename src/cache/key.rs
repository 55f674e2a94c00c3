//! Cache key derivation.

use std::fmt;

/// Replaces `/` in the flattened key.
pub const KEY_SEPARATOR: char = '-';

/// Flat identifier of a cached response, derived from Host and path.
///
/// Method and query string play no part: `GET /a?x=1` and `POST /a` share
/// the entry stored for `/a`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn derive(host: &str, path: &str) -> Self {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let flat = format!("{host}{path}").replace('/', &KEY_SEPARATOR.to_string());
        Self(flat.trim_end_matches(KEY_SEPARATOR).to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CacheKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}
