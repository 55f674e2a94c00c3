//! Request parsing and resolution.
//!
//! # Responsibilities
//! - Split the raw client bytes into header block and body at the first CRLFCRLF
//! - Parse the request line and header lines into a [`Request`]
//! - Resolve the effective Host (header or host continuity) and the relative path
//!
//! # Design Decisions
//! - Header names are unique ignoring ASCII case; the last occurrence wins
//!   and keeps its own spelling
//! - Absolute-form targets are reduced to path+query before anything else sees them

use thiserror::Error;

/// Marks the end of the header block.
pub const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";

/// Errors produced while turning raw bytes into a resolvable request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    /// No CRLFCRLF anywhere in the received bytes.
    #[error("request has no header terminator")]
    MissingTerminator,

    /// Header block is not valid UTF-8.
    #[error("request header block is not valid UTF-8")]
    NotUtf8,

    /// Request line does not have exactly three tokens.
    #[error("malformed request line: {0:?}")]
    MalformedRequestLine(String),

    /// A header line without a colon (or with an empty name).
    #[error("malformed header line: {0:?}")]
    MalformedHeader(String),

    /// No Host header and no earlier request to borrow one from.
    #[error("request has no Host header and no previous host is known")]
    MissingHost,
}

/// Ordered header collection with case-insensitive unique names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a header, replacing any earlier header with the same name.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.entries.retain(|(existing, _)| !existing.eq_ignore_ascii_case(&name));
        self.entries.push((name, value.into()));
    }

    /// Look up a header value by name, ignoring ASCII case.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A parsed client request, before host resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: String,
    /// Target exactly as sent; absolute or origin-form.
    pub target: String,
    pub version: String,
    pub headers: Headers,
    pub body: Option<Vec<u8>>,
}

impl Request {
    /// Parse raw bytes received from a client.
    pub fn parse(raw: &[u8]) -> Result<Self, RequestError> {
        let split = find_subsequence(raw, HEADER_TERMINATOR).ok_or(RequestError::MissingTerminator)?;
        let head = std::str::from_utf8(&raw[..split]).map_err(|_| RequestError::NotUtf8)?;
        let rest = &raw[split + HEADER_TERMINATOR.len()..];

        let mut lines = head.split("\r\n");
        let request_line = lines.next().unwrap_or_default();
        let tokens: Vec<&str> = request_line.split_whitespace().collect();
        let &[method, target, version] = tokens.as_slice() else {
            return Err(RequestError::MalformedRequestLine(request_line.to_string()));
        };

        let mut headers = Headers::new();
        for line in lines {
            let (name, value) = line
                .split_once(':')
                .ok_or_else(|| RequestError::MalformedHeader(line.to_string()))?;
            let name = name.trim();
            if name.is_empty() {
                return Err(RequestError::MalformedHeader(line.to_string()));
            }
            headers.insert(name, value.trim());
        }

        Ok(Self {
            method: method.to_string(),
            target: target.to_string(),
            version: version.to_string(),
            headers,
            body: (!rest.is_empty()).then(|| rest.to_vec()),
        })
    }

    /// Resolve Host and relative path, updating host continuity along the way.
    pub fn resolve(self, hosts: &mut HostContinuity) -> Result<ProxyRequest, RequestError> {
        let host = hosts.resolve(self.headers.get("host"))?;
        let path = relative_path(&self.target, &host);
        Ok(ProxyRequest {
            request: self,
            host,
            path,
        })
    }
}

/// A request with its effective Host and relative path settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyRequest {
    pub request: Request,
    pub host: String,
    /// Path plus query, always origin-form.
    pub path: String,
}

impl ProxyRequest {
    pub fn method(&self) -> &str {
        &self.request.method
    }
}

/// Most recently seen Host header, used for requests that omit one.
#[derive(Debug, Clone, Default)]
pub struct HostContinuity {
    last: Option<String>,
}

impl HostContinuity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the effective host, remembering `header` when present.
    pub fn resolve(&mut self, header: Option<&str>) -> Result<String, RequestError> {
        match self.remember(header) {
            Some(host) => Ok(host.to_string()),
            None => {
                tracing::debug!(last_host = ?self.last, "No Host header, reusing previous host");
                self.last.clone().ok_or(RequestError::MissingHost)
            }
        }
    }

    /// Record a non-empty `header` as the latest host without requiring one.
    pub fn remember<'a>(&mut self, header: Option<&'a str>) -> Option<&'a str> {
        let host = header.filter(|h| !h.is_empty())?;
        self.last = Some(host.to_string());
        Some(host)
    }

    pub fn last(&self) -> Option<&str> {
        self.last.as_deref()
    }
}

/// Strip scheme and authority from an absolute-form target.
fn relative_path(target: &str, host: &str) -> String {
    let path = if target.starts_with('/') {
        target
    } else {
        match target.find(host) {
            Some(idx) => &target[idx + host.len()..],
            None => target,
        }
    };
    if path.is_empty() {
        "/".to_string()
    } else {
        path.to_string()
    }
}

pub(crate) fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}
