//! One-shot HTTP/1.0 client for origin servers.
//!
//! # Responsibilities
//! - Open a fresh TCP connection per cache miss (no pooling, no keep-alive)
//! - Rebuild the request as `{method} {path} HTTP/1.0` with Host and
//!   `Connection: close`, replaying the client's other headers and body
//! - Read the response until the origin closes its side
//!
//! # Design Decisions
//! - Framing is read-until-EOF; Content-Length is never consulted
//! - Connect and response reads each run under their own deadline
//! - An origin that closes without sending anything is an error, not an entry

use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time;

use crate::config::{ProxyConfig, TimeoutConfig};
use crate::http::request::ProxyRequest;
use crate::observability::metrics;
use crate::resilience::RetryPolicy;

/// Headers the client rebuilds itself instead of replaying.
const REBUILT_HEADERS: [&str; 2] = ["Host", "Connection"];

/// Errors talking to an origin.
#[derive(Debug, Error)]
pub enum OriginError {
    /// Connection refused, DNS failure, unreachable network.
    #[error("failed to connect to origin {origin}: {source}")]
    Connect {
        origin: String,
        #[source]
        source: std::io::Error,
    },

    #[error("origin {origin} did not {stage} within {limit:?}")]
    Timeout {
        origin: String,
        stage: &'static str,
        limit: Duration,
    },

    #[error("I/O error talking to origin {origin}: {source}")]
    Io {
        origin: String,
        #[source]
        source: std::io::Error,
    },

    #[error("origin {0} closed the connection without responding")]
    EmptyResponse(String),
}

impl OriginError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, OriginError::Timeout { .. })
    }
}

/// Fetches full raw responses from origin servers.
#[derive(Debug, Clone)]
pub struct OriginClient {
    default_port: u16,
    connect_timeout: Duration,
    response_timeout: Duration,
    retries: RetryPolicy,
}

impl OriginClient {
    pub fn new(default_port: u16, timeouts: &TimeoutConfig, retries: RetryPolicy) -> Self {
        Self {
            default_port,
            connect_timeout: Duration::from_secs(timeouts.connect_secs),
            response_timeout: Duration::from_secs(timeouts.request_secs),
            retries,
        }
    }

    pub fn from_config(config: &ProxyConfig) -> Self {
        Self::new(
            config.origin.default_port,
            &config.timeouts,
            RetryPolicy::from_config(&config.retries),
        )
    }

    /// Send `request` to its origin and return every byte of the response.
    pub async fn fetch(&self, request: &ProxyRequest) -> Result<Vec<u8>, OriginError> {
        let result = self.exchange(request).await;
        metrics::record_origin_fetch(result.as_ref().ok().map(Vec::len));
        result
    }

    async fn exchange(&self, request: &ProxyRequest) -> Result<Vec<u8>, OriginError> {
        let (name, port) = origin_address(&request.host, self.default_port);
        let origin = format!("{name}:{port}");

        let mut stream = self.connect(name, port, &origin).await?;
        let outbound = build_request(request);

        let exchange = async {
            stream.write_all(&outbound).await?;
            stream.flush().await?;
            let mut response = Vec::new();
            stream.read_to_end(&mut response).await?;
            Ok::<_, std::io::Error>(response)
        };

        let response = match time::timeout(self.response_timeout, exchange).await {
            Ok(Ok(response)) => response,
            Ok(Err(source)) => return Err(OriginError::Io { origin, source }),
            Err(_) => {
                return Err(OriginError::Timeout {
                    origin,
                    stage: "respond",
                    limit: self.response_timeout,
                })
            }
        };

        if response.is_empty() {
            return Err(OriginError::EmptyResponse(origin));
        }

        tracing::debug!(origin = %origin, bytes = response.len(), "Origin response received");
        Ok(response)
    }

    async fn connect(&self, name: &str, port: u16, origin: &str) -> Result<TcpStream, OriginError> {
        let mut attempts = 0;
        loop {
            attempts += 1;
            let error = match time::timeout(self.connect_timeout, TcpStream::connect((name, port))).await {
                Ok(Ok(stream)) => {
                    tracing::debug!(origin = %origin, attempt = attempts, "Connected to origin");
                    return Ok(stream);
                }
                Ok(Err(source)) => OriginError::Connect {
                    origin: origin.to_string(),
                    source,
                },
                Err(_) => OriginError::Timeout {
                    origin: origin.to_string(),
                    stage: "accept the connection",
                    limit: self.connect_timeout,
                },
            };

            match self.retries.next_delay(attempts) {
                Some(delay) => {
                    tracing::info!(origin = %origin, attempt = attempts, delay = ?delay, error = %error, "Retrying origin connect");
                    time::sleep(delay).await;
                }
                None => return Err(error),
            }
        }
    }
}

/// Serialize the outbound HTTP/1.0 request for `request`.
pub fn build_request(request: &ProxyRequest) -> Vec<u8> {
    let mut head = format!(
        "{} {} HTTP/1.0\r\nHost: {}\r\nConnection: close\r\n",
        request.method(),
        request.path,
        request.host
    );
    for (name, value) in request.request.headers.iter() {
        if REBUILT_HEADERS.iter().any(|h| h.eq_ignore_ascii_case(name)) {
            continue;
        }
        head.push_str(name);
        head.push_str(": ");
        head.push_str(value);
        head.push_str("\r\n");
    }
    head.push_str("\r\n");

    let mut bytes = head.into_bytes();
    if let Some(body) = &request.request.body {
        bytes.extend_from_slice(body);
    }
    bytes
}

/// Split a Host value into connect name and port.
///
/// Bracketed IPv6 literals lose their brackets; a bare IPv6 literal is
/// taken as a name without a port.
pub fn origin_address(host: &str, default_port: u16) -> (&str, u16) {
    if let Some(rest) = host.strip_prefix('[') {
        return match rest.split_once(']') {
            Some((addr, tail)) => {
                let port = tail
                    .strip_prefix(':')
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(default_port);
                (addr, port)
            }
            None => (host, default_port),
        };
    }

    match host.rsplit_once(':') {
        Some((name, port)) if !name.contains(':') => match port.parse() {
            Ok(port) => (name, port),
            Err(_) => (host, default_port),
        },
        _ => (host, default_port),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::request::{HostContinuity, Request, HEADER_TERMINATOR};
    use tokio::net::TcpListener;

    fn proxy_request(raw: &[u8]) -> ProxyRequest {
        Request::parse(raw)
            .unwrap()
            .resolve(&mut HostContinuity::new())
            .unwrap()
    }

    fn client() -> OriginClient {
        let timeouts = TimeoutConfig {
            connect_secs: 2,
            request_secs: 2,
            client_read_secs: 2,
        };
        OriginClient::new(80, &timeouts, RetryPolicy::none())
    }

    #[test]
    fn rebuilds_request_line_and_headers() {
        let req = proxy_request(
            b"GET http://example.com/a?b=1 HTTP/1.1\r\nhost: example.com\r\nConnection: keep-alive\r\nAccept: */*\r\n\r\n",
        );
        let outbound = String::from_utf8(build_request(&req)).unwrap();
        assert_eq!(
            outbound,
            "GET /a?b=1 HTTP/1.0\r\nHost: example.com\r\nConnection: close\r\nAccept: */*\r\n\r\n"
        );
    }

    #[test]
    fn appends_body_after_headers() {
        let req = proxy_request(b"POST /form HTTP/1.0\r\nHost: a.com\r\nContent-Length: 3\r\n\r\nx=1");
        let outbound = build_request(&req);
        assert!(outbound.ends_with(b"Content-Length: 3\r\n\r\nx=1"));
    }

    #[test]
    fn splits_host_and_port() {
        assert_eq!(origin_address("example.com", 80), ("example.com", 80));
        assert_eq!(origin_address("example.com:8080", 80), ("example.com", 8080));
        assert_eq!(origin_address("example.com:http", 80), ("example.com:http", 80));
        assert_eq!(origin_address("[::1]:8081", 80), ("::1", 8081));
        assert_eq!(origin_address("[::1]", 80), ("::1", 80));
        assert_eq!(origin_address("::1", 80), ("::1", 80));
    }

    #[tokio::test]
    async fn fetch_reads_until_origin_closes() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let origin = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut received = Vec::new();
            let mut buf = [0u8; 1024];
            while !received.ends_with(HEADER_TERMINATOR) {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                received.extend_from_slice(&buf[..n]);
            }
            socket.write_all(b"HTTP/1.0 200 OK\r\n\r\n").await.unwrap();
            socket.write_all(b"streamed body").await.unwrap();
            socket.shutdown().await.unwrap();
            received
        });

        let raw = format!("GET /page HTTP/1.0\r\nHost: {addr}\r\n\r\n");
        let response = client().fetch(&proxy_request(raw.as_bytes())).await.unwrap();
        assert_eq!(response, b"HTTP/1.0 200 OK\r\n\r\nstreamed body".to_vec());

        let received = String::from_utf8(origin.await.unwrap()).unwrap();
        assert!(received.starts_with("GET /page HTTP/1.0\r\n"));
        assert!(received.contains("Connection: close\r\n"));
    }

    #[tokio::test]
    async fn refused_connection_is_connect_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let raw = format!("GET / HTTP/1.0\r\nHost: {addr}\r\n\r\n");
        let err = client().fetch(&proxy_request(raw.as_bytes())).await.unwrap_err();
        assert!(matches!(err, OriginError::Connect { .. }));
        assert!(!err.is_timeout());
    }

    #[tokio::test]
    async fn silent_close_is_empty_response() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;
            let _ = socket.shutdown().await;
        });

        let raw = format!("GET / HTTP/1.0\r\nHost: {addr}\r\n\r\n");
        let err = client().fetch(&proxy_request(raw.as_bytes())).await.unwrap_err();
        assert!(matches!(err, OriginError::EmptyResponse(_)));
    }

    #[tokio::test]
    async fn stalled_origin_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
            drop(socket);
        });

        let timeouts = TimeoutConfig {
            connect_secs: 1,
            request_secs: 1,
            client_read_secs: 1,
        };
        let client = OriginClient::new(80, &timeouts, RetryPolicy::none());
        let raw = format!("GET / HTTP/1.0\r\nHost: {addr}\r\n\r\n");
        let err = client.fetch(&proxy_request(raw.as_bytes())).await.unwrap_err();
        assert!(err.is_timeout());
    }
}
