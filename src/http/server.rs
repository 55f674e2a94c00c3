//! Proxy server and per-connection session driver.
//!
//! # Responsibilities
//! - Own the listener, the cache resolver and host continuity
//! - Accept connections and drive each session to Closed before the next accept
//! - Turn every failure into a response (or a silent drop) for that session only
//! - Stop accepting when shutdown is triggered

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tracing::Instrument;

use crate::cache::{CacheError, CacheResolver, CacheStore, Method, Resolved};
use crate::config::ProxyConfig;
use crate::http::error::ProxyError;
use crate::http::request::{HostContinuity, Request};
use crate::http::response;
use crate::net::{Listener, ListenerError, ProxySession, ReceiveError, SessionState};
use crate::observability::metrics;
use crate::origin::OriginClient;

/// Fatal startup errors.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Listener(#[from] ListenerError),

    #[error("failed to open cache store: {0}")]
    Cache(#[from] CacheError),
}

/// The caching forward proxy.
#[derive(Debug)]
pub struct ProxyServer {
    listener: Listener,
    resolver: CacheResolver,
    hosts: HostContinuity,
    read_buffer_size: usize,
    client_read_timeout: Duration,
}

impl ProxyServer {
    /// Bind the listener and open the cache store described by `config`.
    pub async fn bind(config: &ProxyConfig) -> Result<Self, ServerError> {
        let store = CacheStore::open(&config.cache.directory).await?;
        let listener = Listener::bind(&config.listener.bind_address).await?;

        tracing::info!(
            cache_dir = %store.root().display(),
            default_origin_port = config.origin.default_port,
            read_buffer_size = config.listener.read_buffer_size,
            "Proxy server ready"
        );

        Ok(Self {
            listener,
            resolver: CacheResolver::new(store, OriginClient::from_config(config)),
            hosts: HostContinuity::new(),
            read_buffer_size: config.listener.read_buffer_size,
            client_read_timeout: Duration::from_secs(config.timeouts.client_read_secs),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, std::io::Error> {
        self.listener.local_addr()
    }

    /// Serve connections one after another until `shutdown` fires.
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) -> Result<(), ServerError> {
        let addr = self.listener.local_addr().map_err(ListenerError::Accept)?;
        tracing::info!(address = %addr, "Proxy server accepting connections");

        loop {
            let (stream, peer) = tokio::select! {
                accepted = self.listener.accept() => match accepted {
                    Ok(conn) => conn,
                    Err(e) => {
                        tracing::warn!(error = %e, "Accept failed");
                        continue;
                    }
                },
                _ = shutdown.recv() => break,
            };

            self.serve(stream, peer).await;
        }

        tracing::info!(address = %addr, "Proxy server stopped");
        Ok(())
    }

    /// Drive one session from Accepted to Closed.
    async fn serve(&mut self, stream: TcpStream, peer: SocketAddr) {
        let session = ProxySession::new(stream, peer);
        let span = tracing::info_span!("session", id = %session.id(), peer = %peer);
        self.drive(session).instrument(span).await;
    }

    async fn drive(&mut self, mut session: ProxySession) {
        let start = Instant::now();

        let raw = match session
            .receive(self.read_buffer_size, self.client_read_timeout)
            .await
        {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                tracing::debug!("Client closed without sending data");
                metrics::record_session_dropped("empty_request");
                session.close().await;
                return;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Dropping session");
                let reason = match e {
                    ReceiveError::TimedOut(_) => "client_timeout",
                    ReceiveError::Io(_) => "read_error",
                };
                metrics::record_session_dropped(reason);
                session.close().await;
                return;
            }
        };

        let (method, result) = self.handle(&mut session, &raw).await;
        let (bytes, outcome) = match result {
            Ok(Resolved { outcome, bytes }) => (bytes, outcome.as_str()),
            Err(e) => {
                tracing::warn!(error = %e, status = e.status().code, "Request failed");
                (e.to_response(), "error")
            }
        };

        let status = response::status_code(&bytes).unwrap_or_default();
        match session.respond(&bytes).await {
            Ok(()) => {
                let method_label = match method.as_str() {
                    "GET" | "POST" => method.as_str(),
                    _ => "other",
                };
                metrics::record_request(method_label, status, outcome, start);
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to send response");
                metrics::record_session_dropped("write_error");
            }
        }

        tracing::debug!(
            status,
            outcome,
            bytes = bytes.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Session complete"
        );
        session.close().await;
    }

    /// Parse, resolve and look up one request. Returns the method for metrics.
    async fn handle(
        &mut self,
        session: &mut ProxySession,
        raw: &[u8],
    ) -> (String, Result<Resolved, ProxyError>) {
        let request = match Request::parse(raw) {
            Ok(request) => request,
            Err(e) => return ("unknown".to_string(), Err(e.into())),
        };
        let method = request.method.clone();
        tracing::debug!(method = %method, target = %request.target, version = %request.version, "Request received");
        session.advance(SessionState::Validated);

        // The method gate does not depend on a Host being known.
        if Method::parse(&method).is_none() {
            self.hosts.remember(request.headers.get("host"));
            tracing::info!(method = %method, "Method not allowed");
            session.advance(SessionState::Resolved);
            return (method, Ok(Resolved::method_not_allowed()));
        }

        let request = match request.resolve(&mut self.hosts) {
            Ok(request) => request,
            Err(e) => return (method, Err(e.into())),
        };

        let result = self.resolver.resolve(&request).await;
        if result.is_ok() {
            session.advance(SessionState::Resolved);
        }
        (method, result)
    }
}
