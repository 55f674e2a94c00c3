//! Per-connection session state machine.
//!
//! # Responsibilities
//! - Generate unique session IDs for tracing
//! - Track session state (Accepted → RequestReceived → Validated → Resolved → Responded → Closed)
//! - Own the client socket for exactly one request/response exchange

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// Global atomic counter for session IDs.
static SESSION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(u64);

impl SessionId {
    /// Generate a new unique session ID.
    pub fn new() -> Self {
        Self(SESSION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// Where a session is in its accept → respond → close cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SessionState {
    Accepted,
    RequestReceived,
    Validated,
    Resolved,
    Responded,
    Closed,
}

/// Why a client read produced no request.
#[derive(Debug)]
pub enum ReceiveError {
    TimedOut(Duration),
    Io(std::io::Error),
}

impl std::fmt::Display for ReceiveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReceiveError::TimedOut(limit) => write!(f, "client sent nothing within {:?}", limit),
            ReceiveError::Io(e) => write!(f, "client read failed: {}", e),
        }
    }
}

impl std::error::Error for ReceiveError {}

/// One client connection, from accept to close.
#[derive(Debug)]
pub struct ProxySession {
    id: SessionId,
    peer: SocketAddr,
    stream: TcpStream,
    state: SessionState,
}

impl ProxySession {
    pub fn new(stream: TcpStream, peer: SocketAddr) -> Self {
        Self {
            id: SessionId::new(),
            peer,
            stream,
            state: SessionState::Accepted,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn advance(&mut self, next: SessionState) {
        tracing::trace!(session = %self.id, from = ?self.state, to = ?next, "Session state change");
        self.state = next;
    }

    /// One read of at most `buffer_size` bytes.
    ///
    /// `Ok(None)` means the client closed without sending anything.
    pub async fn receive(
        &mut self,
        buffer_size: usize,
        limit: Duration,
    ) -> Result<Option<Vec<u8>>, ReceiveError> {
        let mut buf = vec![0u8; buffer_size];
        let n = match tokio::time::timeout(limit, self.stream.read(&mut buf)).await {
            Ok(Ok(n)) => n,
            Ok(Err(e)) => return Err(ReceiveError::Io(e)),
            Err(_) => return Err(ReceiveError::TimedOut(limit)),
        };
        if n == 0 {
            return Ok(None);
        }
        buf.truncate(n);
        self.advance(SessionState::RequestReceived);
        Ok(Some(buf))
    }

    /// Write the full response in one send.
    pub async fn respond(&mut self, bytes: &[u8]) -> Result<(), std::io::Error> {
        self.stream.write_all(bytes).await?;
        self.stream.flush().await?;
        self.advance(SessionState::Responded);
        Ok(())
    }

    /// Shut the socket down and end the session.
    pub async fn close(mut self) {
        if let Err(e) = self.stream.shutdown().await {
            tracing::trace!(session = %self.id, error = %e, "Shutdown on closed socket");
        }
        self.advance(SessionState::Closed);
    }
}
