//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept)
//!     → connection.rs (ProxySession: one read, one write, close)
//!     → Hand off to the HTTP layer for parsing and resolution
//!
//! Session States:
//!     Accepted → RequestReceived → Validated → Resolved → Responded → Closed
//! ```
//!
//! # Design Decisions
//! - Exactly one session is in flight; the next accept waits for Closed
//! - Client reads are a single bounded read with a deadline

pub mod connection;
pub mod listener;

pub use connection::{ProxySession, ReceiveError, SessionId, SessionState};
pub use listener::{Listener, ListenerError};
