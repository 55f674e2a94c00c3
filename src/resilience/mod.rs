//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Cache miss → origin fetch:
//!     → connect (bounded by timeouts.connect_secs)
//!     → on connect failure: retries.rs decides, backoff.rs waits
//!     → request/response exchange (bounded by timeouts.request_secs)
//! ```
//!
//! # Design Decisions
//! - Every external call has a deadline
//! - Retries are opt-in and limited to connection establishment

pub mod backoff;
pub mod retries;

pub use backoff::Backoff;
pub use retries::RetryPolicy;
