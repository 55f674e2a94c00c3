//! Origin access subsystem.
//!
//! # Data Flow
//! ```text
//! Cache miss (resolver)
//!     → client.rs: resolve host:port, connect (with retries)
//!     → write rebuilt HTTP/1.0 request
//!     → read until EOF
//!     → raw response bytes back to the resolver
//! ```

pub mod client;

pub use client::{OriginClient, OriginError};
