//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! ProxySession (raw bytes, one read)
//!     → request.rs (split at CRLFCRLF, parse, resolve Host + relative path)
//!     → [cache resolver decides hit/miss]
//!     → response.rs (canned responses for 405 and errors)
//!     → server.rs (relay bytes verbatim, close)
//! ```

pub mod error;
pub mod request;
pub mod response;
pub mod server;

pub use error::ProxyError;
pub use request::{Headers, HostContinuity, ProxyRequest, Request, RequestError};
pub use server::{ProxyServer, ServerError};
