//! Response cache subsystem.
//!
//! # Data Flow
//! ```text
//! ProxyRequest (host, path, method)
//!     → key.rs (host+path flattened into a CacheKey)
//!     → resolver.rs (method gate, hit/miss decision)
//!         hit  → store.rs read
//!         miss → origin fetch → store.rs write → store.rs read
//!     → response bytes to the session driver
//! ```
//!
//! # Design Decisions
//! - One file per key, no expiry and no eviction
//! - Method and query string are not part of the key

pub mod key;
pub mod resolver;
pub mod store;

pub use key::CacheKey;
pub use resolver::{CacheResolver, Method, Outcome, Resolved};
pub use store::{CacheError, CacheStore};
