//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Session driver, cache resolver, origin client produce:
//!     → logging.rs (structured log events, one span per session)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout (fmt layer)
//!     → Metrics endpoint (Prometheus scrape), when enabled
//! ```

pub mod logging;
pub mod metrics;
