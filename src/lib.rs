//! HTTP/1.0 caching forward proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌──────────────────────────────────────────────────────┐
//!                    │                   CACHING PROXY                      │
//!                    │                                                      │
//!   Client Request   │  ┌─────────┐    ┌──────────┐    ┌──────────────┐     │
//!   ─────────────────┼─▶│   net   │───▶│   http   │───▶│    cache     │     │
//!                    │  │listener │    │ request  │    │   resolver   │     │
//!                    │  │ session │    │  parser  │    └──────┬───────┘     │
//!                    │  └─────────┘    └──────────┘       hit │ miss        │
//!                    │                                ┌──────┴──────┐      │
//!                    │                                ▼             ▼      │
//!                    │                         ┌────────────┐ ┌─────────┐   │
//!                    │                         │cache store │ │ origin  │◀──┼── Origin
//!                    │                         │  (disk)    │◀│ client  │   │   Server
//!                    │                         └─────┬──────┘ └─────────┘   │
//!   Client Response  │  ┌─────────┐                  │                      │
//!   ◀────────────────┼──│ session │◀─────────────────┘                      │
//!                    │  └─────────┘                                         │
//!                    │  config · lifecycle · observability · resilience     │
//!                    └──────────────────────────────────────────────────────┘
//! ```
//!
//! One client is served end to end before the next is accepted.

pub mod cache;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod origin;
pub mod resilience;

pub use cache::{CacheKey, CacheStore};
pub use config::ProxyConfig;
pub use http::ProxyServer;
pub use lifecycle::Shutdown;
