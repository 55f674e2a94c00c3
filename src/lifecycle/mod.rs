//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (binary):
//!     Parse CLI → Load config → Validate → Init logging/metrics → Bind → Run
//!
//! Shutdown (shutdown.rs):
//!     Trigger → accept loop stops after the current session → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - An in-flight session always runs to Closed before the loop exits

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
