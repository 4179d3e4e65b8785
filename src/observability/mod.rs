//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! config store / generator produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (update and failure counters)
//! ```

pub mod logging;
pub mod metrics;
