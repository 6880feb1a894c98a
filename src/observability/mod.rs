//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Audit backends produce:
//!     → logging.rs (one bracketed line per audit event)
//!     → metrics.rs (cumulative latency histograms)
//!
//! Consumers:
//!     → Log scrapers (stdout or file)
//!     → Metrics endpoint owned by the serving process (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Both sinks are process-wide and injected, never looked up implicitly
//!   by the backends
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;
