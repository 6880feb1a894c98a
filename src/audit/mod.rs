//! Request auditing subsystem.
//!
//! # Data Flow
//! ```text
//! Request with RequestInfo attached
//!     → dispatcher.rs (service label → BackendLabels)
//!     → labels.rs (each entry's LabelMatcher checks the labels)
//!     → backend.rs (phase check, process_http_request)
//!         - histogram.rs (latency observation, after handler)
//!         - local_log.rs (audit line, before handler)
//!     → number of backends that recorded
//! ```
//!
//! # Design Decisions
//! - One single-method contract shared by every sink
//! - Skips are boolean outcomes, never errors
//! - Backends are long-lived and shared across concurrent requests

pub mod backend;
pub mod dispatcher;
pub mod histogram;
pub mod labels;
pub mod local_log;

pub use backend::{AuditPhase, Backend};
pub use dispatcher::{AuditDispatcher, AuditEntry};
pub use histogram::{PrometheusHistogramBackend, AUDIT_HISTOGRAM_LABELS};
pub use labels::{BackendLabels, LabelMatcher, LOCAL_LOG, PROMETHEUS_HISTOGRAM};
pub use local_log::{render_service_info, LocalLogBackend, AUDIT_LOG_MESSAGE};
