//! Pluggable HTTP request auditing.
//!
//! Every audited request carries a `RequestInfo` in its extensions and is
//! routed through the backends whose label its service carries: a latency
//! histogram, a structured audit log, or both.

pub mod audit;
pub mod config;
pub mod http;
pub mod observability;

pub use audit::{AuditDispatcher, Backend, BackendLabels, LabelMatcher};
pub use config::AuditConfig;
pub use http::{audit_middleware, AuditState, RequestInfo};
pub use observability::metrics::MetricsRegistry;
