//! Audit backend abstraction.
//!
//! # Responsibilities
//! - Define the single-operation contract every audit sink implements
//! - State at which invocation point (before or after the handler) a sink runs
//!
//! # Design Decisions
//! - Skips are `false`, never errors: missing metadata and a disabled backend
//!   are both ordinary "nothing to do" outcomes
//! - Backends are shared across all in-flight requests and own their own
//!   synchronization

use axum::body::Body;
use axum::http::Request;

/// A pluggable sink turning an audited request into an observation.
pub trait Backend: Send + Sync + std::fmt::Debug {
    /// Record the request. Returns true if something was recorded.
    fn process_http_request(&self, req: &Request<Body>) -> bool;

    /// Returns true if this backend runs before the handler. Backends that
    /// need the completion time return false and run after it.
    fn process_before_handler(&self) -> bool;
}

/// Invocation point within the request lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditPhase {
    BeforeHandler,
    AfterHandler,
}

impl AuditPhase {
    /// Whether `backend` runs in this phase.
    pub fn includes(self, backend: &dyn Backend) -> bool {
        backend.process_before_handler() == (self == AuditPhase::BeforeHandler)
    }
}
