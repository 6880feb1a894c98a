//! HTTP request handling for auditing.
//!
//! # Data Flow
//! ```text
//! Inbound request (from the serving router)
//!     → middleware.rs (capture body, build metadata)
//!     → request.rs (RequestInfo attached to extensions)
//!     → dispatch before-handler backends
//!     → handler
//!     → request.rs (EndTimestamp attached)
//!     → dispatch after-handler backends
//! ```

pub mod middleware;
pub mod request;

pub use middleware::{audit_middleware, AuditState};
pub use request::{
    end_time, request_info, with_end_time, with_request_info, EndTimestamp, RequestInfo,
    ServiceLabel,
};
