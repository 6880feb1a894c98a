//! Audit middleware.
//!
//! # Responsibilities
//! - Build and attach `RequestInfo` at ingestion
//! - Capture small request bodies into `body_param`
//! - Dispatch before-handler backends, run the handler, attach the
//!   completion time, dispatch after-handler backends
//!
//! # Design Decisions
//! - Auditing never alters the response or fails the request
//! - Bodies are captured only when their exact size is known and within the
//!   limit; anything else streams through untouched
//! - A body that fails while being captured is handed on as a body yielding
//!   the same error, so the handler sees the failure it would have seen
//! - The after-handler phase runs on a body-less copy of the request that
//!   carries the same metadata

use std::sync::Arc;

use axum::{
    body::{Body, Bytes, HttpBody},
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::audit::backend::AuditPhase;
use crate::audit::dispatcher::AuditDispatcher;
use crate::http::request::{unix_now, with_end_time, with_request_info, RequestInfo};

/// Shared state for [`audit_middleware`].
#[derive(Debug, Clone)]
pub struct AuditState {
    pub dispatcher: Arc<AuditDispatcher>,
    pub max_body_bytes: usize,
}

impl AuditState {
    pub fn new(dispatcher: Arc<AuditDispatcher>, max_body_bytes: usize) -> Self {
        Self {
            dispatcher,
            max_body_bytes,
        }
    }
}

/// Middleware function auditing each request around the handler.
///
/// ```rust,ignore
/// let app = Router::new()
///     .route("/pd/api/v1/regions", get(handler))
///     .layer(middleware::from_fn_with_state(state, audit_middleware));
/// ```
pub async fn audit_middleware(
    State(state): State<AuditState>,
    request: Request,
    next: Next,
) -> Response {
    if !state.dispatcher.is_enabled() {
        return next.run(request).await;
    }

    let (request, body_param) = capture_body(request, state.max_body_bytes).await;
    let info = RequestInfo::from_request(&request).with_body_param(body_param);

    let mut request = request;
    with_request_info(&mut request, info.clone());
    state.dispatcher.dispatch(&request, AuditPhase::BeforeHandler);

    let mut audit_copy = body_less_copy(&request, info);
    let response = next.run(request).await;

    with_end_time(&mut audit_copy, unix_now());
    state.dispatcher.dispatch(&audit_copy, AuditPhase::AfterHandler);

    response
}

async fn capture_body(request: Request, limit: usize) -> (Request, String) {
    let exact = request.body().size_hint().exact();
    match exact {
        Some(len) if len > 0 && len <= limit as u64 => {}
        _ => return (request, String::new()),
    }

    let (parts, body) = request.into_parts();
    match axum::body::to_bytes(body, limit).await {
        Ok(bytes) => {
            let body_param = String::from_utf8_lossy(&bytes).into_owned();
            (Request::from_parts(parts, Body::from(bytes)), body_param)
        }
        Err(e) => {
            tracing::warn!(error = %e, path = %parts.uri.path(), "Failed to capture request body");
            let replay = Body::from_stream(futures_util::stream::iter([Err::<Bytes, _>(e)]));
            (Request::from_parts(parts, replay), String::new())
        }
    }
}

fn body_less_copy(request: &Request, info: RequestInfo) -> Request {
    let mut copy = Request::new(Body::empty());
    *copy.method_mut() = request.method().clone();
    *copy.uri_mut() = request.uri().clone();
    *copy.version_mut() = request.version();
    *copy.headers_mut() = request.headers().clone();
    with_request_info(&mut copy, info);
    copy
}
