//! Request metadata carried through the request's extensions.
//!
//! # Responsibilities
//! - Build a `RequestInfo` once per request at ingestion
//! - Attach and retrieve it from the request extensions
//! - Attach the completion timestamp separately, once known
//!
//! # Design Decisions
//! - `RequestInfo` is never mutated in place after attachment; re-attaching
//!   replaces it
//! - Completion time lives in its own `EndTimestamp` extension, so its
//!   absence is the signal that timing is not yet known
//! - Query parameters are kept sorted by key for deterministic rendering

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::extract::ConnectInfo;
use axum::http::{HeaderMap, Request};
use chrono::{Local, TimeZone};

/// Header carrying the caller identity.
pub const COMPONENT_HEADER: &str = "component";

/// Component recorded when the caller does not identify itself.
pub const ANONYMOUS_COMPONENT: &str = "anonymous";

/// Service label a router attaches to a route.
///
/// ```rust,ignore
/// Router::new()
///     .route("/pd/api/v1/regions", get(handler))
///     .layer(Extension(ServiceLabel::new("GetRegions")))
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceLabel(pub String);

impl ServiceLabel {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }
}

/// Unix seconds at which the request finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndTimestamp(pub i64);

/// Structured metadata describing one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestInfo {
    /// Logical API name, empty if unclassified.
    pub service_label: String,
    /// Protocol, verb and path, e.g. `HTTP/1.1/GET:/test`.
    pub method: String,
    /// Caller identity, `anonymous` when absent.
    pub component: String,
    pub ip: String,
    /// Unix seconds at ingestion.
    pub start_timestamp: i64,
    pub url_param: BTreeMap<String, Vec<String>>,
    /// Captured body, best effort.
    pub body_param: String,
}

impl RequestInfo {
    /// Extract metadata from a request. The body is not read; see
    /// [`RequestInfo::with_body_param`].
    pub fn from_request<B>(req: &Request<B>) -> Self {
        let service_label = req
            .extensions()
            .get::<ServiceLabel>()
            .map(|l| l.0.clone())
            .unwrap_or_default();

        let method = format!(
            "{:?}/{}:{}",
            req.version(),
            req.method(),
            req.uri().path()
        );

        let component = req
            .headers()
            .get(COMPONENT_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .unwrap_or(ANONYMOUS_COMPONENT)
            .to_string();

        let peer = req
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);

        Self {
            service_label,
            method,
            component,
            ip: client_ip(req.headers(), peer),
            start_timestamp: unix_now(),
            url_param: parse_query(req.uri().query()),
            body_param: String::new(),
        }
    }

    /// Set the captured body.
    pub fn with_body_param(mut self, body: impl Into<String>) -> Self {
        self.body_param = body.into();
        self
    }
}

/// Resolve the client address: `X-Forwarded-For` first entry, then
/// `X-Real-Ip`, then the peer address.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    if let Some(ip) = forwarded {
        return ip.to_string();
    }

    let real_ip = headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    if let Some(ip) = real_ip {
        return ip.to_string();
    }

    peer.map(|addr| addr.ip().to_string()).unwrap_or_default()
}

fn parse_query(query: Option<&str>) -> BTreeMap<String, Vec<String>> {
    let mut params: BTreeMap<String, Vec<String>> = BTreeMap::new();
    if let Some(query) = query {
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            params.entry(key.into_owned()).or_default().push(value.into_owned());
        }
    }
    params
}

/// Current unix time in seconds.
pub fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

/// Render unix seconds as local time, e.g. `2022-05-10 12:00:00 +0800`.
/// No zone abbreviation follows the offset.
pub fn format_start_time(ts: i64) -> String {
    match Local.timestamp_opt(ts, 0).single() {
        Some(t) => t.format("%Y-%m-%d %H:%M:%S %z").to_string(),
        None => ts.to_string(),
    }
}

/// Attach request metadata, replacing any previous carrier.
pub fn with_request_info<B>(req: &mut Request<B>, info: RequestInfo) {
    req.extensions_mut().insert(info);
}

/// Metadata attached to the request, if any.
pub fn request_info<B>(req: &Request<B>) -> Option<&RequestInfo> {
    req.extensions().get::<RequestInfo>()
}

/// Attach the completion timestamp.
pub fn with_end_time<B>(req: &mut Request<B>, end: i64) {
    req.extensions_mut().insert(EndTimestamp(end));
}

/// Completion timestamp, absent until the request has finished.
pub fn end_time<B>(req: &Request<B>) -> Option<i64> {
    req.extensions().get::<EndTimestamp>().map(|e| e.0)
}
