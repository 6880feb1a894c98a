//! Local log backend.
//!
//! Emits one `"Audit Log"` event per request carrying a `service-info` field.
//! The rendering is read by external log scrapers; keep field order and
//! punctuation unchanged.

use axum::body::Body;
use axum::http::Request;

use crate::audit::backend::Backend;
use crate::http::request::{format_start_time, request_info, RequestInfo, ANONYMOUS_COMPONENT};

/// Message every audit event is tagged with.
pub const AUDIT_LOG_MESSAGE: &str = "Audit Log";

/// Writes an audit line through the installed tracing subscriber.
#[derive(Debug, Clone)]
pub struct LocalLogBackend {
    enabled: bool,
}

impl LocalLogBackend {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }
}

impl Backend for LocalLogBackend {
    fn process_http_request(&self, req: &Request<Body>) -> bool {
        if !self.enabled {
            return false;
        }
        let Some(info) = request_info(req) else {
            return false;
        };

        tracing::info!({ "service-info" = %render_service_info(info) }, "{}", AUDIT_LOG_MESSAGE);
        true
    }

    fn process_before_handler(&self) -> bool {
        true
    }
}

/// Render metadata as
/// `{ServiceLabel:<s>, Method:<m>, Component:<c>, IP:<ip>, StartTime:<t>, URLParam:<json>, BodyParam:<raw>}`.
/// An empty component renders as `anonymous`.
pub fn render_service_info(info: &RequestInfo) -> String {
    let url_param = serde_json::to_string(&info.url_param).unwrap_or_default();
    let component = if info.component.is_empty() {
        ANONYMOUS_COMPONENT
    } else {
        info.component.as_str()
    };
    format!(
        "{{ServiceLabel:{}, Method:{}, Component:{}, IP:{}, StartTime:{}, URLParam:{}, BodyParam:{}}}",
        info.service_label,
        info.method,
        component,
        info.ip,
        format_start_time(info.start_timestamp),
        url_param,
        info.body_param,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn info() -> RequestInfo {
        let mut url_param = BTreeMap::new();
        url_param.insert("test".to_string(), vec!["test".to_string()]);
        RequestInfo {
            service_label: String::new(),
            method: "HTTP/1.1/GET:/test".into(),
            component: "anonymous".into(),
            ip: String::new(),
            start_timestamp: 1_652_155_200,
            url_param,
            body_param: "testBody".into(),
        }
    }

    #[test]
    fn test_render_service_info() {
        let expected = format!(
            "{{ServiceLabel:, Method:HTTP/1.1/GET:/test, Component:anonymous, IP:, StartTime:{}, URLParam:{{\"test\":[\"test\"]}}, BodyParam:testBody}}",
            format_start_time(1_652_155_200)
        );
        assert_eq!(render_service_info(&info()), expected);
    }

    #[test]
    fn test_render_multi_value_params() {
        let mut info = info();
        info.url_param.insert("ids".into(), vec!["1".into(), "2".into()]);
        let rendered = render_service_info(&info);
        assert!(rendered.contains("URLParam:{\"ids\":[\"1\",\"2\"],\"test\":[\"test\"]}"));
    }

    #[test]
    fn test_empty_component_renders_anonymous() {
        let mut info = info();
        info.component.clear();
        assert!(render_service_info(&info).contains(", Component:anonymous, IP:"));
    }

    #[test]
    fn test_local_log_backend_skips() {
        let req = Request::builder().uri("/test").body(Body::default()).unwrap();
        assert!(!LocalLogBackend::new(true).process_http_request(&req));

        let mut req = req;
        req.extensions_mut().insert(info());
        assert!(!LocalLogBackend::new(false).process_http_request(&req));
    }

    #[test]
    fn test_runs_before_handler() {
        assert!(LocalLogBackend::new(true).process_before_handler());
    }
}
