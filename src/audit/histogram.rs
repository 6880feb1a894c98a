//! Latency histogram backend.
//!
//! # Responsibilities
//! - Observe request handling seconds by `(service, method, component)`
//! - Run after the handler, once the completion time is attached
//!
//! # Design Decisions
//! - No state besides the histogram handle and the `enabled` flag, both
//!   read-only after construction
//! - A missing completion time is a skip; it is never synthesized

use axum::body::Body;
use axum::http::Request;

use crate::audit::backend::Backend;
use crate::http::request::{end_time, request_info};
use crate::observability::metrics::HistogramVec;

/// Label names of the audit histogram, in observation order.
pub const AUDIT_HISTOGRAM_LABELS: [&str; 3] = ["service", "method", "component"];

/// Records request latency into a cumulative histogram.
#[derive(Debug, Clone)]
pub struct PrometheusHistogramBackend {
    histogram_vec: HistogramVec,
    enabled: bool,
}

impl PrometheusHistogramBackend {
    /// `histogram_vec` must be registered with [`AUDIT_HISTOGRAM_LABELS`].
    pub fn new(histogram_vec: HistogramVec, enabled: bool) -> Self {
        Self {
            histogram_vec,
            enabled,
        }
    }
}

impl Backend for PrometheusHistogramBackend {
    fn process_http_request(&self, req: &Request<Body>) -> bool {
        if !self.enabled {
            return false;
        }
        let Some(info) = request_info(req) else {
            return false;
        };
        let Some(end) = end_time(req) else {
            return false;
        };

        let elapsed = end.saturating_sub(info.start_timestamp);
        self.histogram_vec
            .with_label_values(&[
                info.service_label.as_str(),
                info.method.as_str(),
                info.component.as_str(),
            ])
            .record(elapsed as f64);
        true
    }

    fn process_before_handler(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::request::{with_end_time, with_request_info, RequestInfo};
    use crate::observability::metrics::{HistogramOpts, MetricsRegistry, DEFAULT_BUCKETS};

    fn histogram(registry: &MetricsRegistry) -> HistogramVec {
        registry.histogram_vec(
            HistogramOpts {
                namespace: "pd".into(),
                subsystem: "service".into(),
                name: "audit_handling_seconds_test".into(),
                help: "PD server service handling audit".into(),
            },
            &AUDIT_HISTOGRAM_LABELS,
        )
    }

    fn request() -> Request<Body> {
        Request::builder()
            .uri("http://127.0.0.1:2379/test?test=test")
            .body(Body::default())
            .unwrap()
    }

    #[test]
    fn test_prometheus_histogram_backend() {
        let registry = MetricsRegistry::new(&DEFAULT_BUCKETS).unwrap();
        let backend = PrometheusHistogramBackend::new(histogram(&registry), true);

        let mut req = request();
        let mut info = RequestInfo::from_request(&req);
        info.service_label = "test".into();
        info.component = "user1".into();
        with_request_info(&mut req, info.clone());
        assert!(!backend.process_http_request(&req));

        with_end_time(&mut req, info.start_timestamp + 20);
        assert!(backend.process_http_request(&req));
        assert!(backend.process_http_request(&req));

        info.component = "user2".into();
        with_request_info(&mut req, info);
        assert!(backend.process_http_request(&req));

        let output = registry.render();
        assert!(output.contains(
            "pd_service_audit_handling_seconds_test_count{component=\"user1\",method=\"HTTP/1.1/GET:/test\",service=\"test\"} 2"
        ));
        assert!(output.contains(
            "pd_service_audit_handling_seconds_test_count{component=\"user2\",method=\"HTTP/1.1/GET:/test\",service=\"test\"} 1"
        ));
    }

    #[test]
    fn test_missing_end_time_records_nothing() {
        let registry = MetricsRegistry::new(&DEFAULT_BUCKETS).unwrap();
        let backend = PrometheusHistogramBackend::new(histogram(&registry), true);

        let mut req = request();
        assert!(!backend.process_http_request(&req));

        let info = RequestInfo::from_request(&req);
        with_request_info(&mut req, info);
        assert!(!backend.process_http_request(&req));

        assert!(!registry.render().contains("audit_handling_seconds_test_count"));
    }

    #[test]
    fn test_disabled_backend_never_records() {
        let registry = MetricsRegistry::new(&DEFAULT_BUCKETS).unwrap();
        let backend = PrometheusHistogramBackend::new(histogram(&registry), false);

        let mut req = request();
        let info = RequestInfo::from_request(&req);
        let start = info.start_timestamp;
        with_request_info(&mut req, info);
        assert!(!backend.process_http_request(&req));
        with_end_time(&mut req, start + 1);
        assert!(!backend.process_http_request(&req));

        assert!(!registry.render().contains("audit_handling_seconds_test_count"));
    }

    #[test]
    fn test_runs_after_handler() {
        let registry = MetricsRegistry::new(&DEFAULT_BUCKETS).unwrap();
        assert!(!PrometheusHistogramBackend::new(histogram(&registry), true).process_before_handler());
    }
}
