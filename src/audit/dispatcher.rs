//! Backend dispatch.
//!
//! # Responsibilities
//! - Hold the ordered `(LabelMatcher, Backend)` sequence
//! - Hold the backend labels registered per service
//! - Run the backends of one phase whose matcher accepts the service labels
//!
//! # Design Decisions
//! - Entries are fixed at construction; only the switch and the service
//!   label map change at runtime
//! - A service without registered labels is not audited
//! - The runtime switch is independent of each backend's own `enabled` flag

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::body::Body;
use axum::http::Request;
use dashmap::DashMap;

use crate::audit::backend::{AuditPhase, Backend};
use crate::audit::histogram::{PrometheusHistogramBackend, AUDIT_HISTOGRAM_LABELS};
use crate::audit::labels::{BackendLabels, LabelMatcher, LOCAL_LOG, PROMETHEUS_HISTOGRAM};
use crate::audit::local_log::LocalLogBackend;
use crate::config::AuditConfig;
use crate::http::request::request_info;
use crate::observability::metrics::MetricsRegistry;

/// One configured backend and the label it answers to.
#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub matcher: LabelMatcher,
    pub backend: Arc<dyn Backend>,
}

/// Routes audited requests through the configured backends.
#[derive(Debug)]
pub struct AuditDispatcher {
    entries: Vec<AuditEntry>,
    service_labels: DashMap<String, BackendLabels>,
    enabled: AtomicBool,
}

impl Default for AuditDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl AuditDispatcher {
    /// Create an enabled dispatcher with no backends.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            service_labels: DashMap::new(),
            enabled: AtomicBool::new(true),
        }
    }

    /// Build the histogram and local log backends from config.
    ///
    /// The registry should come from [`MetricsRegistry::from_config`] on the
    /// same config, or the configured buckets are not applied.
    pub fn from_config(config: &AuditConfig, registry: &MetricsRegistry) -> Self {
        let opts = config.metrics.histogram_opts();
        let fq_name = opts.fq_name();
        if registry.buckets_for(&fq_name) != config.metrics.buckets.as_slice() {
            tracing::warn!(
                metric = %fq_name,
                "Metrics registry buckets differ from the configured audit buckets"
            );
        }
        let histogram_vec = registry.histogram_vec(opts, &AUDIT_HISTOGRAM_LABELS);

        let dispatcher = Self::new()
            .with_backend(
                LabelMatcher::new(PROMETHEUS_HISTOGRAM),
                Arc::new(PrometheusHistogramBackend::new(histogram_vec, config.metrics.enabled)),
            )
            .with_backend(
                LabelMatcher::new(LOCAL_LOG),
                Arc::new(LocalLogBackend::new(config.log.enabled)),
            );
        dispatcher.set_enabled(config.enable_audit);
        for service in &config.services {
            dispatcher.set_service_labels(&service.name, service.backend_labels());
        }

        tracing::info!(
            enabled = config.enable_audit,
            services = config.services.len(),
            backends = dispatcher.entries.len(),
            "Audit dispatcher configured"
        );
        dispatcher
    }

    /// Append a backend answering to `matcher`.
    pub fn with_backend(mut self, matcher: LabelMatcher, backend: Arc<dyn Backend>) -> Self {
        self.entries.push(AuditEntry { matcher, backend });
        self
    }

    pub fn entries(&self) -> &[AuditEntry] {
        &self.entries
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    /// Register or replace the labels of a service.
    pub fn set_service_labels(&self, service: &str, labels: BackendLabels) {
        self.service_labels.insert(service.to_string(), labels);
    }

    pub fn service_labels(&self, service: &str) -> Option<BackendLabels> {
        self.service_labels.get(service).map(|l| l.value().clone())
    }

    /// Replace the runtime switch and service labels from a reloaded config.
    pub fn apply_config(&self, config: &AuditConfig) {
        self.set_enabled(config.enable_audit);
        self.service_labels
            .retain(|name, _| config.services.iter().any(|s| s.name == *name));
        for service in &config.services {
            self.set_service_labels(&service.name, service.backend_labels());
        }
        tracing::info!(
            enabled = config.enable_audit,
            services = config.services.len(),
            "Audit config applied"
        );
    }

    /// Run the backends of `phase` matching the request's service.
    /// Returns how many recorded the request.
    pub fn dispatch(&self, req: &Request<Body>, phase: AuditPhase) -> usize {
        if !self.is_enabled() {
            return 0;
        }
        let Some(info) = request_info(req) else {
            return 0;
        };
        let Some(labels) = self.service_labels(&info.service_label) else {
            return 0;
        };

        let fired = self
            .entries
            .iter()
            .filter(|entry| phase.includes(entry.backend.as_ref()))
            .filter(|entry| entry.matcher.matches(&labels))
            .filter(|entry| entry.backend.process_http_request(req))
            .count();

        tracing::debug!(
            service = %info.service_label,
            method = %info.method,
            phase = ?phase,
            fired,
            "Audit dispatched"
        );
        fired
    }
}
