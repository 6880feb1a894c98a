//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Own the Prometheus recorder that accumulates audit observations
//! - Define labelled histogram families (`HistogramVec`)
//! - Render all series in the Prometheus text exposition format
//!
//! # Metrics
//! - `<namespace>_<subsystem>_<name>` (histogram): request handling seconds
//!   by `component`, `method`, `service`
//!
//! # Design Decisions
//! - The registry is injected, not installed as the global recorder, so
//!   tests and embedders can hold independent registries
//! - Bucket counters are atomics inside the recorder; observing needs no
//!   lock on our side
//! - Label pairs are ordered by label name in the exposed series
//! - Bucket bounds are fixed when the recorder is built; per-metric bounds
//!   from config are registered then
//! - Nothing drains histogram samples in the background; call
//!   `run_upkeep` periodically if scrapes are rare

use std::sync::Arc;

use metrics::{Histogram, Key, Label, Level, Metadata, Recorder, SharedString};
use metrics_exporter_prometheus::{
    BuildError, Matcher, PrometheusBuilder, PrometheusHandle, PrometheusRecorder,
};
use thiserror::Error;

use crate::config::MetricsConfig;

/// Standard Prometheus latency buckets, in seconds.
pub const DEFAULT_BUCKETS: [f64; 11] = [
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("failed to build Prometheus recorder: {0}")]
    Build(#[from] BuildError),
}

/// Naming and help text for a histogram family.
#[derive(Debug, Clone, Default)]
pub struct HistogramOpts {
    pub namespace: String,
    pub subsystem: String,
    pub name: String,
    pub help: String,
}

impl HistogramOpts {
    /// Fully qualified metric name, skipping empty parts.
    pub fn fq_name(&self) -> String {
        [&self.namespace, &self.subsystem, &self.name]
            .iter()
            .filter(|s| !s.is_empty())
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join("_")
    }
}

/// Process-wide metrics registry backed by a Prometheus recorder.
#[derive(Clone)]
pub struct MetricsRegistry {
    recorder: Arc<PrometheusRecorder>,
    handle: PrometheusHandle,
    buckets: Vec<f64>,
    overrides: Vec<(String, Vec<f64>)>,
}

impl MetricsRegistry {
    /// Create a registry rendering every histogram with the given buckets.
    pub fn new(buckets: &[f64]) -> Result<Self, MetricsError> {
        Self::build(buckets, Vec::new())
    }

    /// Create a registry whose audit histogram uses the configured buckets.
    pub fn from_config(config: &MetricsConfig) -> Result<Self, MetricsError> {
        let name = config.histogram_opts().fq_name();
        Self::build(&DEFAULT_BUCKETS, vec![(name, config.buckets.clone())])
    }

    fn build(buckets: &[f64], overrides: Vec<(String, Vec<f64>)>) -> Result<Self, MetricsError> {
        let mut builder = PrometheusBuilder::new().set_buckets(buckets)?;
        for (name, bounds) in &overrides {
            builder = builder.set_buckets_for_metric(Matcher::Full(name.clone()), bounds)?;
        }
        let recorder = builder.build_recorder();
        let handle = recorder.handle();
        Ok(Self {
            recorder: Arc::new(recorder),
            handle,
            buckets: buckets.to_vec(),
            overrides,
        })
    }

    /// Bucket bounds a histogram named `name` renders with.
    pub fn buckets_for(&self, name: &str) -> &[f64] {
        self.overrides
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, b)| b.as_slice())
            .unwrap_or(&self.buckets)
    }

    /// Register a histogram family with fixed label names.
    pub fn histogram_vec(&self, opts: HistogramOpts, label_names: &[&'static str]) -> HistogramVec {
        let name = opts.fq_name();
        self.recorder.describe_histogram(
            name.clone().into(),
            Some(metrics::Unit::Seconds),
            SharedString::from(opts.help),
        );
        HistogramVec {
            name,
            label_names: label_names.to_vec(),
            recorder: self.recorder.clone(),
        }
    }

    /// Render every registered series in the text exposition format.
    pub fn render(&self) -> String {
        self.handle.render()
    }

    /// Fold pending histogram samples into their buckets.
    pub fn run_upkeep(&self) {
        self.handle.run_upkeep();
    }
}

impl std::fmt::Debug for MetricsRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsRegistry").finish_non_exhaustive()
    }
}

/// A histogram family partitioned by label values.
#[derive(Clone)]
pub struct HistogramVec {
    name: String,
    label_names: Vec<&'static str>,
    recorder: Arc<dyn Recorder + Send + Sync>,
}

impl HistogramVec {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Histogram for one label tuple. Values pair with the label names in
    /// order; extra values are ignored.
    pub fn with_label_values(&self, values: &[&str]) -> Histogram {
        let mut labels: Vec<Label> = self
            .label_names
            .iter()
            .zip(values)
            .map(|(name, value)| Label::new(*name, value.to_string()))
            .collect();
        labels.sort_by(|a, b| a.key().cmp(b.key()));

        let key = Key::from_parts(self.name.clone(), labels);
        let metadata = Metadata::new(module_path!(), Level::INFO, Some(module_path!()));
        self.recorder.register_histogram(&key, &metadata)
    }
}

impl std::fmt::Debug for HistogramVec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistogramVec")
            .field("name", &self.name)
            .field("label_names", &self.label_names)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fq_name() {
        let opts = HistogramOpts {
            namespace: "pd".into(),
            subsystem: "service".into(),
            name: "audit_handling_seconds".into(),
            help: String::new(),
        };
        assert_eq!(opts.fq_name(), "pd_service_audit_handling_seconds");

        let opts = HistogramOpts {
            name: "latency".into(),
            ..Default::default()
        };
        assert_eq!(opts.fq_name(), "latency");
    }

    #[test]
    fn test_labels_rendered_in_name_order() {
        let registry = MetricsRegistry::new(&DEFAULT_BUCKETS).unwrap();
        let vec = registry.histogram_vec(
            HistogramOpts {
                name: "test_seconds".into(),
                help: "test".into(),
                ..Default::default()
            },
            &["service", "method", "component"],
        );
        vec.with_label_values(&["svc", "GET", "user1"]).record(1.0);

        let output = registry.render();
        assert!(output.contains(
            "test_seconds_count{component=\"user1\",method=\"GET\",service=\"svc\"} 1"
        ));
    }

    #[test]
    fn test_empty_buckets_rejected() {
        assert!(MetricsRegistry::new(&[]).is_err());
    }

    #[test]
    fn test_configured_buckets_are_rendered() {
        let config = MetricsConfig {
            buckets: vec![0.1, 1.0],
            ..MetricsConfig::default()
        };
        let registry = MetricsRegistry::from_config(&config).unwrap();
        assert_eq!(registry.buckets_for("pd_service_audit_handling_seconds"), &[0.1, 1.0]);
        assert_eq!(registry.buckets_for("other_seconds"), &DEFAULT_BUCKETS);

        let vec = registry.histogram_vec(config.histogram_opts(), &["service"]);
        vec.with_label_values(&["svc"]).record(0.5);

        let output = registry.render();
        assert!(output.contains("pd_service_audit_handling_seconds_bucket{service=\"svc\",le=\"0.1\"} 0"));
        assert!(output.contains("le=\"+Inf\"} 1"));
        assert!(!output.contains("le=\"0.005\""));
    }

    #[test]
    fn test_upkeep_keeps_observations() {
        let registry = MetricsRegistry::new(&DEFAULT_BUCKETS).unwrap();
        let vec = registry.histogram_vec(
            HistogramOpts {
                name: "upkeep_seconds".into(),
                ..Default::default()
            },
            &["service"],
        );
        vec.with_label_values(&["svc"]).record(1.0);
        vec.with_label_values(&["svc"]).record(2.0);

        registry.run_upkeep();
        assert!(registry
            .render()
            .contains("upkeep_seconds_count{service=\"svc\"} 2"));
    }
}
