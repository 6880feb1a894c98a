//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for request
//! auditing. All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::audit::labels::BackendLabels;
use crate::observability::metrics::{HistogramOpts, DEFAULT_BUCKETS};

/// Root configuration for request auditing.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Runtime switch for the whole audit pipeline.
    pub enable_audit: bool,

    /// Largest request body captured into `body_param`, in bytes.
    pub max_body_bytes: usize,

    /// Services to audit and the backend labels each one carries.
    pub services: Vec<ServiceAuditConfig>,

    /// Latency histogram backend settings.
    pub metrics: MetricsConfig,

    /// Local log backend and log sink settings.
    pub log: LogConfig,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enable_audit: true,
            max_body_bytes: 64 * 1024,
            services: Vec::new(),
            metrics: MetricsConfig::default(),
            log: LogConfig::default(),
        }
    }
}

/// Labels attached to one service.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceAuditConfig {
    /// Service label, as attached to the route.
    pub name: String,

    /// Backend labels, e.g. `prometheus-histogram`, `local-log`.
    #[serde(default)]
    pub labels: Vec<String>,
}

impl ServiceAuditConfig {
    pub fn backend_labels(&self) -> BackendLabels {
        BackendLabels::new(self.labels.iter().cloned())
    }
}

/// Latency histogram configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Enable the histogram backend.
    pub enabled: bool,

    pub namespace: String,
    pub subsystem: String,
    pub name: String,
    pub help: String,

    /// Histogram bucket upper bounds in seconds.
    pub buckets: Vec<f64>,
}

impl MetricsConfig {
    pub fn histogram_opts(&self) -> HistogramOpts {
        HistogramOpts {
            namespace: self.namespace.clone(),
            subsystem: self.subsystem.clone(),
            name: self.name.clone(),
            help: self.help.clone(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            namespace: "pd".to_string(),
            subsystem: "service".to_string(),
            name: "audit_handling_seconds".to_string(),
            help: "PD server service handling audit".to_string(),
            buckets: DEFAULT_BUCKETS.to_vec(),
        }
    }
}

/// Log configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LogConfig {
    /// Enable the local log backend.
    pub enabled: bool,

    /// Log level (trace, debug, info, warn, error) or a full filter directive.
    pub level: String,

    /// Log file path; stdout when unset.
    pub file: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: "info".to_string(),
            file: None,
        }
    }
}
