//! Label matching between services and audit backends.
//!
//! # Design Decisions
//! - Exact string equality, no prefix or substring matching
//! - Duplicates in a label set are tolerated, not removed
//! - O(n) scan; label sets are expected to stay in single digits

use serde::{Deserialize, Serialize};

/// Label for the latency histogram backend.
pub const PROMETHEUS_HISTOGRAM: &str = "prometheus-histogram";

/// Label for the local log backend.
pub const LOCAL_LOG: &str = "local-log";

/// Labels describing which backends a service should be audited by.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendLabels {
    pub labels: Vec<String>,
}

impl BackendLabels {
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            labels: labels.into_iter().map(Into::into).collect(),
        }
    }
}

/// Matches a label set containing the target label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelMatcher {
    target: String,
}

impl LabelMatcher {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// Returns true if the target occurs anywhere in `labels`.
    pub fn matches(&self, labels: &BackendLabels) -> bool {
        labels.labels.iter().any(|l| *l == self.target)
    }
}
