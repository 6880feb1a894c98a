//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate the histogram definition (name, buckets)
//! - Detect duplicate or unnamed services
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AuditConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;

use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::config::schema::AuditConfig;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("metric name must not be empty")]
    EmptyMetricName,
    #[error("histogram buckets must not be empty")]
    EmptyBuckets,
    #[error("histogram buckets must be strictly increasing (at index {0})")]
    UnorderedBuckets(usize),
    #[error("service at index {0} has an empty name")]
    EmptyServiceName(usize),
    #[error("duplicate service: {0}")]
    DuplicateService(String),
    #[error("service {0} has an empty label")]
    EmptyLabel(String),
    #[error("invalid log level: {0}")]
    InvalidLogLevel(String),
    #[error("max_body_bytes must be greater than zero")]
    ZeroBodyLimit,
}

/// Check an `AuditConfig` for semantic errors.
pub fn validate_config(config: &AuditConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.metrics.name.trim().is_empty() {
        errors.push(ValidationError::EmptyMetricName);
    }
    if config.metrics.buckets.is_empty() {
        errors.push(ValidationError::EmptyBuckets);
    }
    for (i, pair) in config.metrics.buckets.windows(2).enumerate() {
        if pair[1] <= pair[0] {
            errors.push(ValidationError::UnorderedBuckets(i + 1));
        }
    }

    let mut seen = HashSet::new();
    for (i, service) in config.services.iter().enumerate() {
        if service.name.is_empty() {
            errors.push(ValidationError::EmptyServiceName(i));
            continue;
        }
        if !seen.insert(service.name.as_str()) {
            errors.push(ValidationError::DuplicateService(service.name.clone()));
        }
        if service.labels.iter().any(|l| l.is_empty()) {
            errors.push(ValidationError::EmptyLabel(service.name.clone()));
        }
    }

    if EnvFilter::try_new(&config.log.level).is_err() {
        errors.push(ValidationError::InvalidLogLevel(config.log.level.clone()));
    }
    if config.max_body_bytes == 0 {
        errors.push(ValidationError::ZeroBodyLimit);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::ServiceAuditConfig;

    fn service(name: &str, labels: &[&str]) -> ServiceAuditConfig {
        ServiceAuditConfig {
            name: name.into(),
            labels: labels.iter().map(|l| l.to_string()).collect(),
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(validate_config(&AuditConfig::default()), Ok(()));
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = AuditConfig::default();
        config.metrics.name = String::new();
        config.metrics.buckets = vec![0.5, 0.1, 1.0, 1.0];
        config.services = vec![
            service("GetRegion", &["local-log"]),
            service("GetRegion", &[""]),
            service("", &[]),
        ];
        config.max_body_bytes = 0;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::EmptyMetricName,
                ValidationError::UnorderedBuckets(1),
                ValidationError::UnorderedBuckets(3),
                ValidationError::DuplicateService("GetRegion".into()),
                ValidationError::EmptyLabel("GetRegion".into()),
                ValidationError::EmptyServiceName(2),
                ValidationError::ZeroBodyLimit,
            ]
        );
    }

    #[test]
    fn test_rejects_bad_log_level() {
        let mut config = AuditConfig::default();
        config.log.level = "audit=loud".into();
        let errors = validate_config(&config).unwrap_err();
        assert!(matches!(errors[0], ValidationError::InvalidLogLevel(_)));
    }
}
