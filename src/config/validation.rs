//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation of parsed sections (key parsing handles syntax)
//! - Validate value ranges (ports, timeouts, buffer sizes)
//! - Check that enabled features carry the settings they need
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is a pure function: &Record → Result<(), Vec<ValidationError>>
//! - Runs before a section value is accepted into the store
//! - The pack-as-bytes/protocol combination is not checked here; the
//!   authorization filter builder owns that rule

use thiserror::Error;

use crate::config::kourier::KourierConfig;
use crate::config::network::NetworkConfig;

/// A single semantic problem found in a parsed section.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("external authorization is enabled but no host is set")]
    MissingAuthzHost,

    #[error("external authorization port must be non-zero")]
    InvalidAuthzPort,

    #[error("external authorization timeout must be greater than zero")]
    ZeroAuthzTimeout,

    #[error("external authorization max request bytes must be greater than zero")]
    ZeroMaxRequestBytes,

    #[error("tracing is enabled but the collector address is incomplete")]
    IncompleteTracingCollector,

    #[error("tracing collector endpoint must start with '/', got {0:?}")]
    RelativeCollectorEndpoint(String),

    #[error("unsupported default external scheme {0:?}")]
    UnsupportedScheme(String),

    #[error("ingress class must not be empty")]
    EmptyIngressClass,
}

/// Validate a parsed routing section.
pub fn validate_kourier(config: &KourierConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let authz = &config.external_authz;
    if authz.enabled {
        if authz.config.host.is_empty() {
            errors.push(ValidationError::MissingAuthzHost);
        }
        if authz.config.port == 0 {
            errors.push(ValidationError::InvalidAuthzPort);
        }
        if authz.config.timeout == 0 {
            errors.push(ValidationError::ZeroAuthzTimeout);
        }
        if authz.config.max_request_bytes == 0 {
            errors.push(ValidationError::ZeroMaxRequestBytes);
        }
    }

    let tracing = &config.tracing;
    if tracing.enabled {
        if tracing.collector_host.is_empty() || tracing.collector_port == 0 {
            errors.push(ValidationError::IncompleteTracingCollector);
        }
        if !tracing.collector_endpoint.starts_with('/') {
            errors.push(ValidationError::RelativeCollectorEndpoint(
                tracing.collector_endpoint.clone(),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate a parsed network section.
pub fn validate_network(config: &NetworkConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.ingress_class.is_empty() {
        errors.push(ValidationError::EmptyIngressClass);
    }
    if !matches!(config.default_external_scheme.as_str(), "http" | "https") {
        errors.push(ValidationError::UnsupportedScheme(
            config.default_external_scheme.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
