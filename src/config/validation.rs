//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Validate the proxy's public identity (scheme, host)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::ProxyConfig;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid bind address {0:?}")]
    InvalidBindAddress(String),

    #[error("invalid metrics address {0:?}")]
    InvalidMetricsAddress(String),

    #[error("timeouts.{0} must be greater than zero")]
    ZeroTimeout(&'static str),

    #[error("{0} must be greater than zero")]
    ZeroLimit(&'static str),

    #[error("timeouts.request_secs ({request}) must exceed timeouts.upstream_secs ({upstream})")]
    RequestTimeoutNotAboveUpstream { request: u64, upstream: u64 },

    #[error("proxy.public_scheme must be \"http\" or \"https\", got {0:?}")]
    InvalidPublicScheme(String),

    #[error("proxy.public_host must be a bare authority, got {0:?}")]
    InvalidPublicHost(String),

    #[error("unknown log level {0:?}")]
    InvalidLogLevel(String),

    #[error("listener.tls.{0} must not be empty")]
    EmptyTlsPath(&'static str),
}

/// Check a configuration, collecting every problem found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    if let Some(tls) = &config.listener.tls {
        if tls.cert_path.trim().is_empty() {
            errors.push(ValidationError::EmptyTlsPath("cert_path"));
        }
        if tls.key_path.trim().is_empty() {
            errors.push(ValidationError::EmptyTlsPath("key_path"));
        }
    }

    let timeouts = [
        ("connect_secs", config.timeouts.connect_secs),
        ("request_secs", config.timeouts.request_secs),
        ("upstream_secs", config.timeouts.upstream_secs),
        ("idle_secs", config.timeouts.idle_secs),
    ];
    for (name, value) in timeouts {
        if value == 0 {
            errors.push(ValidationError::ZeroTimeout(name));
        }
    }

    // The handler backstop answers 408 with no body and no event record.
    let (request, upstream) = (config.timeouts.request_secs, config.timeouts.upstream_secs);
    if request > 0 && upstream > 0 && request <= upstream {
        errors.push(ValidationError::RequestTimeoutNotAboveUpstream { request, upstream });
    }

    if config.proxy.max_html_body_bytes == 0 {
        errors.push(ValidationError::ZeroLimit("proxy.max_html_body_bytes"));
    }
    if config.security.max_body_size == 0 {
        errors.push(ValidationError::ZeroLimit("security.max_body_size"));
    }

    if let Some(scheme) = &config.proxy.public_scheme {
        if scheme != "http" && scheme != "https" {
            errors.push(ValidationError::InvalidPublicScheme(scheme.clone()));
        }
    }

    if let Some(host) = &config.proxy.public_host {
        let bare = !host.is_empty()
            && !host.contains(['/', '?', '#', ' '])
            && !host.contains("://");
        if !bare {
            errors.push(ValidationError::InvalidPublicHost(host.clone()));
        }
    }

    let level = config.observability.log_level.to_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ValidationError::InvalidLogLevel(
            config.observability.log_level.clone(),
        ));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
