//! Configuration validation.
//!
//! Returns all validation errors, not just the first. Validation is a pure
//! function: `&ProxyConfig → Result<(), Vec<ValidationError>>`.

use std::net::SocketAddr;

use axum::http::HeaderValue;
use thiserror::Error;

use crate::config::schema::ProxyConfig;

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid bind address '{0}'")]
    BindAddress(String),

    #[error("allow_origin must be a non-empty header value")]
    AllowOrigin,

    #[error("insecure origin '{0}' must be a bare host[:port]")]
    InsecureOrigin(String),

    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }

    let origin = &config.cors.allow_origin;
    if origin.is_empty() || HeaderValue::from_str(origin).is_err() {
        errors.push(ValidationError::AllowOrigin);
    }

    for host in &config.upstream.insecure_origins {
        if host.is_empty() || host.contains('/') || host.contains(char::is_whitespace) {
            errors.push(ValidationError::InsecureOrigin(host.clone()));
        }
    }

    if config.upstream.response_timeout_secs == Some(0) {
        errors.push(ValidationError::Zero("upstream.response_timeout_secs"));
    }
    if config.upstream.connect_timeout_secs == 0 {
        errors.push(ValidationError::Zero("upstream.connect_timeout_secs"));
    }
    if config.upstream.relay_capacity == 0 {
        errors.push(ValidationError::Zero("upstream.relay_capacity"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
