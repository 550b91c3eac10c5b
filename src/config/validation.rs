//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate backend URLs carry the expected scheme
//! - Validate the listener address and pool sizes
//! - Validate the queue topic against the broker's naming rules
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServiceConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::ServiceConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: &'static str,
    /// What is wrong with it.
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Validate a configuration, collecting every error.
pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.service_name.trim().is_empty() {
        errors.push(ValidationError::new("service_name", "must not be empty"));
    }

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    if !has_scheme(&config.counter.url, &["redis://", "rediss://"]) {
        errors.push(ValidationError::new(
            "counter.url",
            "must start with redis:// or rediss://",
        ));
    }

    if config.counter.key.is_empty() {
        errors.push(ValidationError::new("counter.key", "must not be empty"));
    }

    if !has_scheme(&config.store.dsn, &["postgres://", "postgresql://"]) {
        errors.push(ValidationError::new(
            "store.dsn",
            "must start with postgres:// or postgresql://",
        ));
    }

    if config.store.max_connections == 0 {
        errors.push(ValidationError::new("store.max_connections", "must be > 0"));
    }

    if config.queue.brokers.split(',').all(|b| b.trim().is_empty()) {
        errors.push(ValidationError::new("queue.brokers", "must list at least one broker"));
    }

    if !is_valid_topic(&config.queue.topic) {
        errors.push(ValidationError::new(
            "queue.topic",
            format!(
                "'{}' must be 1-249 characters of [A-Za-z0-9._-]",
                config.queue.topic
            ),
        ));
    }

    if let Some(endpoint) = &config.observability.otlp_endpoint {
        if !has_scheme(endpoint, &["http://", "https://"]) {
            errors.push(ValidationError::new(
                "observability.otlp_endpoint",
                "must start with http:// or https://",
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn has_scheme(url: &str, schemes: &[&str]) -> bool {
    schemes
        .iter()
        .any(|scheme| url.len() > scheme.len() && url.starts_with(scheme))
}

fn is_valid_topic(topic: &str) -> bool {
    !topic.is_empty()
        && topic.len() <= 249
        && topic != "."
        && topic != ".."
        && topic
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}
