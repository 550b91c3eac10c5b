//! Configuration loading from disk and the process environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::ServiceConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {var}: {message}")]
    Env { var: &'static str, message: String },

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load configuration: optional TOML file, then environment overrides,
/// then validation.
pub fn load_config(path: Option<&Path>) -> Result<ServiceConfig, ConfigError> {
    load_config_with(path, |key| std::env::var(key).ok())
}

/// Same as [`load_config`] with an injectable environment lookup.
pub fn load_config_with<F>(path: Option<&Path>, lookup: F) -> Result<ServiceConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => ServiceConfig::default(),
    };

    apply_env(&mut config, lookup)?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Overlay environment variables onto a configuration.
///
/// `REDIS_URL` wins over `REDIS_HOST` when both are set.
pub fn apply_env<F>(config: &mut ServiceConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(v) = get("SERVICE_NAME") {
        config.service_name = v;
    }
    if let Some(v) = get("BIND_ADDRESS") {
        config.listener.bind_address = v;
    }
    if let Some(host) = get("REDIS_HOST") {
        config.counter.url = format!("redis://{}:6379", host);
    }
    if let Some(v) = get("REDIS_URL") {
        config.counter.url = v;
    }
    if let Some(v) = get("COUNTER_KEY") {
        config.counter.key = v;
    }
    if let Some(v) = get("POSTGRES_DSN") {
        config.store.dsn = v;
    }
    if let Some(v) = get("KAFKA_BROKERS") {
        config.queue.brokers = v;
    }
    if let Some(v) = get("QUEUE_TOPIC") {
        config.queue.topic = v;
    }
    if let Some(v) = get("LOG_LEVEL") {
        config.observability.log_level = v;
    }
    if let Some(v) = get("OTEL_EXPORTER_OTLP_ENDPOINT") {
        config.observability.otlp_endpoint = Some(v);
    }
    if let Some(v) = get("LOG_FORMAT") {
        config.observability.log_format = v
            .parse()
            .map_err(|message| ConfigError::Env { var: "LOG_FORMAT", message })?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::LogFormat;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_file_or_env() {
        let config = load_config_with(None, env(&[])).unwrap();
        assert_eq!(config.service_name, "inventory-service");
    }

    #[test]
    fn test_env_overrides() {
        let config = load_config_with(
            None,
            env(&[
                ("REDIS_HOST", "cache"),
                ("POSTGRES_DSN", "postgres://app:pw@db:5432/app"),
                ("KAFKA_BROKERS", "redpanda:9092"),
                ("QUEUE_TOPIC", "access-events"),
                ("SERVICE_NAME", "service-b"),
                ("LOG_FORMAT", "json"),
                ("OTEL_EXPORTER_OTLP_ENDPOINT", "http://tempo:4317"),
            ]),
        )
        .unwrap();

        assert_eq!(config.counter.url, "redis://cache:6379");
        assert_eq!(config.store.dsn, "postgres://app:pw@db:5432/app");
        assert_eq!(config.queue.brokers, "redpanda:9092");
        assert_eq!(config.queue.topic, "access-events");
        assert_eq!(config.service_name, "service-b");
        assert_eq!(config.observability.log_format, LogFormat::Json);
        assert_eq!(
            config.observability.otlp_endpoint.as_deref(),
            Some("http://tempo:4317")
        );
    }

    #[test]
    fn test_redis_url_wins_over_host() {
        let config = load_config_with(
            None,
            env(&[("REDIS_HOST", "cache"), ("REDIS_URL", "rediss://secure:6380")]),
        )
        .unwrap();
        assert_eq!(config.counter.url, "rediss://secure:6380");
    }

    #[test]
    fn test_blank_env_is_ignored() {
        let config = load_config_with(None, env(&[("SERVICE_NAME", "  ")])).unwrap();
        assert_eq!(config.service_name, "inventory-service");
    }

    #[test]
    fn test_bad_log_format() {
        let err = load_config_with(None, env(&[("LOG_FORMAT", "xml")])).unwrap_err();
        assert!(matches!(err, ConfigError::Env { var: "LOG_FORMAT", .. }));
    }

    #[test]
    fn test_file_then_env() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "service_name = \"from-file\"\n[queue]\ntopic = \"file-topic\""
        )
        .unwrap();

        let config =
            load_config_with(Some(file.path()), env(&[("QUEUE_TOPIC", "env-topic")])).unwrap();
        assert_eq!(config.service_name, "from-file");
        assert_eq!(config.queue.topic, "env-topic");
    }

    #[test]
    fn test_invalid_file_reports_validation() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[store]\ndsn = \"sqlite://x\"").unwrap();

        let err = load_config_with(Some(file.path()), env(&[])).unwrap_err();
        match err {
            ConfigError::Validation(errors) => assert_eq!(errors[0].field, "store.dsn"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_file() {
        let err = load_config_with(Some(Path::new("/nonexistent/inventory.toml")), env(&[]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
