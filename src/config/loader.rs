//! Configuration loading from disk and the process environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::ProxyConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load configuration from an optional TOML file, apply environment
/// overrides and validate the result.
pub fn load(path: Option<&Path>) -> Result<ProxyConfig, ConfigError> {
    let mut config = match path {
        Some(path) => load_file(path)?,
        None => ProxyConfig::default(),
    };

    apply_env(&mut config, |key| std::env::var(key).ok());

    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Parse a TOML file without validating it.
pub fn load_file(path: &Path) -> Result<ProxyConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Apply `ALLOW_ORIGIN`, `INSECURE_HTTP_ORIGINS` and `DEBUG` on top of `config`.
pub fn apply_env<F>(config: &mut ProxyConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(origin) = lookup("ALLOW_ORIGIN").filter(|v| !v.is_empty()) {
        config.cors.allow_origin = origin;
    }

    if let Some(origins) = lookup("INSECURE_HTTP_ORIGINS") {
        config.upstream.insecure_origins = parse_origin_list(&origins);
    }

    if lookup("DEBUG").is_some_and(|v| !v.is_empty()) {
        config.observability.debug = true;
    }
}

/// Split a comma-separated host list, dropping blank entries.
pub fn parse_origin_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
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
    fn test_env_overrides() {
        let mut config = ProxyConfig::default();
        apply_env(
            &mut config,
            env(&[
                ("ALLOW_ORIGIN", "https://app.example.com"),
                ("INSECURE_HTTP_ORIGINS", "localhost:3000, git.internal ,,"),
                ("DEBUG", "1"),
            ]),
        );

        assert_eq!(config.cors.allow_origin, "https://app.example.com");
        assert_eq!(
            config.upstream.insecure_origins,
            vec!["localhost:3000".to_string(), "git.internal".to_string()]
        );
        assert!(config.observability.debug);
    }

    #[test]
    fn test_empty_env_keeps_defaults() {
        let mut config = ProxyConfig::default();
        apply_env(&mut config, env(&[("ALLOW_ORIGIN", ""), ("DEBUG", "")]));

        assert_eq!(config.cors.allow_origin, "*");
        assert!(!config.observability.debug);
    }

    #[test]
    fn test_load_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[cors]\nallow_origin = \"https://a.example\"").unwrap();

        let config = load_file(file.path()).unwrap();
        assert_eq!(config.cors.allow_origin, "https://a.example");
    }

    #[test]
    fn test_load_file_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[cors").unwrap();

        assert!(matches!(load_file(file.path()), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_missing_file() {
        let result = load_file(Path::new("/nonexistent/cors-proxy.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
