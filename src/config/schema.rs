//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the CORS proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// CORS response policy.
    pub cors: CorsConfig,

    /// Upstream Git host settings.
    pub upstream: UpstreamConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:9999").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:9999".to_string(),
        }
    }
}

impl ListenerConfig {
    /// Replace the port of the bind address, keeping the host part.
    pub fn set_port(&mut self, port: u16) {
        let host = match self.bind_address.rsplit_once(':') {
            Some((host, _)) => host,
            None => self.bind_address.as_str(),
        };
        self.bind_address = format!("{}:{}", host, port);
    }
}

/// CORS policy configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Value echoed in `Access-Control-Allow-Origin`.
    pub allow_origin: String,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allow_origin: "*".to_string(),
        }
    }
}

/// Upstream forwarding configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Hosts reached over plain HTTP instead of HTTPS.
    pub insecure_origins: Vec<String>,

    /// TCP/TLS connect timeout in seconds.
    pub connect_timeout_secs: u64,

    /// Give up when the upstream has not sent response headers after this
    /// many seconds. Unset by default: a push is only answered once the
    /// whole pack was received, however long that takes.
    pub response_timeout_secs: Option<u64>,

    /// Chunks buffered between a body producer and its consumer.
    pub relay_capacity: usize,

    /// Honor `HTTP_PROXY`/`HTTPS_PROXY` for outgoing requests.
    pub use_system_proxy: bool,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            insecure_origins: Vec::new(),
            connect_timeout_secs: 30,
            response_timeout_secs: None,
            relay_capacity: 16,
            use_system_proxy: true,
        }
    }
}

impl UpstreamConfig {
    /// Whether `host` must be contacted over plain HTTP.
    pub fn is_insecure(&self, host: &str) -> bool {
        self.insecure_origins.iter().any(|h| h == host)
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log every forwarded request's method and URL.
    pub debug: bool,

    /// Log line format.
    pub log_format: LogFormat,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            debug: false,
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ProxyConfig::default();
        assert_eq!(config.listener.bind_address, "0.0.0.0:9999");
        assert_eq!(config.cors.allow_origin, "*");
        assert!(config.upstream.insecure_origins.is_empty());
        assert!(!config.observability.debug);
    }

    #[test]
    fn test_partial_toml() {
        let config: ProxyConfig = toml::from_str(
            r#"
            [upstream]
            insecure_origins = ["localhost:8080"]

            [observability]
            log_format = "json"
            "#,
        )
        .unwrap();

        assert!(config.upstream.is_insecure("localhost:8080"));
        assert!(!config.upstream.is_insecure("github.com"));
        assert_eq!(config.upstream.relay_capacity, 16);
        assert_eq!(config.upstream.response_timeout_secs, None);
        assert_eq!(config.observability.log_format, LogFormat::Json);
        assert_eq!(config.cors.allow_origin, "*");
    }

    #[test]
    fn test_set_port() {
        let mut listener = ListenerConfig::default();
        listener.set_port(8080);
        assert_eq!(listener.bind_address, "0.0.0.0:8080");

        listener.bind_address = "[::1]:9999".into();
        listener.set_port(1234);
        assert_eq!(listener.bind_address, "[::1]:1234");
    }
}
