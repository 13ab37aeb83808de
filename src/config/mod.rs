use std::env;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://107.23.14.43/registro";
const DEFAULT_SERVICE_NAME: &str = "registro-consumer";
const DEFAULT_PREFETCH_COUNT: u16 = 10;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;
const DEFAULT_METRICS_PORT: u16 = 9090;

/// Broker coordinates. The URL is authoritative; the remaining fields
/// override its parts when present.
#[derive(Debug, Clone)]
pub struct BrokerSettings {
    pub url: String,
    pub vhost: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub port: Option<u16>,
    pub queue: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub broker: BrokerSettings,
    pub api_url: String,
    pub service_name: String,
    pub prefetch_count: u16,
    pub connect_timeout: Duration,
    pub http_timeout: Duration,
    pub metrics_port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let url = required("AMQP_URL")?;
        let queue = required("AMQP_QUEUE")?;

        let broker = BrokerSettings {
            url,
            vhost: optional("AMQP_VHOST"),
            username: optional("AMQP_USERNAME"),
            password: optional("AMQP_PASSWORD"),
            port: parsed("AMQP_PORT")?,
            queue,
        };

        let api_url = optional("API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let service_name =
            optional("SERVICE_NAME").unwrap_or_else(|| DEFAULT_SERVICE_NAME.to_string());
        let prefetch_count = parsed("PREFETCH_COUNT")?.unwrap_or(DEFAULT_PREFETCH_COUNT);
        let connect_timeout = Duration::from_secs(
            parsed("CONNECT_TIMEOUT_SECS")?.unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS),
        );
        let http_timeout =
            Duration::from_secs(parsed("HTTP_TIMEOUT_SECS")?.unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS));
        let metrics_port = parsed("METRICS_PORT")?.unwrap_or(DEFAULT_METRICS_PORT);

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            broker,
            api_url,
            service_name,
            prefetch_count,
            connect_timeout,
            http_timeout,
            metrics_port,
            rust_log,
        })
    }
}

fn required(key: &'static str) -> Result<String, ConfigError> {
    optional(key).ok_or(ConfigError::MissingRequired(key))
}

// Empty values count as unset, like an unset variable in a .env file.
fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parsed<T: FromStr>(key: &'static str) -> Result<Option<T>, ConfigError> {
    match optional(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { key, value: raw }),
        None => Ok(None),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid value for environment variable {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    const BROKER_VARS: [(&str, Option<&str>); 2] = [
        ("AMQP_URL", Some("amqp://localhost:5672")),
        ("AMQP_QUEUE", Some("registro")),
    ];

    const OPTIONAL_VARS: [&str; 11] = [
        "AMQP_VHOST",
        "AMQP_USERNAME",
        "AMQP_PASSWORD",
        "AMQP_PORT",
        "API_URL",
        "SERVICE_NAME",
        "PREFETCH_COUNT",
        "CONNECT_TIMEOUT_SECS",
        "HTTP_TIMEOUT_SECS",
        "METRICS_PORT",
        "RUST_LOG",
    ];

    fn with_broker_env<F: FnOnce()>(extra: &[(&str, Option<&str>)], f: F) {
        let mut vars: Vec<(&str, Option<&str>)> =
            OPTIONAL_VARS.iter().map(|key| (*key, None)).collect();
        vars.extend_from_slice(&BROKER_VARS);
        vars.retain(|(key, _)| !extra.iter().any(|(overridden, _)| overridden == key));
        vars.extend_from_slice(extra);
        temp_env::with_vars(vars, f);
    }

    #[test]
    fn test_defaults_applied() {
        with_broker_env(&[], || {
            let config = Config::from_env().unwrap();
            assert_eq!(config.broker.url, "amqp://localhost:5672");
            assert_eq!(config.broker.queue, "registro");
            assert!(config.broker.vhost.is_none());
            assert!(config.broker.port.is_none());
            assert_eq!(config.api_url, DEFAULT_API_URL);
            assert_eq!(config.prefetch_count, 10);
            assert_eq!(config.connect_timeout, Duration::from_secs(30));
            assert_eq!(config.http_timeout, Duration::from_secs(10));
            assert_eq!(config.metrics_port, 9090);
            assert_eq!(config.rust_log, "info");
        });
    }

    #[test]
    fn test_broker_overrides_read() {
        with_broker_env(
            &[
                ("AMQP_VHOST", Some("sensores")),
                ("AMQP_USERNAME", Some("kit")),
                ("AMQP_PASSWORD", Some("secret")),
                ("AMQP_PORT", Some("5673")),
            ],
            || {
                let config = Config::from_env().unwrap();
                assert_eq!(config.broker.vhost.as_deref(), Some("sensores"));
                assert_eq!(config.broker.username.as_deref(), Some("kit"));
                assert_eq!(config.broker.password.as_deref(), Some("secret"));
                assert_eq!(config.broker.port, Some(5673));
            },
        );
    }

    #[test]
    fn test_missing_queue_rejected() {
        with_broker_env(&[("AMQP_QUEUE", None)], || {
            let err = Config::from_env().unwrap_err();
            assert!(matches!(err, ConfigError::MissingRequired("AMQP_QUEUE")));
        });
    }

    #[test]
    fn test_empty_url_treated_as_missing() {
        with_broker_env(&[("AMQP_URL", Some(""))], || {
            let err = Config::from_env().unwrap_err();
            assert!(matches!(err, ConfigError::MissingRequired("AMQP_URL")));
        });
    }

    #[test]
    fn test_non_numeric_port_rejected() {
        with_broker_env(&[("AMQP_PORT", Some("five"))], || {
            let err = Config::from_env().unwrap_err();
            match err {
                ConfigError::InvalidValue { key, value } => {
                    assert_eq!(key, "AMQP_PORT");
                    assert_eq!(value, "five");
                }
                other => panic!("unexpected error: {other}"),
            }
        });
    }
}
