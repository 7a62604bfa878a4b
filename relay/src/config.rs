use event_relay::config::{Config as EventRelayConfig, ValidationError};
use serde::Deserialize;
use std::fs::File;

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct MetricsConfig {
    pub statsd_host: String,
    pub statsd_port: u16,
    #[serde(default = "default_metrics_prefix")]
    pub prefix: String,
}

fn default_metrics_prefix() -> String {
    "event_relay".into()
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct LoggingConfig {
    pub sentry_dsn: Option<String>,
    /// `tracing_subscriber::EnvFilter` directives, overridden by `RUST_LOG`
    pub level: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct CommonConfig {
    pub metrics: Option<MetricsConfig>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct Config {
    #[serde(flatten)]
    pub common: CommonConfig,
    #[serde(flatten)]
    pub relay: EventRelayConfig,
}

impl Config {
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let file = File::open(path)?;
        let data = serde_yaml::from_reader(file)?;

        Ok(data)
    }

    /// Loads `path` if given, then layers the environment on top and validates.
    pub fn load<F>(path: Option<&std::path::Path>, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        config.relay.apply_env(env)?;
        config.relay.validate()?;

        Ok(config)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("could not load config from file: {0}")]
    LoadError(#[from] std::io::Error),
    #[error("could not parse config: {0}")]
    ParseError(#[from] serde_yaml::Error),
    #[error("invalid config: {0}")]
    ValidationError(#[from] ValidationError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_tmp_file(s: &str) -> tempfile::NamedTempFile {
        let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
        write!(tmp, "{}", s).expect("write yaml");

        tmp
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn full_config() {
        let yaml = r#"
            listener:
                host: 127.0.0.1
                port: 8080
            mixpanel:
                token: abc123
            metrics:
                statsd_host: 127.0.0.1
                statsd_port: 8125
            logging:
                sentry_dsn: https://key@sentry.example.com/1
                level: debug
            "#;
        let tmp = write_tmp_file(yaml);
        let config = Config::load(Some(tmp.path()), no_env).expect("load config");

        assert_eq!(config.relay.listener.port, 8080);
        assert_eq!(config.relay.mixpanel.token.as_deref(), Some("abc123"));

        let metrics = config.common.metrics.expect("metrics config");
        assert_eq!(metrics.statsd_port, 8125);
        assert_eq!(metrics.prefix, "event_relay");
        assert_eq!(config.common.logging.level.as_deref(), Some("debug"));
    }

    #[test]
    fn defaults_without_file() {
        let config = Config::load(None, no_env).expect("load config");
        assert_eq!(config.relay.listener.port, 3000);
        assert!(config.common.metrics.is_none());
        assert!(config.common.logging.sentry_dsn.is_none());
    }

    #[test]
    fn env_overrides_file() {
        let tmp = write_tmp_file("mixpanel:\n  token: from-file\n");
        let env = |key: &str| match key {
            "MIXPANEL_TOKEN" => Some("from-env".to_string()),
            "PORT" => Some("4100".to_string()),
            _ => None,
        };

        let config = Config::load(Some(tmp.path()), env).expect("load config");
        assert_eq!(config.relay.mixpanel.token.as_deref(), Some("from-env"));
        assert_eq!(config.relay.listener.port, 4100);
    }

    #[test]
    fn load_errors() {
        let missing = std::path::Path::new("/nonexistent/relay.yaml");
        assert!(matches!(
            Config::load(Some(missing), no_env),
            Err(ConfigError::LoadError(_))
        ));

        let tmp = write_tmp_file("listener: [not, a, map]");
        assert!(matches!(
            Config::load(Some(tmp.path()), no_env),
            Err(ConfigError::ParseError(_))
        ));

        let tmp = write_tmp_file("listener:\n  host: 0.0.0.0\n  port: 0\n");
        assert!(matches!(
            Config::load(Some(tmp.path()), no_env),
            Err(ConfigError::ValidationError(_))
        ));
    }
}
