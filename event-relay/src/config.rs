use serde::Deserialize;
use thiserror::Error;
use url::Url;

/// Environment variable overriding `listener.port`
pub const PORT_ENV: &str = "PORT";
/// Environment variable overriding `mixpanel.token`
pub const MIXPANEL_TOKEN_ENV: &str = "MIXPANEL_TOKEN";

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Port cannot be 0")]
    InvalidPort,

    #[error("Invalid PORT value: {0}")]
    InvalidPortEnv(String),

    #[error("Mixpanel token cannot be empty")]
    EmptyToken,

    #[error("Mixpanel timeout cannot be 0")]
    InvalidTimeout,
}

/// Event relay configuration
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct Config {
    /// Listener for storefront requests
    #[serde(default)]
    pub listener: Listener,
    /// Analytics vendor settings
    #[serde(default)]
    pub mixpanel: MixpanelConfig,
}

impl Config {
    /// Applies `PORT` and `MIXPANEL_TOKEN` on top of the file values.
    ///
    /// `lookup` is usually `|key| std::env::var(key).ok()`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ValidationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup(PORT_ENV) {
            self.listener.port = port
                .trim()
                .parse::<u16>()
                .map_err(|_| ValidationError::InvalidPortEnv(port))?;
        }

        if let Some(token) = lookup(MIXPANEL_TOKEN_ENV) {
            self.mixpanel.token = Some(token);
        }

        Ok(())
    }

    /// Validates the relay configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.listener.validate()?;
        self.mixpanel.validate()?;
        Ok(())
    }
}

/// Network listener configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Listener {
    /// Host address to bind to (e.g., "0.0.0.0" or "127.0.0.1")
    pub host: String,
    /// Port number to listen on
    pub port: u16,
}

impl Default for Listener {
    fn default() -> Self {
        Listener {
            host: "0.0.0.0".into(),
            port: 3000,
        }
    }
}

impl Listener {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.port == 0 {
            return Err(ValidationError::InvalidPort);
        }
        Ok(())
    }
}

/// Mixpanel client configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct MixpanelConfig {
    /// Project token. When unset the relay still serves requests but every
    /// vendor call fails.
    #[serde(default)]
    pub token: Option<String>,
    /// Ingestion API base URL, e.g. `https://api-eu.mixpanel.com` for EU residency
    #[serde(default = "default_api_url")]
    pub api_url: Url,
    /// Timeout applied to each vendor request
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for MixpanelConfig {
    fn default() -> Self {
        MixpanelConfig {
            token: None,
            api_url: default_api_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl MixpanelConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.token.as_deref().is_some_and(|t| t.trim().is_empty()) {
            return Err(ValidationError::EmptyToken);
        }
        if self.timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout);
        }
        Ok(())
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }
}

fn default_api_url() -> Url {
    Url::parse("https://api.mixpanel.com").expect("static URL is valid")
}

fn default_timeout_secs() -> u64 {
    30
}
