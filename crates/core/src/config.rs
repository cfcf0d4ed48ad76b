//! TOML-based configuration for flowalert.
//!
//! The robot token and signing secret are never written into the file.
//! `token_env` / `secret_env` name environment variables that are resolved
//! at runtime via [`AppConfig::resolve_env_vars`].

use std::path::Path;

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::errors::ConfigError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level application configuration loaded from a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// Web server identity used to build execution links.
    #[serde(default)]
    pub server: ServerConfig,

    /// DingTalk robot settings.
    #[serde(default)]
    pub dingtalk: DingTalkConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

/// How the workflow server is reached from outside, plus its display name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Display name embedded in alert titles (default `azkaban`).
    #[serde(default = "default_name")]
    pub name: String,

    /// Local hostname; used when no external hostname is set.
    #[serde(default = "default_hostname")]
    pub hostname: String,

    /// Externally reachable hostname.
    #[serde(default)]
    pub external_hostname: Option<String>,

    /// Serve links over `https` (default true).
    #[serde(default = "default_true")]
    pub use_ssl: bool,

    /// Local TLS port (default 8443).
    #[serde(default = "default_ssl_port")]
    pub ssl_port: u16,

    /// Externally reachable TLS port.
    #[serde(default)]
    pub external_ssl_port: Option<u16>,

    /// Local plain-HTTP port (default 8081).
    #[serde(default = "default_port")]
    pub port: u16,

    /// Externally reachable plain-HTTP port.
    #[serde(default)]
    pub external_port: Option<u16>,

    /// UTC offset used when rendering start/end times, e.g. `+08:00`.
    #[serde(default = "default_utc_offset")]
    pub utc_offset: String,
}

fn default_name() -> String {
    "azkaban".into()
}
fn default_hostname() -> String {
    "localhost".into()
}
fn default_true() -> bool {
    true
}
fn default_ssl_port() -> u16 {
    8443
}
fn default_port() -> u16 {
    8081
}
fn default_utc_offset() -> String {
    "+00:00".into()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            hostname: default_hostname(),
            external_hostname: None,
            use_ssl: true,
            ssl_port: default_ssl_port(),
            external_ssl_port: None,
            port: default_port(),
            external_port: None,
            utc_offset: default_utc_offset(),
        }
    }
}

impl ServerConfig {
    /// `https` when TLS is enabled, `http` otherwise.
    pub fn scheme(&self) -> &'static str {
        if self.use_ssl {
            "https"
        } else {
            "http"
        }
    }

    /// The host embedded in execution links.
    pub fn host(&self) -> &str {
        self.external_hostname.as_deref().unwrap_or(&self.hostname)
    }

    /// The port matching [`scheme`](Self::scheme); external ports win.
    pub fn port(&self) -> u16 {
        if self.use_ssl {
            self.external_ssl_port.unwrap_or(self.ssl_port)
        } else {
            self.external_port.unwrap_or(self.port)
        }
    }

    /// `scheme://host:port`, with no trailing slash.
    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.scheme(), self.host(), self.port())
    }

    /// Parse [`utc_offset`](Self::utc_offset).
    pub fn offset(&self) -> Result<FixedOffset, ConfigError> {
        self.utc_offset
            .parse::<FixedOffset>()
            .map_err(|e| ConfigError::InvalidValue {
                field: "server.utc_offset".into(),
                detail: format!("'{}' is not a UTC offset like +08:00: {}", self.utc_offset, e),
            })
    }
}

// ---------------------------------------------------------------------------
// DingTalk
// ---------------------------------------------------------------------------

/// DingTalk custom-robot settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DingTalkConfig {
    /// Robot send endpoint, without query string.
    #[serde(default = "default_webhook_url")]
    pub webhook_url: String,

    /// Environment variable holding the robot access token.
    #[serde(default)]
    pub token_env: Option<String>,

    /// Environment variable holding the robot signing secret.
    #[serde(default)]
    pub secret_env: Option<String>,

    /// Refuse to send unsigned requests (default true).
    #[serde(default = "default_true")]
    pub require_signature: bool,

    /// HTTP request timeout in seconds (default 10).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Resolved access token (populated by `resolve_env_vars`).
    #[serde(skip)]
    pub token: Option<String>,

    /// Resolved signing secret.
    #[serde(skip)]
    pub secret: Option<String>,
}

fn default_webhook_url() -> String {
    "https://oapi.dingtalk.com/robot/send".into()
}
fn default_timeout_secs() -> u64 {
    10
}

impl Default for DingTalkConfig {
    fn default() -> Self {
        Self {
            webhook_url: default_webhook_url(),
            token_env: None,
            secret_env: None,
            require_signature: true,
            timeout_secs: default_timeout_secs(),
            token: None,
            secret: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Minimum tracing level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading & resolving
// ---------------------------------------------------------------------------

impl AppConfig {
    /// Load an [`AppConfig`] from a TOML file at the given path.
    ///
    /// This does **not** resolve environment variables -- call
    /// [`resolve_env_vars`](Self::resolve_env_vars) afterwards.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading configuration");

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        debug!("configuration parsed successfully");
        Ok(config)
    }

    /// Resolve the `*_env` fields from environment variables.
    ///
    /// A missing variable logs a warning and leaves the resolved field
    /// `None`; a missing token simply disables the alerter.
    pub fn resolve_env_vars(&mut self) -> Result<(), ConfigError> {
        info!("resolving environment variable references in config");

        if let Some(ref env_name) = self.dingtalk.token_env {
            self.dingtalk.token = resolve_optional_env(env_name, "dingtalk.token_env");
        }

        if let Some(ref env_name) = self.dingtalk.secret_env {
            self.dingtalk.secret = resolve_optional_env(env_name, "dingtalk.secret_env");
        }

        debug!("environment variable resolution complete");
        Ok(())
    }

    /// Validate that all fields are sane.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.name.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "server.name".into(),
                detail: "display name must not be empty".into(),
            });
        }
        if self.server.host().trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "server.hostname".into(),
                detail: "hostname must not be empty".into(),
            });
        }
        self.server.offset()?;

        let url = &self.dingtalk.webhook_url;
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(ConfigError::InvalidValue {
                field: "dingtalk.webhook_url".into(),
                detail: format!("'{}' must start with http:// or https://", url),
            });
        }
        if url.contains('?') {
            return Err(ConfigError::InvalidValue {
                field: "dingtalk.webhook_url".into(),
                detail: "must not carry a query string; the token goes in token_env".into(),
            });
        }
        if self.dingtalk.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "dingtalk.timeout_secs".into(),
                detail: "timeout must be > 0".into(),
            });
        }

        Ok(())
    }

    /// Convenience: load, resolve, and validate in one call.
    pub fn load_and_resolve<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut config = Self::load_from_file(path)?;
        config.resolve_env_vars()?;
        config.validate()?;
        Ok(config)
    }
}

/// Try to read an environment variable by name. Returns `Some(value)` on
/// success; logs a warning and returns `None` if the variable is unset.
fn resolve_optional_env(env_name: &str, field: &str) -> Option<String> {
    match std::env::var(env_name) {
        Ok(val) if !val.is_empty() => {
            debug!(field, env_name, "resolved env var");
            Some(val)
        }
        Ok(_) => {
            warn!(field, env_name, "env var is set but empty");
            None
        }
        Err(_) => {
            warn!(field, env_name, "env var not set");
            None
        }
    }
}
