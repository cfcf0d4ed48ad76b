//! Error types for the flowalert core library.
//!
//! Each subsystem has its own error type derived with `thiserror`, and a
//! top-level [`CoreError`] enum unifies them for callers that want a single
//! error type.

use thiserror::Error;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Unified error type for the entire core library.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Signing(#[from] SigningError),

    #[error(transparent)]
    Notification(#[from] NotificationError),
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file not found.
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    /// TOML parse error.
    #[error("configuration parse error: {0}")]
    ParseError(String),

    /// A config value is invalid.
    #[error("invalid configuration value for '{field}': {detail}")]
    InvalidValue {
        field: String,
        detail: String,
    },

    /// Generic I/O error reading the config file.
    #[error("configuration I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Signing errors
// ---------------------------------------------------------------------------

/// Errors from computing the webhook request signature.
#[derive(Debug, Error)]
pub enum SigningError {
    /// Signing is required but no secret was configured.
    #[error("webhook signing is required but no signing secret is configured")]
    MissingSecret,

    /// The HMAC key could not be initialized.
    #[error("invalid HMAC signing key: {0}")]
    InvalidKey(String),
}

// ---------------------------------------------------------------------------
// Notification errors
// ---------------------------------------------------------------------------

/// Errors from delivering an alert to the webhook provider.
#[derive(Debug, Error)]
pub enum NotificationError {
    /// The request could not be signed; nothing was sent.
    #[error("alert signing failed: {0}")]
    Signing(#[from] SigningError),

    /// HTTP transport error (connect, TLS, timeout, ...).
    #[error("notification HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// The provider answered, but rejected the message.
    #[error("webhook provider rejected the message (HTTP {status}): {body}")]
    ProviderError {
        status: u16,
        body: String,
    },

    /// The payload could not be serialized.
    #[error("failed to serialize alert payload: {0}")]
    Serialize(#[from] serde_json::Error),
}
