//! Signed delivery to a DingTalk custom robot.
//!
//! The robot authenticates a request by `timestamp` (epoch millis) and
//! `sign = urlencode(base64(HMAC-SHA256(secret, "{timestamp}\n{secret}")))`
//! carried in the query string next to `access_token`.

use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::{debug, info, warn};

use crate::config::DingTalkConfig;
use crate::errors::{NotificationError, SigningError};

type HmacSha256 = Hmac<Sha256>;

/// Compute the URL-encoded request signature for `timestamp_ms`.
pub fn sign(secret: &str, timestamp_ms: i64) -> Result<String, SigningError> {
    let string_to_sign = format!("{}\n{}", timestamp_ms, secret);
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| SigningError::InvalidKey(e.to_string()))?;
    mac.update(string_to_sign.as_bytes());
    let digest = STANDARD.encode(mac.finalize().into_bytes());
    Ok(urlencoding::encode(&digest).into_owned())
}

/// Build the robot URL for one request.
///
/// Without a secret the URL carries only `access_token`, unless
/// `require_signature` is set, in which case signing fails.
pub fn signed_url(
    base: &str,
    token: &str,
    secret: Option<&str>,
    timestamp_ms: i64,
    require_signature: bool,
) -> Result<String, SigningError> {
    let token = urlencoding::encode(token);
    match secret {
        Some(secret) => {
            let sig = sign(secret, timestamp_ms)?;
            Ok(format!(
                "{}?access_token={}&timestamp={}&sign={}",
                base, token, timestamp_ms, sig
            ))
        }
        None if require_signature => Err(SigningError::MissingSecret),
        None => Ok(format!("{}?access_token={}", base, token)),
    }
}

/// Posts serialized messages to one robot.
pub struct WebhookSender {
    webhook_url: String,
    token: String,
    secret: Option<String>,
    require_signature: bool,
    http: reqwest::Client,
}

impl WebhookSender {
    /// Create a sender for `token`, with the HTTP timeout from `config`.
    pub fn new(config: &DingTalkConfig, token: String) -> Result<Self, NotificationError> {
        info!(
            url = %config.webhook_url,
            signed = config.secret.is_some(),
            "initializing DingTalk webhook sender"
        );
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            webhook_url: config.webhook_url.clone(),
            token,
            secret: config.secret.clone(),
            require_signature: config.require_signature,
            http,
        })
    }

    /// Whether requests carry a `sign` parameter.
    pub fn is_signed(&self) -> bool {
        self.secret.is_some()
    }

    /// POST `body` once; the timestamp is taken at call time.
    ///
    /// Non-2xx replies and replies whose `errcode` is non-zero are logged
    /// and returned as [`NotificationError::ProviderError`].
    pub async fn send(&self, body: String) -> Result<(), NotificationError> {
        let timestamp = chrono::Utc::now().timestamp_millis();
        let url = signed_url(
            &self.webhook_url,
            &self.token,
            self.secret.as_deref(),
            timestamp,
            self.require_signature,
        )?;

        debug!(len = body.len(), timestamp, "sending DingTalk message");

        let resp = self
            .http
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(NotificationError::HttpError)?;

        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();

        if !status.is_success() {
            warn!(status = %status, body = %text, "DingTalk webhook returned error");
            return Err(NotificationError::ProviderError {
                status: status.as_u16(),
                body: text,
            });
        }

        if let Some(errcode) = provider_errcode(&text) {
            warn!(status = %status, errcode, body = %text, "DingTalk rejected the message");
            return Err(NotificationError::ProviderError {
                status: status.as_u16(),
                body: text,
            });
        }

        info!(status = %status, body = %text, "DingTalk message sent");
        Ok(())
    }
}

/// Non-zero `errcode` from a DingTalk reply body, if any.
fn provider_errcode(body: &str) -> Option<i64> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    match value.get("errcode")?.as_i64()? {
        0 => None,
        code => Some(code),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_known_vector() {
        assert_eq!(
            sign("test", 1_000_000_000_000).unwrap(),
            "ms%2FYGo5mYW7Yj696zK7vZk56MY0dlyNxIPTjRPDwSlg%3D"
        );
        assert_eq!(
            sign("SEC0123456789abcdef", 1_700_000_000_000).unwrap(),
            "TSZbRFUuvaSQaRKUpF970OPCb2%2FLcQAP3wOvwZIzBZk%3D"
        );
    }

    #[test]
    fn test_sign_is_deterministic() {
        let a = sign("secret", 1_234).unwrap();
        let b = sign("secret", 1_234).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, sign("secret", 1_235).unwrap());
    }

    #[test]
    fn test_signed_url_with_secret() {
        let url = signed_url(
            "https://oapi.dingtalk.com/robot/send",
            "tok",
            Some("test"),
            1_000_000_000_000,
            true,
        )
        .unwrap();
        assert_eq!(
            url,
            "https://oapi.dingtalk.com/robot/send?access_token=tok\
             &timestamp=1000000000000&sign=ms%2FYGo5mYW7Yj696zK7vZk56MY0dlyNxIPTjRPDwSlg%3D"
        );
    }

    #[test]
    fn test_signed_url_missing_secret() {
        let result = signed_url("https://x/robot/send", "tok", None, 1, true);
        assert!(matches!(result, Err(SigningError::MissingSecret)));

        let url = signed_url("https://x/robot/send", "tok", None, 1, false).unwrap();
        assert_eq!(url, "https://x/robot/send?access_token=tok");
    }

    #[test]
    fn test_provider_errcode() {
        assert_eq!(provider_errcode(r#"{"errcode":0,"errmsg":"ok"}"#), None);
        assert_eq!(
            provider_errcode(r#"{"errcode":310000,"errmsg":"sign not match"}"#),
            Some(310000)
        );
        assert_eq!(provider_errcode("not json"), None);
    }

    #[test]
    fn test_sender_construction() {
        let config = DingTalkConfig {
            secret: Some("s".into()),
            ..DingTalkConfig::default()
        };
        let sender = WebhookSender::new(&config, "tok".into()).unwrap();
        assert!(sender.is_signed());
        assert_eq!(sender.webhook_url, "https://oapi.dingtalk.com/robot/send");
    }
}
