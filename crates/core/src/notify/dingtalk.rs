//! DingTalk robot alerter.
//!
//! Implements only the on-error hook: a Markdown failure report is rendered
//! and posted to the configured robot. Without a token the alerter is inert.

use async_trait::async_trait;
use chrono::FixedOffset;
use tracing::{debug, info};

use crate::config::{AppConfig, ServerConfig};
use crate::errors::{CoreError, NotificationError};
use crate::models::ExecutableFlow;
use crate::notify::message::MarkdownMessage;
use crate::notify::report::{FailureReport, RenderContext};
use crate::notify::signer::WebhookSender;
use crate::notify::Alerter;

/// Alerter that reports failed executions to a DingTalk group robot.
pub struct DingTalkAlerter {
    sender: Option<WebhookSender>,
    server: ServerConfig,
    offset: FixedOffset,
}

impl DingTalkAlerter {
    /// Build from resolved configuration. A missing token yields a disabled
    /// alerter, not an error.
    pub fn new(config: &AppConfig) -> Result<Self, CoreError> {
        let offset = config.server.offset()?;
        let sender = match config.dingtalk.token.clone() {
            Some(token) => {
                info!("DingTalk alerts enabled");
                Some(WebhookSender::new(&config.dingtalk, token)?)
            }
            None => {
                info!("no DingTalk token configured; DingTalk alerts disabled");
                None
            }
        };

        Ok(Self {
            sender,
            server: config.server.clone(),
            offset,
        })
    }

    /// Whether a token is configured.
    pub fn is_enabled(&self) -> bool {
        self.sender.is_some()
    }

    pub fn sender(&self) -> Option<&WebhookSender> {
        self.sender.as_ref()
    }

    /// Render the failure report for `flow` without sending it.
    pub fn build_message(
        &self,
        flow: &ExecutableFlow,
        extra_reasons: &[String],
        now_ms: i64,
    ) -> MarkdownMessage {
        let base_url = self.server.base_url();
        let ctx = RenderContext {
            server_name: &self.server.name,
            base_url: &base_url,
            offset: self.offset,
            now_ms,
        };
        FailureReport::from_flow(flow, extra_reasons).render(&ctx)
    }

    /// Serialize and post `message`; a no-op when disabled.
    pub async fn send_message(&self, message: &MarkdownMessage) -> Result<(), NotificationError> {
        let Some(ref sender) = self.sender else {
            debug!("DingTalk disabled; message dropped");
            return Ok(());
        };
        sender.send(message.to_json()?).await
    }
}

#[async_trait]
impl Alerter for DingTalkAlerter {
    fn name(&self) -> &str {
        "dingtalk"
    }

    async fn alert_on_error(
        &self,
        flow: &ExecutableFlow,
        extra_reasons: &[String],
    ) -> Result<(), NotificationError> {
        if !self.is_enabled() {
            debug!(execution_id = flow.execution_id, "DingTalk disabled; skipping error alert");
            return Ok(());
        }

        info!(
            flow = %flow.flow_id,
            execution_id = flow.execution_id,
            project = %flow.project_name,
            "sending DingTalk failure alert"
        );

        let now_ms = chrono::Utc::now().timestamp_millis();
        let message = self.build_message(flow, extra_reasons, now_ms);
        self.send_message(&message).await
    }
}
