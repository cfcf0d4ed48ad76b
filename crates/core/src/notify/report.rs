//! Failure report rendering.
//!
//! A [`FailureReport`] is derived on demand from a failed execution and
//! rendered into the Markdown body sent to chat robots.

use chrono::FixedOffset;

use crate::models::{ExecutableFlow, Status};
use crate::notify::message::MarkdownMessage;
use crate::timefmt::{format_date_time_zone, format_duration};

/// What went wrong in one execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureReport {
    pub flow_id: String,
    pub execution_id: i64,
    pub project_name: String,
    pub start_time: i64,
    pub end_time: i64,
    pub status: Status,
    /// Ids of failed nodes, in flow order.
    pub failed_jobs: Vec<String>,
    /// Free-text reasons supplied by the caller.
    pub extra_reasons: Vec<String>,
}

/// Where the report is rendered for.
#[derive(Debug, Clone)]
pub struct RenderContext<'a> {
    /// Server display name.
    pub server_name: &'a str,
    /// `scheme://host:port` of the web UI.
    pub base_url: &'a str,
    pub offset: FixedOffset,
    /// Epoch millis used to measure executions that have not ended.
    pub now_ms: i64,
}

impl FailureReport {
    pub fn from_flow(flow: &ExecutableFlow, extra_reasons: &[String]) -> Self {
        Self {
            flow_id: flow.flow_id.clone(),
            execution_id: flow.execution_id,
            project_name: flow.project_name.clone(),
            start_time: flow.start_time,
            end_time: flow.end_time,
            status: flow.status,
            failed_jobs: flow.failed_jobs().into_iter().map(str::to_owned).collect(),
            extra_reasons: extra_reasons.to_vec(),
        }
    }

    /// Link to the execution page in the web UI.
    pub fn execution_url(&self, base_url: &str) -> String {
        format!("{}/executor?execid={}", base_url, self.execution_id)
    }

    pub fn title(&self, server_name: &str) -> String {
        format!(
            "Flow {} has encountered a failure on {}",
            self.flow_id, server_name
        )
    }

    pub fn render(&self, ctx: &RenderContext<'_>) -> MarkdownMessage {
        let execution_url = self.execution_url(ctx.base_url);

        let header = format!(
            "# Execution {} of flow {} of project {} has encountered a failure on {} \n",
            self.execution_id, self.flow_id, self.project_name, ctx.server_name
        );
        let start_time = format!(
            "- Start Time: {} \n",
            format_date_time_zone(self.start_time, ctx.offset)
        );
        let end_time = format!(
            "- End Time: {} \n",
            format_date_time_zone(self.end_time, ctx.offset)
        );
        let duration = format!(
            "- Duration: {}\n",
            format_duration(self.start_time, self.end_time, ctx.now_ms)
        );
        let status = format!("- Status: {} \n", self.status);
        let execution_link = format!("- [Execution Link]({}) \n", execution_url);
        let reason_section = "## Reason \n".to_string();

        let mut reasons = String::new();
        for job in &self.failed_jobs {
            reasons.push_str(&format!(
                "- [Failed job '{}' Link]({}&job={}) \n",
                job, execution_url, job
            ));
        }
        for reason in &self.extra_reasons {
            reasons.push_str(&format!("- {}\n", reason));
        }

        MarkdownMessage::new(
            self.title(ctx.server_name),
            [
                header,
                start_time,
                end_time,
                duration,
                status,
                execution_link,
                reason_section,
                reasons,
            ],
        )
    }
}
