//! Execution-engine types consumed by the alerters.
//!
//! These mirror what the workflow server hands an alerter: a flow execution
//! with its per-node results, SLA rules, and executor descriptions. They are
//! deserializable so an execution can be fed in from JSON.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Lifecycle status of a flow execution or one of its nodes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Ready,
    Dispatching,
    Preparing,
    Running,
    Paused,
    Succeeded,
    Killing,
    Killed,
    Failed,
    FailedFinishing,
    Skipped,
    Disabled,
    Queued,
    FailedSucceeded,
    Cancelled,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Ready => "READY",
            Self::Dispatching => "DISPATCHING",
            Self::Preparing => "PREPARING",
            Self::Running => "RUNNING",
            Self::Paused => "PAUSED",
            Self::Succeeded => "SUCCEEDED",
            Self::Killing => "KILLING",
            Self::Killed => "KILLED",
            Self::Failed => "FAILED",
            Self::FailedFinishing => "FAILED_FINISHING",
            Self::Skipped => "SKIPPED",
            Self::Disabled => "DISABLED",
            Self::Queued => "QUEUED",
            Self::FailedSucceeded => "FAILED_SUCCEEDED",
            Self::Cancelled => "CANCELLED",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Flow execution
// ---------------------------------------------------------------------------

/// One job within a flow execution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExecutableNode {
    pub id: String,
    pub status: Status,
}

impl ExecutableNode {
    pub fn new(id: impl Into<String>, status: Status) -> Self {
        Self {
            id: id.into(),
            status,
        }
    }
}

/// A single run of a flow.
///
/// Times are epoch milliseconds; `-1` means the time is not known yet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExecutableFlow {
    pub flow_id: String,
    pub execution_id: i64,
    pub project_name: String,
    #[serde(default = "unset_time")]
    pub start_time: i64,
    #[serde(default = "unset_time")]
    pub end_time: i64,
    pub status: Status,
    /// Nodes in flow order.
    #[serde(default)]
    pub nodes: Vec<ExecutableNode>,
}

fn unset_time() -> i64 {
    -1
}

impl ExecutableFlow {
    /// Ids of the nodes whose status is exactly [`Status::Failed`], in flow
    /// order.
    pub fn failed_jobs(&self) -> Vec<&str> {
        self.nodes
            .iter()
            .filter(|node| node.status == Status::Failed)
            .map(|node| node.id.as_str())
            .collect()
    }
}

// ---------------------------------------------------------------------------
// SLA / executors
// ---------------------------------------------------------------------------

/// A service-level rule attached to a flow or job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SlaOption {
    /// Rule type, e.g. `FlowFinish` or `JobSucceed`.
    pub kind: String,
    pub flow_id: String,
    #[serde(default)]
    pub job_id: Option<String>,
    /// Allowed duration before the rule is violated.
    #[serde(default)]
    pub duration_ms: Option<i64>,
}

/// A worker process the web server dispatches executions to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Executor {
    pub id: i64,
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub active: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flow_with(nodes: Vec<ExecutableNode>) -> ExecutableFlow {
        ExecutableFlow {
            flow_id: "etl_daily".into(),
            execution_id: 42,
            project_name: "warehouse".into(),
            start_time: -1,
            end_time: -1,
            status: Status::Failed,
            nodes,
        }
    }

    #[test]
    fn test_status_display_matches_serde() {
        for status in [Status::Failed, Status::FailedFinishing, Status::Succeeded] {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status));
        }
    }

    #[test]
    fn test_failed_jobs_keeps_order_and_exact_status() {
        let flow = flow_with(vec![
            ExecutableNode::new("extract", Status::Succeeded),
            ExecutableNode::new("load_table", Status::Failed),
            ExecutableNode::new("cleanup", Status::Killed),
            ExecutableNode::new("notify", Status::FailedFinishing),
            ExecutableNode::new("audit", Status::Failed),
            ExecutableNode::new("report", Status::Cancelled),
        ]);
        assert_eq!(flow.failed_jobs(), vec!["load_table", "audit"]);
    }

    #[test]
    fn test_failed_jobs_empty() {
        assert!(flow_with(vec![]).failed_jobs().is_empty());

        let flow = flow_with(vec![ExecutableNode::new("a", Status::Succeeded)]);
        assert!(flow.failed_jobs().is_empty());
    }

    #[test]
    fn test_deserialize_flow_defaults() {
        let json = r#"{
            "flow_id": "etl_daily",
            "execution_id": 7,
            "project_name": "warehouse",
            "status": "KILLED"
        }"#;
        let flow: ExecutableFlow = serde_json::from_str(json).unwrap();
        assert_eq!(flow.start_time, -1);
        assert_eq!(flow.end_time, -1);
        assert_eq!(flow.status, Status::Killed);
        assert!(flow.nodes.is_empty());
    }
}
