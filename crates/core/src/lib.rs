//! flowalert core library.
//!
//! Turns failed workflow executions into Markdown reports and posts them to
//! a DingTalk group robot using the robot's timestamp + HMAC-SHA256 request
//! signing. Provides configuration, the execution models the alerters
//! consume, and the alert dispatch point.

pub mod config;
pub mod errors;
pub mod models;
pub mod notify;
pub mod timefmt;

// Re-exports for convenience.
pub use config::AppConfig;
pub use models::{ExecutableFlow, ExecutableNode, Status};
pub use notify::dingtalk::DingTalkAlerter;
pub use notify::{AlertDispatcher, Alerter};
