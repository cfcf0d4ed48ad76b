//! Alerting subsystem for workflow executions.
//!
//! The workflow server notifies alerters through the [`Alerter`] hooks. Every
//! hook defaults to doing nothing, so an alerter overrides only the events it
//! reports. [`AlertDispatcher`] is the host's single dispatch point: it calls
//! the configured alerter and logs a failed delivery instead of propagating
//! it, so alerting never fails the workflow it reports on.

pub mod dingtalk;
pub mod message;
pub mod report;
pub mod signer;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::errors::{CoreError, NotificationError};
use crate::models::{ExecutableFlow, Executor, SlaOption};

/// Notification hooks invoked by the workflow server.
#[async_trait]
pub trait Alerter: Send + Sync {
    /// Short channel name for logs.
    fn name(&self) -> &str;

    async fn alert_on_success(&self, _flow: &ExecutableFlow) -> Result<(), NotificationError> {
        Ok(())
    }

    /// The execution finished in a failed state.
    async fn alert_on_error(
        &self,
        _flow: &ExecutableFlow,
        _extra_reasons: &[String],
    ) -> Result<(), NotificationError> {
        Ok(())
    }

    /// The first node of a still-running execution failed.
    async fn alert_on_first_error(&self, _flow: &ExecutableFlow) -> Result<(), NotificationError> {
        Ok(())
    }

    async fn alert_on_sla(
        &self,
        _sla: &SlaOption,
        _message: &str,
    ) -> Result<(), NotificationError> {
        Ok(())
    }

    /// The server lost track of executions running on `executor`.
    async fn alert_on_failed_update(
        &self,
        _executor: &Executor,
        _executions: &[ExecutableFlow],
        _error: &str,
    ) -> Result<(), NotificationError> {
        Ok(())
    }

    async fn alert_on_failed_executor_health_check(
        &self,
        _executor: &Executor,
        _executions: &[ExecutableFlow],
        _error: &str,
        _alert_emails: &[String],
    ) -> Result<(), NotificationError> {
        Ok(())
    }
}

/// Tally of one dispatched hook.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub succeeded: usize,
    pub failed: usize,
}

impl DispatchOutcome {
    fn record(&mut self, alerter: &dyn Alerter, hook: &str, result: Result<(), NotificationError>) {
        match result {
            Ok(()) => self.succeeded += 1,
            Err(e) => {
                warn!(alerter = alerter.name(), hook, error = %e, "alert delivery failed");
                self.failed += 1;
            }
        }
    }
}

/// Host-side dispatch point that logs and continues on alert failures.
#[derive(Default, Clone)]
pub struct AlertDispatcher {
    alerters: Vec<Arc<dyn Alerter>>,
}

impl AlertDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Dispatcher with every channel the configuration enables.
    pub fn from_config(config: &AppConfig) -> Result<Self, CoreError> {
        let mut dispatcher = Self::new();
        let dingtalk = dingtalk::DingTalkAlerter::new(config)?;
        if dingtalk.is_enabled() {
            dispatcher.register(Arc::new(dingtalk));
        }
        info!(alerters = dispatcher.len(), "alert dispatcher ready");
        Ok(dispatcher)
    }

    pub fn register(&mut self, alerter: Arc<dyn Alerter>) {
        self.alerters.push(alerter);
    }

    pub fn len(&self) -> usize {
        self.alerters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alerters.is_empty()
    }

    pub async fn on_success(&self, flow: &ExecutableFlow) -> DispatchOutcome {
        let mut outcome = DispatchOutcome::default();
        for alerter in &self.alerters {
            let result = alerter.alert_on_success(flow).await;
            outcome.record(alerter.as_ref(), "success", result);
        }
        outcome
    }

    pub async fn on_error(&self, flow: &ExecutableFlow, extra_reasons: &[String]) -> DispatchOutcome {
        let mut outcome = DispatchOutcome::default();
        for alerter in &self.alerters {
            let result = alerter.alert_on_error(flow, extra_reasons).await;
            outcome.record(alerter.as_ref(), "error", result);
        }
        outcome
    }

    pub async fn on_first_error(&self, flow: &ExecutableFlow) -> DispatchOutcome {
        let mut outcome = DispatchOutcome::default();
        for alerter in &self.alerters {
            let result = alerter.alert_on_first_error(flow).await;
            outcome.record(alerter.as_ref(), "first_error", result);
        }
        outcome
    }

    pub async fn on_sla(&self, sla: &SlaOption, message: &str) -> DispatchOutcome {
        let mut outcome = DispatchOutcome::default();
        for alerter in &self.alerters {
            let result = alerter.alert_on_sla(sla, message).await;
            outcome.record(alerter.as_ref(), "sla", result);
        }
        outcome
    }

    pub async fn on_failed_update(
        &self,
        executor: &Executor,
        executions: &[ExecutableFlow],
        error: &str,
    ) -> DispatchOutcome {
        let mut outcome = DispatchOutcome::default();
        for alerter in &self.alerters {
            let result = alerter
                .alert_on_failed_update(executor, executions, error)
                .await;
            outcome.record(alerter.as_ref(), "failed_update", result);
        }
        outcome
    }

    pub async fn on_failed_executor_health_check(
        &self,
        executor: &Executor,
        executions: &[ExecutableFlow],
        error: &str,
        alert_emails: &[String],
    ) -> DispatchOutcome {
        let mut outcome = DispatchOutcome::default();
        for alerter in &self.alerters {
            let result = alerter
                .alert_on_failed_executor_health_check(executor, executions, error, alert_emails)
                .await;
            outcome.record(alerter.as_ref(), "executor_health_check", result);
        }
        outcome
    }
}
