use async_trait::async_trait;
use tracing::{error, warn};

use crate::config::NotificationConfig;
use crate::error::AppError;

/// Seam for outbound run notifications. Actual delivery (mail, paging,
/// chat) lives outside this service; implementations only accept the
/// event. Emission must never fail a run, so these return nothing.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// The run just failed and another attempt is scheduled.
    async fn retry_scheduled(
        &self,
        attempt: u32,
        max_attempts: u32,
        delay_seconds: u64,
        error: &AppError,
    );

    /// The run failed for good, all attempts spent.
    async fn run_failed(&self, attempts: u32, error: &AppError);
}

/// Writes notification events to the log sink, honoring the configured
/// flags and recipient list.
pub struct LogNotifier {
    config: NotificationConfig,
}

impl LogNotifier {
    pub fn new(config: NotificationConfig) -> Self {
        Self { config }
    }

    fn recipients(&self) -> String {
        self.config.email.join(", ")
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn retry_scheduled(
        &self,
        attempt: u32,
        max_attempts: u32,
        delay_seconds: u64,
        error: &AppError,
    ) {
        if !self.config.email_on_retry {
            return;
        }
        warn!(
            "Notifying [{}]: attempt {}/{} failed, next in {}s: {}",
            self.recipients(),
            attempt,
            max_attempts,
            delay_seconds,
            error
        );
    }

    async fn run_failed(&self, attempts: u32, error: &AppError) {
        if !self.config.email_on_failure {
            return;
        }
        error!(
            "Notifying [{}]: run failed after {} attempt{}: {}",
            self.recipients(),
            attempts,
            if attempts == 1 { "" } else { "s" },
            error
        );
    }
}
