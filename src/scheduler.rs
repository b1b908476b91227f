use crate::config::{Config, RetryConfig};
use crate::error::Result;
use crate::notify::Notifier;
use crate::pipeline::{Pipeline, RunReport};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::{interval, Duration};
use tracing::{error, info, warn};

pub struct Scheduler {
    config: Config,
    pipeline: Pipeline,
    notifier: Arc<dyn Notifier>,
    shutdown_rx: watch::Receiver<bool>,
}

impl Scheduler {
    pub fn new(
        config: Config,
        pipeline: Pipeline,
        notifier: Arc<dyn Notifier>,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Self {
        Self {
            config,
            pipeline,
            notifier,
            shutdown_rx,
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        let initial_delay = Duration::from_secs(self.config.scheduler.initial_delay_seconds);
        let run_interval = Duration::from_secs(self.config.scheduler.interval_hours * 3600);

        info!(
            "Scheduler starting with {}s initial delay, {}h interval",
            self.config.scheduler.initial_delay_seconds, self.config.scheduler.interval_hours
        );

        // Initial delay
        tokio::select! {
            _ = tokio::time::sleep(initial_delay) => {},
            _ = self.shutdown_rx.changed() => {
                info!("Shutdown received during initial delay");
                return Ok(());
            }
        }

        // Run immediately, then on interval
        self.run_once().await;

        let mut ticker = interval(run_interval);
        ticker.tick().await; // First tick is immediate, skip it

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.run_once().await;
                }
                _ = self.shutdown_rx.changed() => {
                    info!("Shutdown signal received, stopping scheduler");
                    break;
                }
            }
        }

        Ok(())
    }

    async fn run_once(&self) {
        if let Some(start_date) = self.config.start_date {
            let today = chrono::Utc::now().date_naive();
            if today < start_date {
                info!(
                    "Skipping run: start date {} not reached (today is {})",
                    start_date, today
                );
                return;
            }
        }

        info!("Starting ingestion run for {}", self.config.api.city);

        match execute_with_retry(&self.pipeline, &self.config.retry, self.notifier.as_ref()).await {
            Ok(report) => {
                info!(
                    "Ingestion run completed: {} ({}, {})",
                    report.object_key, report.record.city, report.record.description
                );
            }
            Err(e) => {
                error!("Ingestion run failed permanently: {}", e);
            }
        }
    }
}

/// Drive one run to success or exhaustion.
///
/// Every re-attempt restarts the whole flow at the readiness probe, and
/// the delay between attempts is fixed and uniform across error kinds.
/// `max_retries` counts re-attempts, so the total attempt count is one
/// higher.
pub async fn execute_with_retry(
    pipeline: &Pipeline,
    retry: &RetryConfig,
    notifier: &dyn Notifier,
) -> Result<RunReport> {
    let max_attempts = retry.max_retries + 1;
    let delay = Duration::from_secs(retry.delay_seconds);
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        match pipeline.execute().await {
            Ok(report) => return Ok(report),
            Err(e) => {
                if attempt >= max_attempts {
                    notifier.run_failed(attempt, &e).await;
                    return Err(e);
                }

                notifier
                    .retry_scheduled(attempt, max_attempts, retry.delay_seconds, &e)
                    .await;
                warn!(
                    "Run attempt {}/{} failed: {}. Retrying in {:?}...",
                    attempt, max_attempts, e, delay
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}
