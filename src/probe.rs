use std::time::Duration;

use reqwest::Client;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::config::{ApiConfig, ProbeConfig};
use crate::error::{AppError, Result};
use crate::fetcher::current_weather_url;

const PROBE_TIMEOUT_SECONDS: u64 = 30;

/// Pokes the weather endpoint until it answers with a success status,
/// so a run never commits to fetching against a dead upstream.
pub struct ReadinessProbe {
    client: Client,
    url: String,
    city: String,
    api_key: String,
    poke_interval: Duration,
    timeout: Duration,
}

impl ReadinessProbe {
    pub fn new(api: &ApiConfig, probe: &ProbeConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent("owm-ingest/0.1.0")
            .timeout(Duration::from_secs(PROBE_TIMEOUT_SECONDS))
            .build()?;

        Ok(Self {
            client,
            url: current_weather_url(&api.endpoint),
            city: api.city.clone(),
            api_key: api.api_key.clone(),
            poke_interval: Duration::from_secs(probe.poke_interval_seconds),
            timeout: Duration::from_secs(probe.timeout_seconds),
        })
    }

    /// Poke until the endpoint is ready or the window closes.
    ///
    /// A transport error and a non-success status both count as "not
    /// ready yet". Only the window expiring is fatal; the probe gives
    /// up as soon as the next poke could not complete inside it.
    pub async fn wait_until_ready(&self) -> Result<()> {
        let started = Instant::now();
        let deadline = started + self.timeout;
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            match self.poke().await {
                Ok(()) => {
                    info!(
                        "Weather endpoint ready after {} poke{}",
                        attempt,
                        if attempt == 1 { "" } else { "s" }
                    );
                    return Ok(());
                }
                Err(reason) => {
                    debug!("Poke {} found endpoint not ready: {}", attempt, reason);
                }
            }

            if Instant::now() + self.poke_interval > deadline {
                return Err(AppError::Timeout {
                    waited_seconds: started.elapsed().as_secs(),
                    poke_interval_seconds: self.poke_interval.as_secs(),
                });
            }

            tokio::time::sleep(self.poke_interval).await;
        }
    }

    async fn poke(&self) -> std::result::Result<(), String> {
        let response = self
            .client
            .get(&self.url)
            .query(&[("q", self.city.as_str()), ("appid", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(format!("status {}", status))
        }
    }
}
