use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use crate::config::ApiConfig;
use crate::error::{AppError, Result};
use crate::model::WeatherReading;

/// Current-conditions path on the weather API.
pub(crate) const CURRENT_WEATHER_PATH: &str = "/data/2.5/weather";

const REQUEST_TIMEOUT_SECONDS: u64 = 60;
const MAX_LOGGED_BODY: usize = 200;

/// Issues the single data request of a run and parses the reply.
pub struct WeatherFetcher {
    client: Client,
    url: String,
    city: String,
    api_key: String,
}

impl WeatherFetcher {
    pub fn new(api: &ApiConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent("owm-ingest/0.1.0")
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECONDS))
            .build()?;

        Ok(Self {
            client,
            url: current_weather_url(&api.endpoint),
            city: api.city.clone(),
            api_key: api.api_key.clone(),
        })
    }

    /// Fetch the current conditions for the configured city.
    ///
    /// The raw body goes to the log sink before parsing, so a rejected
    /// payload can still be inspected afterwards. A non-success status
    /// is `Upstream`; a body that is not JSON is `MalformedResponse`.
    pub async fn fetch_current(&self) -> Result<WeatherReading> {
        debug!("Fetching current weather for {} from {}", self.city, self.url);

        let response = self
            .client
            .get(&self.url)
            .query(&[("q", self.city.as_str()), ("appid", self.api_key.as_str())])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        debug!(
            "Weather response for {} ({} bytes): {}",
            self.city,
            body.len(),
            body
        );

        if !status.is_success() {
            return Err(AppError::Upstream {
                status,
                body: truncate_body(&body),
            });
        }

        WeatherReading::from_json(&body)
    }
}

pub(crate) fn current_weather_url(endpoint: &str) -> String {
    format!("{}{}", endpoint.trim_end_matches('/'), CURRENT_WEATHER_PATH)
}

/// Error payloads can be arbitrarily large; keep the leading part.
pub(crate) fn truncate_body(body: &str) -> String {
    if body.chars().count() > MAX_LOGGED_BODY {
        let cut: String = body.chars().take(MAX_LOGGED_BODY).collect();
        format!("{}...", cut)
    } else {
        body.to_string()
    }
}
