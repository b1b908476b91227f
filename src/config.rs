use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::storage::StorageCredentials;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_owner")]
    pub owner: String,
    /// Runs are skipped until this date is reached (scheduler keeps
    /// ticking). Absent means start immediately.
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    pub api: ApiConfig,
    #[serde(default)]
    pub probe: ProbeConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub notifications: NotificationConfig,
    pub storage: StorageConfig,
}

fn default_owner() -> String {
    "data-platform".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    /// Base URL of the weather API, e.g. `https://api.openweathermap.org`.
    pub endpoint: String,
    pub city: String,
    pub api_key: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProbeConfig {
    #[serde(default = "default_poke_interval")]
    pub poke_interval_seconds: u64,
    #[serde(default = "default_probe_timeout")]
    pub timeout_seconds: u64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            poke_interval_seconds: default_poke_interval(),
            timeout_seconds: default_probe_timeout(),
        }
    }
}

fn default_poke_interval() -> u64 {
    60
}

fn default_probe_timeout() -> u64 {
    3600
}

#[derive(Debug, Deserialize, Clone)]
pub struct SchedulerConfig {
    #[serde(default = "default_interval_hours")]
    pub interval_hours: u64,
    #[serde(default = "default_initial_delay")]
    pub initial_delay_seconds: u64,
    /// Accepted but inert: historical backfill is never performed, and
    /// enabling this only logs a warning.
    #[serde(default)]
    pub catchup: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_hours: default_interval_hours(),
            initial_delay_seconds: default_initial_delay(),
            catchup: false,
        }
    }
}

fn default_interval_hours() -> u64 {
    24
}

fn default_initial_delay() -> u64 {
    10
}

/// Whole-run retry policy: a failed run is re-attempted from the
/// readiness probe, with a fixed delay between attempts.
#[derive(Debug, Deserialize, Clone)]
pub struct RetryConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_delay")]
    pub delay_seconds: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            delay_seconds: default_retry_delay(),
        }
    }
}

fn default_max_retries() -> u32 {
    2
}

fn default_retry_delay() -> u64 {
    120
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct NotificationConfig {
    #[serde(default)]
    pub email: Vec<String>,
    #[serde(default)]
    pub email_on_failure: bool,
    #[serde(default)]
    pub email_on_retry: bool,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum StorageConfig {
    /// S3-compatible gateway: objects are PUT to
    /// `{endpoint}/{bucket}/{key}` with the credential triple attached
    /// per request.
    Http {
        endpoint: String,
        bucket: String,
        access_key: String,
        secret_key: String,
        #[serde(default)]
        session_token: Option<String>,
    },
    /// Local directory sink for development runs.
    Fs { root: PathBuf },
}

impl StorageConfig {
    pub fn credentials(&self) -> StorageCredentials {
        match self {
            StorageConfig::Http {
                access_key,
                secret_key,
                session_token,
                ..
            } => StorageCredentials {
                access_key: access_key.clone(),
                secret_key: secret_key.clone(),
                session_token: session_token.clone(),
            },
            StorageConfig::Fs { .. } => StorageCredentials::anonymous(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| AppError::Config(format!("Failed to read config file: {}", e)))?;

        let expanded = expand_env_vars(&content)?;

        let config: Config = serde_yaml::from_str(&expanded)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    ///
    /// Checks for:
    /// - Unexpanded environment variables in credentials
    /// - Valid endpoint URLs
    /// - Non-empty required fields
    /// - Coherent probe and scheduler intervals
    /// - Notification flags without a recipient
    fn validate(&self) -> Result<()> {
        if self.api.city.trim().is_empty() {
            return Err(AppError::Config("api.city cannot be empty".to_string()));
        }

        if self.api.api_key.is_empty() {
            return Err(AppError::Config(
                "api.api_key cannot be empty. Set OWM_API_KEY or create a .env file \
                 (see .env.example)."
                    .to_string(),
            ));
        }

        if self.api.api_key.contains("${") {
            return Err(AppError::Config(
                "api.api_key environment variable is not set. \
                 Please set it or create a .env file. \
                 See .env.example for required variables."
                    .to_string(),
            ));
        }

        validate_endpoint("api.endpoint", &self.api.endpoint)?;

        if self.probe.poke_interval_seconds == 0 {
            return Err(AppError::Config(
                "probe.poke_interval_seconds must be greater than 0".to_string(),
            ));
        }

        if self.probe.timeout_seconds < self.probe.poke_interval_seconds {
            return Err(AppError::Config(format!(
                "probe.timeout_seconds ({}) must be at least probe.poke_interval_seconds ({})",
                self.probe.timeout_seconds, self.probe.poke_interval_seconds
            )));
        }

        if self.scheduler.interval_hours == 0 {
            return Err(AppError::Config(
                "scheduler.interval_hours must be greater than 0".to_string(),
            ));
        }

        if self.scheduler.catchup {
            tracing::warn!(
                "scheduler.catchup is enabled but historical backfill is not supported; \
                 the flag is ignored"
            );
        }

        if self.retry.max_retries > 10 {
            tracing::warn!(
                "retry.max_retries of {} is very high, consider 10 or fewer",
                self.retry.max_retries
            );
        }

        let wants_email =
            self.notifications.email_on_failure || self.notifications.email_on_retry;
        if wants_email && self.notifications.email.is_empty() {
            return Err(AppError::Config(
                "notifications.email must list at least one recipient when \
                 email_on_failure or email_on_retry is enabled"
                    .to_string(),
            ));
        }

        match &self.storage {
            StorageConfig::Http {
                endpoint,
                bucket,
                access_key,
                secret_key,
                ..
            } => {
                validate_endpoint("storage.endpoint", endpoint)?;

                if bucket.trim().is_empty() {
                    return Err(AppError::Config(
                        "storage.bucket cannot be empty".to_string(),
                    ));
                }

                for (name, value) in
                    [("storage.access_key", access_key), ("storage.secret_key", secret_key)]
                {
                    if value.is_empty() || value.contains("${") {
                        return Err(AppError::Config(format!(
                            "{} is not set. Please set the corresponding environment \
                             variable or create a .env file. See .env.example.",
                            name
                        )));
                    }
                }
            }
            StorageConfig::Fs { root } => {
                if root.as_os_str().is_empty() {
                    return Err(AppError::Config(
                        "storage.root cannot be empty".to_string(),
                    ));
                }
            }
        }

        Ok(())
    }
}

fn validate_endpoint(field: &str, value: &str) -> Result<()> {
    let parsed = url::Url::parse(value)
        .map_err(|e| AppError::Config(format!("Invalid {} '{}': {}", field, value, e)))?;

    match parsed.scheme() {
        "https" => {}
        // Plain HTTP stays allowed for local gateways; flag it so it
        // never reaches production silently.
        "http" => tracing::warn!("{} uses plain HTTP: {}", field, value),
        other => {
            return Err(AppError::Config(format!(
                "{} must use http or https, got: {}",
                field, other
            )));
        }
    }

    Ok(())
}

fn expand_env_vars(content: &str) -> Result<String> {
    let mut result = content.to_string();
    let re = regex_lite::Regex::new(r"\$\{([^}]+)\}").unwrap();

    let mut missing_vars = Vec::new();

    for cap in re.captures_iter(content) {
        let var_name = &cap[1];
        match std::env::var(var_name) {
            Ok(value) => {
                result = result.replace(&cap[0], &value);
            }
            Err(_) => {
                missing_vars.push(var_name.to_string());
            }
        }
    }

    if !missing_vars.is_empty() {
        return Err(AppError::Config(format!(
            "Missing required environment variable{}: {}\n\n\
             To fix this:\n\
             1. Create a .env file in the project root (copy .env.example)\n\
             2. Or export the variable{} before running",
            if missing_vars.len() > 1 { "s" } else { "" },
            missing_vars.join(", "),
            if missing_vars.len() > 1 { "s" } else { "" },
        )));
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_yaml() -> String {
        r#"
api:
  endpoint: https://api.openweathermap.org
  city: Lisbon
  api_key: test-key
storage:
  backend: fs
  root: ./data
"#
        .to_string()
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config: Config = serde_yaml::from_str(&base_yaml()).unwrap();
        assert_eq!(config.owner, "data-platform");
        assert_eq!(config.start_date, None);
        assert_eq!(config.probe.poke_interval_seconds, 60);
        assert_eq!(config.probe.timeout_seconds, 3600);
        assert_eq!(config.scheduler.interval_hours, 24);
        assert!(!config.scheduler.catchup);
        assert_eq!(config.retry.max_retries, 2);
        assert_eq!(config.retry.delay_seconds, 120);
        assert!(config.notifications.email.is_empty());
        assert!(!config.notifications.email_on_failure);
        config.validate().unwrap();
    }

    #[test]
    fn test_start_date_parses() {
        let yaml = format!("start_date: 2023-01-08\n{}", base_yaml());
        let config: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(
            config.start_date,
            Some(NaiveDate::from_ymd_opt(2023, 1, 8).unwrap())
        );
    }

    #[test]
    fn test_http_storage_backend_parses() {
        let yaml = r#"
api:
  endpoint: https://api.openweathermap.org
  city: Lisbon
  api_key: test-key
storage:
  backend: http
  endpoint: https://storage.example.com
  bucket: weather-api-ingest
  access_key: AKIA123
  secret_key: shh
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        config.validate().unwrap();

        let credentials = config.storage.credentials();
        assert_eq!(credentials.access_key, "AKIA123");
        assert_eq!(credentials.secret_key, "shh");
        assert_eq!(credentials.session_token, None);
    }

    #[test]
    fn test_notification_flag_requires_recipient() {
        let yaml = format!(
            "{}notifications:\n  email_on_failure: true\n",
            base_yaml()
        );
        let config: Config = serde_yaml::from_str(&yaml).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("at least one recipient"));
    }

    #[test]
    fn test_probe_timeout_must_cover_poke_interval() {
        let yaml = format!(
            "{}probe:\n  poke_interval_seconds: 120\n  timeout_seconds: 60\n",
            base_yaml()
        );
        let config: Config = serde_yaml::from_str(&yaml).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("poke_interval_seconds"));
    }

    #[test]
    fn test_rejects_non_http_endpoint() {
        let yaml = base_yaml().replace(
            "endpoint: https://api.openweathermap.org",
            "endpoint: ftp://api.openweathermap.org",
        );
        let config: Config = serde_yaml::from_str(&yaml).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("http or https"));
    }

    #[test]
    fn test_unexpanded_api_key_is_rejected() {
        let yaml = base_yaml().replace("api_key: test-key", "api_key: ${OWM_API_KEY}");
        let config: Config = serde_yaml::from_str(&yaml).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("environment variable"));
    }

    #[test]
    fn test_expand_env_vars_substitutes() {
        std::env::set_var("OWM_INGEST_TEST_VAR", "sesame");
        let expanded = expand_env_vars("key: ${OWM_INGEST_TEST_VAR}").unwrap();
        assert_eq!(expanded, "key: sesame");
        std::env::remove_var("OWM_INGEST_TEST_VAR");
    }

    #[test]
    fn test_expand_env_vars_reports_missing() {
        let err = expand_env_vars("key: ${OWM_INGEST_DEFINITELY_UNSET}").unwrap_err();
        assert!(err.to_string().contains("OWM_INGEST_DEFINITELY_UNSET"));
    }
}
