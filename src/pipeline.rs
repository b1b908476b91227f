use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::config::{Config, StorageConfig};
use crate::error::Result;
use crate::fetcher::WeatherFetcher;
use crate::model::{NormalizedRecord, RunIdentity};
use crate::probe::ReadinessProbe;
use crate::storage::{FsObjectStore, HttpObjectStore, ObjectStore, StorageCredentials};
use crate::transform;

/// Stages of a single run, in order. No stage is re-entered within a
/// run; the first failure makes `Failed` terminal for that attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Pending,
    Probing,
    Fetching,
    Transforming,
    Persisted,
    Failed,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunState::Pending => "pending",
            RunState::Probing => "probing",
            RunState::Fetching => "fetching",
            RunState::Transforming => "transforming",
            RunState::Persisted => "persisted",
            RunState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// What a successful run produced.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub object_key: String,
    pub record: NormalizedRecord,
}

/// One complete ingestion flow: probe, fetch, transform, persist.
///
/// Carries no state between runs. Every `execute` call starts from
/// scratch, so a retry that re-runs it repeats the whole flow.
pub struct Pipeline {
    config: Config,
    store: Arc<dyn ObjectStore>,
    credentials: StorageCredentials,
}

impl Pipeline {
    pub fn new(config: Config) -> Result<Self> {
        let store = build_store(&config.storage)?;
        let credentials = config.storage.credentials();
        Ok(Self {
            config,
            store,
            credentials,
        })
    }

    /// Drive one run front to back, reporting the object it persisted.
    pub async fn execute(&self) -> Result<RunReport> {
        let mut state = RunState::Pending;

        match self.run_stages(&mut state).await {
            Ok(report) => Ok(report),
            Err(e) => {
                warn!("Run failed during {} stage: {}", state, e);
                transition(&mut state, RunState::Failed);
                Err(e)
            }
        }
    }

    async fn run_stages(&self, state: &mut RunState) -> Result<RunReport> {
        transition(state, RunState::Probing);
        let probe = ReadinessProbe::new(&self.config.api, &self.config.probe)?;
        probe.wait_until_ready().await?;

        transition(state, RunState::Fetching);
        let fetcher = WeatherFetcher::new(&self.config.api)?;
        let reading = fetcher.fetch_current().await?;

        transition(state, RunState::Transforming);
        let record = transform::normalize(&reading)?;
        let body = transform::to_csv(&record)?;

        // Object names derive from wall-clock time at persistence, not
        // from the observation timestamp inside the reading.
        let identity = RunIdentity::generate(&self.config.api.city, Utc::now());
        let key = identity.object_key();
        self.store.put(&key, &body, &self.credentials).await?;

        transition(state, RunState::Persisted);
        info!("Persisted {} ({} bytes)", key, body.len());

        Ok(RunReport {
            object_key: key,
            record,
        })
    }
}

fn transition(state: &mut RunState, next: RunState) {
    debug!("Run state {} -> {}", state, next);
    *state = next;
}

fn build_store(storage: &StorageConfig) -> Result<Arc<dyn ObjectStore>> {
    Ok(match storage {
        StorageConfig::Http {
            endpoint, bucket, ..
        } => Arc::new(HttpObjectStore::new(endpoint, bucket)?),
        StorageConfig::Fs { root } => Arc::new(FsObjectStore::new(root.clone())),
    })
}
