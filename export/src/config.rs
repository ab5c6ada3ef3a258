//! Configuration for the export service.
//!
//! Loaded from YAML; every field has a default so a minimal file only needs
//! `search.url` and `export.url_prefix`:
//!
//! ```yaml
//! storage:
//!   type: SlateDb
//!   path: export-sessions
//!   object_store:
//!     type: Local
//!     path: /var/lib/export
//! file_store:
//!   type: Aws
//!   region: us-east-1
//!   bucket: log-exports
//! search:
//!   url: http://search.internal:9200/api/v1/search
//! export:
//!   url_prefix: https://log-exports.s3.amazonaws.com
//!   workers: 8
//!   allowed_users: [alice, bob]
//! ```

use std::path::Path;
use std::time::Duration;

use common::{ObjectStoreConfig, StorageConfig};
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::partition::PartLength;
use crate::rate_limit::RateLimitConfig;

/// Root configuration file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceConfig {
    /// Backend of the Session Store.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Where exported partitions and manifests are written.
    #[serde(default)]
    pub file_store: ObjectStoreConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub export: ExportConfig,
}

impl ServiceConfig {
    pub fn validate(&self) -> Result<()> {
        self.search.validate()?;
        self.export.validate()
    }
}

/// Remote search service and the pacing applied to it.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    #[serde(default)]
    pub url: String,
    /// Minimum spacing between successful calls, in milliseconds.
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
    /// Per-request timeout, in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_delay_ms() -> u64 {
    100
}

fn default_initial_backoff_ms() -> u64 {
    500
}

fn default_max_backoff_ms() -> u64 {
    30_000
}

fn default_timeout_ms() -> u64 {
    60_000
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            delay_ms: default_delay_ms(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl SearchConfig {
    pub fn validate(&self) -> Result<()> {
        if self.url.is_empty() {
            return Err(Error::Config("search.url must be set".to_string()));
        }
        if self.initial_backoff_ms > self.max_backoff_ms {
            return Err(Error::Config(format!(
                "search.initial_backoff_ms ({}) exceeds search.max_backoff_ms ({})",
                self.initial_backoff_ms, self.max_backoff_ms
            )));
        }
        Ok(())
    }

    pub fn rate_limit(&self) -> RateLimitConfig {
        RateLimitConfig {
            delay: Duration::from_millis(self.delay_ms),
            initial_backoff: Duration::from_millis(self.initial_backoff_ms),
            max_backoff: Duration::from_millis(self.max_backoff_ms),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Export engine settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ExportConfig {
    /// Partition length in seconds. Must be whole minutes dividing 24h.
    #[serde(default = "default_part_length_secs")]
    pub part_length_secs: u64,
    /// Number of concurrent workers per export.
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Base URL under which exported objects are downloadable.
    #[serde(default)]
    pub url_prefix: String,
    /// Events per search page.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// Capacity of the per-export task queue. Keep it above the largest
    /// partition count an export can have so the producer never blocks.
    #[serde(default = "default_task_queue_size")]
    pub task_queue_size: usize,
    /// Users allowed to call the service. Empty means open mode.
    #[serde(default)]
    pub allowed_users: Vec<String>,
}

fn default_part_length_secs() -> u64 {
    3600
}

fn default_workers() -> usize {
    4
}

fn default_page_size() -> usize {
    1000
}

fn default_task_queue_size() -> usize {
    100_000
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            part_length_secs: default_part_length_secs(),
            workers: default_workers(),
            url_prefix: String::new(),
            page_size: default_page_size(),
            task_queue_size: default_task_queue_size(),
            allowed_users: Vec::new(),
        }
    }
}

impl ExportConfig {
    pub fn part_length(&self) -> Result<PartLength> {
        PartLength::new(Duration::from_secs(self.part_length_secs))
    }

    pub fn validate(&self) -> Result<()> {
        self.part_length()?;
        if self.workers == 0 {
            return Err(Error::Config("export.workers must be positive".to_string()));
        }
        if self.url_prefix.is_empty() {
            return Err(Error::Config("export.url_prefix must be set".to_string()));
        }
        if self.page_size == 0 {
            return Err(Error::Config("export.page_size must be positive".to_string()));
        }
        if self.task_queue_size == 0 {
            return Err(Error::Config(
                "export.task_queue_size must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Loads the service configuration from a YAML file.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<ServiceConfig> {
    let contents = std::fs::read_to_string(path.as_ref())
        .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;

    serde_yaml::from_str(&contents)
        .map_err(|e| Error::Config(format!("Failed to parse config file: {}", e)))
}
