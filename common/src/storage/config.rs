//! Where session records and exported files live.
//!
//! [`StorageConfig`] picks the key-value backend that holds export
//! sessions. [`ObjectStoreConfig`] names a bucket or directory and is used
//! twice: underneath SlateDB, and as the destination of exported files.
//!
//! ```yaml
//! storage:
//!   type: SlateDb
//!   path: export-sessions
//!   object_store:
//!     type: Local
//!     path: /var/lib/export
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

const DEFAULT_SESSION_PATH: &str = "export-sessions";
const DEFAULT_LOCAL_DIR: &str = ".data";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum StorageConfig {
    /// Sessions vanish on restart. Tests and local runs only.
    InMemory,
    SlateDb(SlateDbStorageConfig),
}

/// A SlateDB database under `./.data/export-sessions`.
impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig::SlateDb(SlateDbStorageConfig::default())
    }
}

impl StorageConfig {
    pub fn backend_name(&self) -> &'static str {
        match self {
            StorageConfig::InMemory => "in-memory",
            StorageConfig::SlateDb(_) => "slatedb",
        }
    }

    /// True when sessions survive a restart, so interrupted exports can be
    /// restored.
    pub fn is_durable(&self) -> bool {
        match self {
            StorageConfig::InMemory => false,
            StorageConfig::SlateDb(slate) => slate.object_store.is_durable(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SlateDbStorageConfig {
    /// Prefix of the database inside `object_store`.
    #[serde(default = "default_session_path")]
    pub path: String,
    pub object_store: ObjectStoreConfig,
    /// SlateDB settings file. Without one, `Settings::load()` looks for
    /// `SlateDb.{toml,json,yaml}` and `SLATEDB_` environment variables.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings_path: Option<String>,
}

fn default_session_path() -> String {
    DEFAULT_SESSION_PATH.to_string()
}

impl Default for SlateDbStorageConfig {
    fn default() -> Self {
        Self {
            path: default_session_path(),
            object_store: ObjectStoreConfig::Local(LocalObjectStoreConfig {
                path: DEFAULT_LOCAL_DIR.to_string(),
            }),
            settings_path: None,
        }
    }
}

#[derive(Default, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum ObjectStoreConfig {
    #[default]
    InMemory,
    /// S3 bucket. Credentials come from the usual `AWS_*` environment.
    Aws(AwsObjectStoreConfig),
    /// Directory on the local filesystem, created on first use.
    Local(LocalObjectStoreConfig),
}

impl ObjectStoreConfig {
    pub fn is_durable(&self) -> bool {
        !matches!(self, ObjectStoreConfig::InMemory)
    }
}

/// Renders the location for log lines, e.g. `s3://log-exports (eu-west-1)`.
impl fmt::Display for ObjectStoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectStoreConfig::InMemory => write!(f, "memory://"),
            ObjectStoreConfig::Aws(aws) => write!(f, "s3://{} ({})", aws.bucket, aws.region),
            ObjectStoreConfig::Local(local) => write!(f, "file://{}", local.path),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AwsObjectStoreConfig {
    pub region: String,
    pub bucket: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LocalObjectStoreConfig {
    pub path: String,
}
