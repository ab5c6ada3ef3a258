//! Core data types for the export engine.
//!
//! [`ExportSession`] is the persisted unit of work; [`ExportInfo`] is the
//! read-only view returned to callers; [`LoadTask`] is the in-memory
//! description of one partition handed to a worker.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::{DurationMilliSeconds, serde_as};

use crate::partition::Partition;

/// Lifecycle status of an export session.
///
/// `Start` is the only non-terminal status. `Cancel`, `Fail` and `Finish`
/// are terminal: once reached, further status changes are rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportStatus {
    Start,
    Cancel,
    Fail,
    Finish,
}

impl ExportStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ExportStatus::Start)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExportStatus::Start => "start",
            ExportStatus::Cancel => "cancel",
            ExportStatus::Fail => "fail",
            ExportStatus::Finish => "finish",
        }
    }
}

impl std::fmt::Display for ExportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Byte counters accumulated from confirmed partitions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TotalSize {
    /// Bytes of newline-delimited JSON before compression.
    pub unpacked: u64,
    /// Bytes written to the file store after gzip.
    pub packed: u64,
}

impl TotalSize {
    pub fn add(&mut self, other: TotalSize) {
        self.unpacked += other.unpacked;
        self.packed += other.packed;
    }
}

/// Persisted state of one export job.
///
/// Everything except `status`, `part_is_uploaded`, `total_size`, the
/// timestamps and `error` is fixed at creation.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportSession {
    pub id: String,
    pub user: String,
    pub name: String,
    pub status: ExportStatus,
    pub query: String,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub window: Duration,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub part_length: Duration,
    /// Page size of every search request.
    pub batch_size: usize,
    /// One flag per partition, indexed newest first.
    pub part_is_uploaded: Vec<bool>,
    pub total_size: TotalSize,
    pub file_store_path_prefix: String,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl ExportSession {
    pub fn parts_total(&self) -> usize {
        self.part_is_uploaded.len()
    }

    pub fn parts_uploaded(&self) -> usize {
        self.part_is_uploaded.iter().filter(|uploaded| **uploaded).count()
    }

    /// Fraction of partitions confirmed, in `[0, 1]`.
    pub fn progress(&self) -> f64 {
        match self.parts_total() {
            0 => 0.0,
            total => self.parts_uploaded() as f64 / total as f64,
        }
    }

    /// Time between start and finish, once both are known.
    pub fn duration(&self) -> Option<Duration> {
        match (self.started_at, self.finished_at) {
            (Some(start), Some(end)) => (end - start).to_std().ok(),
            _ => None,
        }
    }

    pub fn manifest_path(&self) -> String {
        manifest_path(&self.file_store_path_prefix)
    }
}

/// Session id for a job: `"{user}/{name}_{created_at_ms}"`.
pub fn session_id(user: &str, name: &str, created_at: DateTime<Utc>) -> String {
    format!("{}/{}_{}", user, name, created_at.timestamp_millis())
}

/// Object path prefix under which a job's files are written.
pub fn path_prefix(user: &str, name: &str, created_at: DateTime<Utc>) -> String {
    format!("exports/{}", session_id(user, name, created_at))
}

/// Object path of one partition's output, derived from its time bounds.
pub fn part_path(prefix: &str, partition: &Partition) -> String {
    format!(
        "{}/{}_{}.jsonl.gz",
        prefix,
        partition.from.format("%Y%m%dT%H%M%SZ"),
        partition.to.format("%Y%m%dT%H%M%SZ")
    )
}

pub fn manifest_path(prefix: &str) -> String {
    format!("{}/manifest.txt", prefix)
}

/// Caller-facing view of a session with derived progress and links.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportInfo {
    pub id: String,
    pub user: String,
    pub name: String,
    pub status: ExportStatus,
    pub query: String,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub progress: f64,
    pub parts_total: usize,
    pub parts_uploaded: usize,
    pub total_size: TotalSize,
    pub manifest_link: String,
    #[serde_as(as = "Option<DurationMilliSeconds<u64>>")]
    pub duration: Option<Duration>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl ExportInfo {
    pub fn from_session(session: &ExportSession, manifest_link: String) -> Self {
        Self {
            id: session.id.clone(),
            user: session.user.clone(),
            name: session.name.clone(),
            status: session.status,
            query: session.query.clone(),
            from: session.from,
            to: session.to,
            progress: session.progress(),
            parts_total: session.parts_total(),
            parts_uploaded: session.parts_uploaded(),
            total_size: session.total_size,
            manifest_link,
            duration: session.duration(),
            created_at: session.created_at,
            started_at: session.started_at,
            finished_at: session.finished_at,
            error: session.error.clone(),
        }
    }
}

/// Work item for one partition. Never persisted; regenerated from the
/// session parameters whenever a job is (re)launched.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadTask {
    pub part_id: usize,
    pub path: String,
    pub query: String,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub window: Duration,
}
