//! Mass export of log search results to object storage.
//!
//! An export takes a query and a time range, cuts the range into fixed-length
//! partitions, and writes each partition's matching events as one gzipped
//! newline-delimited JSON object. Progress is persisted per partition, so an
//! export interrupted by a restart resumes where it stopped instead of
//! starting over.
//!
//! # Architecture
//!
//! - [`ExportService`] is the entry point. It validates requests, owns the
//!   deployment-wide single-export lock and launches pipelines in the
//!   background.
//! - [`SessionStore`] persists sessions and the lock. [`StorageSessionStore`]
//!   implements it over the [`common::Storage`] traits (in memory or SlateDB).
//! - [`SearchSource`] is the remote search service. [`RateLimitedSearchSource`]
//!   paces calls and absorbs "rate exceeded" answers with backoff.
//! - [`FileStore`] receives the exported objects. [`ObjectFileStore`] writes
//!   them to any object store.
//!
//! # Example
//!
//! ```ignore
//! let service = ExportService::new(&config.export, sessions, search, files, metrics).await?;
//! let id = service
//!     .start_export(Some("alice"), ExportRequest {
//!         query: "level:error".to_string(),
//!         from: "2024-01-01T00:00:00Z".parse()?,
//!         to: "2024-01-01T03:00:00Z".parse()?,
//!         window: Duration::from_secs(600),
//!         name: "errors".to_string(),
//!     })
//!     .await?;
//! let info = service.check_export(Some("alice"), &id).await?;
//! println!("{:.0}% done", info.progress * 100.0);
//! ```

pub mod config;
mod error;
mod exporter;
pub mod file_store;
pub mod metrics;
pub mod model;
pub mod partition;
pub mod rate_limit;
pub mod search;
mod serde;
#[cfg(feature = "http-server")]
pub mod server;
pub mod service;
pub mod session;
mod worker;

pub use config::{ExportConfig, SearchConfig, ServiceConfig, load_config};
pub use error::{Error, Result};
pub use file_store::{FileStore, ObjectFileStore, ObjectReader};
pub use metrics::ExportMetrics;
pub use model::{ExportInfo, ExportSession, ExportStatus, LoadTask, TotalSize};
pub use partition::{PartLength, Partition};
pub use rate_limit::{RateLimitConfig, RateLimitedSearchSource};
pub use search::{HttpSearchSource, LogEvent, SearchError, SearchRequest, SearchSource};
pub use service::{ANONYMOUS_USER, ExportRequest, ExportService};
pub use session::{SessionStore, StorageSessionStore};
