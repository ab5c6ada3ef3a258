//! Shared storage abstractions.
//!
//! The export service persists its session records through the [`Storage`]
//! traits defined here. Two backends are provided: an in-memory map for tests
//! and single-node development, and SlateDB on top of an object store for
//! durable deployments. The same [`ObjectStoreConfig`] also describes where
//! exported files are written.

pub mod clock;
pub mod storage;

pub use clock::Clock;
pub use storage::config::{ObjectStoreConfig, StorageConfig};
pub use storage::{
    BytesRange, Record, RecordOp, Storage, StorageError, StorageIterator, StorageRead,
    StorageResult,
};
