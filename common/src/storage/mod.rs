//! Key-value storage traits and shared record types.
//!
//! Backends implement [`StorageRead`] for point lookups and ordered range
//! scans, and [`Storage`] for batched writes. All writes in a single call are
//! applied atomically.

pub mod config;
pub mod factory;
pub mod in_memory;
pub mod slate;

use std::ops::{Bound, RangeBounds};

use async_trait::async_trait;
use bytes::Bytes;

/// Errors surfaced by storage backends.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    /// The backend failed to read or write.
    #[error("Storage error: {0}")]
    Storage(String),

    /// An invariant of the storage layer was violated.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl StorageError {
    /// Wraps any backend error as a [`StorageError::Storage`].
    pub fn from_storage(err: impl std::fmt::Display) -> Self {
        StorageError::Storage(err.to_string())
    }
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// A single key-value pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub key: Bytes,
    pub value: Bytes,
}

impl Record {
    pub fn new(key: Bytes, value: Bytes) -> Self {
        Self { key, value }
    }
}

/// A write operation inside an atomic batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOp {
    Put(Record),
    Delete(Bytes),
}

/// An owned byte-key range usable with every backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BytesRange {
    start: Bound<Bytes>,
    end: Bound<Bytes>,
}

impl BytesRange {
    pub fn new(start: Bound<Bytes>, end: Bound<Bytes>) -> Self {
        Self { start, end }
    }

    /// Range covering every key that starts with `prefix`.
    pub fn prefix(prefix: Bytes) -> Self {
        let end = match prefix_successor(&prefix) {
            Some(end) => Bound::Excluded(end),
            None => Bound::Unbounded,
        };
        Self {
            start: Bound::Included(prefix),
            end,
        }
    }
}

impl RangeBounds<Bytes> for BytesRange {
    fn start_bound(&self) -> Bound<&Bytes> {
        self.start.as_ref()
    }

    fn end_bound(&self) -> Bound<&Bytes> {
        self.end.as_ref()
    }
}

/// Smallest key greater than every key carrying `prefix`, if one exists.
fn prefix_successor(prefix: &[u8]) -> Option<Bytes> {
    let mut end = prefix.to_vec();
    while let Some(last) = end.pop() {
        if last < u8::MAX {
            end.push(last + 1);
            return Some(Bytes::from(end));
        }
    }
    None
}

/// Iterator over records returned by a range scan, in key order.
#[async_trait]
pub trait StorageIterator {
    async fn next(&mut self) -> StorageResult<Option<Record>>;
}

/// Read operations shared by all backends.
#[async_trait]
pub trait StorageRead: Send + Sync {
    /// Retrieves a single record by key, or `None` if absent.
    async fn get(&self, key: Bytes) -> StorageResult<Option<Record>>;

    /// Returns an iterator over all records whose key falls in `range`.
    async fn scan_iter(
        &self,
        range: BytesRange,
    ) -> StorageResult<Box<dyn StorageIterator + Send + 'static>>;
}

/// Read-write storage.
#[async_trait]
pub trait Storage: StorageRead {
    /// Applies a batch of puts and deletes atomically.
    async fn apply(&self, ops: Vec<RecordOp>) -> StorageResult<()>;

    async fn put(&self, records: Vec<Record>) -> StorageResult<()> {
        self.apply(records.into_iter().map(RecordOp::Put).collect())
            .await
    }

    async fn delete(&self, key: Bytes) -> StorageResult<()> {
        self.apply(vec![RecordOp::Delete(key)]).await
    }
}
