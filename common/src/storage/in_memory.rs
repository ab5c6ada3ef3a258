//! In-memory storage backend.
//!
//! Backed by an ordered map so range scans return keys in the same order
//! SlateDB would. Nothing survives a restart.

use std::collections::BTreeMap;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::RwLock;

use super::{BytesRange, Record, RecordOp, Storage, StorageIterator, StorageRead, StorageResult};

#[derive(Default)]
pub struct InMemoryStorage {
    data: RwLock<BTreeMap<Bytes, Bytes>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StorageRead for InMemoryStorage {
    #[tracing::instrument(level = "trace", skip_all)]
    async fn get(&self, key: Bytes) -> StorageResult<Option<Record>> {
        let data = self.data.read().await;
        Ok(data.get(&key).map(|v| Record::new(key.clone(), v.clone())))
    }

    #[tracing::instrument(level = "trace", skip_all)]
    async fn scan_iter(
        &self,
        range: BytesRange,
    ) -> StorageResult<Box<dyn StorageIterator + Send + 'static>> {
        let data = self.data.read().await;
        let records: Vec<Record> = data
            .range(range)
            .map(|(k, v)| Record::new(k.clone(), v.clone()))
            .collect();
        Ok(Box::new(InMemoryIterator {
            records: records.into_iter(),
        }))
    }
}

/// Iterates a snapshot of the records taken when the scan started.
struct InMemoryIterator {
    records: std::vec::IntoIter<Record>,
}

#[async_trait]
impl StorageIterator for InMemoryIterator {
    async fn next(&mut self) -> StorageResult<Option<Record>> {
        Ok(self.records.next())
    }
}

#[async_trait]
impl Storage for InMemoryStorage {
    async fn apply(&self, ops: Vec<RecordOp>) -> StorageResult<()> {
        let mut data = self.data.write().await;
        for op in ops {
            match op {
                RecordOp::Put(record) => {
                    data.insert(record.key, record.value);
                }
                RecordOp::Delete(key) => {
                    data.remove(&key);
                }
            }
        }
        Ok(())
    }
}
