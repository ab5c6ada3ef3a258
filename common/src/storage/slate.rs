//! SlateDB backend.
//!
//! A database path admits one writer at a time; opening it from a second
//! process fences the first, which is what keeps two export servers from
//! both believing they hold the export lock.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use slatedb::{Db, DbIterator, WriteBatch};

use super::{
    BytesRange, Record, RecordOp, Storage, StorageError, StorageIterator, StorageRead,
    StorageResult,
};

pub struct SlateDbStorage {
    db: Arc<Db>,
}

impl SlateDbStorage {
    pub fn new(db: Arc<Db>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl StorageRead for SlateDbStorage {
    #[tracing::instrument(level = "trace", skip_all)]
    async fn get(&self, key: Bytes) -> StorageResult<Option<Record>> {
        let value = self
            .db
            .get(&key)
            .await
            .map_err(StorageError::from_storage)?;
        Ok(value.map(|value| Record::new(key, value)))
    }

    #[tracing::instrument(level = "trace", skip_all)]
    async fn scan_iter(
        &self,
        range: BytesRange,
    ) -> StorageResult<Box<dyn StorageIterator + Send + 'static>> {
        let iter = self
            .db
            .scan(range)
            .await
            .map_err(StorageError::from_storage)?;
        Ok(Box::new(SlateDbScan(iter)))
    }
}

struct SlateDbScan(DbIterator);

#[async_trait]
impl StorageIterator for SlateDbScan {
    async fn next(&mut self) -> StorageResult<Option<Record>> {
        let entry = self.0.next().await.map_err(StorageError::from_storage)?;
        Ok(entry.map(|kv| Record::new(kv.key, kv.value)))
    }
}

#[async_trait]
impl Storage for SlateDbStorage {
    /// Writes the whole batch in one `WriteBatch`, waiting for durability.
    #[tracing::instrument(level = "trace", skip_all, fields(ops = ops.len()))]
    async fn apply(&self, ops: Vec<RecordOp>) -> StorageResult<()> {
        let mut batch = WriteBatch::new();
        for op in ops {
            match op {
                RecordOp::Put(record) => batch.put(record.key, record.value),
                RecordOp::Delete(key) => batch.delete(key),
            }
        }
        self.db.write(batch).await.map_err(StorageError::from_storage)
    }
}
