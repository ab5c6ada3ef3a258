//! File Store: where exported partitions and manifests are written.

use std::sync::Arc;

use async_trait::async_trait;
use slatedb::object_store::ObjectStore;
use slatedb::object_store::buffered::BufWriter;
use slatedb::object_store::path::Path;
use tokio::io::{AsyncRead, AsyncWriteExt};

use crate::error::{Error, Result};

/// Boxed byte stream handed to [`FileStore::put_object`].
pub type ObjectReader = Box<dyn AsyncRead + Send + Unpin>;

#[async_trait]
pub trait FileStore: Send + Sync {
    /// Streams `reader` to the object at `path` until EOF.
    ///
    /// Must support concurrent calls for different paths.
    async fn put_object(&self, path: &str, reader: ObjectReader) -> Result<()>;

    /// Link under which callers can download the object at `path`.
    fn link(&self, path: &str) -> String;
}

/// [`FileStore`] backed by an object store, uploading through a buffered
/// multipart writer so an object is never held in memory whole.
pub struct ObjectFileStore {
    store: Arc<dyn ObjectStore>,
    url_prefix: String,
}

impl ObjectFileStore {
    pub fn new(store: Arc<dyn ObjectStore>, url_prefix: impl Into<String>) -> Self {
        Self {
            store,
            url_prefix: url_prefix.into(),
        }
    }
}

#[async_trait]
impl FileStore for ObjectFileStore {
    #[tracing::instrument(level = "debug", skip(self, reader))]
    async fn put_object(&self, path: &str, mut reader: ObjectReader) -> Result<()> {
        let mut writer = BufWriter::new(Arc::clone(&self.store), Path::from(path));
        let copied = tokio::io::copy(&mut reader, &mut writer)
            .await
            .map_err(|e| Error::FileStore(format!("upload of {} failed: {}", path, e)))?;
        writer
            .shutdown()
            .await
            .map_err(|e| Error::FileStore(format!("completing {} failed: {}", path, e)))?;
        tracing::debug!("uploaded {} bytes to {}", copied, path);
        Ok(())
    }

    fn link(&self, path: &str) -> String {
        format!("{}/{}", self.url_prefix.trim_end_matches('/'), path)
    }
}
