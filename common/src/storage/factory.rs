//! Builds backends and object stores from their configuration.

use std::sync::Arc;

use slatedb::DbBuilder;
use slatedb::config::Settings;
use slatedb::object_store::aws::AmazonS3Builder;
use slatedb::object_store::local::LocalFileSystem;
use slatedb::object_store::memory::InMemory;
use slatedb::object_store::ObjectStore;

use super::config::{ObjectStoreConfig, SlateDbStorageConfig, StorageConfig};
use super::in_memory::InMemoryStorage;
use super::slate::SlateDbStorage;
use super::{Storage, StorageError, StorageResult};

/// Opens the session store backend.
///
/// ```rust,ignore
/// let storage = create_storage(&StorageConfig::InMemory).await?;
/// ```
pub async fn create_storage(config: &StorageConfig) -> StorageResult<Arc<dyn Storage>> {
    tracing::info!("opening {} storage", config.backend_name());
    match config {
        StorageConfig::InMemory => Ok(Arc::new(InMemoryStorage::new())),
        StorageConfig::SlateDb(slate) => Ok(Arc::new(open_slatedb(slate).await?)),
    }
}

/// Builds the object store behind `config`. Local directories are created
/// when missing; S3 credentials are read from the environment.
pub fn create_object_store(config: &ObjectStoreConfig) -> StorageResult<Arc<dyn ObjectStore>> {
    match config {
        ObjectStoreConfig::InMemory => Ok(Arc::new(InMemory::new())),
        ObjectStoreConfig::Aws(aws) => AmazonS3Builder::from_env()
            .with_region(&aws.region)
            .with_bucket_name(&aws.bucket)
            .build()
            .map(|s3| Arc::new(s3) as Arc<dyn ObjectStore>)
            .map_err(|e| StorageError::Storage(format!("cannot open {}: {}", config, e))),
        ObjectStoreConfig::Local(local) => {
            std::fs::create_dir_all(&local.path)
                .map_err(|e| StorageError::Storage(format!("cannot create {}: {}", config, e)))?;
            LocalFileSystem::new_with_prefix(&local.path)
                .map(|fs| Arc::new(fs) as Arc<dyn ObjectStore>)
                .map_err(|e| StorageError::Storage(format!("cannot open {}: {}", config, e)))
        }
    }
}

async fn open_slatedb(config: &SlateDbStorageConfig) -> StorageResult<SlateDbStorage> {
    let settings = match &config.settings_path {
        Some(path) => Settings::from_file(path).map_err(|e| {
            StorageError::Storage(format!("invalid SlateDB settings in {}: {}", path, e))
        })?,
        None => Settings::load().unwrap_or_default(),
    };
    let object_store = create_object_store(&config.object_store)?;
    tracing::debug!("SlateDB at {}/{}", config.object_store, config.path);

    let db = DbBuilder::new(config.path.clone(), object_store)
        .with_settings(settings)
        .build()
        .await
        .map_err(|e| StorageError::Storage(format!("cannot open SlateDB: {}", e)))?;
    Ok(SlateDbStorage::new(Arc::new(db)))
}
