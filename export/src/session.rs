//! Session Store: persisted, lockable export state.
//!
//! [`SessionStore`] is the contract the engine consumes. [`StorageSessionStore`]
//! implements it on top of any [`Storage`] backend: one record per session
//! plus a single lock key naming the session currently allowed to run.
//!
//! Every read-modify-write (lock acquisition, part confirmation, status
//! transitions) runs under one writer mutex, and each one lands in storage as
//! a single atomic batch. SlateDB admits one writer per database path, so the
//! mutex makes check-and-set atomic from the store's point of view.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use common::clock::{Clock, SystemClock};
use common::{Record, RecordOp, Storage};
use tokio::sync::Mutex;

use crate::error::{Error, Result};
use crate::model::{ExportSession, ExportStatus, TotalSize};
use crate::serde::{
    ACTIVE_EXPORT_KEY, SessionKey, deserialize_active_export, deserialize_session,
    serialize_session,
};

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Persists a new session and takes the global lock for it, failing with
    /// [`Error::Conflict`] if another session holds the lock.
    async fn start_export(&self, session: ExportSession) -> Result<()>;

    /// Loads a session, or [`Error::NotFound`].
    async fn check_export(&self, id: &str) -> Result<ExportSession>;

    async fn cancel_export(&self, id: &str) -> Result<()>;

    async fn fail_export(&self, id: &str, message: &str) -> Result<()>;

    async fn finish_export(&self, id: &str) -> Result<()>;

    /// Marks partition `part_index` uploaded and adds `size` to the totals.
    /// Confirming an out-of-range or already confirmed index is an error.
    async fn confirm_part(&self, id: &str, part_index: usize, size: TotalSize) -> Result<()>;

    /// Takes the global lock for `id`. Fails with [`Error::Conflict`] while
    /// any session holds it, `id` included.
    async fn lock(&self, id: &str) -> Result<()>;

    /// Takes the global lock for a session still in `Start`, as one
    /// check-and-set. Returns the session as it was when locked.
    async fn lock_for_restore(&self, id: &str) -> Result<ExportSession>;

    /// Clears the global lock regardless of holder.
    async fn unlock(&self) -> Result<()>;

    /// Id of the session holding the lock, or [`Error::NoActiveExport`].
    async fn get_cur_active_export(&self) -> Result<String>;

    async fn get_all_exports(&self) -> Result<Vec<ExportSession>>;
}

pub struct StorageSessionStore {
    storage: Arc<dyn Storage>,
    clock: Arc<dyn Clock>,
    write_lock: Mutex<()>,
}

impl StorageSessionStore {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self::with_clock(storage, Arc::new(SystemClock))
    }

    pub fn with_clock(storage: Arc<dyn Storage>, clock: Arc<dyn Clock>) -> Self {
        Self {
            storage,
            clock,
            write_lock: Mutex::new(()),
        }
    }

    fn now(&self) -> DateTime<Utc> {
        DateTime::<Utc>::from(self.clock.now())
    }

    async fn load(&self, id: &str) -> Result<ExportSession> {
        let record = self.storage.get(SessionKey::new(id).serialize()).await?;
        match record {
            Some(r) => deserialize_session(&r.value),
            None => Err(Error::NotFound(id.to_string())),
        }
    }

    async fn active(&self) -> Result<Option<String>> {
        let record = self
            .storage
            .get(Bytes::from_static(&ACTIVE_EXPORT_KEY))
            .await?;
        record
            .map(|r| deserialize_active_export(&r.value))
            .transpose()
    }

    fn put_session(session: &ExportSession) -> Result<RecordOp> {
        Ok(RecordOp::Put(Record::new(
            SessionKey::new(&session.id).serialize(),
            serialize_session(session)?,
        )))
    }

    fn put_lock(id: &str) -> RecordOp {
        RecordOp::Put(Record::new(
            Bytes::from_static(&ACTIVE_EXPORT_KEY),
            Bytes::from(id.to_string()),
        ))
    }

    /// Releases the lock if `id` holds it, then moves the session to a
    /// terminal status unless it already is in one.
    async fn transition(&self, id: &str, status: ExportStatus, error: Option<String>) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut session = self.load(id).await?;

        let mut ops = Vec::with_capacity(2);
        if self.active().await?.as_deref() == Some(id) {
            ops.push(RecordOp::Delete(Bytes::from_static(&ACTIVE_EXPORT_KEY)));
        }

        if session.status.is_terminal() {
            if !ops.is_empty() {
                self.storage.apply(ops).await?;
            }
            return Err(Error::AlreadyTerminal {
                id: id.to_string(),
                status: session.status.to_string(),
            });
        }

        session.status = status;
        session.finished_at = Some(self.now());
        session.error = error;
        ops.push(Self::put_session(&session)?);
        self.storage.apply(ops).await?;
        tracing::info!(session = %id, "export moved to status {}", status);
        Ok(())
    }
}

#[async_trait]
impl SessionStore for StorageSessionStore {
    async fn start_export(&self, session: ExportSession) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        if let Some(active) = self.active().await? {
            return Err(Error::Conflict(format!(
                "export {} is already running",
                active
            )));
        }
        let ops = vec![Self::put_session(&session)?, Self::put_lock(&session.id)];
        self.storage.apply(ops).await?;
        Ok(())
    }

    async fn check_export(&self, id: &str) -> Result<ExportSession> {
        self.load(id).await
    }

    async fn cancel_export(&self, id: &str) -> Result<()> {
        self.transition(id, ExportStatus::Cancel, None).await
    }

    async fn fail_export(&self, id: &str, message: &str) -> Result<()> {
        self.transition(id, ExportStatus::Fail, Some(message.to_string()))
            .await
    }

    async fn finish_export(&self, id: &str) -> Result<()> {
        self.transition(id, ExportStatus::Finish, None).await
    }

    async fn confirm_part(&self, id: &str, part_index: usize, size: TotalSize) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut session = self.load(id).await?;
        let parts = session.part_is_uploaded.len();
        let Some(flag) = session.part_is_uploaded.get_mut(part_index) else {
            return Err(Error::InvalidRequest(format!(
                "part {} out of range for export {} with {} parts",
                part_index, id, parts
            )));
        };
        if *flag {
            return Err(Error::Conflict(format!(
                "part {} of export {} is already confirmed",
                part_index, id
            )));
        }
        *flag = true;
        session.total_size.add(size);
        self.storage.apply(vec![Self::put_session(&session)?]).await?;
        Ok(())
    }

    async fn lock(&self, id: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        if let Some(active) = self.active().await? {
            return Err(Error::Conflict(format!(
                "export {} is already running",
                active
            )));
        }
        self.storage.apply(vec![Self::put_lock(id)]).await?;
        Ok(())
    }

    async fn lock_for_restore(&self, id: &str) -> Result<ExportSession> {
        let _guard = self.write_lock.lock().await;
        let session = self.load(id).await?;
        if session.status != ExportStatus::Start {
            return Err(Error::Conflict(format!(
                "export {} is {} and cannot be restored",
                id, session.status
            )));
        }
        if let Some(active) = self.active().await? {
            return Err(Error::Conflict(format!(
                "export {} is already running",
                active
            )));
        }
        self.storage.apply(vec![Self::put_lock(id)]).await?;
        Ok(session)
    }

    async fn unlock(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.storage
            .delete(Bytes::from_static(&ACTIVE_EXPORT_KEY))
            .await?;
        Ok(())
    }

    async fn get_cur_active_export(&self) -> Result<String> {
        self.active().await?.ok_or(Error::NoActiveExport)
    }

    async fn get_all_exports(&self) -> Result<Vec<ExportSession>> {
        let mut iter = self.storage.scan_iter(SessionKey::scan_range()).await?;
        let mut sessions = Vec::new();
        while let Some(record) = iter.next().await? {
            let key = SessionKey::deserialize(&record.key)?;
            let session = deserialize_session(&record.value)?;
            if session.id != key.id {
                return Err(Error::Encoding(format!(
                    "session record {} is stored under key {}",
                    session.id, key.id
                )));
            }
            sessions.push(session);
        }
        Ok(sessions)
    }
}
