//! Per-partition export worker.
//!
//! A worker drains [`LoadTask`]s from the job's shared queue. For every task
//! it checks the live session status, then runs two futures side by side:
//!
//! ```text
//!   search pages --> JSON lines --> gzip --> [ duplex pipe ] --> FileStore::put_object
//!   \_______________ download ______________/                  \_______ upload ______/
//! ```
//!
//! The pipe has a fixed buffer, so a partition is never held in memory
//! whole. Both halves are joined with `try_join!`: the first error drops the
//! other half and is the one reported.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_compression::tokio::write::GzipEncoder;
use tokio::io::{AsyncWrite, AsyncWriteExt, DuplexStream};
use tokio::sync::{Mutex, mpsc};
use tokio_util::io::InspectReader;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::file_store::FileStore;
use crate::metrics::ExportMetrics;
use crate::model::{ExportStatus, LoadTask, TotalSize};
use crate::partition::windows;
use crate::search::{SearchError, SearchRequest, SearchSource};
use crate::session::SessionStore;

/// Buffer size of the pipe between the compressor and the uploader.
const PIPE_CAPACITY: usize = 256 * 1024;

/// Queue of tasks shared by all workers of one job.
pub type TaskQueue = Arc<Mutex<mpsc::Receiver<LoadTask>>>;

/// Result of processing one partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartOutcome {
    /// Uploaded and confirmed with the measured sizes.
    Uploaded(TotalSize),
    /// The session was already cancelled or failed; nothing was done.
    Skipped,
}

/// How a worker left its loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerExit {
    /// The queue is drained.
    Drained,
    /// The session left `Start`, so the remaining tasks were abandoned.
    Stopped,
    /// The service is shutting down; the session stays restorable.
    Interrupted,
    /// A partition failed and the session was marked `Fail`.
    Failed(Error),
}

#[derive(Clone)]
pub struct Worker {
    pub(crate) sessions: Arc<dyn SessionStore>,
    pub(crate) search: Arc<dyn SearchSource>,
    pub(crate) files: Arc<dyn FileStore>,
    pub(crate) metrics: ExportMetrics,
    pub(crate) page_size: usize,
    pub(crate) shutdown: CancellationToken,
}

impl Worker {
    /// Pulls tasks until the queue is empty, the session stops, or a task
    /// fails. Failures are recorded on the session before returning.
    pub async fn run(&self, session_id: &str, queue: TaskQueue) -> WorkerExit {
        loop {
            let task = { queue.lock().await.recv().await };
            let Some(task) = task else {
                return WorkerExit::Drained;
            };

            match self.process(session_id, &task).await {
                Ok(PartOutcome::Uploaded(size)) => {
                    self.metrics.parts_exported_total.inc();
                    self.metrics.bytes_unpacked_total.inc_by(size.unpacked);
                    self.metrics.bytes_packed_total.inc_by(size.packed);
                }
                Ok(PartOutcome::Skipped) => return WorkerExit::Stopped,
                Err(Error::Search(SearchError::Cancelled)) if self.shutdown.is_cancelled() => {
                    tracing::info!(
                        session = %session_id,
                        part = task.part_id,
                        "shutdown interrupted part, export left restorable"
                    );
                    return WorkerExit::Interrupted;
                }
                Err(err) => {
                    tracing::error!(session = %session_id, part = task.part_id, "part failed: {}", err);
                    match self.sessions.fail_export(session_id, &err.to_string()).await {
                        Ok(()) => {
                            self.metrics.exports_failed_total.inc();
                        }
                        Err(e) => tracing::warn!(session = %session_id, "could not mark export failed: {}", e),
                    }
                    return WorkerExit::Failed(err);
                }
            }
        }
    }

    /// Exports one partition and confirms it in the Session Store.
    #[tracing::instrument(level = "debug", skip_all, fields(session = %session_id, part = task.part_id))]
    pub async fn process(&self, session_id: &str, task: &LoadTask) -> Result<PartOutcome> {
        let session = self.sessions.check_export(session_id).await?;
        match session.status {
            ExportStatus::Start => {}
            ExportStatus::Cancel | ExportStatus::Fail => {
                tracing::debug!("session is {}, skipping part", session.status);
                return Ok(PartOutcome::Skipped);
            }
            status => {
                return Err(Error::Internal(format!(
                    "part {} scheduled for session {} in status {}",
                    task.part_id, session_id, status
                )));
            }
        }

        let size = self.transfer(session_id, task, session.batch_size).await?;
        self.sessions
            .confirm_part(session_id, task.part_id, size)
            .await?;
        tracing::debug!(
            unpacked = size.unpacked,
            packed = size.packed,
            "part {} uploaded to {}",
            task.part_id,
            task.path
        );
        Ok(PartOutcome::Uploaded(size))
    }

    async fn transfer(&self, session_id: &str, task: &LoadTask, batch_size: usize) -> Result<TotalSize> {
        let (writer, reader) = tokio::io::duplex(PIPE_CAPACITY);

        let packed = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&packed);
        let reader = InspectReader::new(reader, move |chunk: &[u8]| {
            counter.fetch_add(chunk.len() as u64, Ordering::Relaxed);
        });

        let download = self.download(session_id, task, batch_size, GzipEncoder::new(writer));
        let upload = self.files.put_object(&task.path, Box::new(reader));
        let (unpacked, ()) = tokio::try_join!(download, upload)?;

        Ok(TotalSize {
            unpacked,
            packed: packed.load(Ordering::Relaxed),
        })
    }

    /// Writes every event of the partition as a JSON line, newest window
    /// first, and closes the stream. Returns the uncompressed byte count.
    async fn download(
        &self,
        session_id: &str,
        task: &LoadTask,
        batch_size: usize,
        mut sink: GzipEncoder<DuplexStream>,
    ) -> Result<u64> {
        let limit = if batch_size == 0 { self.page_size } else { batch_size };
        let mut unpacked = 0u64;

        for (from, to) in windows(task.from, task.to, task.window) {
            let mut offset = 0;
            loop {
                let request = SearchRequest {
                    session_id: session_id.to_string(),
                    query: task.query.clone(),
                    from,
                    to,
                    limit,
                    offset,
                };
                let events = self.search.search(&self.shutdown, &request).await?;
                for event in &events {
                    let mut line = serde_json::to_vec(event)?;
                    line.push(b'\n');
                    write(&mut sink, &line).await?;
                    unpacked += line.len() as u64;
                }
                if events.len() < limit {
                    break;
                }
                offset += events.len();
            }
        }

        sink.shutdown()
            .await
            .map_err(|e| Error::FileStore(format!("closing stream for {}: {}", task.path, e)))?;
        Ok(unpacked)
    }
}

async fn write<W: AsyncWrite + Unpin>(sink: &mut W, buf: &[u8]) -> Result<()> {
    sink.write_all(buf)
        .await
        .map_err(|e| Error::FileStore(format!("writing to upload stream: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex as StdMutex;
    use std::time::{Duration, SystemTime};

    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use common::storage::in_memory::InMemoryStorage;
    use tokio::io::AsyncReadExt;

    use crate::file_store::ObjectReader;
    use crate::model::{ExportSession, path_prefix, session_id};
    use crate::search::LogEvent;
    use crate::session::StorageSessionStore;

    /// Returns `events_per_window` events for every window, in pages.
    struct PagedSource {
        events_per_window: usize,
        requests: StdMutex<Vec<SearchRequest>>,
    }

    #[async_trait]
    impl SearchSource for PagedSource {
        async fn search(
            &self,
            _cancel: &CancellationToken,
            request: &SearchRequest,
        ) -> std::result::Result<Vec<LogEvent>, SearchError> {
            self.requests.lock().unwrap().push(request.clone());
            let remaining = self.events_per_window.saturating_sub(request.offset);
            Ok((0..remaining.min(request.limit))
                .map(|i| {
                    serde_json::json!({
                        "ts": request.to.to_rfc3339(),
                        "seq": request.offset + i,
                    })
                })
                .collect())
        }
    }

    #[derive(Default)]
    struct MemoryFiles {
        objects: StdMutex<HashMap<String, Vec<u8>>>,
    }

    #[async_trait]
    impl FileStore for MemoryFiles {
        async fn put_object(&self, path: &str, mut reader: ObjectReader) -> Result<()> {
            let mut buf = Vec::new();
            reader
                .read_to_end(&mut buf)
                .await
                .map_err(|e| Error::FileStore(e.to_string()))?;
            self.objects.lock().unwrap().insert(path.to_string(), buf);
            Ok(())
        }

        fn link(&self, path: &str) -> String {
            format!("mem://{}", path)
        }
    }

    struct FailingFiles;

    #[async_trait]
    impl FileStore for FailingFiles {
        async fn put_object(&self, _path: &str, _reader: ObjectReader) -> Result<()> {
            Err(Error::FileStore("bucket unavailable".to_string()))
        }

        fn link(&self, path: &str) -> String {
            path.to_string()
        }
    }

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn session() -> ExportSession {
        let created_at = DateTime::<Utc>::from(SystemTime::UNIX_EPOCH + Duration::from_secs(1_704_067_200));
        ExportSession {
            id: session_id("alice", "job", created_at),
            user: "alice".to_string(),
            name: "job".to_string(),
            status: ExportStatus::Start,
            query: "*".to_string(),
            from: utc("2024-01-01T00:00:00Z"),
            to: utc("2024-01-01T01:00:00Z"),
            window: Duration::from_secs(30 * 60),
            part_length: Duration::from_secs(3600),
            batch_size: 2,
            part_is_uploaded: vec![false],
            total_size: TotalSize::default(),
            file_store_path_prefix: path_prefix("alice", "job", created_at),
            created_at,
            started_at: Some(created_at),
            finished_at: None,
            error: None,
        }
    }

    fn task(session: &ExportSession) -> LoadTask {
        LoadTask {
            part_id: 0,
            path: format!("{}/part0.jsonl.gz", session.file_store_path_prefix),
            query: session.query.clone(),
            from: session.from,
            to: session.to,
            window: session.window,
        }
    }

    fn worker(
        sessions: Arc<dyn SessionStore>,
        search: Arc<dyn SearchSource>,
        files: Arc<dyn FileStore>,
    ) -> Worker {
        Worker {
            sessions,
            search,
            files,
            metrics: ExportMetrics::new(),
            page_size: 1000,
            shutdown: CancellationToken::new(),
        }
    }

    async fn gunzip(bytes: &[u8]) -> String {
        let mut decoder = async_compression::tokio::bufread::GzipDecoder::new(bytes);
        let mut text = String::new();
        decoder.read_to_string(&mut text).await.unwrap();
        text
    }

    #[tokio::test]
    async fn should_upload_gzipped_json_lines_and_confirm_part() {
        // given
        let sessions = Arc::new(StorageSessionStore::new(Arc::new(InMemoryStorage::new())));
        let s = session();
        sessions.start_export(s.clone()).await.unwrap();
        let source = Arc::new(PagedSource {
            events_per_window: 3,
            requests: StdMutex::new(Vec::new()),
        });
        let files = Arc::new(MemoryFiles::default());
        let worker = worker(sessions.clone(), source.clone(), files.clone());

        // when
        let outcome = worker.process(&s.id, &task(&s)).await.unwrap();

        // then
        let PartOutcome::Uploaded(size) = outcome else {
            panic!("expected upload, got {:?}", outcome);
        };
        let packed = files.objects.lock().unwrap().get(&task(&s).path).unwrap().clone();
        let text = gunzip(&packed).await;
        assert_eq!(text.lines().count(), 6);
        assert_eq!(size.unpacked, text.len() as u64);
        assert_eq!(size.packed, packed.len() as u64);
        let stored = sessions.check_export(&s.id).await.unwrap();
        assert_eq!(stored.part_is_uploaded, vec![true]);
        assert_eq!(stored.total_size, size);
    }

    #[tokio::test]
    async fn should_page_until_short_page_and_walk_windows_backward() {
        // given
        let sessions = Arc::new(StorageSessionStore::new(Arc::new(InMemoryStorage::new())));
        let s = session();
        sessions.start_export(s.clone()).await.unwrap();
        let source = Arc::new(PagedSource {
            events_per_window: 3,
            requests: StdMutex::new(Vec::new()),
        });
        let worker = worker(sessions, source.clone(), Arc::new(MemoryFiles::default()));

        // when
        worker.process(&s.id, &task(&s)).await.unwrap();

        // then
        let requests = source.requests.lock().unwrap();
        let seen: Vec<_> = requests.iter().map(|r| (r.to, r.offset)).collect();
        assert_eq!(
            seen,
            vec![
                (utc("2024-01-01T01:00:00Z"), 0),
                (utc("2024-01-01T01:00:00Z"), 2),
                (utc("2024-01-01T00:30:00Z"), 0),
                (utc("2024-01-01T00:30:00Z"), 2),
            ]
        );
        assert!(requests.iter().all(|r| r.limit == 2));
    }

    #[tokio::test]
    async fn should_skip_part_when_session_cancelled() {
        // given
        let sessions = Arc::new(StorageSessionStore::new(Arc::new(InMemoryStorage::new())));
        let s = session();
        sessions.start_export(s.clone()).await.unwrap();
        sessions.cancel_export(&s.id).await.unwrap();
        let source = Arc::new(PagedSource {
            events_per_window: 3,
            requests: StdMutex::new(Vec::new()),
        });
        let worker = worker(sessions, source.clone(), Arc::new(MemoryFiles::default()));

        // when
        let outcome = worker.process(&s.id, &task(&s)).await.unwrap();

        // then
        assert_eq!(outcome, PartOutcome::Skipped);
        assert!(source.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn should_reject_part_for_finished_session() {
        // given
        let sessions = Arc::new(StorageSessionStore::new(Arc::new(InMemoryStorage::new())));
        let s = session();
        sessions.start_export(s.clone()).await.unwrap();
        sessions.finish_export(&s.id).await.unwrap();
        let worker = worker(
            sessions,
            Arc::new(PagedSource {
                events_per_window: 0,
                requests: StdMutex::new(Vec::new()),
            }),
            Arc::new(MemoryFiles::default()),
        );

        // when
        let result = worker.process(&s.id, &task(&s)).await;

        // then
        assert!(matches!(result, Err(Error::Internal(_))));
    }

    #[tokio::test]
    async fn should_mark_session_failed_when_upload_fails() {
        // given
        let sessions = Arc::new(StorageSessionStore::new(Arc::new(InMemoryStorage::new())));
        let s = session();
        sessions.start_export(s.clone()).await.unwrap();
        let worker = worker(
            sessions.clone(),
            Arc::new(PagedSource {
                events_per_window: 3,
                requests: StdMutex::new(Vec::new()),
            }),
            Arc::new(FailingFiles),
        );
        let (tx, rx) = mpsc::channel(4);
        tx.send(task(&s)).await.unwrap();
        drop(tx);

        // when
        let exit = worker.run(&s.id, Arc::new(Mutex::new(rx))).await;

        // then
        assert!(matches!(exit, WorkerExit::Failed(Error::FileStore(_))));
        let stored = sessions.check_export(&s.id).await.unwrap();
        assert_eq!(stored.status, ExportStatus::Fail);
        assert!(stored.error.unwrap().contains("bucket unavailable"));
        assert_eq!(stored.part_is_uploaded, vec![false]);
        assert_eq!(worker.metrics.exports_failed_total.get(), 1);
    }
}
