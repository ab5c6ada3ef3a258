//! Export service: the public state machine.
//!
//! ```text
//!            start / restore
//!                 |
//!                 v
//!   +-------------------------+
//!   |          Start          |
//!   +-------------------------+
//!      | cancel   | fail   | finish
//!      v          v        v
//!   Cancel      Fail     Finish      (terminal)
//! ```
//!
//! Only one session may hold the global lock at a time. Pipelines run in the
//! background on tasks owned by the service; callers poll [`check_export`]
//! or [`get_all`] for progress.
//!
//! [`check_export`]: ExportService::check_export
//! [`get_all`]: ExportService::get_all

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, Utc};
use common::clock::{Clock, SystemClock};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::config::ExportConfig;
use crate::error::{Error, Result};
use crate::exporter::Exporter;
use crate::file_store::FileStore;
use crate::metrics::ExportMetrics;
use crate::model::{ExportInfo, ExportSession, ExportStatus, TotalSize, path_prefix, session_id};
use crate::partition::{PartLength, partition_count};
use crate::search::SearchSource;
use crate::session::SessionStore;
use crate::worker::Worker;

/// Identity used for every caller when no allow-list is configured.
pub const ANONYMOUS_USER: &str = "anonymous";

/// Parameters of a new export.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportRequest {
    pub query: String,
    pub from: DateTime<FixedOffset>,
    pub to: DateTime<FixedOffset>,
    /// Length of a single search window; at most the partition length.
    pub window: Duration,
    pub name: String,
}

pub struct ExportService {
    sessions: Arc<dyn SessionStore>,
    files: Arc<dyn FileStore>,
    exporter: Arc<Exporter>,
    part_length: PartLength,
    page_size: usize,
    max_parts: usize,
    allowed_users: Option<HashSet<String>>,
    clock: Arc<dyn Clock>,
    metrics: ExportMetrics,
    shutdown: CancellationToken,
    tracker: TaskTracker,
}

impl ExportService {
    /// Builds the service and recovers from a previous process: the global
    /// lock is cleared and sessions left in `Start` are reported so they can
    /// be restored.
    pub async fn new(
        config: &ExportConfig,
        sessions: Arc<dyn SessionStore>,
        search: Arc<dyn SearchSource>,
        files: Arc<dyn FileStore>,
        metrics: ExportMetrics,
    ) -> Result<Self> {
        Self::with_clock(config, sessions, search, files, metrics, Arc::new(SystemClock)).await
    }

    pub async fn with_clock(
        config: &ExportConfig,
        sessions: Arc<dyn SessionStore>,
        search: Arc<dyn SearchSource>,
        files: Arc<dyn FileStore>,
        metrics: ExportMetrics,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;
        let part_length = config.part_length()?;

        let allowed_users = if config.allowed_users.is_empty() {
            tracing::warn!(
                "no allowed users configured, every caller is treated as '{}'",
                ANONYMOUS_USER
            );
            None
        } else {
            Some(config.allowed_users.iter().cloned().collect())
        };

        let shutdown = CancellationToken::new();
        let worker = Worker {
            sessions: Arc::clone(&sessions),
            search,
            files: Arc::clone(&files),
            metrics: metrics.clone(),
            page_size: config.page_size,
            shutdown: shutdown.clone(),
        };
        let exporter = Exporter::new(worker, config.workers, config.task_queue_size);

        let service = Self {
            sessions,
            files,
            exporter: Arc::new(exporter),
            part_length,
            page_size: config.page_size,
            max_parts: config.task_queue_size,
            allowed_users,
            clock,
            metrics,
            shutdown,
            tracker: TaskTracker::new(),
        };
        service.recover().await?;
        Ok(service)
    }

    async fn recover(&self) -> Result<()> {
        self.sessions.unlock().await?;
        for session in self.sessions.get_all_exports().await? {
            if session.status == ExportStatus::Start {
                tracing::warn!(
                    session = %session.id,
                    "export was interrupted at {}/{} partitions, restore it to resume",
                    session.parts_uploaded(),
                    session.parts_total()
                );
            }
        }
        Ok(())
    }

    /// Resolves the caller's identity, rejecting callers outside the
    /// allow-list.
    pub fn authorize(&self, user: Option<&str>) -> Result<String> {
        let Some(allowed) = &self.allowed_users else {
            return Ok(ANONYMOUS_USER.to_string());
        };
        match user {
            Some(user) if allowed.contains(user) => Ok(user.to_string()),
            Some(user) => Err(Error::PermissionDenied(format!(
                "user {} may not export logs",
                user
            ))),
            None => Err(Error::PermissionDenied(
                "authentication required".to_string(),
            )),
        }
    }

    /// Validates and persists a new export, takes the global lock and
    /// launches its pipeline. Returns the session id.
    pub async fn start_export(&self, user: Option<&str>, request: ExportRequest) -> Result<String> {
        let user = self.authorize(user)?;
        self.validate(&request)?;

        let (from, to) = self.part_length.normalize(&request.from, &request.to);
        let part_length = self.part_length.as_duration();
        let parts = partition_count(from, to, part_length);
        if parts > self.max_parts {
            return Err(Error::InvalidRequest(format!(
                "range {} to {} spans {} partitions, at most {} are allowed",
                from, to, parts, self.max_parts
            )));
        }
        let now = DateTime::<Utc>::from(self.clock.now());

        let session = ExportSession {
            id: session_id(&user, &request.name, now),
            user: user.clone(),
            name: request.name.clone(),
            status: ExportStatus::Start,
            query: request.query,
            from,
            to,
            window: request.window,
            part_length,
            batch_size: self.page_size,
            part_is_uploaded: vec![false; parts],
            total_size: TotalSize::default(),
            file_store_path_prefix: path_prefix(&user, &request.name, now),
            created_at: now,
            started_at: Some(now),
            finished_at: None,
            error: None,
        };
        let id = session.id.clone();

        self.sessions.start_export(session).await?;
        self.metrics.exports_started_total.inc();
        tracing::info!(session = %id, %from, %to, parts, "export started");
        self.launch(id.clone());
        Ok(id)
    }

    fn validate(&self, request: &ExportRequest) -> Result<()> {
        if request.name.trim().is_empty() {
            return Err(Error::InvalidRequest("export name must not be empty".to_string()));
        }
        if request.name.contains('/') {
            return Err(Error::InvalidRequest(format!(
                "export name {} must not contain '/'",
                request.name
            )));
        }
        if request.from >= request.to {
            return Err(Error::InvalidRequest(format!(
                "from {} must be before to {}",
                request.from, request.to
            )));
        }
        if request.window.is_zero() {
            return Err(Error::InvalidRequest("window must be positive".to_string()));
        }
        if request.window > self.part_length.as_duration() {
            return Err(Error::InvalidRequest(format!(
                "window {:?} exceeds partition length {:?}",
                request.window,
                self.part_length.as_duration()
            )));
        }
        Ok(())
    }

    pub async fn check_export(&self, user: Option<&str>, id: &str) -> Result<ExportInfo> {
        self.authorize(user)?;
        let session = self.sessions.check_export(id).await?;
        Ok(self.info(&session))
    }

    /// Releases the lock and moves the session to `Cancel`. Partitions
    /// already in flight complete; no new partition starts.
    pub async fn cancel_export(&self, user: Option<&str>, id: &str) -> Result<()> {
        let caller = self.authorize(user)?;
        self.sessions.cancel_export(id).await?;
        self.metrics.exports_cancelled_total.inc();
        tracing::info!(session = %id, caller = %caller, "export cancelled");
        Ok(())
    }

    /// Re-drives a session left in `Start` by a previous process. Requires
    /// that no session holds the global lock, so concurrent restores of one
    /// session launch a single pipeline.
    pub async fn restore_export(&self, user: Option<&str>, id: &str) -> Result<()> {
        self.authorize(user)?;
        let session = self.sessions.lock_for_restore(id).await?;
        self.metrics.exports_started_total.inc();
        tracing::info!(
            session = %id,
            "export restored at {}/{} partitions",
            session.parts_uploaded(),
            session.parts_total()
        );
        self.launch(id.to_string());
        Ok(())
    }

    pub async fn get_all(&self, user: Option<&str>) -> Result<Vec<ExportInfo>> {
        self.authorize(user)?;
        let sessions = self.sessions.get_all_exports().await?;
        Ok(sessions.iter().map(|s| self.info(s)).collect())
    }

    fn info(&self, session: &ExportSession) -> ExportInfo {
        ExportInfo::from_session(session, self.files.link(&session.manifest_path()))
    }

    fn launch(&self, id: String) {
        let exporter = Arc::clone(&self.exporter);
        self.tracker.spawn(async move {
            if let Err(err) = exporter.run(&id).await {
                tracing::error!(session = %id, "export pipeline stopped: {}", err);
            }
        });
    }

    /// Interrupts running pipelines and waits for them to stop. Interrupted
    /// sessions stay in `Start` and can be restored by the next process.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        self.tracker.close();
        self.tracker.wait().await;
        tracing::info!("export service stopped");
    }

    /// Waits until no pipeline launched by this service is running.
    pub async fn wait_idle(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        if !self.shutdown.is_cancelled() {
            self.tracker.reopen();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex as StdMutex;
    use std::time::SystemTime;

    use async_trait::async_trait;
    use common::clock::MockClock;
    use common::storage::in_memory::InMemoryStorage;
    use tokio::io::AsyncReadExt;
    use tokio::sync::Semaphore;

    use crate::file_store::ObjectReader;
    use crate::search::{LogEvent, SearchError, SearchRequest};
    use crate::session::StorageSessionStore;

    /// One event per request, always a short page.
    struct OneEventSource;

    #[async_trait]
    impl SearchSource for OneEventSource {
        async fn search(
            &self,
            _cancel: &CancellationToken,
            request: &SearchRequest,
        ) -> std::result::Result<Vec<LogEvent>, SearchError> {
            Ok(vec![serde_json::json!({"ts": request.from.to_rfc3339()})])
        }
    }

    /// Answers one request per permit added to the semaphore.
    struct SteppedSource {
        permits: Arc<Semaphore>,
    }

    #[async_trait]
    impl SearchSource for SteppedSource {
        async fn search(
            &self,
            cancel: &CancellationToken,
            request: &SearchRequest,
        ) -> std::result::Result<Vec<LogEvent>, SearchError> {
            tokio::select! {
                _ = cancel.cancelled() => Err(SearchError::Cancelled),
                permit = self.permits.acquire() => {
                    permit.map_err(|_| SearchError::Cancelled)?.forget();
                    Ok(vec![serde_json::json!({"ts": request.from.to_rfc3339()})])
                }
            }
        }
    }

    /// Blocks every request until released.
    struct GatedSource {
        gate: CancellationToken,
    }

    #[async_trait]
    impl SearchSource for GatedSource {
        async fn search(
            &self,
            cancel: &CancellationToken,
            _request: &SearchRequest,
        ) -> std::result::Result<Vec<LogEvent>, SearchError> {
            tokio::select! {
                _ = cancel.cancelled() => Err(SearchError::Cancelled),
                _ = self.gate.cancelled() => Ok(Vec::new()),
            }
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
            format!("https://files.example.com/{}", path)
        }
    }

    fn config() -> ExportConfig {
        ExportConfig {
            url_prefix: "https://files.example.com".to_string(),
            workers: 2,
            ..ExportConfig::default()
        }
    }

    fn ts(s: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(s).unwrap()
    }

    fn request(name: &str) -> ExportRequest {
        ExportRequest {
            query: "level:error".to_string(),
            from: ts("2024-01-01T00:00:00Z"),
            to: ts("2024-01-01T03:00:00Z"),
            window: Duration::from_secs(3600),
            name: name.to_string(),
        }
    }

    struct Fixture {
        service: ExportService,
        sessions: Arc<StorageSessionStore>,
        files: Arc<MemoryFiles>,
        clock: Arc<MockClock>,
    }

    async fn fixture(config: ExportConfig, search: Arc<dyn SearchSource>) -> Fixture {
        let sessions = Arc::new(StorageSessionStore::new(Arc::new(InMemoryStorage::new())));
        let files = Arc::new(MemoryFiles::default());
        let clock = Arc::new(MockClock::starting_at(
            SystemTime::UNIX_EPOCH + Duration::from_secs(1_704_153_600),
        ));
        let service = ExportService::with_clock(
            &config,
            sessions.clone(),
            search,
            files.clone(),
            ExportMetrics::new(),
            clock.clone(),
        )
        .await
        .unwrap();
        Fixture {
            service,
            sessions,
            files,
            clock,
        }
    }

    #[tokio::test]
    async fn should_run_export_to_finish_and_upload_manifest() {
        // given
        let f = fixture(config(), Arc::new(OneEventSource)).await;

        // when
        let id = f.service.start_export(None, request("errors")).await.unwrap();
        f.service.wait_idle().await;

        // then
        let info = f.service.check_export(None, &id).await.unwrap();
        assert_eq!(info.status, ExportStatus::Finish);
        assert_eq!(info.parts_total, 3);
        assert_eq!(info.progress, 1.0);
        assert_eq!(info.user, ANONYMOUS_USER);
        let manifest_path = format!("exports/{}/manifest.txt", id);
        assert_eq!(info.manifest_link, format!("https://files.example.com/{}", manifest_path));
        let objects = f.files.objects.lock().unwrap();
        let manifest = String::from_utf8(objects.get(&manifest_path).unwrap().clone()).unwrap();
        assert_eq!(manifest.split('\n').count(), 4);
        assert!(manifest.ends_with('\n'));
        assert_eq!(objects.len(), 4);
    }

    #[tokio::test]
    async fn should_normalize_range_to_partition_boundaries() {
        // given
        let f = fixture(config(), Arc::new(OneEventSource)).await;
        let mut req = request("errors");
        req.from = ts("2024-01-01T00:20:00Z");
        req.to = ts("2024-01-01T02:10:00Z");

        // when
        let id = f.service.start_export(None, req).await.unwrap();
        f.service.wait_idle().await;

        // then
        let info = f.service.check_export(None, &id).await.unwrap();
        assert_eq!(info.from, ts("2024-01-01T00:00:00Z"));
        assert_eq!(info.to, ts("2024-01-01T03:00:00Z"));
        assert_eq!(info.parts_total, 3);
    }

    #[tokio::test]
    async fn should_reject_second_export_while_first_runs() {
        // given
        let gate = CancellationToken::new();
        let f = fixture(config(), Arc::new(GatedSource { gate: gate.clone() })).await;
        f.service.start_export(None, request("first")).await.unwrap();

        // when
        let result = f.service.start_export(None, request("second")).await;

        // then
        assert!(matches!(result, Err(Error::Conflict(_))));
        gate.cancel();
        f.service.wait_idle().await;
    }

    #[tokio::test]
    async fn should_start_new_export_after_cancelling_running_one() {
        // given
        let gate = CancellationToken::new();
        let f = fixture(config(), Arc::new(GatedSource { gate: gate.clone() })).await;
        let first = f.service.start_export(None, request("first")).await.unwrap();

        // when
        f.service.cancel_export(None, &first).await.unwrap();
        f.clock.advance(Duration::from_secs(1));
        let second = f.service.start_export(None, request("second")).await;

        // then
        assert!(second.is_ok());
        gate.cancel();
        f.service.wait_idle().await;
        let first = f.service.check_export(None, &first).await.unwrap();
        assert_eq!(first.status, ExportStatus::Cancel);
        assert!(first.parts_uploaded < first.parts_total);
    }

    #[tokio::test]
    async fn should_reject_invalid_requests_without_persisting() {
        // given
        let f = fixture(config(), Arc::new(OneEventSource)).await;
        let mut too_wide = request("wide");
        too_wide.window = Duration::from_secs(7200);
        let mut reversed = request("reversed");
        reversed.from = ts("2024-01-01T03:00:00Z");
        reversed.to = ts("2024-01-01T00:00:00Z");

        // when
        let results = vec![
            f.service.start_export(None, too_wide).await,
            f.service.start_export(None, reversed).await,
            f.service.start_export(None, request("")).await,
        ];

        // then
        for result in results {
            assert!(matches!(result, Err(Error::InvalidRequest(_))));
        }
        assert!(f.service.get_all(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn should_reject_callers_outside_allow_list() {
        // given
        let config = ExportConfig {
            allowed_users: vec!["alice".to_string()],
            ..config()
        };
        let f = fixture(config, Arc::new(OneEventSource)).await;

        // when
        let stranger = f.service.start_export(Some("mallory"), request("x")).await;
        let anonymous = f.service.get_all(None).await;
        let alice = f.service.start_export(Some("alice"), request("x")).await;

        // then
        assert!(matches!(stranger, Err(Error::PermissionDenied(_))));
        assert!(matches!(anonymous, Err(Error::PermissionDenied(_))));
        assert!(alice.unwrap().starts_with("alice/x_"));
        f.service.wait_idle().await;
    }

    #[tokio::test]
    async fn should_restore_interrupted_export_and_finish_it() {
        // given
        let gate = CancellationToken::new();
        let f = fixture(config(), Arc::new(GatedSource { gate: gate.clone() })).await;
        let id = f.service.start_export(None, request("job")).await.unwrap();
        f.service.shutdown().await;
        assert_eq!(
            f.sessions.check_export(&id).await.unwrap().status,
            ExportStatus::Start
        );

        // when
        let restarted = ExportService::new(
            &config(),
            f.sessions.clone(),
            Arc::new(OneEventSource),
            f.files.clone(),
            ExportMetrics::new(),
        )
        .await
        .unwrap();
        restarted.restore_export(None, &id).await.unwrap();
        restarted.wait_idle().await;

        // then
        let info = restarted.check_export(None, &id).await.unwrap();
        assert_eq!(info.status, ExportStatus::Finish);
        assert_eq!(info.parts_uploaded, 3);
    }

    #[tokio::test]
    async fn should_refuse_restoring_terminal_or_blocked_exports() {
        // given
        let f = fixture(config(), Arc::new(OneEventSource)).await;
        let finished = f.service.start_export(None, request("done")).await.unwrap();
        f.service.wait_idle().await;

        // when
        let terminal = f.service.restore_export(None, &finished).await;

        // then
        assert!(matches!(terminal, Err(Error::Conflict(_))));

        // given
        let gate = CancellationToken::new();
        let g = fixture(config(), Arc::new(GatedSource { gate: gate.clone() })).await;
        let running = g.service.start_export(None, request("running")).await.unwrap();

        // when
        let blocked = g.service.restore_export(None, &running).await;

        // then
        assert!(matches!(blocked, Err(Error::Conflict(_))));
        gate.cancel();
        g.service.wait_idle().await;
    }

    #[tokio::test]
    async fn should_clear_orphaned_lock_on_construction() {
        // given
        let sessions = Arc::new(StorageSessionStore::new(Arc::new(InMemoryStorage::new())));
        sessions.lock("previous/job_1").await.unwrap();

        // when
        ExportService::new(
            &config(),
            sessions.clone(),
            Arc::new(OneEventSource),
            Arc::new(MemoryFiles::default()),
            ExportMetrics::new(),
        )
        .await
        .unwrap();

        // then
        assert_eq!(
            sessions.get_cur_active_export().await,
            Err(Error::NoActiveExport)
        );
    }

    #[tokio::test]
    async fn should_reject_cancelling_finished_export() {
        // given
        let f = fixture(config(), Arc::new(OneEventSource)).await;
        let id = f.service.start_export(None, request("done")).await.unwrap();
        f.service.wait_idle().await;

        // when
        let result = f.service.cancel_export(None, &id).await;

        // then
        assert!(matches!(result, Err(Error::AlreadyTerminal { .. })));
    }

    #[tokio::test]
    async fn should_launch_single_pipeline_for_concurrent_restores() {
        // given
        let gate = CancellationToken::new();
        let f = fixture(config(), Arc::new(GatedSource { gate: gate.clone() })).await;
        let id = f.service.start_export(None, request("job")).await.unwrap();
        f.service.shutdown().await;
        let restarted = ExportService::new(
            &config(),
            f.sessions.clone(),
            Arc::new(GatedSource { gate: gate.clone() }),
            f.files.clone(),
            ExportMetrics::new(),
        )
        .await
        .unwrap();

        // when
        let (first, second) = tokio::join!(
            restarted.restore_export(None, &id),
            restarted.restore_export(None, &id)
        );

        // then
        assert_eq!(
            [first.is_ok(), second.is_ok()].iter().filter(|ok| **ok).count(),
            1
        );
        assert!(matches!(first.or(second), Ok(())));
        gate.cancel();
        restarted.wait_idle().await;
        let info = restarted.check_export(None, &id).await.unwrap();
        assert_eq!(info.status, ExportStatus::Finish);
        assert_eq!(info.error, None);
        assert_eq!(info.parts_uploaded, 3);
    }

    #[tokio::test]
    async fn should_reject_range_with_more_partitions_than_queue_holds() {
        // given
        let config = ExportConfig {
            task_queue_size: 2,
            ..config()
        };
        let f = fixture(config, Arc::new(OneEventSource)).await;
        let mut ancient = request("ancient");
        ancient.from = ts("0001-01-01T00:00:00Z");
        ancient.to = ts("9999-12-31T00:00:00Z");

        // when
        let too_many = f.service.start_export(None, request("three_hours")).await;
        let huge = f.service.start_export(None, ancient).await;

        // then
        assert!(matches!(too_many, Err(Error::InvalidRequest(_))));
        assert!(matches!(huge, Err(Error::InvalidRequest(_))));
        assert!(f.service.get_all(None).await.unwrap().is_empty());
        assert_eq!(
            f.sessions.get_cur_active_export().await,
            Err(Error::NoActiveExport)
        );
    }

    #[tokio::test]
    async fn should_report_progress_that_never_decreases() {
        // given
        let permits = Arc::new(Semaphore::new(0));
        let config = ExportConfig {
            workers: 1,
            ..config()
        };
        let f = fixture(config, Arc::new(SteppedSource { permits: permits.clone() })).await;
        let id = f.service.start_export(None, request("steps")).await.unwrap();
        let mut seen = vec![f.service.check_export(None, &id).await.unwrap().progress];

        // when
        for confirmed in 1..=3 {
            permits.add_permits(1);
            loop {
                let info = f.service.check_export(None, &id).await.unwrap();
                seen.push(info.progress);
                if info.parts_uploaded < info.parts_total {
                    assert!(info.progress < 1.0);
                    assert_eq!(info.status, ExportStatus::Start);
                }
                if info.status == ExportStatus::Finish {
                    assert_eq!(info.progress, 1.0);
                }
                if info.parts_uploaded >= confirmed {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        }
        f.service.wait_idle().await;

        // then
        let info = f.service.check_export(None, &id).await.unwrap();
        assert_eq!(info.status, ExportStatus::Finish);
        assert_eq!(info.progress, 1.0);
        assert_eq!(seen[0], 0.0);
        assert!(seen.windows(2).all(|pair| pair[0] <= pair[1]));
    }

    #[tokio::test]
    async fn should_keep_accepting_exports_after_waiting_for_idle() {
        // given
        let f = fixture(config(), Arc::new(OneEventSource)).await;
        f.service.wait_idle().await;
        let first = f.service.start_export(None, request("first")).await.unwrap();
        f.service.wait_idle().await;

        // when
        f.clock.advance(Duration::from_secs(1));
        let second = f.service.start_export(None, request("second")).await.unwrap();
        f.service.wait_idle().await;

        // then
        for id in [first, second] {
            let info = f.service.check_export(None, &id).await.unwrap();
            assert_eq!(info.status, ExportStatus::Finish);
        }
    }
}
