//! Export job pipeline.
//!
//! One [`Exporter::run`] call drives a started session to completion: it
//! regenerates the partitions, queues the ones not yet uploaded, lets a
//! fixed pool of [`Worker`]s drain the queue, and finally uploads the
//! manifest and marks the session finished. It is safe to call again on a
//! session that was interrupted; confirmed partitions are skipped.

use std::io::Cursor;
use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinSet;

use crate::error::{Error, Result};
use crate::file_store::FileStore;
use crate::metrics::ExportMetrics;
use crate::model::{ExportSession, ExportStatus, LoadTask, part_path};
use crate::partition::partitions;
use crate::session::SessionStore;
use crate::worker::{Worker, WorkerExit};

pub struct Exporter {
    worker: Worker,
    workers: usize,
    task_queue_size: usize,
}

impl Exporter {
    pub fn new(worker: Worker, workers: usize, task_queue_size: usize) -> Self {
        Self {
            worker,
            workers: workers.max(1),
            task_queue_size: task_queue_size.max(1),
        }
    }

    fn sessions(&self) -> &Arc<dyn SessionStore> {
        &self.worker.sessions
    }

    fn files(&self) -> &Arc<dyn FileStore> {
        &self.worker.files
    }

    fn metrics(&self) -> &ExportMetrics {
        &self.worker.metrics
    }

    /// Runs the pipeline for `session_id`. Errors after the workers have
    /// started are recorded on the session; the returned error only covers
    /// what could not be recorded.
    #[tracing::instrument(level = "info", skip(self))]
    pub async fn run(&self, session_id: &str) -> Result<()> {
        self.metrics().exports_running.inc();
        let result = self.run_inner(session_id).await;
        self.metrics().exports_running.dec();
        result
    }

    async fn run_inner(&self, session_id: &str) -> Result<()> {
        let session = self.sessions().check_export(session_id).await?;
        if session.status != ExportStatus::Start {
            tracing::info!("export is {}, nothing to run", session.status);
            return Ok(());
        }

        let tasks = load_tasks(&session)?;
        tracing::info!(
            "exporting {} of {} partitions with {} workers",
            tasks.len(),
            session.parts_total(),
            self.workers
        );

        let exits = self.drain(session_id, tasks).await;
        let clean = exits.iter().all(|exit| matches!(exit, WorkerExit::Drained));
        if !clean {
            return Ok(());
        }

        let session = self.sessions().check_export(session_id).await?;
        if session.status != ExportStatus::Start {
            tracing::info!("export became {} while running", session.status);
            return Ok(());
        }
        if session.parts_uploaded() != session.parts_total() {
            tracing::warn!(
                "{} of {} partitions confirmed after all workers drained, leaving export restorable",
                session.parts_uploaded(),
                session.parts_total()
            );
            return Ok(());
        }

        if let Err(err) = self.finalize(&session).await {
            tracing::error!("finalizing export failed: {}", err);
            self.sessions()
                .fail_export(session_id, &err.to_string())
                .await?;
            self.metrics().exports_failed_total.inc();
            return Ok(());
        }
        Ok(())
    }

    /// Feeds `tasks` to the worker pool and waits for every worker to exit.
    async fn drain(&self, session_id: &str, tasks: Vec<LoadTask>) -> Vec<WorkerExit> {
        let (tx, rx) = mpsc::channel(self.task_queue_size);
        let queue = Arc::new(Mutex::new(rx));

        let mut pool = JoinSet::new();
        for _ in 0..self.workers {
            let worker = self.worker.clone();
            let queue = Arc::clone(&queue);
            let id = session_id.to_string();
            pool.spawn(async move { worker.run(&id, queue).await });
        }
        // Workers own the receiver from here on, so the producer's send
        // fails instead of blocking once they have all stopped.
        drop(queue);

        let produce = async move {
            for task in tasks {
                if tx.send(task).await.is_err() {
                    break;
                }
            }
        };
        let collect = async {
            let mut exits = Vec::with_capacity(self.workers);
            while let Some(joined) = pool.join_next().await {
                match joined {
                    Ok(exit) => exits.push(exit),
                    Err(e) => {
                        let msg = format!("worker panicked: {}", e);
                        tracing::error!("{}", msg);
                        if let Err(err) = self.sessions().fail_export(session_id, &msg).await {
                            tracing::warn!("could not mark export failed: {}", err);
                        }
                        exits.push(WorkerExit::Failed(Error::Internal(msg)));
                    }
                }
            }
            exits
        };
        let ((), exits) = tokio::join!(produce, collect);
        exits
    }

    /// Uploads the manifest and moves the session to `Finish`.
    async fn finalize(&self, session: &ExportSession) -> Result<()> {
        let manifest = self.manifest(session);
        self.files()
            .put_object(&session.manifest_path(), Box::new(Cursor::new(manifest.into_bytes())))
            .await?;
        self.sessions().finish_export(&session.id).await?;
        self.metrics().exports_finished_total.inc();
        tracing::info!(
            unpacked = session.total_size.unpacked,
            packed = session.total_size.packed,
            "export finished, manifest at {}",
            self.files().link(&session.manifest_path())
        );
        Ok(())
    }

    /// One download link per partition, newest first, each on its own line.
    fn manifest(&self, session: &ExportSession) -> String {
        let mut manifest = String::new();
        for partition in partitions(session.from, session.to, session.part_length) {
            let path = part_path(&session.file_store_path_prefix, &partition);
            manifest.push_str(&self.files().link(&path));
            manifest.push('\n');
        }
        manifest
    }
}

/// Regenerates the session's partitions and keeps those not yet uploaded.
pub fn load_tasks(session: &ExportSession) -> Result<Vec<LoadTask>> {
    let parts = partitions(session.from, session.to, session.part_length);
    if parts.len() != session.parts_total() {
        return Err(Error::Internal(format!(
            "session {} tracks {} partitions but its range yields {}",
            session.id,
            session.parts_total(),
            parts.len()
        )));
    }
    Ok(parts
        .into_iter()
        .filter(|p| !session.part_is_uploaded[p.index])
        .map(|p| LoadTask {
            part_id: p.index,
            path: part_path(&session.file_store_path_prefix, &p),
            query: session.query.clone(),
            from: p.from,
            to: p.to,
            window: session.window,
        })
        .collect())
}
