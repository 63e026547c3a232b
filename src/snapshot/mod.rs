//! Local SQLite snapshot store for rule documents.
//!
//! All SQLite access happens on a dedicated worker thread; callers submit
//! closures and await the result over a oneshot channel, so the async
//! runtime never blocks on disk I/O.

use std::{
    path::{Path, PathBuf},
    sync::{mpsc, Arc, Mutex},
    thread::{self, JoinHandle},
};

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use log::{error, info};
use rusqlite::{params, Connection};
use tokio::sync::oneshot;

mod migrations;

use crate::rules::RuleSetDocument;
use migrations::run_migrations;

/// How many historical snapshots to retain after each save.
const SNAPSHOT_RETENTION: usize = 20;

type StoreTask = Box<dyn FnOnce(&mut Connection) + Send + 'static>;

enum StoreCommand {
    Execute(StoreTask),
    Shutdown,
}

struct SnapshotStoreInner {
    sender: mpsc::Sender<StoreCommand>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for SnapshotStoreInner {
    fn drop(&mut self) {
        let mut guard = match self.worker.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(handle) = guard.take() {
            if let Err(err) = self.sender.send(StoreCommand::Shutdown) {
                error!("Failed to send shutdown to snapshot thread: {err}");
            }
            if let Err(join_err) = handle.join() {
                error!("Failed to join snapshot thread: {join_err:?}");
            }
        }
    }
}

fn parse_datetime(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|err| anyhow!("invalid datetime '{value}': {err}"))
}

#[derive(Clone)]
pub struct SnapshotStore {
    inner: Arc<SnapshotStoreInner>,
    db_path: Arc<PathBuf>,
}

impl SnapshotStore {
    pub fn new(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create snapshot directory {}", parent.display())
            })?;
        }

        let (command_tx, command_rx) = mpsc::channel::<StoreCommand>();
        let (ready_tx, ready_rx) = mpsc::channel();
        let path_for_thread = db_path.clone();

        let worker = thread::Builder::new()
            .name("fleetline-snapshots".into())
            .spawn(move || {
                let mut conn = match Connection::open(&path_for_thread) {
                    Ok(connection) => connection,
                    Err(err) => {
                        let _ = ready_tx.send(Err(anyhow::Error::new(err)
                            .context("failed to open snapshot database")));
                        return;
                    }
                };

                if let Err(err) = conn.pragma_update(None, "journal_mode", "WAL") {
                    error!("Failed to enable WAL mode: {err}");
                }
                if let Err(err) = conn.pragma_update(None, "foreign_keys", "ON") {
                    error!("Failed to enable foreign keys: {err}");
                }

                let init_result =
                    run_migrations(&mut conn).context("failed to run snapshot migrations");
                if ready_tx.send(init_result).is_err() {
                    error!("Snapshot initialization receiver dropped before ready signal");
                    return;
                }

                while let Ok(command) = command_rx.recv() {
                    match command {
                        StoreCommand::Execute(task) => {
                            task(&mut conn);
                        }
                        StoreCommand::Shutdown => break,
                    }
                }

                info!("Snapshot store thread shutting down");
            })
            .with_context(|| "failed to spawn snapshot worker thread")?;

        ready_rx
            .recv()
            .context("snapshot worker exited before signaling readiness")??;

        info!("Snapshot store initialized at {}", db_path.display());

        Ok(Self {
            inner: Arc::new(SnapshotStoreInner {
                sender: command_tx,
                worker: Mutex::new(Some(worker)),
            }),
            db_path: Arc::new(db_path),
        })
    }

    pub fn path(&self) -> &Path {
        self.db_path.as_path()
    }

    pub async fn execute<F, T>(&self, task: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let sender = self.inner.sender.clone();
        let (reply_tx, reply_rx) = oneshot::channel();

        let command = StoreCommand::Execute(Box::new(move |conn| {
            let result = task(conn);
            if reply_tx.send(result).is_err() {
                error!("Snapshot caller dropped before receiving result");
            }
        }));

        sender
            .send(command)
            .map_err(|err| anyhow!("failed to send command to snapshot thread: {err}"))?;

        reply_rx
            .await
            .map_err(|_| anyhow!("snapshot thread terminated unexpectedly"))?
    }

    /// Persist a document as a new snapshot row, pruning old history.
    pub async fn save_document(&self, document: &RuleSetDocument) -> Result<()> {
        let version = document.version.clone();
        let saved_at = Utc::now();
        let serialized =
            serde_json::to_string(document).context("failed to serialize rule document")?;

        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO ruleset_snapshots (version, document, saved_at)
                 VALUES (?1, ?2, ?3)",
                params![version, serialized, saved_at.to_rfc3339()],
            )
            .with_context(|| "failed to insert rule snapshot")?;

            conn.execute(
                "DELETE FROM ruleset_snapshots
                 WHERE id NOT IN (
                     SELECT id FROM ruleset_snapshots
                     ORDER BY id DESC
                     LIMIT ?1
                 )",
                params![SNAPSHOT_RETENTION as i64],
            )
            .with_context(|| "failed to prune rule snapshots")?;

            Ok(())
        })
        .await
    }

    /// Load the most recently saved document, if any.
    pub async fn load_latest(&self) -> Result<Option<(RuleSetDocument, DateTime<Utc>)>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT document, saved_at
                 FROM ruleset_snapshots
                 ORDER BY id DESC
                 LIMIT 1",
            )?;

            let mut rows = stmt.query([])?;
            if let Some(row) = rows.next()? {
                let serialized: String = row.get(0)?;
                let saved_at = parse_datetime(&row.get::<_, String>(1)?)?;
                let document: RuleSetDocument = serde_json::from_str(&serialized)
                    .context("stored rule snapshot failed to deserialize")?;
                Ok(Some((document, saved_at)))
            } else {
                Ok(None)
            }
        })
        .await
    }

    pub async fn snapshot_count(&self) -> Result<i64> {
        self.execute(|conn| {
            let count: i64 =
                conn.query_row("SELECT COUNT(*) FROM ruleset_snapshots", [], |row| {
                    row.get(0)
                })?;
            Ok(count)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::default_document;

    fn temp_store() -> (tempfile::TempDir, SnapshotStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("rules.sqlite3")).unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn empty_store_has_no_latest() {
        let (_dir, store) = temp_store();
        assert!(store.load_latest().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn save_and_load_round_trip() {
        let (_dir, store) = temp_store();
        let doc = default_document();

        store.save_document(&doc).await.unwrap();
        let (loaded, _saved_at) = store.load_latest().await.unwrap().unwrap();
        assert_eq!(loaded, doc);
    }

    #[tokio::test]
    async fn latest_snapshot_wins() {
        let (_dir, store) = temp_store();
        let mut doc = default_document();

        store.save_document(&doc).await.unwrap();
        doc.telemetry_rules.insert(
            "test-code".to_string(),
            crate::models::ProductivityClass::Productive,
        );
        store.save_document(&doc).await.unwrap();

        let (loaded, _) = store.load_latest().await.unwrap().unwrap();
        assert!(loaded.telemetry_rules.contains_key("test-code"));
    }

    #[tokio::test]
    async fn history_is_pruned() {
        let (_dir, store) = temp_store();
        let doc = default_document();

        for _ in 0..(SNAPSHOT_RETENTION + 5) {
            store.save_document(&doc).await.unwrap();
        }

        let count = store.snapshot_count().await.unwrap();
        assert_eq!(count, SNAPSHOT_RETENTION as i64);
    }
}
