use std::{
    path::PathBuf,
    sync::{mpsc, Arc, Mutex},
    thread::{self, JoinHandle},
};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use log::{error, info};
use rusqlite::{params, Connection};
use tokio::sync::oneshot;
use uuid::Uuid;

mod migrations;

use crate::models::SessionRecord;
use migrations::run_migrations;

/// Persistence contract between the cycle controller and storage. Writes are
/// fire-and-forget from the controller's side; reads feed the history pane.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Record a fully completed session (all work periods plus the long break).
    async fn save_completed_session(
        &self,
        task_name: &str,
        started_at: DateTime<Utc>,
        ended_at: DateTime<Utc>,
    ) -> Result<()>;

    /// Record a cycle abandoned after `completed_cycles` work periods.
    async fn save_partial_session(
        &self,
        task_name: &str,
        started_at: DateTime<Utc>,
        ended_at: DateTime<Utc>,
        completed_cycles: u32,
    ) -> Result<()>;

    /// Sessions started on the given UTC date, earliest first. Empty when
    /// there are none.
    async fn sessions_for_date(&self, date: NaiveDate) -> Result<Vec<SessionRecord>>;

    /// The most recently started sessions, newest first.
    async fn recent_sessions(&self, limit: u32) -> Result<Vec<SessionRecord>>;
}

type DbTask = Box<dyn FnOnce(&mut Connection) + Send + 'static>;

enum DbCommand {
    Execute(DbTask),
    Shutdown,
}

struct DatabaseInner {
    sender: mpsc::Sender<DbCommand>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for DatabaseInner {
    fn drop(&mut self) {
        let mut guard = match self.worker.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(handle) = guard.take() {
            if let Err(err) = self.sender.send(DbCommand::Shutdown) {
                error!("Failed to send shutdown to DB thread: {err}");
            }
            if let Err(join_err) = handle.join() {
                error!("Failed to join DB thread: {join_err:?}");
            }
        }
    }
}

fn parse_datetime(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|err| anyhow!("invalid datetime '{value}': {err}"))
}

fn to_u64(value: i64) -> Result<u64> {
    u64::try_from(value).map_err(|_| anyhow!("value {value} is negative"))
}

fn to_u32(value: i64) -> Result<u32> {
    u32::try_from(value).map_err(|_| anyhow!("value {value} out of range"))
}

#[derive(Clone)]
pub struct Database {
    inner: Arc<DatabaseInner>,
}

impl Database {
    pub fn new(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create database directory {}", parent.display())
            })?;
        }

        let (command_tx, command_rx) = mpsc::channel::<DbCommand>();
        let (ready_tx, ready_rx) = mpsc::channel();
        let path_for_thread = db_path.clone();

        let worker = thread::Builder::new()
            .name("pmo-db".into())
            .spawn(move || {
                let mut conn = match Connection::open(&path_for_thread) {
                    Ok(connection) => connection,
                    Err(err) => {
                        let _ = ready_tx.send(Err(anyhow::Error::new(err)
                            .context("failed to open SQLite database")));
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
                    run_migrations(&mut conn).context("failed to run database migrations");
                if ready_tx.send(init_result).is_err() {
                    error!("DB initialization receiver dropped before ready signal");
                    return;
                }

                while let Ok(command) = command_rx.recv() {
                    match command {
                        DbCommand::Execute(task) => {
                            task(&mut conn);
                        }
                        DbCommand::Shutdown => break,
                    }
                }

                info!("Database thread shutting down");
            })
            .with_context(|| "failed to spawn database worker thread")?;

        ready_rx
            .recv()
            .context("database worker exited before signaling readiness")??;

        info!("Database initialized at {}", db_path.display());

        Ok(Self {
            inner: Arc::new(DatabaseInner {
                sender: command_tx,
                worker: Mutex::new(Some(worker)),
            }),
        })
    }

    pub async fn execute<F, T>(&self, task: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let sender = self.inner.sender.clone();
        let (reply_tx, reply_rx) = oneshot::channel();

        let command = DbCommand::Execute(Box::new(move |conn| {
            let result = task(conn);
            if reply_tx.send(result).is_err() {
                error!("DB caller dropped before receiving result");
            }
        }));

        sender
            .send(command)
            .map_err(|err| anyhow!("failed to send command to DB thread: {err}"))?;

        reply_rx
            .await
            .map_err(|_| anyhow!("database thread terminated unexpectedly"))?
    }
}

fn insert_session(
    conn: &Connection,
    task_name: &str,
    started_at: DateTime<Utc>,
    ended_at: DateTime<Utc>,
    completed_cycles: u32,
    is_completed: bool,
) -> Result<()> {
    let duration_secs = (ended_at - started_at).num_seconds().max(0);
    conn.execute(
        "INSERT INTO sessions (id, task_name, started_at, ended_at, duration_secs, completed_cycles, is_completed)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            Uuid::new_v4().to_string(),
            task_name,
            started_at.to_rfc3339(),
            ended_at.to_rfc3339(),
            duration_secs,
            completed_cycles,
            is_completed,
        ],
    )
    .with_context(|| "failed to insert session")?;
    Ok(())
}

fn row_to_record(row: &rusqlite::Row<'_>) -> Result<SessionRecord> {
    Ok(SessionRecord {
        id: row.get(0)?,
        task_name: row.get(1)?,
        started_at: parse_datetime(&row.get::<_, String>(2)?)?,
        ended_at: parse_datetime(&row.get::<_, String>(3)?)?,
        duration_secs: to_u64(row.get::<_, i64>(4)?)?,
        completed_cycles: to_u32(row.get::<_, i64>(5)?)?,
        is_completed: row.get(6)?,
    })
}

const SESSION_COLUMNS: &str =
    "id, task_name, started_at, ended_at, duration_secs, completed_cycles, is_completed";

#[async_trait]
impl SessionStore for Database {
    async fn save_completed_session(
        &self,
        task_name: &str,
        started_at: DateTime<Utc>,
        ended_at: DateTime<Utc>,
    ) -> Result<()> {
        let task_name = task_name.to_string();
        self.execute(move |conn| {
            insert_session(
                conn,
                &task_name,
                started_at,
                ended_at,
                crate::timer::state::WORK_PERIODS_PER_SESSION,
                true,
            )
        })
        .await
    }

    async fn save_partial_session(
        &self,
        task_name: &str,
        started_at: DateTime<Utc>,
        ended_at: DateTime<Utc>,
        completed_cycles: u32,
    ) -> Result<()> {
        let task_name = task_name.to_string();
        self.execute(move |conn| {
            insert_session(conn, &task_name, started_at, ended_at, completed_cycles, false)
        })
        .await
    }

    async fn sessions_for_date(&self, date: NaiveDate) -> Result<Vec<SessionRecord>> {
        let day = date.format("%Y-%m-%d").to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SESSION_COLUMNS}
                 FROM sessions
                 WHERE date(started_at) = ?1
                 ORDER BY started_at ASC"
            ))?;

            let mut rows = stmt.query(params![day])?;
            let mut sessions = Vec::new();
            while let Some(row) = rows.next()? {
                sessions.push(row_to_record(row)?);
            }

            Ok(sessions)
        })
        .await
    }

    async fn recent_sessions(&self, limit: u32) -> Result<Vec<SessionRecord>> {
        self.execute(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SESSION_COLUMNS}
                 FROM sessions
                 ORDER BY started_at DESC
                 LIMIT ?1"
            ))?;

            let mut rows = stmt.query(params![i64::from(limit)])?;
            let mut sessions = Vec::new();
            while let Some(row) = rows.next()? {
                sessions.push(row_to_record(row)?);
            }

            Ok(sessions)
        })
        .await
    }
}
