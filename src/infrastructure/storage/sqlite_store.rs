//! Durable key-value store on `SQLite`.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use sqlx::{Connection, Row, Sqlite, SqliteConnection, Transaction};
use tokio::sync::{broadcast, Mutex};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::config::StorageConfig;
use crate::domain::ports::{diff_changes, KeyValueStore, Record, StorageChanges};

const CHANNEL_CAPACITY: usize = 64;

/// Poll interval used by [`SqliteStore::connect`].
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// `SQLite`-backed key-value store.
///
/// One row per key in `kv_store`, values kept as JSON text. Writes are
/// serialized through a lock and land in a single transaction; the change
/// notification is sent after commit.
///
/// File databases are also watched for commits made by other processes
/// (`PRAGMA data_version` on a dedicated connection). Such writes are diffed
/// against the last known contents and broadcast like local ones.
pub struct SqliteStore {
    pool: SqlitePool,
    /// Last known contents; holding the lock serializes writes
    known: Arc<Mutex<Record>>,
    changes: broadcast::Sender<StorageChanges>,
    watcher: CancellationToken,
}

impl SqliteStore {
    /// Open the store described by `config`, creating parent directories
    /// and running migrations.
    pub async fn open(config: &StorageConfig) -> DomainResult<Self> {
        if config.path != ":memory:" {
            if let Some(parent) = std::path::Path::new(&config.path).parent() {
                if !parent.as_os_str().is_empty() {
                    tokio::fs::create_dir_all(parent).await.map_err(|e| {
                        DomainError::Persistence(format!(
                            "failed to create {}: {e}",
                            parent.display()
                        ))
                    })?;
                }
            }
        }
        Self::connect_with_poll(
            &config.database_url(),
            config.max_connections,
            config.poll_interval(),
        )
        .await
    }

    /// Connect to `database_url` and run migrations.
    pub async fn connect(database_url: &str, max_connections: u32) -> DomainResult<Self> {
        Self::connect_with_poll(database_url, max_connections, DEFAULT_POLL_INTERVAL).await
    }

    /// Like [`Self::connect`], checking for external writes every
    /// `poll_interval`.
    ///
    /// In-memory databases live only as long as their connection, so they
    /// get a single connection that is never recycled and are not watched.
    pub async fn connect_with_poll(
        database_url: &str,
        max_connections: u32,
        poll_interval: Duration,
    ) -> DomainResult<Self> {
        let in_memory = database_url.contains(":memory:");

        let mut options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| DomainError::Persistence(format!("invalid database URL: {e}")))?
            .busy_timeout(Duration::from_secs(5))
            .create_if_missing(true);
        if !in_memory {
            options = options
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Normal);
        }

        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .min_connections(1)
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new()
                .max_connections(max_connections.max(1))
                .idle_timeout(Duration::from_secs(30))
        };

        let pool = pool_options
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options.clone())
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        let known = Arc::new(Mutex::new(read_all(&pool).await?));
        let (changes, _) = broadcast::channel(CHANNEL_CAPACITY);
        let watcher = CancellationToken::new();

        if !in_memory {
            let connection = SqliteConnection::connect_with(&options).await?;
            tokio::spawn(watch_external_writes(
                connection,
                ExternalWatch {
                    pool: pool.clone(),
                    known: Arc::clone(&known),
                    changes: changes.clone(),
                },
                poll_interval,
                watcher.clone(),
            ));
        }
        debug!(database_url, watched = !in_memory, "sqlite store ready");

        Ok(Self {
            pool,
            known,
            changes,
            watcher,
        })
    }

    /// Underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Stop watching for external writes and close the pool.
    pub async fn close(&self) {
        self.watcher.cancel();
        self.pool.close().await;
    }

    async fn apply(&self, updates: Vec<(String, Option<Value>)>) -> DomainResult<()> {
        let mut known = self.known.lock().await;
        let mut tx = self.pool.begin().await?;

        let mut previous = Record::new();
        for (key, _) in &updates {
            if let Some(value) = read_value(&mut tx, key).await? {
                previous.insert(key.clone(), value);
            }
        }

        let now = Utc::now().to_rfc3339();
        for (key, value) in &updates {
            match value {
                Some(value) => {
                    sqlx::query(
                        "INSERT INTO kv_store (key, value, updated_at) VALUES (?, ?, ?)
                         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                    )
                    .bind(key)
                    .bind(value.to_string())
                    .bind(&now)
                    .execute(&mut *tx)
                    .await?;
                }
                None => {
                    sqlx::query("DELETE FROM kv_store WHERE key = ?")
                        .bind(key)
                        .execute(&mut *tx)
                        .await?;
                }
            }
        }
        tx.commit().await?;

        for (key, value) in &updates {
            match value {
                Some(value) => {
                    known.insert(key.clone(), value.clone());
                }
                None => {
                    known.remove(key);
                }
            }
        }

        let changes = diff_changes(&previous, updates);
        if !changes.is_empty() {
            trace!(keys = ?changes.keys().collect::<Vec<_>>(), "sqlite store changed");
            let _ = self.changes.send(changes);
        }
        Ok(())
    }
}

impl Drop for SqliteStore {
    fn drop(&mut self) {
        self.watcher.cancel();
    }
}

/// State the external-write watcher shares with its store.
struct ExternalWatch {
    pool: SqlitePool,
    known: Arc<Mutex<Record>>,
    changes: broadcast::Sender<StorageChanges>,
}

impl ExternalWatch {
    /// Re-read every key and broadcast whatever differs from the last
    /// known contents. Local writes already updated `known`, so they
    /// produce no second notification.
    async fn resync(&self) -> DomainResult<()> {
        let mut known = self.known.lock().await;
        let current = read_all(&self.pool).await?;

        let updates: Vec<(String, Option<Value>)> = current
            .iter()
            .map(|(key, value)| (key.clone(), Some(value.clone())))
            .chain(
                known
                    .keys()
                    .filter(|key| !current.contains_key(*key))
                    .map(|key| (key.clone(), None)),
            )
            .collect();
        let changes = diff_changes(&known, updates);
        *known = current;

        if !changes.is_empty() {
            debug!(keys = ?changes.keys().collect::<Vec<_>>(), "external write detected");
            let _ = self.changes.send(changes);
        }
        Ok(())
    }
}

/// `data_version` changes whenever another connection commits.
async fn data_version(connection: &mut SqliteConnection) -> DomainResult<i64> {
    Ok(sqlx::query_scalar::<_, i64>("PRAGMA data_version")
        .fetch_one(&mut *connection)
        .await?)
}

async fn watch_external_writes(
    mut connection: SqliteConnection,
    watch: ExternalWatch,
    poll_interval: Duration,
    stop: CancellationToken,
) {
    let mut last = match data_version(&mut connection).await {
        Ok(version) => version,
        Err(err) => {
            warn!(error = %err, "cannot watch for external writes");
            return;
        }
    };

    let mut ticker = tokio::time::interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            () = stop.cancelled() => break,
            _ = ticker.tick() => {}
        }

        match data_version(&mut connection).await {
            Ok(version) if version != last => {
                last = version;
                if let Err(err) = watch.resync().await {
                    warn!(error = %err, "failed to reload store after external write");
                }
            }
            Ok(_) => {}
            Err(err) => warn!(error = %err, "failed to poll data_version"),
        }
    }

    if let Err(err) = connection.close().await {
        debug!(error = %err, "closing watch connection failed");
    }
    trace!("external write watcher stopped");
}

async fn read_value(tx: &mut Transaction<'_, Sqlite>, key: &str) -> DomainResult<Option<Value>> {
    let row = sqlx::query("SELECT value FROM kv_store WHERE key = ?")
        .bind(key)
        .fetch_optional(&mut **tx)
        .await?;
    Ok(row.and_then(|row| decode_row(key, &row.get::<String, _>("value"))))
}

async fn read_all(pool: &SqlitePool) -> DomainResult<Record> {
    let rows = sqlx::query("SELECT key, value FROM kv_store ORDER BY key")
        .fetch_all(pool)
        .await?;
    Ok(rows
        .iter()
        .filter_map(|row| {
            let key: String = row.get("key");
            decode_row(&key, &row.get::<String, _>("value")).map(|v| (key, v))
        })
        .collect())
}

/// Unparseable rows read as absent so callers reinitialize them.
fn decode_row(key: &str, raw: &str) -> Option<Value> {
    match serde_json::from_str(raw) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(key, error = %e, "ignoring undecodable stored value");
            None
        }
    }
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    async fn get(&self, keys: &[&str]) -> DomainResult<Record> {
        let mut record = Record::new();
        for key in keys {
            let row = sqlx::query("SELECT value FROM kv_store WHERE key = ?")
                .bind(*key)
                .fetch_optional(&self.pool)
                .await?;
            if let Some(value) = row.and_then(|r| decode_row(key, &r.get::<String, _>("value"))) {
                record.insert((*key).to_string(), value);
            }
        }
        Ok(record)
    }

    async fn get_all(&self) -> DomainResult<Record> {
        read_all(&self.pool).await
    }

    async fn set(&self, entries: Record) -> DomainResult<()> {
        self.apply(entries.into_iter().map(|(k, v)| (k, Some(v))).collect())
            .await
    }

    async fn remove(&self, keys: &[&str]) -> DomainResult<()> {
        self.apply(keys.iter().map(|k| ((*k).to_string(), None)).collect())
            .await
    }

    async fn clear(&self) -> DomainResult<()> {
        let keys: Vec<String> = sqlx::query("SELECT key FROM kv_store")
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(|row| row.get("key"))
            .collect();
        self.apply(keys.into_iter().map(|k| (k, None)).collect()).await
    }

    fn subscribe(&self) -> broadcast::Receiver<StorageChanges> {
        self.changes.subscribe()
    }
}
