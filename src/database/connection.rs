/*!
 * SQLite connection handle shared by the content repository.
 *
 * A single connection sits behind a mutex; async callers reach it through
 * `spawn_blocking` so pipeline workers never block the runtime on disk I/O.
 */

use anyhow::{anyhow, Context, Result};
use log::{debug, info};
use parking_lot::Mutex;
use rusqlite::{Connection, Transaction};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::schema;

const APP_DIR: &str = "reelsmith";
const DB_FILE: &str = "reelsmith.db";
const MEMORY_PATH: &str = ":memory:";

/// Cloneable handle to the content database
#[derive(Clone)]
pub struct DatabaseConnection {
    location: PathBuf,
    inner: Arc<Mutex<Connection>>,
}

impl fmt::Debug for DatabaseConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConnection")
            .field("location", &self.location)
            .finish_non_exhaustive()
    }
}

impl DatabaseConnection {
    /// Open (or create) the database file, creating parent directories as needed
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let location = path.as_ref().to_path_buf();

        match location.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => {
                std::fs::create_dir_all(dir)
                    .with_context(|| format!("Cannot create database directory {}", dir.display()))?;
            }
            _ => {}
        }

        info!("Opening content database at {}", location.display());
        let conn = Connection::open(&location)
            .with_context(|| format!("Cannot open database {}", location.display()))?;

        Self::from_connection(conn, location)
    }

    /// Open the database under the user's local data directory
    pub fn new_default() -> Result<Self> {
        Self::new(Self::default_database_path()?)
    }

    /// Throwaway database, used by tests and `--dry-run`
    pub fn new_in_memory() -> Result<Self> {
        debug!("Opening in-memory content database");
        let conn = Connection::open_in_memory().context("Cannot open in-memory database")?;
        Self::from_connection(conn, PathBuf::from(MEMORY_PATH))
    }

    fn from_connection(conn: Connection, location: PathBuf) -> Result<Self> {
        schema::initialize_schema(&conn)?;
        Ok(Self {
            location,
            inner: Arc::new(Mutex::new(conn)),
        })
    }

    /// `<local data dir>/reelsmith/reelsmith.db`
    pub fn default_database_path() -> Result<PathBuf> {
        let data_dir = dirs::data_local_dir()
            .or_else(dirs::data_dir)
            .or_else(|| dirs::home_dir().map(|home| home.join(".local").join("share")))
            .ok_or_else(|| anyhow!("No data directory available for the content database"))?;

        Ok(data_dir.join(APP_DIR).join(DB_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.location
    }

    fn is_in_memory(&self) -> bool {
        self.location.as_os_str() == MEMORY_PATH
    }

    /// Run `op` against the connection on the current thread
    pub fn execute<F, T>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let guard = self.inner.lock();
        op(&guard)
    }

    /// Run `op` on the blocking pool
    pub async fn execute_async<F, T>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        let joined = tokio::task::spawn_blocking(move || op(&inner.lock())).await;
        joined.context("Database worker panicked")?
    }

    /// Run `op` inside a transaction on the blocking pool.
    ///
    /// Commits when `op` returns `Ok`; dropping the transaction on `Err` rolls it back.
    /// The caller's error type is preserved.
    pub async fn transaction_async<F, T, E>(&self, op: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&Transaction) -> std::result::Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: From<rusqlite::Error> + From<anyhow::Error> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        let joined = tokio::task::spawn_blocking(move || -> std::result::Result<T, E> {
            let mut guard = inner.lock();
            let tx = guard.transaction()?;
            let value = op(&tx)?;
            tx.commit()?;
            Ok(value)
        })
        .await;

        match joined {
            Ok(outcome) => outcome,
            Err(join_err) => Err(E::from(anyhow!("Database transaction worker panicked: {}", join_err))),
        }
    }

    /// Row counts by status plus the on-disk size
    pub fn stats(&self) -> Result<DatabaseStats> {
        let (content_count, completed_count, failed_count) = self.execute(|conn| {
            let row: (i64, i64, i64) = conn.query_row(
                "SELECT COUNT(*),
                        COALESCE(SUM(status = 'completed'), 0),
                        COALESCE(SUM(status = 'failed'), 0)
                 FROM contents",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )?;
            Ok(row)
        })?;

        let file_size_bytes = if self.is_in_memory() {
            0
        } else {
            std::fs::metadata(&self.location).map(|meta| meta.len()).unwrap_or(0)
        };

        Ok(DatabaseStats {
            content_count,
            completed_count,
            failed_count,
            file_size_bytes,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatabaseStats {
    pub content_count: i64,
    pub completed_count: i64,
    pub failed_count: i64,
    pub file_size_bytes: u64,
}

impl fmt::Display for DatabaseStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} contents ({} completed, {} failed), {} KB on disk",
            self.content_count,
            self.completed_count,
            self.failed_count,
            self.file_size_bytes / 1024
        )
    }
}
