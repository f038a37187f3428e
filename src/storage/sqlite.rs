//! SQLite database layer

use std::path::Path;
use std::time::Duration;

use parking_lot::Mutex;
use rusqlite::Connection;
use tracing::debug;

use crate::error::Result;
use crate::storage::migrations;

/// Default wait for both the engine lock and the in-process connection lock.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite database holding the mapping table.
///
/// The connection sits behind a mutex; all access goes through a
/// [`UnitOfWork`](super::tx::UnitOfWork) obtained from [`Database::begin`].
pub struct Database {
    pub(super) conn: Mutex<Connection>,
    schema_version: u32,
    pub(super) busy_timeout: Duration,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("schema_version", &self.schema_version)
            .field("busy_timeout", &self.busy_timeout)
            .finish_non_exhaustive()
    }
}

impl Database {
    /// Open database at the given path with the default busy timeout
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_timeout(path, DEFAULT_BUSY_TIMEOUT)
    }

    /// Open database at the given path
    pub fn open_with_timeout(path: impl AsRef<Path>, busy_timeout: Duration) -> Result<Self> {
        let path = path.as_ref();

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        debug!(path = %path.display(), "opened mapping database");
        Self::from_connection(conn, busy_timeout)
    }

    /// Private in-memory database, mostly for tests.
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?, DEFAULT_BUSY_TIMEOUT)
    }

    fn from_connection(conn: Connection, busy_timeout: Duration) -> Result<Self> {
        Self::configure_pragmas(&conn, busy_timeout)?;
        let schema_version = migrations::run_migrations(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
            schema_version,
            busy_timeout,
        })
    }

    /// Current schema version after migrations.
    #[must_use]
    pub const fn schema_version(&self) -> u32 {
        self.schema_version
    }

    #[must_use]
    pub const fn busy_timeout(&self) -> Duration {
        self.busy_timeout
    }

    /// Run `PRAGMA integrity_check`.
    pub fn integrity_check(&self) -> Result<bool> {
        let uow = self.begin()?;
        let result: String = uow
            .conn()
            .query_row("PRAGMA integrity_check;", [], |row| row.get(0))?;
        uow.commit()?;
        Ok(result == "ok")
    }

    fn configure_pragmas(conn: &Connection, busy_timeout: Duration) -> Result<()> {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA temp_store = MEMORY;
             PRAGMA foreign_keys = ON;",
        )?;
        conn.busy_timeout(busy_timeout)?;
        Ok(())
    }
}
