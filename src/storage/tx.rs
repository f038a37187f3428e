//! Explicit units of work over the mapping database.
//!
//! Every store operation takes a `&UnitOfWork`. A unit of work owns the
//! connection lock for its lifetime and wraps one `BEGIN IMMEDIATE`
//! transaction, so a read-then-write decision made inside it cannot interleave
//! with another writer. Dropping an uncommitted unit of work rolls it back.

use parking_lot::MutexGuard;
use rusqlite::Connection;
use tracing::{debug, warn};

use crate::error::{Result, TsmError};

use super::sqlite::Database;

// =============================================================================
// UNIT OF WORK
// =============================================================================

/// One open transaction plus exclusive use of the connection.
pub struct UnitOfWork<'a> {
    conn: MutexGuard<'a, Connection>,
    finished: bool,
}

impl std::fmt::Debug for UnitOfWork<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnitOfWork")
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

impl UnitOfWork<'_> {
    /// Connection bound to this transaction.
    #[must_use]
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    pub fn commit(mut self) -> Result<()> {
        self.conn.execute_batch("COMMIT")?;
        self.finished = true;
        debug!("unit of work committed");
        Ok(())
    }

    pub fn rollback(mut self) -> Result<()> {
        self.finished = true;
        self.conn.execute_batch("ROLLBACK")?;
        debug!("unit of work rolled back");
        Ok(())
    }

    /// Run `f` inside a named savepoint. On error the savepoint is rolled
    /// back before the error is returned, so none of `f`'s writes survive
    /// even if the enclosing unit of work is later committed.
    pub fn savepoint<T>(&self, name: &str, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        self.conn.execute_batch(&format!("SAVEPOINT {name}"))?;
        match f(&self.conn) {
            Ok(value) => {
                self.conn.execute_batch(&format!("RELEASE {name}"))?;
                Ok(value)
            }
            Err(err) => {
                debug!(savepoint = name, error = %err, "rolling back savepoint");
                if let Err(rollback_err) = self
                    .conn
                    .execute_batch(&format!("ROLLBACK TO {name}; RELEASE {name}"))
                {
                    warn!(savepoint = name, error = %rollback_err, "savepoint rollback failed");
                }
                Err(err)
            }
        }
    }
}

impl Drop for UnitOfWork<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        if let Err(err) = self.conn.execute_batch("ROLLBACK") {
            warn!(error = %err, "rollback of abandoned unit of work failed");
        } else {
            debug!("abandoned unit of work rolled back");
        }
    }
}

// =============================================================================
// DATABASE ENTRY POINTS
// =============================================================================

impl Database {
    /// Open a unit of work.
    ///
    /// Waits up to the configured busy timeout for the connection; the
    /// engine-level write lock is then taken with `BEGIN IMMEDIATE`, which
    /// honours the same timeout through SQLite's busy handler.
    pub fn begin(&self) -> Result<UnitOfWork<'_>> {
        let conn = self.conn.try_lock_for(self.busy_timeout).ok_or_else(|| {
            TsmError::StorageFailure(format!(
                "database busy: connection not available after {:?}",
                self.busy_timeout
            ))
        })?;
        conn.execute_batch("BEGIN IMMEDIATE")?;
        Ok(UnitOfWork {
            conn,
            finished: false,
        })
    }

    /// Run `f` in a fresh unit of work: commit on `Ok`, roll back on `Err`.
    pub fn in_transaction<T>(&self, f: impl FnOnce(&UnitOfWork<'_>) -> Result<T>) -> Result<T> {
        let uow = self.begin()?;
        match f(&uow) {
            Ok(value) => {
                uow.commit()?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = uow.rollback() {
                    warn!(error = %rollback_err, "rollback after failed unit of work failed");
                }
                Err(err)
            }
        }
    }
}
