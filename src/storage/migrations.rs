//! Database migrations

use rusqlite::Connection;
use tracing::debug;

use crate::error::{Result, TsmError};

const MIGRATIONS: [&str; 2] = [
    include_str!("../../migrations/001_create_test_sample_mapping.sql"),
    include_str!("../../migrations/002_add_active_mapping_indexes.sql"),
];

#[allow(clippy::cast_possible_truncation)]
pub const SCHEMA_VERSION: u32 = MIGRATIONS.len() as u32;

/// Run all pending migrations, returning the resulting schema version.
pub fn run_migrations(conn: &Connection) -> Result<u32> {
    let current_version: u32 = conn
        .query_row("PRAGMA user_version;", [], |row| row.get(0))
        .map_err(|err| TsmError::StorageFailure(format!("read user_version: {err}")))?;

    for (idx, sql) in MIGRATIONS.iter().enumerate() {
        #[allow(clippy::cast_possible_truncation)]
        let target_version = (idx + 1) as u32;
        if current_version >= target_version {
            continue;
        }

        debug!(target_version, "applying migration");
        conn.execute_batch(sql).map_err(|err| {
            TsmError::StorageFailure(format!("migration {target_version} failed: {err}"))
        })?;
        conn.pragma_update(None, "user_version", target_version)
            .map_err(|err| {
                TsmError::StorageFailure(format!(
                    "failed to set user_version {target_version}: {err}"
                ))
            })?;
    }

    Ok(SCHEMA_VERSION)
}
