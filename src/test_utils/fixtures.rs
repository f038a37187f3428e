use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use tempfile::TempDir;

use crate::core::{ActorId, FixedClock, NewMapping, TestSampleMapping};
use crate::lifecycle::MappingLifecycleService;
use crate::storage::{Database, SqliteMappingStore};

/// Instant every fixture clock starts at.
#[must_use]
pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 15, 8, 0, 0)
        .single()
        .unwrap_or_default()
}

/// File-backed database in a temp directory with a manually driven clock.
pub struct TestDb {
    pub temp_dir: TempDir,
    pub db_path: PathBuf,
    pub db: Arc<Database>,
    pub clock: Arc<FixedClock>,
}

impl TestDb {
    /// # Panics
    ///
    /// Panics when the temp directory or database cannot be created.
    #[must_use]
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("tsm.db");
        let db = Arc::new(Database::open(&db_path).expect("Failed to open test database"));
        let clock = Arc::new(FixedClock::new(epoch()));
        Self {
            temp_dir,
            db_path,
            db,
            clock,
        }
    }

    #[must_use]
    pub fn store(&self) -> SqliteMappingStore {
        SqliteMappingStore::new(self.clock.clone())
    }

    #[must_use]
    pub fn service(&self) -> MappingLifecycleService {
        MappingLifecycleService::new(self.db.clone(), self.clock.clone())
    }

    /// Second handle on the same file, as another process would open it.
    ///
    /// # Panics
    ///
    /// Panics when the database cannot be reopened.
    #[must_use]
    pub fn reopen(&self) -> Database {
        Database::open(&self.db_path).expect("Failed to reopen test database")
    }

    /// Insert mappings in one committed unit of work.
    ///
    /// # Panics
    ///
    /// Panics when any insert fails.
    pub fn seed(&self, new: &[NewMapping], actor: ActorId) -> Vec<TestSampleMapping> {
        let service = self.service();
        service
            .in_transaction(|uow| service.create_bulk(uow, new, actor))
            .expect("Failed to seed mappings")
    }
}

impl Default for TestDb {
    fn default() -> Self {
        Self::new()
    }
}

/// A draw of `order`/`test` on physical sample `sample_id`.
#[must_use]
pub fn draw(order: &str, test: &str, sample_id: i64, sample_number: u32) -> NewMapping {
    NewMapping {
        oms_order_id: order.to_string(),
        oms_test_id: test.to_string(),
        sample_id,
        sample_number,
        vial_type_id: 3,
        oms_city_code: "PUN".to_string(),
    }
}

#[must_use]
pub fn ids(values: &[&str]) -> Vec<String> {
    values.iter().map(ToString::to_string).collect()
}
