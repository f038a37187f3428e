//! Mapping store: the only code issuing reads and writes against
//! `test_sample_mapping`.
//!
//! Reads come in two flavours. The `get_*` lookups treat an empty result as
//! [`TsmError::NotFound`]; `list_by_order` and the boolean checks treat "no
//! rows" as a valid answer. Writes stamp `updated_at` from the store's
//! [`Clock`] and `updated_by` from the actor passed in. Soft deletes write
//! only the deletion pair.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rusqlite::types::{Type, Value};
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};
use serde::Serialize;
use tracing::debug;

use crate::core::{
    ActorId, Clock, DeletionState, MappingId, MappingKey, MappingPatch, NewMapping, SystemClock,
    TestSampleMapping,
};
use crate::error::{Result, TsmError};

use super::tx::UnitOfWork;

/// Subquery matching the members of one [`json_list`] parameter.
const IN_LIST: &str = "SELECT value FROM json_each(?)";

const COLUMNS: &str = "id, oms_order_id, oms_test_id, sample_id, sample_number, vial_type_id, \
     oms_city_code, is_rejected, recollection_pending, rejection_reason, created_at, created_by, \
     updated_at, updated_by, deleted_at, deleted_by";

// =============================================================================
// QUERY VOCABULARY
// =============================================================================

/// Whether a read sees soft-deleted rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scope {
    #[default]
    Active,
    /// Include soft-deleted rows (history/audit reads).
    All,
}

impl Scope {
    const fn filter(self) -> &'static str {
        match self {
            Self::Active => " AND deleted_at IS NULL",
            Self::All => "",
        }
    }
}

/// Result of a mutation that may legitimately touch nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum MutationOutcome {
    Applied { rows: usize },
    NoOp,
}

impl MutationOutcome {
    #[must_use]
    pub const fn from_rows(rows: usize) -> Self {
        if rows == 0 {
            Self::NoOp
        } else {
            Self::Applied { rows }
        }
    }

    #[must_use]
    pub const fn rows(self) -> usize {
        match self {
            Self::Applied { rows } => rows,
            Self::NoOp => 0,
        }
    }

    #[must_use]
    pub const fn is_noop(self) -> bool {
        matches!(self, Self::NoOp)
    }
}

// =============================================================================
// STORE INTERFACE
// =============================================================================

/// Physical access to mapping rows. Every operation joins the caller's unit
/// of work.
pub trait MappingStore: Send + Sync {
    /// Active mappings of an order; empty is a valid answer.
    fn list_by_order(&self, uow: &UnitOfWork<'_>, order_id: &str)
    -> Result<Vec<TestSampleMapping>>;

    fn get_by_order(&self, uow: &UnitOfWork<'_>, order_id: &str) -> Result<Vec<TestSampleMapping>>;

    fn get_by_orders(
        &self,
        uow: &UnitOfWork<'_>,
        order_ids: &[String],
    ) -> Result<Vec<TestSampleMapping>>;

    fn get_by_test_ids(
        &self,
        uow: &UnitOfWork<'_>,
        test_ids: &[String],
    ) -> Result<Vec<TestSampleMapping>>;

    fn get_by_order_and_tests(
        &self,
        uow: &UnitOfWork<'_>,
        order_id: &str,
        test_ids: &[String],
        scope: Scope,
    ) -> Result<Vec<TestSampleMapping>>;

    /// The active mapping occupying a draw slot.
    fn get_by_key(&self, uow: &UnitOfWork<'_>, key: &MappingKey) -> Result<TestSampleMapping>;

    fn get_by_id(
        &self,
        uow: &UnitOfWork<'_>,
        id: MappingId,
        scope: Scope,
    ) -> Result<TestSampleMapping>;

    /// Any active row for these orders and tests still owes a recollection.
    fn any_recollection_pending(
        &self,
        uow: &UnitOfWork<'_>,
        order_ids: &[String],
        test_ids: &[String],
    ) -> Result<bool>;

    fn any_recollection_pending_for_order(
        &self,
        uow: &UnitOfWork<'_>,
        order_id: &str,
    ) -> Result<bool>;

    /// No other active test on this order's sample number is still unrejected.
    fn all_other_tests_rejected(&self, uow: &UnitOfWork<'_>, key: &MappingKey) -> Result<bool>;

    fn create(
        &self,
        uow: &UnitOfWork<'_>,
        new: &NewMapping,
        actor: ActorId,
    ) -> Result<TestSampleMapping>;

    fn create_bulk(
        &self,
        uow: &UnitOfWork<'_>,
        new: &[NewMapping],
        actor: ActorId,
    ) -> Result<Vec<TestSampleMapping>>;

    /// Full-row replace of the mutable columns. Linkage keys must match.
    fn update(
        &self,
        uow: &UnitOfWork<'_>,
        mapping: &TestSampleMapping,
        actor: ActorId,
    ) -> Result<TestSampleMapping>;

    fn update_bulk(
        &self,
        uow: &UnitOfWork<'_>,
        mappings: &[TestSampleMapping],
        actor: ActorId,
    ) -> Result<Vec<TestSampleMapping>>;

    fn patch(
        &self,
        uow: &UnitOfWork<'_>,
        id: MappingId,
        patch: &MappingPatch,
        actor: ActorId,
    ) -> Result<TestSampleMapping>;

    fn patch_bulk(
        &self,
        uow: &UnitOfWork<'_>,
        ids: &[MappingId],
        patch: &MappingPatch,
        actor: ActorId,
    ) -> Result<MutationOutcome>;

    /// Clear `recollection_pending` on active rows of these tests that still
    /// have it set.
    fn clear_recollection_for_tests(
        &self,
        uow: &UnitOfWork<'_>,
        test_ids: &[String],
        actor: ActorId,
    ) -> Result<MutationOutcome>;

    /// Flag every active, unresolved mapping of a physical sample as rejected
    /// with a recollection owed. `None` keeps any recorded reason.
    fn reject_by_sample_id(
        &self,
        uow: &UnitOfWork<'_>,
        sample_id: i64,
        reason: Option<&str>,
        actor: ActorId,
    ) -> Result<MutationOutcome>;

    fn soft_delete_by_key(
        &self,
        uow: &UnitOfWork<'_>,
        key: &MappingKey,
        actor: ActorId,
    ) -> Result<MutationOutcome>;

    fn soft_delete_by_test_ids(
        &self,
        uow: &UnitOfWork<'_>,
        test_ids: &[String],
        actor: ActorId,
    ) -> Result<MutationOutcome>;

    fn soft_delete_by_ids(
        &self,
        uow: &UnitOfWork<'_>,
        ids: &[MappingId],
        actor: ActorId,
    ) -> Result<MutationOutcome>;
}

// =============================================================================
// SQLITE IMPLEMENTATION
// =============================================================================

/// [`MappingStore`] over the SQLite schema in `migrations/`.
#[derive(Clone)]
pub struct SqliteMappingStore {
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for SqliteMappingStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteMappingStore").finish_non_exhaustive()
    }
}

impl Default for SqliteMappingStore {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl SqliteMappingStore {
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Stored timestamps carry microseconds; stamp at the same precision so
    /// returned records equal what a later read sees.
    fn now(&self) -> DateTime<Utc> {
        self.clock.now().trunc_subsecs(6)
    }
}

impl MappingStore for SqliteMappingStore {
    fn list_by_order(
        &self,
        uow: &UnitOfWork<'_>,
        order_id: &str,
    ) -> Result<Vec<TestSampleMapping>> {
        debug!(order_id, "listing mappings by order");
        query_mappings(
            uow.conn(),
            &format!(
                "SELECT {COLUMNS} FROM test_sample_mapping \
                 WHERE oms_order_id = ? AND deleted_at IS NULL ORDER BY id"
            ),
            vec![Value::Text(order_id.to_string())],
        )
    }

    fn get_by_order(&self, uow: &UnitOfWork<'_>, order_id: &str) -> Result<Vec<TestSampleMapping>> {
        let found = self.list_by_order(uow, order_id)?;
        require_rows(found, || format!("order {order_id}"))
    }

    fn get_by_orders(
        &self,
        uow: &UnitOfWork<'_>,
        order_ids: &[String],
    ) -> Result<Vec<TestSampleMapping>> {
        if order_ids.is_empty() {
            return require_rows(Vec::new(), || "an empty order set".to_string());
        }
        debug!(orders = order_ids.len(), "fetching mappings by orders");
        let found = query_mappings(
            uow.conn(),
            &format!(
                "SELECT {COLUMNS} FROM test_sample_mapping \
                 WHERE oms_order_id IN ({IN_LIST}) AND deleted_at IS NULL ORDER BY id"
            ),
            vec![json_list(order_ids)?],
        )?;
        require_rows(found, || format!("orders {}", order_ids.join(", ")))
    }

    fn get_by_test_ids(
        &self,
        uow: &UnitOfWork<'_>,
        test_ids: &[String],
    ) -> Result<Vec<TestSampleMapping>> {
        if test_ids.is_empty() {
            return require_rows(Vec::new(), || "an empty test set".to_string());
        }
        debug!(tests = test_ids.len(), "fetching mappings by tests");
        let found = query_mappings(
            uow.conn(),
            &format!(
                "SELECT {COLUMNS} FROM test_sample_mapping \
                 WHERE oms_test_id IN ({IN_LIST}) AND deleted_at IS NULL ORDER BY id"
            ),
            vec![json_list(test_ids)?],
        )?;
        require_rows(found, || format!("tests {}", test_ids.join(", ")))
    }

    fn get_by_order_and_tests(
        &self,
        uow: &UnitOfWork<'_>,
        order_id: &str,
        test_ids: &[String],
        scope: Scope,
    ) -> Result<Vec<TestSampleMapping>> {
        let describe = || format!("order {order_id}, tests {}", test_ids.join(", "));
        if test_ids.is_empty() {
            return require_rows(Vec::new(), describe);
        }
        debug!(order_id, tests = test_ids.len(), ?scope, "fetching mappings by order and tests");
        let values = vec![Value::Text(order_id.to_string()), json_list(test_ids)?];
        let found = query_mappings(
            uow.conn(),
            &format!(
                "SELECT {COLUMNS} FROM test_sample_mapping \
                 WHERE oms_order_id = ? AND oms_test_id IN ({IN_LIST}){} ORDER BY id",
                scope.filter()
            ),
            values,
        )?;
        require_rows(found, describe)
    }

    fn get_by_key(&self, uow: &UnitOfWork<'_>, key: &MappingKey) -> Result<TestSampleMapping> {
        debug!(%key, "fetching mapping by key");
        uow.conn()
            .query_row(
                &format!(
                    "SELECT {COLUMNS} FROM test_sample_mapping \
                     WHERE oms_order_id = ? AND oms_test_id = ? AND sample_number = ? \
                     AND deleted_at IS NULL ORDER BY id LIMIT 1"
                ),
                params![key.oms_order_id, key.oms_test_id, key.sample_number],
                mapping_from_row,
            )
            .optional()?
            .ok_or_else(|| TsmError::NotFound(format!("test sample mapping {key} not found")))
    }

    fn get_by_id(
        &self,
        uow: &UnitOfWork<'_>,
        id: MappingId,
        scope: Scope,
    ) -> Result<TestSampleMapping> {
        fetch_by_id(uow.conn(), id, scope)
    }

    fn any_recollection_pending(
        &self,
        uow: &UnitOfWork<'_>,
        order_ids: &[String],
        test_ids: &[String],
    ) -> Result<bool> {
        if order_ids.is_empty() || test_ids.is_empty() {
            return Ok(false);
        }
        let pending = count(
            uow.conn(),
            &format!(
                "SELECT COUNT(*) FROM test_sample_mapping \
                 WHERE oms_order_id IN ({IN_LIST}) AND oms_test_id IN ({IN_LIST}) \
                 AND recollection_pending = 1 AND deleted_at IS NULL"
            ),
            vec![json_list(order_ids)?, json_list(test_ids)?],
        )?;
        debug!(pending, "recollection pending count for orders and tests");
        Ok(pending > 0)
    }

    fn any_recollection_pending_for_order(
        &self,
        uow: &UnitOfWork<'_>,
        order_id: &str,
    ) -> Result<bool> {
        let pending = count(
            uow.conn(),
            "SELECT COUNT(*) FROM test_sample_mapping \
             WHERE oms_order_id = ? AND recollection_pending = 1 AND deleted_at IS NULL",
            vec![Value::Text(order_id.to_string())],
        )?;
        debug!(order_id, pending, "recollection pending count for order");
        Ok(pending > 0)
    }

    fn all_other_tests_rejected(&self, uow: &UnitOfWork<'_>, key: &MappingKey) -> Result<bool> {
        let unrejected = count(
            uow.conn(),
            "SELECT COUNT(*) FROM test_sample_mapping \
             WHERE sample_number = ? AND oms_test_id != ? AND oms_order_id = ? \
             AND deleted_at IS NULL AND is_rejected = 0",
            vec![
                Value::Integer(i64::from(key.sample_number)),
                Value::Text(key.oms_test_id.clone()),
                Value::Text(key.oms_order_id.clone()),
            ],
        )?;
        debug!(%key, unrejected, "other unrejected tests on sample number");
        Ok(unrejected == 0)
    }

    fn create(
        &self,
        uow: &UnitOfWork<'_>,
        new: &NewMapping,
        actor: ActorId,
    ) -> Result<TestSampleMapping> {
        insert_row(uow.conn(), new, actor, self.now())
    }

    fn create_bulk(
        &self,
        uow: &UnitOfWork<'_>,
        new: &[NewMapping],
        actor: ActorId,
    ) -> Result<Vec<TestSampleMapping>> {
        if new.is_empty() {
            return Ok(Vec::new());
        }
        let now = self.now();
        uow.savepoint("tsm_create_bulk", |conn| {
            new.iter()
                .map(|mapping| insert_row(conn, mapping, actor, now))
                .collect()
        })
    }

    fn update(
        &self,
        uow: &UnitOfWork<'_>,
        mapping: &TestSampleMapping,
        actor: ActorId,
    ) -> Result<TestSampleMapping> {
        replace_row(uow.conn(), mapping, actor, self.now())
    }

    fn update_bulk(
        &self,
        uow: &UnitOfWork<'_>,
        mappings: &[TestSampleMapping],
        actor: ActorId,
    ) -> Result<Vec<TestSampleMapping>> {
        if mappings.is_empty() {
            return Ok(Vec::new());
        }
        let now = self.now();
        debug!(rows = mappings.len(), "bulk replacing mappings");
        uow.savepoint("tsm_update_bulk", |conn| {
            mappings
                .iter()
                .map(|mapping| replace_row(conn, mapping, actor, now))
                .collect()
        })
    }

    fn patch(
        &self,
        uow: &UnitOfWork<'_>,
        id: MappingId,
        patch: &MappingPatch,
        actor: ActorId,
    ) -> Result<TestSampleMapping> {
        let conn = uow.conn();
        if patch.is_empty() {
            return fetch_by_id(conn, id, Scope::Active);
        }
        let (assignments, mut values) = patch_assignments(patch, self.now(), actor);
        values.push(Value::Integer(id));
        let changed = conn.execute(
            &format!(
                "UPDATE test_sample_mapping SET {assignments} WHERE id = ? AND deleted_at IS NULL"
            ),
            params_from_iter(values),
        )?;
        if changed == 0 {
            return Err(not_found_id(id));
        }
        debug!(id, "patched mapping");
        fetch_by_id(conn, id, Scope::Active)
    }

    fn patch_bulk(
        &self,
        uow: &UnitOfWork<'_>,
        ids: &[MappingId],
        patch: &MappingPatch,
        actor: ActorId,
    ) -> Result<MutationOutcome> {
        let unique: BTreeSet<MappingId> = ids.iter().copied().collect();
        if unique.is_empty() || patch.is_empty() {
            return Ok(MutationOutcome::NoOp);
        }
        let (assignments, mut values) = patch_assignments(patch, self.now(), actor);
        values.push(json_list(&unique)?);
        let sql = format!(
            "UPDATE test_sample_mapping SET {assignments} \
             WHERE id IN ({IN_LIST}) AND deleted_at IS NULL"
        );
        uow.savepoint("tsm_patch_bulk", |conn| {
            let changed = conn.execute(&sql, params_from_iter(values))?;
            if changed != unique.len() {
                return Err(TsmError::NotFound(format!(
                    "{} of {} test sample mappings are missing or deleted",
                    unique.len() - changed,
                    unique.len()
                )));
            }
            debug!(rows = changed, "bulk patched mappings");
            Ok(MutationOutcome::from_rows(changed))
        })
    }

    fn clear_recollection_for_tests(
        &self,
        uow: &UnitOfWork<'_>,
        test_ids: &[String],
        actor: ActorId,
    ) -> Result<MutationOutcome> {
        if test_ids.is_empty() {
            return Ok(MutationOutcome::NoOp);
        }
        let values = vec![
            Value::Text(format_ts(self.now())),
            actor_value(actor),
            json_list(test_ids)?,
        ];
        let changed = uow.conn().execute(
            &format!(
                "UPDATE test_sample_mapping \
                 SET recollection_pending = 0, updated_at = ?, updated_by = ? \
                 WHERE oms_test_id IN ({IN_LIST}) AND recollection_pending = 1 \
                 AND deleted_at IS NULL"
            ),
            params_from_iter(values),
        )?;
        debug!(tests = test_ids.len(), rows = changed, "cleared recollection flags");
        Ok(MutationOutcome::from_rows(changed))
    }

    fn reject_by_sample_id(
        &self,
        uow: &UnitOfWork<'_>,
        sample_id: i64,
        reason: Option<&str>,
        actor: ActorId,
    ) -> Result<MutationOutcome> {
        let changed = uow.conn().execute(
            "UPDATE test_sample_mapping \
             SET is_rejected = 1, recollection_pending = 1, \
                 rejection_reason = COALESCE(?1, rejection_reason), \
                 updated_at = ?2, updated_by = ?3 \
             WHERE sample_id = ?4 AND deleted_at IS NULL \
             AND NOT (is_rejected = 1 AND recollection_pending = 0)",
            params![reason, format_ts(self.now()), actor.0, sample_id],
        )?;
        debug!(sample_id, rows = changed, "rejected mappings by sample id");
        Ok(MutationOutcome::from_rows(changed))
    }

    fn soft_delete_by_key(
        &self,
        uow: &UnitOfWork<'_>,
        key: &MappingKey,
        actor: ActorId,
    ) -> Result<MutationOutcome> {
        let changed = uow.conn().execute(
            "UPDATE test_sample_mapping SET deleted_at = ?1, deleted_by = ?2 \
             WHERE oms_order_id = ?3 AND oms_test_id = ?4 AND sample_number = ?5 \
             AND deleted_at IS NULL",
            params![
                format_ts(self.now()),
                actor.0,
                key.oms_order_id,
                key.oms_test_id,
                key.sample_number
            ],
        )?;
        debug!(%key, rows = changed, "soft-deleted mapping by key");
        Ok(MutationOutcome::from_rows(changed))
    }

    fn soft_delete_by_test_ids(
        &self,
        uow: &UnitOfWork<'_>,
        test_ids: &[String],
        actor: ActorId,
    ) -> Result<MutationOutcome> {
        if test_ids.is_empty() {
            return Ok(MutationOutcome::NoOp);
        }
        let values = vec![
            Value::Text(format_ts(self.now())),
            actor_value(actor),
            json_list(test_ids)?,
        ];
        let changed = uow.conn().execute(
            &format!(
                "UPDATE test_sample_mapping SET deleted_at = ?, deleted_by = ? \
                 WHERE oms_test_id IN ({IN_LIST}) AND deleted_at IS NULL"
            ),
            params_from_iter(values),
        )?;
        debug!(tests = test_ids.len(), rows = changed, "soft-deleted mappings by tests");
        Ok(MutationOutcome::from_rows(changed))
    }

    fn soft_delete_by_ids(
        &self,
        uow: &UnitOfWork<'_>,
        ids: &[MappingId],
        actor: ActorId,
    ) -> Result<MutationOutcome> {
        if ids.is_empty() {
            return Ok(MutationOutcome::NoOp);
        }
        let values = vec![
            Value::Text(format_ts(self.now())),
            actor_value(actor),
            json_list(ids)?,
        ];
        let changed = uow.conn().execute(
            &format!(
                "UPDATE test_sample_mapping SET deleted_at = ?, deleted_by = ? \
                 WHERE id IN ({IN_LIST}) AND deleted_at IS NULL"
            ),
            params_from_iter(values),
        )?;
        debug!(ids = ids.len(), rows = changed, "soft-deleted mappings by id");
        Ok(MutationOutcome::from_rows(changed))
    }
}

// =============================================================================
// ROW HELPERS
// =============================================================================

#[must_use]
pub fn format_ts(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err)))
}

fn mapping_from_row(row: &Row<'_>) -> rusqlite::Result<TestSampleMapping> {
    let deleted_at = row
        .get::<_, Option<String>>(14)?
        .map(|raw| parse_ts(14, &raw))
        .transpose()?;
    let deleted_by: Option<u32> = row.get(15)?;
    Ok(TestSampleMapping {
        id: row.get(0)?,
        oms_order_id: row.get(1)?,
        oms_test_id: row.get(2)?,
        sample_id: row.get(3)?,
        sample_number: row.get(4)?,
        vial_type_id: row.get(5)?,
        oms_city_code: row.get(6)?,
        is_rejected: row.get(7)?,
        recollection_pending: row.get(8)?,
        rejection_reason: row.get(9)?,
        created_at: parse_ts(10, &row.get::<_, String>(10)?)?,
        created_by: ActorId(row.get(11)?),
        updated_at: parse_ts(12, &row.get::<_, String>(12)?)?,
        updated_by: ActorId(row.get(13)?),
        deletion: DeletionState::from_columns(deleted_at, deleted_by.map(ActorId)),
    })
}

/// Bind a whole set as one JSON array parameter, expanded by `json_each`, so
/// the statement size and variable count stay fixed however long the set is.
fn json_list<T: Serialize + ?Sized>(items: &T) -> Result<Value> {
    Ok(Value::Text(serde_json::to_string(items)?))
}

fn actor_value(actor: ActorId) -> Value {
    Value::Integer(i64::from(actor.0))
}

fn not_found_id(id: MappingId) -> TsmError {
    TsmError::NotFound(format!("test sample mapping {id} not found"))
}

fn require_rows(
    found: Vec<TestSampleMapping>,
    describe: impl FnOnce() -> String,
) -> Result<Vec<TestSampleMapping>> {
    if found.is_empty() {
        return Err(TsmError::NotFound(format!(
            "no test sample mapping found for {}",
            describe()
        )));
    }
    Ok(found)
}

fn query_mappings(conn: &Connection, sql: &str, values: Vec<Value>) -> Result<Vec<TestSampleMapping>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params_from_iter(values), mapping_from_row)?;
    let mut results = Vec::new();
    for row in rows {
        results.push(row?);
    }
    Ok(results)
}

fn count(conn: &Connection, sql: &str, values: Vec<Value>) -> Result<i64> {
    Ok(conn.query_row(sql, params_from_iter(values), |row| row.get(0))?)
}

fn fetch_by_id(conn: &Connection, id: MappingId, scope: Scope) -> Result<TestSampleMapping> {
    conn.query_row(
        &format!(
            "SELECT {COLUMNS} FROM test_sample_mapping WHERE id = ?{}",
            scope.filter()
        ),
        [id],
        mapping_from_row,
    )
    .optional()?
    .ok_or_else(|| not_found_id(id))
}

fn insert_row(
    conn: &Connection,
    new: &NewMapping,
    actor: ActorId,
    now: DateTime<Utc>,
) -> Result<TestSampleMapping> {
    conn.execute(
        "INSERT INTO test_sample_mapping (
            oms_order_id, oms_test_id, sample_id, sample_number, vial_type_id, oms_city_code,
            is_rejected, recollection_pending, rejection_reason,
            created_at, created_by, updated_at, updated_by
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, 0, NULL, ?7, ?8, ?7, ?8)",
        params![
            new.oms_order_id,
            new.oms_test_id,
            new.sample_id,
            new.sample_number,
            new.vial_type_id,
            new.oms_city_code,
            format_ts(now),
            actor.0
        ],
    )?;
    let id = conn.last_insert_rowid();
    debug!(id, key = %new.key(), "created mapping");
    Ok(TestSampleMapping {
        id,
        oms_order_id: new.oms_order_id.clone(),
        oms_test_id: new.oms_test_id.clone(),
        sample_id: new.sample_id,
        sample_number: new.sample_number,
        vial_type_id: new.vial_type_id,
        oms_city_code: new.oms_city_code.clone(),
        is_rejected: false,
        recollection_pending: false,
        rejection_reason: None,
        created_at: now,
        created_by: actor,
        updated_at: now,
        updated_by: actor,
        deletion: DeletionState::Active,
    })
}

fn replace_row(
    conn: &Connection,
    mapping: &TestSampleMapping,
    actor: ActorId,
    now: DateTime<Utc>,
) -> Result<TestSampleMapping> {
    let changed = conn.execute(
        "UPDATE test_sample_mapping
         SET vial_type_id = ?1, oms_city_code = ?2, is_rejected = ?3,
             recollection_pending = ?4, rejection_reason = ?5,
             updated_at = ?6, updated_by = ?7
         WHERE id = ?8 AND oms_order_id = ?9 AND oms_test_id = ?10
           AND sample_id = ?11 AND sample_number = ?12 AND deleted_at IS NULL",
        params![
            mapping.vial_type_id,
            mapping.oms_city_code,
            mapping.is_rejected,
            mapping.recollection_pending,
            mapping.rejection_reason,
            format_ts(now),
            actor.0,
            mapping.id,
            mapping.oms_order_id,
            mapping.oms_test_id,
            mapping.sample_id,
            mapping.sample_number
        ],
    )?;
    if changed == 0 {
        let stored = fetch_by_id(conn, mapping.id, Scope::Active)?;
        return Err(TsmError::ConstraintViolation(format!(
            "linkage keys of mapping {} cannot change (stored {} sample {}, given {} sample {})",
            mapping.id,
            stored.key(),
            stored.sample_id,
            mapping.key(),
            mapping.sample_id
        )));
    }
    debug!(id = mapping.id, "replaced mapping");
    fetch_by_id(conn, mapping.id, Scope::Active)
}

fn patch_assignments(
    patch: &MappingPatch,
    now: DateTime<Utc>,
    actor: ActorId,
) -> (String, Vec<Value>) {
    let mut columns = Vec::new();
    let mut values = Vec::new();
    if let Some(rejected) = patch.is_rejected {
        columns.push("is_rejected = ?");
        values.push(Value::Integer(i64::from(rejected)));
    }
    if let Some(pending) = patch.recollection_pending {
        columns.push("recollection_pending = ?");
        values.push(Value::Integer(i64::from(pending)));
    }
    if let Some(reason) = &patch.rejection_reason {
        columns.push("rejection_reason = ?");
        values.push(reason.clone().map_or(Value::Null, Value::Text));
    }
    if let Some(vial_type_id) = patch.vial_type_id {
        columns.push("vial_type_id = ?");
        values.push(Value::Integer(vial_type_id));
    }
    if let Some(city) = &patch.oms_city_code {
        columns.push("oms_city_code = ?");
        values.push(Value::Text(city.clone()));
    }
    columns.push("updated_at = ?");
    values.push(Value::Text(format_ts(now)));
    columns.push("updated_by = ?");
    values.push(actor_value(actor));
    (columns.join(", "), values)
}
