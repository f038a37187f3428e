//! Mapping lifecycle service.
//!
//! Decides the next state of mappings (rejection, recollection resolution,
//! withdrawal) and commits it through a [`MappingStore`]. Every operation
//! joins the caller's [`UnitOfWork`]; `begin`/`in_transaction` open one for
//! single-call use.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::core::{
    ActorId, Clock, MappingId, MappingKey, MappingPatch, NewMapping, TestSampleMapping,
    TestSampleMappingInfo, to_infos,
};
use crate::error::{Result, TsmError};
use crate::storage::{Database, MappingStore, MutationOutcome, Scope, SqliteMappingStore, UnitOfWork};

use super::state::MappingState;

/// What `resolve_recollection` did to each mapping of the order/test.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolutionReport {
    /// Recollection flag cleared in this call.
    pub cleared: Vec<MappingId>,
    pub already_resolved: Vec<MappingId>,
    /// Never rejected (includes unreconciled rows).
    pub skipped_unrejected: Vec<MappingId>,
    pub skipped_deleted: Vec<MappingId>,
}

impl ResolutionReport {
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.cleared.is_empty()
    }
}

pub struct MappingLifecycleService<S: MappingStore = SqliteMappingStore> {
    db: Arc<Database>,
    store: S,
}

impl<S: MappingStore> std::fmt::Debug for MappingLifecycleService<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MappingLifecycleService")
            .field("db", &self.db)
            .finish_non_exhaustive()
    }
}

impl MappingLifecycleService<SqliteMappingStore> {
    /// Service over the SQLite store, stamping with `clock`.
    #[must_use]
    pub fn new(db: Arc<Database>, clock: Arc<dyn Clock>) -> Self {
        Self::with_store(db, SqliteMappingStore::new(clock))
    }
}

impl<S: MappingStore> MappingLifecycleService<S> {
    pub const fn with_store(db: Arc<Database>, store: S) -> Self {
        Self { db, store }
    }

    pub const fn store(&self) -> &S {
        &self.store
    }

    #[must_use]
    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn begin(&self) -> Result<UnitOfWork<'_>> {
        self.db.begin()
    }

    pub fn in_transaction<T>(&self, f: impl FnOnce(&UnitOfWork<'_>) -> Result<T>) -> Result<T> {
        self.db.in_transaction(f)
    }

    // =========================================================================
    // Rejection and recollection
    // =========================================================================

    /// Reject the draw occupying `key`: the mapping becomes rejected with a
    /// recollection owed, and `reason` replaces any earlier reason.
    ///
    /// Fails `NotFound` when no active mapping holds the slot and
    /// `InvalidTransition` when the mapping was already resolved; a resolved
    /// draw is rejected again only through a new mapping row.
    pub fn reject_draw(
        &self,
        uow: &UnitOfWork<'_>,
        key: &MappingKey,
        reason: &str,
        actor: ActorId,
    ) -> Result<TestSampleMapping> {
        let reason = require_reason(reason)?;
        let mut mapping = self.store.get_by_key(uow, key)?;
        let state = MappingState::of(&mapping);
        if !state.accepts_rejection() {
            return Err(TsmError::InvalidTransition {
                id: mapping.id,
                state: state.name().to_string(),
                action: "reject".to_string(),
            });
        }
        if let MappingState::RecollectionPending {
            reason: Some(previous),
        } = &state
        {
            debug!(id = mapping.id, previous = %previous, "overwriting rejection reason");
        }

        mapping.is_rejected = true;
        mapping.recollection_pending = true;
        mapping.rejection_reason = Some(reason.to_string());
        let updated = self.store.update(uow, &mapping, actor)?;
        info!(id = updated.id, %key, from = %state, %actor, "draw rejected");
        Ok(updated)
    }

    /// Reject every active, unresolved mapping served by a physical sample.
    pub fn reject_sample(
        &self,
        uow: &UnitOfWork<'_>,
        sample_id: i64,
        reason: Option<&str>,
        actor: ActorId,
    ) -> Result<MutationOutcome> {
        let reason = reason.map(require_reason).transpose()?;
        let outcome = self.store.reject_by_sample_id(uow, sample_id, reason, actor)?;
        info!(sample_id, rows = outcome.rows(), %actor, "sample rejected");
        Ok(outcome)
    }

    /// Clear the owed recollection on every rejected mapping of an order's
    /// test, soft-deleted history included in the inspection.
    ///
    /// Only active mappings that are rejected with a recollection pending are
    /// written, so calling this twice leaves the same state as calling it
    /// once. The writes go through one bulk update; a failure on any row
    /// leaves none of them applied.
    pub fn resolve_recollection(
        &self,
        uow: &UnitOfWork<'_>,
        order_id: &str,
        test_id: &str,
        actor: ActorId,
    ) -> Result<ResolutionReport> {
        let history =
            self.store
                .get_by_order_and_tests(uow, order_id, &[test_id.to_string()], Scope::All)?;

        let mut report = ResolutionReport::default();
        let mut to_clear = Vec::new();
        for mut mapping in history {
            match MappingState::of(&mapping) {
                MappingState::RecollectionPending { .. } => {
                    mapping.recollection_pending = false;
                    to_clear.push(mapping);
                }
                MappingState::Resolved { .. } => report.already_resolved.push(mapping.id),
                MappingState::Active => report.skipped_unrejected.push(mapping.id),
                MappingState::Unreconciled => {
                    warn!(
                        id = mapping.id,
                        order_id, test_id, "recollection pending without rejection; left as is"
                    );
                    report.skipped_unrejected.push(mapping.id);
                }
                MappingState::Deleted { .. } => report.skipped_deleted.push(mapping.id),
            }
        }

        let cleared = self.store.update_bulk(uow, &to_clear, actor)?;
        report.cleared = cleared.iter().map(|mapping| mapping.id).collect();
        info!(
            order_id,
            test_id,
            cleared = report.cleared.len(),
            already_resolved = report.already_resolved.len(),
            %actor,
            "recollection resolved"
        );
        Ok(report)
    }

    /// Drop owed recollections for these tests regardless of rejection state.
    pub fn clear_recollection_for_tests(
        &self,
        uow: &UnitOfWork<'_>,
        test_ids: &[String],
        actor: ActorId,
    ) -> Result<MutationOutcome> {
        let outcome = self.store.clear_recollection_for_tests(uow, test_ids, actor)?;
        info!(tests = test_ids.len(), rows = outcome.rows(), %actor, "recollection cleared");
        Ok(outcome)
    }

    // =========================================================================
    // Checks
    // =========================================================================

    /// True when no other active test sharing the order's sample number is
    /// still unrejected, including the case where there is no other test.
    pub fn all_other_tests_rejected(&self, uow: &UnitOfWork<'_>, key: &MappingKey) -> Result<bool> {
        self.store.all_other_tests_rejected(uow, key)
    }

    pub fn any_recollection_pending(
        &self,
        uow: &UnitOfWork<'_>,
        order_ids: &[String],
        test_ids: &[String],
    ) -> Result<bool> {
        self.store.any_recollection_pending(uow, order_ids, test_ids)
    }

    pub fn any_recollection_pending_for_order(
        &self,
        uow: &UnitOfWork<'_>,
        order_id: &str,
    ) -> Result<bool> {
        self.store.any_recollection_pending_for_order(uow, order_id)
    }

    // =========================================================================
    // Withdrawal
    // =========================================================================

    pub fn delete_by_key(
        &self,
        uow: &UnitOfWork<'_>,
        key: &MappingKey,
        actor: ActorId,
    ) -> Result<MutationOutcome> {
        let outcome = self.store.soft_delete_by_key(uow, key, actor)?;
        info!(%key, rows = outcome.rows(), %actor, "mapping withdrawn");
        Ok(outcome)
    }

    pub fn delete_by_test_ids(
        &self,
        uow: &UnitOfWork<'_>,
        test_ids: &[String],
        actor: ActorId,
    ) -> Result<MutationOutcome> {
        if test_ids.is_empty() {
            return Ok(MutationOutcome::NoOp);
        }
        let outcome = self.store.soft_delete_by_test_ids(uow, test_ids, actor)?;
        info!(tests = test_ids.len(), rows = outcome.rows(), %actor, "mappings withdrawn by test");
        Ok(outcome)
    }

    pub fn delete_by_ids(
        &self,
        uow: &UnitOfWork<'_>,
        ids: &[MappingId],
        actor: ActorId,
    ) -> Result<MutationOutcome> {
        if ids.is_empty() {
            return Ok(MutationOutcome::NoOp);
        }
        let outcome = self.store.soft_delete_by_ids(uow, ids, actor)?;
        info!(ids = ids.len(), rows = outcome.rows(), %actor, "mappings withdrawn by id");
        Ok(outcome)
    }

    /// Withdraw an explicit set of previously read mappings.
    pub fn delete_mappings(
        &self,
        uow: &UnitOfWork<'_>,
        mappings: &[TestSampleMapping],
        actor: ActorId,
    ) -> Result<MutationOutcome> {
        let ids: Vec<MappingId> = mappings.iter().map(|mapping| mapping.id).collect();
        self.delete_by_ids(uow, &ids, actor)
    }

    // =========================================================================
    // Creation and administrative writes
    // =========================================================================

    pub fn create(
        &self,
        uow: &UnitOfWork<'_>,
        new: &NewMapping,
        actor: ActorId,
    ) -> Result<TestSampleMapping> {
        validate_new(new)?;
        self.store.create(uow, new, actor)
    }

    pub fn create_bulk(
        &self,
        uow: &UnitOfWork<'_>,
        new: &[NewMapping],
        actor: ActorId,
    ) -> Result<Vec<TestSampleMapping>> {
        new.iter().try_for_each(validate_new)?;
        let created = self.store.create_bulk(uow, new, actor)?;
        debug!(rows = created.len(), "mappings created");
        Ok(created)
    }

    pub fn update_bulk(
        &self,
        uow: &UnitOfWork<'_>,
        mappings: &[TestSampleMapping],
        actor: ActorId,
    ) -> Result<Vec<TestSampleMapping>> {
        self.store.update_bulk(uow, mappings, actor)
    }

    pub fn patch(
        &self,
        uow: &UnitOfWork<'_>,
        id: MappingId,
        patch: &MappingPatch,
        actor: ActorId,
    ) -> Result<TestSampleMapping> {
        self.store.patch(uow, id, patch, actor)
    }

    pub fn patch_bulk(
        &self,
        uow: &UnitOfWork<'_>,
        ids: &[MappingId],
        patch: &MappingPatch,
        actor: ActorId,
    ) -> Result<MutationOutcome> {
        self.store.patch_bulk(uow, ids, patch, actor)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Active mappings of an order; empty is not an error here.
    pub fn list_for_order(
        &self,
        uow: &UnitOfWork<'_>,
        order_id: &str,
    ) -> Result<Vec<TestSampleMapping>> {
        self.store.list_by_order(uow, order_id)
    }

    pub fn mappings_for_order(
        &self,
        uow: &UnitOfWork<'_>,
        order_id: &str,
    ) -> Result<Vec<TestSampleMapping>> {
        self.store.get_by_order(uow, order_id)
    }

    pub fn mappings_for_orders(
        &self,
        uow: &UnitOfWork<'_>,
        order_ids: &[String],
    ) -> Result<Vec<TestSampleMapping>> {
        self.store.get_by_orders(uow, order_ids)
    }

    pub fn mappings_for_tests(
        &self,
        uow: &UnitOfWork<'_>,
        test_ids: &[String],
    ) -> Result<Vec<TestSampleMapping>> {
        self.store.get_by_test_ids(uow, test_ids)
    }

    pub fn mappings_for_order_and_tests(
        &self,
        uow: &UnitOfWork<'_>,
        order_id: &str,
        test_ids: &[String],
        scope: Scope,
    ) -> Result<Vec<TestSampleMapping>> {
        self.store.get_by_order_and_tests(uow, order_id, test_ids, scope)
    }

    pub fn mapping_by_key(&self, uow: &UnitOfWork<'_>, key: &MappingKey) -> Result<TestSampleMapping> {
        self.store.get_by_key(uow, key)
    }

    pub fn mapping_by_id(
        &self,
        uow: &UnitOfWork<'_>,
        id: MappingId,
        scope: Scope,
    ) -> Result<TestSampleMapping> {
        self.store.get_by_id(uow, id, scope)
    }

    pub fn infos_for_order(
        &self,
        uow: &UnitOfWork<'_>,
        order_id: &str,
    ) -> Result<Vec<TestSampleMappingInfo>> {
        Ok(to_infos(&self.store.get_by_order(uow, order_id)?))
    }

    pub fn infos_for_orders(
        &self,
        uow: &UnitOfWork<'_>,
        order_ids: &[String],
    ) -> Result<Vec<TestSampleMappingInfo>> {
        Ok(to_infos(&self.store.get_by_orders(uow, order_ids)?))
    }
}

fn require_reason(reason: &str) -> Result<&str> {
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(TsmError::Validation(
            "rejection reason must not be empty".to_string(),
        ));
    }
    Ok(reason)
}

fn validate_new(new: &NewMapping) -> Result<()> {
    if new.oms_order_id.trim().is_empty() || new.oms_test_id.trim().is_empty() {
        return Err(TsmError::Validation(format!(
            "mapping {} needs both an order id and a test id",
            new.key()
        )));
    }
    if new.sample_number == 0 {
        return Err(TsmError::Validation(format!(
            "mapping {}: sample numbers start at 1",
            new.key()
        )));
    }
    Ok(())
}
