//! Test-sample mapping entity.
//!
//! A mapping ties one physical draw (sample id + sample number) to one test of
//! one order. Lifecycle flags record rejection and owed recollection; soft
//! deletion is carried as an explicit [`DeletionState`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Surrogate row identity.
pub type MappingId = i64;

/// Identity of the user or automated process performing a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorId(pub u32);

impl std::fmt::Display for ActorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Whether a row is live or has been withdrawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DeletionState {
    #[default]
    Active,
    Deleted { at: DateTime<Utc>, by: ActorId },
}

impl DeletionState {
    #[must_use]
    pub const fn is_deleted(&self) -> bool {
        matches!(self, Self::Deleted { .. })
    }

    /// Split into the nullable column pair used by storage.
    #[must_use]
    pub const fn as_columns(&self) -> (Option<DateTime<Utc>>, Option<ActorId>) {
        match *self {
            Self::Active => (None, None),
            Self::Deleted { at, by } => (Some(at), Some(by)),
        }
    }

    /// Rebuild from the nullable column pair. A timestamp without an actor is
    /// still a deletion; it is attributed to actor 0.
    #[must_use]
    pub fn from_columns(at: Option<DateTime<Utc>>, by: Option<ActorId>) -> Self {
        match at {
            None => Self::Active,
            Some(at) => Self::Deleted {
                at,
                by: by.unwrap_or(ActorId(0)),
            },
        }
    }
}

/// The stored record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestSampleMapping {
    pub id: MappingId,
    pub oms_order_id: String,
    pub oms_test_id: String,
    pub sample_id: i64,
    pub sample_number: u32,
    pub vial_type_id: i64,
    pub oms_city_code: String,
    pub is_rejected: bool,
    pub recollection_pending: bool,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub created_by: ActorId,
    pub updated_at: DateTime<Utc>,
    pub updated_by: ActorId,
    pub deletion: DeletionState,
}

impl TestSampleMapping {
    #[must_use]
    pub const fn is_active(&self) -> bool {
        !self.deletion.is_deleted()
    }

    /// The draw slot this mapping occupies.
    #[must_use]
    pub fn key(&self) -> MappingKey {
        MappingKey::new(&self.oms_order_id, &self.oms_test_id, self.sample_number)
    }
}

/// `(order, test, sample_number)`: identifies at most one active mapping.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MappingKey {
    pub oms_order_id: String,
    pub oms_test_id: String,
    pub sample_number: u32,
}

impl MappingKey {
    pub fn new(order_id: impl Into<String>, test_id: impl Into<String>, sample_number: u32) -> Self {
        Self {
            oms_order_id: order_id.into(),
            oms_test_id: test_id.into(),
            sample_number,
        }
    }
}

impl std::fmt::Display for MappingKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.oms_order_id, self.oms_test_id, self.sample_number
        )
    }
}

/// Insert payload: a draw being assigned to a test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMapping {
    pub oms_order_id: String,
    pub oms_test_id: String,
    pub sample_id: i64,
    pub sample_number: u32,
    pub vial_type_id: i64,
    pub oms_city_code: String,
}

impl NewMapping {
    #[must_use]
    pub fn key(&self) -> MappingKey {
        MappingKey::new(&self.oms_order_id, &self.oms_test_id, self.sample_number)
    }
}

/// Partial update. `None` leaves a column untouched; linkage keys are not
/// patchable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingPatch {
    pub is_rejected: Option<bool>,
    pub recollection_pending: Option<bool>,
    /// `Some(None)` clears the reason.
    pub rejection_reason: Option<Option<String>>,
    pub vial_type_id: Option<i64>,
    pub oms_city_code: Option<String>,
}

impl MappingPatch {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.is_rejected.is_none()
            && self.recollection_pending.is_none()
            && self.rejection_reason.is_none()
            && self.vial_type_id.is_none()
            && self.oms_city_code.is_none()
    }

    #[must_use]
    pub fn clear_recollection() -> Self {
        Self {
            recollection_pending: Some(false),
            ..Self::default()
        }
    }
}
