//! Lifecycle state of a single mapping, derived from its stored flags.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::core::{ActorId, DeletionState, TestSampleMapping};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum MappingState {
    /// Draw in use, nothing owed.
    Active,
    /// Rejected; a replacement draw is owed.
    RecollectionPending { reason: Option<String> },
    /// Rejected and the replacement has been accounted for.
    Resolved { reason: Option<String> },
    /// A recollection is owed but no rejection was recorded. Only reachable
    /// through administrative patches.
    Unreconciled,
    Deleted { at: DateTime<Utc>, by: ActorId },
}

impl MappingState {
    #[must_use]
    pub fn of(mapping: &TestSampleMapping) -> Self {
        if let DeletionState::Deleted { at, by } = mapping.deletion {
            return Self::Deleted { at, by };
        }
        match (mapping.is_rejected, mapping.recollection_pending) {
            (true, true) => Self::RecollectionPending {
                reason: mapping.rejection_reason.clone(),
            },
            (true, false) => Self::Resolved {
                reason: mapping.rejection_reason.clone(),
            },
            (false, true) => Self::Unreconciled,
            (false, false) => Self::Active,
        }
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::RecollectionPending { .. } => "recollection_pending",
            Self::Resolved { .. } => "resolved",
            Self::Unreconciled => "unreconciled",
            Self::Deleted { .. } => "deleted",
        }
    }

    /// Whether a draw-level rejection may still be applied.
    #[must_use]
    pub const fn accepts_rejection(&self) -> bool {
        matches!(
            self,
            Self::Active | Self::RecollectionPending { .. } | Self::Unreconciled
        )
    }
}

impl std::fmt::Display for MappingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
