//! Projection of stored mappings into the shape shared with other services.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::mapping::{ActorId, MappingId, TestSampleMapping};

/// Externally shared mapping shape (camelCase on the wire, soft-delete as a
/// plain nullable timestamp).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestSampleMappingInfo {
    pub id: MappingId,
    pub oms_city_code: String,
    pub sample_id: i64,
    pub oms_test_id: String,
    pub sample_number: u32,
    pub vial_type_id: i64,
    pub oms_order_id: String,
    pub is_rejected: bool,
    pub recollection_pending: bool,
    pub rejection_reason: String,
    pub created_at: DateTime<Utc>,
    pub created_by: ActorId,
    pub updated_at: DateTime<Utc>,
    pub updated_by: ActorId,
    pub deleted_at: Option<DateTime<Utc>>,
    pub deleted_by: Option<ActorId>,
}

impl From<&TestSampleMapping> for TestSampleMappingInfo {
    fn from(mapping: &TestSampleMapping) -> Self {
        let (deleted_at, deleted_by) = mapping.deletion.as_columns();
        Self {
            id: mapping.id,
            oms_city_code: mapping.oms_city_code.clone(),
            sample_id: mapping.sample_id,
            oms_test_id: mapping.oms_test_id.clone(),
            sample_number: mapping.sample_number,
            vial_type_id: mapping.vial_type_id,
            oms_order_id: mapping.oms_order_id.clone(),
            is_rejected: mapping.is_rejected,
            recollection_pending: mapping.recollection_pending,
            rejection_reason: mapping.rejection_reason.clone().unwrap_or_default(),
            created_at: mapping.created_at,
            created_by: mapping.created_by,
            updated_at: mapping.updated_at,
            updated_by: mapping.updated_by,
            deleted_at,
            deleted_by,
        }
    }
}

#[must_use]
pub fn to_info(mapping: &TestSampleMapping) -> TestSampleMappingInfo {
    TestSampleMappingInfo::from(mapping)
}

#[must_use]
pub fn to_infos(mappings: &[TestSampleMapping]) -> Vec<TestSampleMappingInfo> {
    mappings.iter().map(TestSampleMappingInfo::from).collect()
}
