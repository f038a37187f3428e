//! Domain types for test-sample mappings.

pub mod clock;
pub mod info;
pub mod mapping;

pub use clock::{Clock, FixedClock, SystemClock};
pub use info::{TestSampleMappingInfo, to_info, to_infos};
pub use mapping::{
    ActorId, DeletionState, MappingId, MappingKey, MappingPatch, NewMapping, TestSampleMapping,
};
