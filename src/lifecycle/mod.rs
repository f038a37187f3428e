//! Rejection / recollection state machine over the mapping store.

pub mod service;
pub mod state;

pub use service::{MappingLifecycleService, ResolutionReport};
pub use state::MappingState;
