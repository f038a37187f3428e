//! Shared test utilities for tsm.
//!
//! Compiled into the library so integration tests and property tests can
//! build isolated databases and deterministic services.

pub mod fixtures;

pub use fixtures::{TestDb, draw, ids};
