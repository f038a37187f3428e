//! Storage layer for tsm
//!
//! SQLite persistence for the mapping table, explicit units of work, and the
//! [`MappingStore`] interface the lifecycle service is written against.

pub mod mapping_store;
pub mod migrations;
pub mod sqlite;
pub mod tx;

pub use mapping_store::{MappingStore, MutationOutcome, Scope, SqliteMappingStore};
pub use sqlite::Database;
pub use tx::UnitOfWork;
