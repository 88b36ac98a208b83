//! SQLite persistence for the ledger.
//!
//! - `migrations.rs` opens the store, sets connection pragmas and applies the schema
//! - `repo/` holds the per-entity queries and the unit-of-work entry point

pub mod migrations;
pub mod repo;

pub use migrations::init_db;
pub use repo::{LedgerTx, Repository};
