//! Key-value store adapters
//!
//! - `SqliteStore`: durable store backed by `SQLite` via sqlx
//! - `MemoryStore`: in-process store for tests and ephemeral runs

pub mod memory_store;
pub mod sqlite_store;

pub use memory_store::MemoryStore;
pub use sqlite_store::SqliteStore;
