// Adapters layer: concrete implementations for external systems (item store, collectors).

pub mod collectors;
pub mod sqlite_store;

pub use sqlite_store::SqliteItemStore;
