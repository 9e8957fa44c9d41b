//! Database module: models and schema for the inventory store.
//!
//! Layout:
//! - `models.rs`: Rust structs mirroring DB rows
//! - `schema.rs`: SQL DDL for initializing the database (SQLite)
//! - `sqlite.rs`: storage handle, query execution and the audit sink

pub mod models;
pub mod schema;
pub mod sqlite;

pub use models::{DbAuditEntry, DbEquipment, DbMaintenanceEntry, NewEquipment, NewMaintenanceEntry};
pub use schema::SQLITE_INIT;
pub use sqlite::{InventoryStorage, SqlitePool};
