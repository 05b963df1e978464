//! Database layer for Locker

mod connection;
mod conflict_repository;
mod item_repository;
mod migrations;
mod transaction;

pub use connection::Database;
pub use conflict_repository::{ConflictRepository, LibSqlConflictRepository};
pub use item_repository::{ItemRepository, LibSqlItemRepository};
pub use migrations::Schema;
pub use transaction::{begin, TxContext};
