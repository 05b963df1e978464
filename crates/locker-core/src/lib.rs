//! locker-core - Core library for Locker
//!
//! This crate holds the item and conflict models, the libSQL storage layer,
//! and the sync logic that reconciles client changes with server items.
//! The HTTP service in `locker-api` is a thin layer over these services.

pub mod client;
pub mod db;
pub mod error;
pub mod models;
pub mod services;

pub use client::{HttpItemClient, ItemClient, LocalItemClient};
pub use error::{Error, Result};
pub use models::{Conflict, ConflictId, Item, ItemId, ResolutionStrategy, UserId};
pub use services::{ConflictStore, DatabaseConflictStore, ItemService, SyncService};
