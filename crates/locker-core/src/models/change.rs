//! Client-declared item changes submitted for synchronization

use serde::{Deserialize, Serialize};

use super::{DataType, ItemId, Metadata};

/// What the client did to an item locally
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeOperation {
    Add,
    Update,
    Delete,
}

/// One locally modified item, consumed by a single sync call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientChange {
    pub item_id: ItemId,
    #[serde(default)]
    pub data_type: DataType,
    #[serde(default)]
    pub data: Vec<u8>,
    #[serde(default)]
    pub metadata: Vec<Metadata>,
    pub operation: ChangeOperation,
    /// Client's last local modification (Unix ms)
    pub updated_at: i64,
}
