//! Batch operations accepted by the item service

use serde::{Deserialize, Serialize};

use super::{DataType, ItemId, Metadata};

/// Fields of an item to create
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewItem {
    /// Client-assigned id; generated by the store when absent
    #[serde(default)]
    pub id: Option<ItemId>,
    pub data_type: DataType,
    pub data: Vec<u8>,
    #[serde(default)]
    pub metadata: Vec<Metadata>,
}

/// Full replacement of an existing item's payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemUpdate {
    pub id: ItemId,
    pub data_type: DataType,
    pub data: Vec<u8>,
    /// Replacement metadata; `None` keeps what is stored
    #[serde(default)]
    pub metadata: Option<Vec<Metadata>>,
}

/// One entry of a batch apply request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "operation", content = "item", rename_all = "snake_case")]
pub enum ItemOperation {
    Add(NewItem),
    Update(ItemUpdate),
    Delete(ItemId),
}

impl ItemOperation {
    pub const fn kind(&self) -> OperationKind {
        match self {
            Self::Add(_) => OperationKind::Add,
            Self::Update(_) => OperationKind::Update,
            Self::Delete(_) => OperationKind::Delete,
        }
    }
}

/// Discriminant of an [`ItemOperation`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Add,
    Update,
    Delete,
}

/// Outcome of one applied operation.
///
/// Results come back grouped as adds, then updates, then deletes; `operation`
/// and `item_id` identify which request each result belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResult {
    pub operation: OperationKind,
    pub item_id: ItemId,
}
