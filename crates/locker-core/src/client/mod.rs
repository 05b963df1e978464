//! Item client: the sync service's only channel to server-side item state.

mod http;
mod local;

use async_trait::async_trait;

use crate::models::{
    BatchResult, ClientChange, Item, ItemId, ItemOperation, ItemUpdate, NewItem, UserId,
};
use crate::Result;

pub use http::HttpItemClient;
pub use local::LocalItemClient;

/// Remote operations the item service exposes to the sync service.
///
/// Implementations never retry; transport failures surface as errors.
#[async_trait]
pub trait ItemClient: Send + Sync {
    /// All of the user's items.
    async fn list_data(&self, user_id: &UserId) -> Result<Vec<Item>>;

    /// Overwrite a single item.
    async fn update_data(&self, user_id: &UserId, update: ItemUpdate) -> Result<Item>;

    /// Apply operations atomically on the item service.
    async fn batch_process(
        &self,
        user_id: &UserId,
        operations: Vec<ItemOperation>,
    ) -> Result<Vec<BatchResult>>;
}

/// Operation creating the changed item, keeping the client's id.
pub fn add_operation(change: &ClientChange) -> ItemOperation {
    ItemOperation::Add(NewItem {
        id: Some(change.item_id),
        data_type: change.data_type,
        data: change.data.clone(),
        metadata: change.metadata.clone(),
    })
}

/// Operation overwriting the server copy with the client's.
pub fn update_operation(change: &ClientChange) -> ItemOperation {
    ItemOperation::Update(ItemUpdate {
        id: change.item_id,
        data_type: change.data_type,
        data: change.data.clone(),
        metadata: Some(change.metadata.clone()),
    })
}

pub const fn delete_operation(item_id: ItemId) -> ItemOperation {
    ItemOperation::Delete(item_id)
}
