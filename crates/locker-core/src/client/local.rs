//! In-process item client.

use async_trait::async_trait;

use super::ItemClient;
use crate::models::{BatchResult, Item, ItemOperation, ItemUpdate, UserId};
use crate::services::ItemService;
use crate::Result;

/// Calls an [`ItemService`] living in the same process.
#[derive(Clone)]
pub struct LocalItemClient {
    service: ItemService,
}

impl LocalItemClient {
    pub const fn new(service: ItemService) -> Self {
        Self { service }
    }
}

#[async_trait]
impl ItemClient for LocalItemClient {
    async fn list_data(&self, user_id: &UserId) -> Result<Vec<Item>> {
        self.service.list(user_id).await
    }

    async fn update_data(&self, user_id: &UserId, update: ItemUpdate) -> Result<Item> {
        self.service.update(user_id, &update).await
    }

    async fn batch_process(
        &self,
        user_id: &UserId,
        operations: Vec<ItemOperation>,
    ) -> Result<Vec<BatchResult>> {
        self.service.batch_process(user_id, operations).await
    }
}
