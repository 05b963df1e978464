//! Item service: user-scoped reads, single updates and atomic batch apply.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::db::{begin, Database, ItemRepository, LibSqlItemRepository, Schema};
use crate::models::{BatchResult, Item, ItemOperation, ItemUpdate, OperationKind, UserId};
use crate::{Error, Result};

/// Thread-safe service over the item store.
#[derive(Clone)]
pub struct ItemService {
    db: Arc<Mutex<Database>>,
}

impl ItemService {
    /// Wrap an item store database.
    pub fn new(db: Database) -> Result<Self> {
        if db.schema() != Schema::Items {
            return Err(Error::Database(format!(
                "item service requires the items schema, got {}",
                db.schema().name()
            )));
        }
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
        })
    }

    /// Open an in-memory item store (primarily for tests).
    pub async fn open_in_memory() -> Result<Self> {
        Self::new(Database::open_in_memory(Schema::Items).await?)
    }

    /// List all of a user's items.
    pub async fn list(&self, user_id: &UserId) -> Result<Vec<Item>> {
        let db = self.db.lock().await;
        let repo = LibSqlItemRepository::new(db.context());
        repo.list(user_id).await
    }

    /// Overwrite one item and return its stored state.
    pub async fn update(&self, user_id: &UserId, update: &ItemUpdate) -> Result<Item> {
        let db = self.db.lock().await;
        begin(&db.context(), |tx| async move {
            let repo = LibSqlItemRepository::new(tx);
            repo.update(user_id, update).await?;
            repo.get(user_id, &update.id)
                .await?
                .ok_or_else(|| Error::NotFound(format!("item {}", update.id)))
        })
        .await
    }

    /// Apply a mixed batch in one transaction.
    ///
    /// Adds run first as a single batch insert, then each update, then all
    /// deletes in one statement. Any failure rolls the whole batch back.
    /// Results are grouped the same way: adds, updates, deletes.
    pub async fn batch_process(
        &self,
        user_id: &UserId,
        operations: Vec<ItemOperation>,
    ) -> Result<Vec<BatchResult>> {
        let total = operations.len();
        let mut adds = Vec::new();
        let mut updates = Vec::new();
        let mut deletes = Vec::new();
        for operation in operations {
            match operation {
                ItemOperation::Add(item) => adds.push(item),
                ItemOperation::Update(update) => updates.push(update),
                ItemOperation::Delete(id) => deletes.push(id),
            }
        }

        let (add_count, update_count, delete_count) = (adds.len(), updates.len(), deletes.len());
        let db = self.db.lock().await;
        let results = begin(&db.context(), |tx| async move {
            let repo = LibSqlItemRepository::new(tx);
            let mut results = Vec::with_capacity(total);

            let added = repo.add_many(user_id, &adds).await?;
            results.extend(added.into_iter().map(|item_id| BatchResult {
                operation: OperationKind::Add,
                item_id,
            }));

            for update in &updates {
                repo.update(user_id, update).await?;
                results.push(BatchResult {
                    operation: OperationKind::Update,
                    item_id: update.id,
                });
            }

            repo.delete_many(user_id, &deletes).await?;
            results.extend(deletes.iter().map(|&item_id| BatchResult {
                operation: OperationKind::Delete,
                item_id,
            }));

            Ok(results)
        })
        .await?;

        tracing::debug!(
            adds = add_count,
            updates = update_count,
            deletes = delete_count,
            "Applied item batch"
        );
        Ok(results)
    }
}
