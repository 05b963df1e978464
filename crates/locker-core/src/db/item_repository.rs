//! Item repository implementation

use libsql::params::Params;
use libsql::{Row, Value};

use super::transaction::{begin, TxContext};
use crate::error::{Error, Result};
use crate::models::{now_millis, Item, ItemId, ItemUpdate, NewItem, UserId};

const ITEM_COLUMNS: &str = "id, user_id, data_type, data, metadata, created_at, updated_at";

/// Trait for item storage operations (async)
#[allow(async_fn_in_trait)]
pub trait ItemRepository {
    /// Insert all items atomically, returning their ids in input order
    async fn add_many(&self, user_id: &UserId, items: &[NewItem]) -> Result<Vec<ItemId>>;

    /// Get one of the user's items
    async fn get(&self, user_id: &UserId, id: &ItemId) -> Result<Option<Item>>;

    /// Overwrite an item's content; not-found when the user has no such item
    async fn update(&self, user_id: &UserId, update: &ItemUpdate) -> Result<()>;

    /// Delete the listed items; not-found when none of them matched
    async fn delete_many(&self, user_id: &UserId, ids: &[ItemId]) -> Result<()>;

    /// All of the user's items, unordered
    async fn list(&self, user_id: &UserId) -> Result<Vec<Item>>;
}

/// libSQL implementation of `ItemRepository`
pub struct LibSqlItemRepository {
    ctx: TxContext,
}

impl LibSqlItemRepository {
    /// Create a new repository running on the given executor
    pub const fn new(ctx: TxContext) -> Self {
        Self { ctx }
    }

    /// Parse an item from a database row
    fn parse_item(row: &Row) -> Result<Item> {
        let id: String = row.get(0)?;
        let user_id: String = row.get(1)?;
        let data_type: String = row.get(2)?;
        let metadata: String = row.get(4)?;

        Ok(Item {
            id: id
                .parse()
                .map_err(|_| Error::Database(format!("invalid item id: {id}")))?,
            user_id: UserId::new(user_id)?,
            data_type: data_type.parse()?,
            data: row.get(3)?,
            metadata: serde_json::from_str(&metadata)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
        })
    }
}

impl ItemRepository for LibSqlItemRepository {
    async fn add_many(&self, user_id: &UserId, items: &[NewItem]) -> Result<Vec<ItemId>> {
        if items.is_empty() {
            return Ok(Vec::new());
        }

        begin(&self.ctx, |tx| async move {
            let now = now_millis();
            let mut ids = Vec::with_capacity(items.len());

            for item in items {
                let id = item.id.unwrap_or_default();
                let mut rows = tx
                    .connection()
                    .query(
                        "INSERT INTO items (id, user_id, data_type, data, metadata, created_at, updated_at)
                         VALUES (?, ?, ?, ?, ?, ?, ?)
                         RETURNING id",
                        libsql::params![
                            id.as_str(),
                            user_id.as_str(),
                            item.data_type.as_str(),
                            item.data.clone(),
                            serde_json::to_string(&item.metadata)?,
                            now,
                            now
                        ],
                    )
                    .await?;

                let row = rows
                    .next()
                    .await?
                    .ok_or_else(|| Error::Database("insert returned no id".into()))?;
                let returned: String = row.get(0)?;
                ids.push(
                    returned
                        .parse()
                        .map_err(|_| Error::Database(format!("invalid item id: {returned}")))?,
                );
            }

            Ok(ids)
        })
        .await
    }

    async fn get(&self, user_id: &UserId, id: &ItemId) -> Result<Option<Item>> {
        let mut rows = self
            .ctx
            .connection()
            .query(
                &format!("SELECT {ITEM_COLUMNS} FROM items WHERE id = ? AND user_id = ?"),
                libsql::params![id.as_str(), user_id.as_str()],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::parse_item(&row)?)),
            None => Ok(None),
        }
    }

    async fn update(&self, user_id: &UserId, update: &ItemUpdate) -> Result<()> {
        let metadata = match &update.metadata {
            Some(metadata) => Value::Text(serde_json::to_string(metadata)?),
            None => Value::Null,
        };

        let rows = self
            .ctx
            .connection()
            .execute(
                "UPDATE items
                 SET data_type = ?, data = ?, metadata = COALESCE(?, metadata), updated_at = ?
                 WHERE id = ? AND user_id = ?",
                libsql::params![
                    update.data_type.as_str(),
                    update.data.clone(),
                    metadata,
                    now_millis(),
                    update.id.as_str(),
                    user_id.as_str()
                ],
            )
            .await?;

        if rows == 0 {
            return Err(Error::NotFound(format!("item {}", update.id)));
        }

        Ok(())
    }

    async fn delete_many(&self, user_id: &UserId, ids: &[ItemId]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }

        let placeholders = vec!["?"; ids.len()].join(", ");
        let mut values = Vec::with_capacity(ids.len() + 1);
        values.push(Value::Text(user_id.as_str().to_string()));
        values.extend(ids.iter().map(|id| Value::Text(id.as_str())));

        let rows = self
            .ctx
            .connection()
            .execute(
                &format!("DELETE FROM items WHERE user_id = ? AND id IN ({placeholders})"),
                Params::Positional(values),
            )
            .await?;

        if rows == 0 {
            return Err(Error::NotFound(format!("items for user {user_id}")));
        }

        Ok(())
    }

    async fn list(&self, user_id: &UserId) -> Result<Vec<Item>> {
        let mut rows = self
            .ctx
            .connection()
            .query(
                &format!("SELECT {ITEM_COLUMNS} FROM items WHERE user_id = ?"),
                [user_id.as_str()],
            )
            .await?;

        let mut items = Vec::new();
        while let Some(row) = rows.next().await? {
            items.push(Self::parse_item(&row)?);
        }

        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Database, Schema};
    use crate::models::{DataType, Metadata};
    use pretty_assertions::assert_eq;

    async fn setup() -> Database {
        Database::open_in_memory(Schema::Items).await.unwrap()
    }

    fn alice() -> UserId {
        UserId::new("alice").unwrap()
    }

    fn new_item(data: &str) -> NewItem {
        NewItem {
            id: None,
            data_type: DataType::Text,
            data: data.as_bytes().to_vec(),
            metadata: vec![Metadata::new("label", data)],
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_add_many_returns_ids_in_order() {
        let db = setup().await;
        let repo = LibSqlItemRepository::new(db.context());

        let fixed = ItemId::new();
        let mut second = new_item("two");
        second.id = Some(fixed);

        let ids = repo
            .add_many(&alice(), &[new_item("one"), second, new_item("three")])
            .await
            .unwrap();
        assert_eq!(ids.len(), 3);
        assert_eq!(ids[1], fixed);

        let first = repo.get(&alice(), &ids[0]).await.unwrap().unwrap();
        assert_eq!(first.data, b"one");
        assert_eq!(first.metadata, vec![Metadata::new("label", "one")]);
        assert_eq!(first.created_at, first.updated_at);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_add_many_is_atomic() {
        let db = setup().await;
        let repo = LibSqlItemRepository::new(db.context());

        let duplicate = ItemId::new();
        let mut a = new_item("a");
        a.id = Some(duplicate);
        let mut b = new_item("b");
        b.id = Some(duplicate);

        assert!(repo.add_many(&alice(), &[a, b]).await.is_err());
        assert!(repo.list(&alice()).await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_update_sets_payload_and_keeps_metadata() {
        let db = setup().await;
        let repo = LibSqlItemRepository::new(db.context());
        let ids = repo.add_many(&alice(), &[new_item("old")]).await.unwrap();

        repo.update(
            &alice(),
            &ItemUpdate {
                id: ids[0],
                data_type: DataType::Text,
                data: b"new".to_vec(),
                metadata: None,
            },
        )
        .await
        .unwrap();

        let item = repo.get(&alice(), &ids[0]).await.unwrap().unwrap();
        assert_eq!(item.data, b"new");
        assert_eq!(item.metadata, vec![Metadata::new("label", "old")]);
        assert!(item.updated_at >= item.created_at);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_update_missing_or_foreign_item_is_not_found() {
        let db = setup().await;
        let repo = LibSqlItemRepository::new(db.context());
        let ids = repo.add_many(&alice(), &[new_item("mine")]).await.unwrap();

        let update = ItemUpdate {
            id: ids[0],
            data_type: DataType::Text,
            data: b"stolen".to_vec(),
            metadata: None,
        };
        let bob = UserId::new("bob").unwrap();
        assert!(repo.update(&bob, &update).await.unwrap_err().is_not_found());

        let missing = ItemUpdate {
            id: ItemId::new(),
            ..update
        };
        assert!(repo
            .update(&alice(), &missing)
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_delete_many() {
        let db = setup().await;
        let repo = LibSqlItemRepository::new(db.context());
        let ids = repo
            .add_many(&alice(), &[new_item("a"), new_item("b"), new_item("c")])
            .await
            .unwrap();

        repo.delete_many(&alice(), &ids[..2]).await.unwrap();
        let remaining = repo.list(&alice()).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, ids[2]);

        // Already gone
        assert!(repo
            .delete_many(&alice(), &ids[..2])
            .await
            .unwrap_err()
            .is_not_found());
        // Nothing to do
        repo.delete_many(&alice(), &[]).await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_list_is_scoped_to_user() {
        let db = setup().await;
        let repo = LibSqlItemRepository::new(db.context());
        repo.add_many(&alice(), &[new_item("a")]).await.unwrap();
        repo.add_many(&UserId::new("bob").unwrap(), &[new_item("b")])
            .await
            .unwrap();

        let items = repo.list(&alice()).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].user_id, alice());
    }
}
