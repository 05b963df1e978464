//! Conflict repository implementation

use libsql::params::Params;
use libsql::{Row, Value};

use super::transaction::{begin, TxContext};
use crate::error::{Error, Result};
use crate::models::{now_millis, Conflict, ConflictId, UserId};

const CONFLICT_COLUMNS: &str =
    "id, user_id, item_id, data_type, client_data, server_data, resolved, created_at, updated_at";

/// Trait for conflict storage operations (async)
#[allow(async_fn_in_trait)]
pub trait ConflictRepository {
    /// Get a conflict by ID
    async fn get(&self, id: &ConflictId) -> Result<Option<Conflict>>;

    /// Unresolved conflicts for a user, in storage order
    async fn list_unresolved(&self, user_id: &UserId) -> Result<Vec<Conflict>>;

    /// Insert all conflicts atomically
    async fn add_many(&self, conflicts: &[Conflict]) -> Result<()>;

    /// Flag a conflict as resolved; not-found for an unknown id
    async fn mark_resolved(&self, id: &ConflictId) -> Result<()>;

    /// Delete the listed conflicts; ids that are already gone are ignored
    async fn delete_many(&self, ids: &[ConflictId]) -> Result<()>;
}

/// libSQL implementation of `ConflictRepository`
pub struct LibSqlConflictRepository {
    ctx: TxContext,
}

impl LibSqlConflictRepository {
    /// Create a new repository running on the given executor
    pub const fn new(ctx: TxContext) -> Self {
        Self { ctx }
    }

    /// Parse a conflict from a database row
    fn parse_conflict(row: &Row) -> Result<Conflict> {
        let id: String = row.get(0)?;
        let user_id: String = row.get(1)?;
        let item_id: String = row.get(2)?;
        let data_type: String = row.get(3)?;

        Ok(Conflict {
            id: id
                .parse()
                .map_err(|_| Error::Database(format!("invalid conflict id: {id}")))?,
            user_id: UserId::new(user_id)?,
            item_id: item_id
                .parse()
                .map_err(|_| Error::Database(format!("invalid item id: {item_id}")))?,
            data_type: data_type.parse()?,
            client_data: row.get(4)?,
            server_data: row.get(5)?,
            resolved: row.get::<i64>(6)? != 0,
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
        })
    }
}

impl ConflictRepository for LibSqlConflictRepository {
    async fn get(&self, id: &ConflictId) -> Result<Option<Conflict>> {
        let mut rows = self
            .ctx
            .connection()
            .query(
                &format!("SELECT {CONFLICT_COLUMNS} FROM conflicts WHERE id = ?"),
                [id.as_str()],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::parse_conflict(&row)?)),
            None => Ok(None),
        }
    }

    async fn list_unresolved(&self, user_id: &UserId) -> Result<Vec<Conflict>> {
        let mut rows = self
            .ctx
            .connection()
            .query(
                &format!(
                    "SELECT {CONFLICT_COLUMNS} FROM conflicts WHERE user_id = ? AND resolved = 0"
                ),
                [user_id.as_str()],
            )
            .await?;

        let mut conflicts = Vec::new();
        while let Some(row) = rows.next().await? {
            conflicts.push(Self::parse_conflict(&row)?);
        }

        Ok(conflicts)
    }

    async fn add_many(&self, conflicts: &[Conflict]) -> Result<()> {
        if conflicts.is_empty() {
            return Ok(());
        }

        begin(&self.ctx, |tx| async move {
            for conflict in conflicts {
                tx.connection()
                    .execute(
                        &format!(
                            "INSERT INTO conflicts ({CONFLICT_COLUMNS})
                             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"
                        ),
                        libsql::params![
                            conflict.id.as_str(),
                            conflict.user_id.as_str(),
                            conflict.item_id.as_str(),
                            conflict.data_type.as_str(),
                            conflict.client_data.clone(),
                            conflict.server_data.clone(),
                            i64::from(conflict.resolved),
                            conflict.created_at,
                            conflict.updated_at
                        ],
                    )
                    .await?;
            }
            Ok(())
        })
        .await
    }

    async fn mark_resolved(&self, id: &ConflictId) -> Result<()> {
        let rows = self
            .ctx
            .connection()
            .execute(
                "UPDATE conflicts SET resolved = 1, updated_at = ? WHERE id = ?",
                libsql::params![now_millis(), id.as_str()],
            )
            .await?;

        if rows == 0 {
            return Err(Error::NotFound(format!("conflict {id}")));
        }

        Ok(())
    }

    async fn delete_many(&self, ids: &[ConflictId]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }

        let placeholders = vec!["?"; ids.len()].join(", ");
        let values = ids.iter().map(|id| Value::Text(id.as_str())).collect();

        let rows = self
            .ctx
            .connection()
            .execute(
                &format!("DELETE FROM conflicts WHERE id IN ({placeholders})"),
                Params::Positional(values),
            )
            .await?;

        tracing::debug!(requested = ids.len(), deleted = rows, "Deleted conflicts");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Database, Schema};
    use crate::models::{DataType, ItemId};
    use pretty_assertions::assert_eq;

    async fn setup() -> Database {
        Database::open_in_memory(Schema::Conflicts).await.unwrap()
    }

    fn conflict(user: &str, client: &str, server: &str) -> Conflict {
        Conflict::new(
            UserId::new(user).unwrap(),
            ItemId::new(),
            DataType::Text,
            client.as_bytes().to_vec(),
            server.as_bytes().to_vec(),
        )
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_add_many_and_get() {
        let db = setup().await;
        let repo = LibSqlConflictRepository::new(db.context());

        let first = conflict("alice", "C", "S");
        repo.add_many(&[first.clone(), conflict("alice", "x", "y")])
            .await
            .unwrap();

        let fetched = repo.get(&first.id).await.unwrap().unwrap();
        assert_eq!(fetched, first);
        assert!(repo.get(&ConflictId::new()).await.unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_list_unresolved_skips_resolved_and_other_users() {
        let db = setup().await;
        let repo = LibSqlConflictRepository::new(db.context());

        let open = conflict("alice", "a", "b");
        let done = conflict("alice", "c", "d");
        repo.add_many(&[open.clone(), done.clone(), conflict("bob", "e", "f")])
            .await
            .unwrap();
        repo.mark_resolved(&done.id).await.unwrap();

        let listed = repo
            .list_unresolved(&UserId::new("alice").unwrap())
            .await
            .unwrap();
        assert_eq!(listed, vec![open]);

        let resolved = repo.get(&done.id).await.unwrap().unwrap();
        assert!(resolved.resolved);
        assert!(resolved.updated_at >= resolved.created_at);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_mark_resolved_unknown_is_not_found() {
        let db = setup().await;
        let repo = LibSqlConflictRepository::new(db.context());

        let err = repo.mark_resolved(&ConflictId::new()).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_delete_many_is_idempotent() {
        let db = setup().await;
        let repo = LibSqlConflictRepository::new(db.context());

        let a = conflict("alice", "a", "b");
        let b = conflict("alice", "c", "d");
        repo.add_many(&[a.clone(), b.clone()]).await.unwrap();

        repo.delete_many(&[a.id, b.id]).await.unwrap();
        repo.delete_many(&[a.id, b.id]).await.unwrap();
        assert!(repo.get(&a.id).await.unwrap().is_none());
        assert!(repo.get(&b.id).await.unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_add_many_is_atomic() {
        let db = setup().await;
        let repo = LibSqlConflictRepository::new(db.context());

        let existing = conflict("alice", "a", "b");
        repo.add_many(std::slice::from_ref(&existing)).await.unwrap();

        let fresh = conflict("alice", "c", "d");
        assert!(repo.add_many(&[fresh.clone(), existing]).await.is_err());
        assert!(repo.get(&fresh.id).await.unwrap().is_none());
    }
}
