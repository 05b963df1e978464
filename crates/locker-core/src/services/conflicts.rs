//! Conflict bookkeeping used by the sync service.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::db::{ConflictRepository, Database, LibSqlConflictRepository, Schema};
use crate::models::{Conflict, ConflictId, UserId};
use crate::{Error, Result};

/// Conflict persistence as seen by the sync service.
#[async_trait]
pub trait ConflictStore: Send + Sync {
    async fn get(&self, id: &ConflictId) -> Result<Option<Conflict>>;

    async fn list_unresolved(&self, user_id: &UserId) -> Result<Vec<Conflict>>;

    /// Insert all conflicts atomically.
    async fn add_many(&self, conflicts: &[Conflict]) -> Result<()>;

    async fn mark_resolved(&self, id: &ConflictId) -> Result<()>;

    /// Delete conflicts by id. Safe to repeat.
    async fn delete_many(&self, ids: &[ConflictId]) -> Result<()>;
}

/// [`ConflictStore`] backed by the conflicts database.
#[derive(Clone)]
pub struct DatabaseConflictStore {
    db: Arc<Mutex<Database>>,
}

impl DatabaseConflictStore {
    pub fn new(db: Database) -> Result<Self> {
        if db.schema() != Schema::Conflicts {
            return Err(Error::Database(format!(
                "conflict store requires the conflicts schema, got {}",
                db.schema().name()
            )));
        }
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
        })
    }

    /// Open an in-memory conflict store (primarily for tests).
    pub async fn open_in_memory() -> Result<Self> {
        Self::new(Database::open_in_memory(Schema::Conflicts).await?)
    }
}

#[async_trait]
impl ConflictStore for DatabaseConflictStore {
    async fn get(&self, id: &ConflictId) -> Result<Option<Conflict>> {
        let db = self.db.lock().await;
        LibSqlConflictRepository::new(db.context()).get(id).await
    }

    async fn list_unresolved(&self, user_id: &UserId) -> Result<Vec<Conflict>> {
        let db = self.db.lock().await;
        LibSqlConflictRepository::new(db.context())
            .list_unresolved(user_id)
            .await
    }

    async fn add_many(&self, conflicts: &[Conflict]) -> Result<()> {
        let db = self.db.lock().await;
        LibSqlConflictRepository::new(db.context())
            .add_many(conflicts)
            .await
    }

    async fn mark_resolved(&self, id: &ConflictId) -> Result<()> {
        let db = self.db.lock().await;
        LibSqlConflictRepository::new(db.context())
            .mark_resolved(id)
            .await
    }

    async fn delete_many(&self, ids: &[ConflictId]) -> Result<()> {
        let db = self.db.lock().await;
        LibSqlConflictRepository::new(db.context())
            .delete_many(ids)
            .await
    }
}
