//! Sync service: reconciles client changes against server items and tracks
//! the conflicts that cannot be applied automatically.
//!
//! Item writes go through an [`ItemClient`] and conflicts through a
//! [`ConflictStore`]; the two never share a transaction. When a batch apply
//! fails after conflicts were recorded, those conflicts are deleted again.

use std::collections::HashMap;
use std::sync::Arc;

use super::ConflictStore;
use crate::client::{add_operation, delete_operation, update_operation, ItemClient};
use crate::error::ResultExt;
use crate::models::{
    ChangeOperation, ClientChange, Conflict, ConflictId, DataType, Item, ItemId, ItemOperation,
    ItemUpdate, ResolutionStrategy, UserId,
};
use crate::{Error, Result};

/// Placed between client and server text when merging free-text items.
pub const MERGE_SEPARATOR: &str = "\n";

/// Writes and conflicts derived from one set of client changes.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SyncPlan {
    pub operations: Vec<ItemOperation>,
    pub conflicts: Vec<Conflict>,
}

/// Classify each client change against the server's current items.
///
/// Identical payloads need nothing. A change to an item the server lacks
/// becomes an add; deleting such an item is a no-op. When both sides differ
/// the client wins only if the server copy is strictly older; otherwise a
/// conflict is recorded instead of writing. A winning change that does not
/// declare its type keeps the type stored on the server.
pub fn reconcile(user_id: &UserId, server_items: &[Item], changes: &[ClientChange]) -> SyncPlan {
    let server: HashMap<ItemId, &Item> =
        server_items.iter().map(|item| (item.id, item)).collect();
    let mut plan = SyncPlan::default();

    for change in changes {
        let existing = server.get(&change.item_id).copied();

        match (change.operation, existing) {
            (ChangeOperation::Delete, Some(item)) => {
                plan.operations.push(delete_operation(item.id));
            }
            (ChangeOperation::Delete, None) => {}
            (ChangeOperation::Add | ChangeOperation::Update, None) => {
                plan.operations.push(add_operation(change));
            }
            (ChangeOperation::Add | ChangeOperation::Update, Some(item)) => {
                if item.data == change.data {
                    continue;
                }
                if item.updated_at < change.updated_at {
                    let typed;
                    let change = if change.data_type == DataType::Unspecified {
                        typed = ClientChange {
                            data_type: item.data_type,
                            ..change.clone()
                        };
                        &typed
                    } else {
                        change
                    };
                    plan.operations.push(update_operation(change));
                } else {
                    plan.conflicts.push(Conflict::new(
                        user_id.clone(),
                        item.id,
                        item.data_type,
                        change.data.clone(),
                        item.data.clone(),
                    ));
                }
            }
        }
    }

    plan
}

/// Payload written back to the item store when `conflict` is resolved.
pub fn resolved_payload(conflict: &Conflict, strategy: ResolutionStrategy) -> Result<Vec<u8>> {
    match strategy {
        ResolutionStrategy::UseClientVersion => Ok(conflict.client_data.clone()),
        ResolutionStrategy::UseServerVersion => Ok(conflict.server_data.clone()),
        ResolutionStrategy::MergeVersions => merge(conflict),
    }
}

fn merge(conflict: &Conflict) -> Result<Vec<u8>> {
    match conflict.data_type {
        DataType::Text => {
            let mut merged = Vec::with_capacity(
                conflict.client_data.len() + MERGE_SEPARATOR.len() + conflict.server_data.len(),
            );
            merged.extend_from_slice(&conflict.client_data);
            merged.extend_from_slice(MERGE_SEPARATOR.as_bytes());
            merged.extend_from_slice(&conflict.server_data);
            Ok(merged)
        }
        DataType::LoginPassword | DataType::Binary | DataType::BankCard => {
            // Encrypted structured payloads cannot be combined server-side.
            tracing::warn!(
                conflict = %conflict.id,
                data_type = %conflict.data_type,
                "Merge of non-text item keeps the client version"
            );
            Ok(conflict.client_data.clone())
        }
        DataType::Unspecified => Err(Error::Validation(format!(
            "unsupported data type for merge: {}",
            conflict.data_type
        ))),
    }
}

/// Reconciles client item changes and resolves recorded conflicts.
#[derive(Clone)]
pub struct SyncService {
    items: Arc<dyn ItemClient>,
    conflicts: Arc<dyn ConflictStore>,
}

impl SyncService {
    pub fn new(items: Arc<dyn ItemClient>, conflicts: Arc<dyn ConflictStore>) -> Self {
        Self { items, conflicts }
    }

    /// Apply `changes` for a user and return the conflicts detected now.
    ///
    /// Conflicts are persisted before any write is submitted; if that fails
    /// nothing is written. Writes go out as one batch. If the batch fails the
    /// conflicts from this call are deleted again, and a failure of that
    /// delete is reported together with the batch failure.
    pub async fn sync_data(
        &self,
        user_id: &UserId,
        changes: &[ClientChange],
    ) -> Result<Vec<Conflict>> {
        let server_items = self
            .items
            .list_data(user_id)
            .await
            .context("failed to list server data")?;

        let SyncPlan {
            operations,
            conflicts,
        } = reconcile(user_id, &server_items, changes);

        tracing::info!(
            user = user_id.fingerprint(),
            changes = changes.len(),
            operations = operations.len(),
            conflicts = conflicts.len(),
            "Reconciled client changes"
        );

        if !conflicts.is_empty() {
            self.conflicts
                .add_many(&conflicts)
                .await
                .context("failed to add conflicts")?;
        }

        if !operations.is_empty() {
            if let Err(error) = self.items.batch_process(user_id, operations).await {
                let error = error.context("failed to apply batch operations");
                return Err(self.roll_back_conflicts(&conflicts, error).await);
            }
        }

        Ok(conflicts)
    }

    /// Compensate a failed batch by deleting the conflicts it recorded.
    async fn roll_back_conflicts(&self, conflicts: &[Conflict], error: Error) -> Error {
        if conflicts.is_empty() {
            return error;
        }

        let ids: Vec<ConflictId> = conflicts.iter().map(|conflict| conflict.id).collect();
        match self.conflicts.delete_many(&ids).await {
            Ok(()) => {
                tracing::warn!(
                    conflicts = ids.len(),
                    %error,
                    "Batch apply failed; recorded conflicts rolled back"
                );
                error
            }
            Err(rollback) => {
                let rollback = rollback.context("failed to roll back conflicts");
                tracing::error!(
                    conflicts = ?ids,
                    %error,
                    %rollback,
                    "Batch apply failed and conflict rollback failed; conflicts left without writes"
                );
                Error::Compensation {
                    source: Box::new(error),
                    rollback: Box::new(rollback),
                }
            }
        }
    }

    /// Resolve one of the user's conflicts with `strategy`.
    ///
    /// The resolved payload is written to the item first, then the conflict
    /// is marked resolved. A retry after a failure between the two steps
    /// rewrites the same payload.
    pub async fn resolve_conflict(
        &self,
        user_id: &UserId,
        conflict_id: &ConflictId,
        strategy: ResolutionStrategy,
    ) -> Result<()> {
        let conflict = self
            .conflicts
            .get(conflict_id)
            .await
            .context("failed to get conflict")?
            .filter(|conflict| &conflict.user_id == user_id)
            .ok_or_else(|| Error::NotFound(format!("conflict {conflict_id}")))?;

        let data = resolved_payload(&conflict, strategy)?;

        self.items
            .update_data(
                &conflict.user_id,
                ItemUpdate {
                    id: conflict.item_id,
                    data_type: conflict.data_type,
                    data,
                    metadata: None,
                },
            )
            .await
            .context("failed to update item")?;

        self.conflicts
            .mark_resolved(conflict_id)
            .await
            .context("failed to mark conflict resolved")?;

        tracing::info!(
            user = user_id.fingerprint(),
            conflict = %conflict_id,
            %strategy,
            "Resolved conflict"
        );
        Ok(())
    }

    /// Unresolved conflicts for a user.
    pub async fn list_conflicts(&self, user_id: &UserId) -> Result<Vec<Conflict>> {
        self.conflicts
            .list_unresolved(user_id)
            .await
            .context("failed to list conflicts")
    }
}
