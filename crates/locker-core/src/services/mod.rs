//! Services shared by the HTTP layer and in-process callers

mod conflicts;
mod item;
mod sync;

pub use conflicts::{ConflictStore, DatabaseConflictStore};
pub use item::ItemService;
pub use sync::{reconcile, resolved_payload, SyncPlan, SyncService, MERGE_SEPARATOR};
