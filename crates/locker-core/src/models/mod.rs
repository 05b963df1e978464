//! Data models for Locker

/// Defines a UUID v7 backed identifier newtype.
macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Create a new unique ID using UUID v7
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Get the string representation of this ID
            #[must_use]
            pub fn as_str(&self) -> String {
                self.0.to_string()
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }
    };
}

pub(crate) use uuid_id;

mod change;
mod conflict;
mod item;
mod operation;

pub use change::{ChangeOperation, ClientChange};
pub use conflict::{Conflict, ConflictId, ResolutionStrategy};
pub use item::{DataType, Item, ItemId, Metadata, UserId};
pub use operation::{BatchResult, ItemOperation, ItemUpdate, NewItem, OperationKind};

/// Current time as Unix milliseconds.
pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
