//! Sync conflict model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::{now_millis, uuid_id, DataType, ItemId, UserId};
use crate::error::Error;

uuid_id!(
    /// Identifier of a recorded conflict
    ConflictId
);

/// A recorded disagreement between the client's and the server's copy of an item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conflict {
    pub id: ConflictId,
    pub user_id: UserId,
    /// Item both sides modified
    pub item_id: ItemId,
    /// Item type at detection time, drives `MergeVersions`
    pub data_type: DataType,
    /// Client payload at detection time
    pub client_data: Vec<u8>,
    /// Server payload at detection time
    pub server_data: Vec<u8>,
    pub resolved: bool,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
    /// Last update timestamp (Unix ms)
    pub updated_at: i64,
}

impl Conflict {
    /// Record a new unresolved conflict with a fresh id
    #[must_use]
    pub fn new(
        user_id: UserId,
        item_id: ItemId,
        data_type: DataType,
        client_data: Vec<u8>,
        server_data: Vec<u8>,
    ) -> Self {
        let now = now_millis();
        Self {
            id: ConflictId::new(),
            user_id,
            item_id,
            data_type,
            client_data,
            server_data,
            resolved: false,
            created_at: now,
            updated_at: now,
        }
    }
}

/// How a conflict's two payloads collapse into the value written back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStrategy {
    UseClientVersion,
    UseServerVersion,
    MergeVersions,
}

impl ResolutionStrategy {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UseClientVersion => "use_client_version",
            Self::UseServerVersion => "use_server_version",
            Self::MergeVersions => "merge_versions",
        }
    }
}

impl fmt::Display for ResolutionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResolutionStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "use_client_version" => Ok(Self::UseClientVersion),
            "use_server_version" => Ok(Self::UseServerVersion),
            "merge_versions" => Ok(Self::MergeVersions),
            other => Err(Error::Validation(format!(
                "unknown resolution strategy: {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_new_is_unresolved() {
        let conflict = Conflict::new(
            UserId::new("alice").unwrap(),
            ItemId::new(),
            DataType::Text,
            b"C".to_vec(),
            b"S".to_vec(),
        );
        assert!(!conflict.resolved);
        assert_eq!(conflict.created_at, conflict.updated_at);
        assert_eq!(conflict.client_data, b"C");
        assert_eq!(conflict.server_data, b"S");
    }

    #[test]
    fn test_strategy_parse() {
        assert_eq!(
            "MERGE_VERSIONS".parse::<ResolutionStrategy>().unwrap(),
            ResolutionStrategy::MergeVersions
        );
        let err = "coin_flip".parse::<ResolutionStrategy>().unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("unknown resolution strategy"));
    }
}
