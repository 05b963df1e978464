//! Stored item model

use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use uuid::Uuid;

use super::uuid_id;
use crate::error::Error;

uuid_id!(
    /// A unique identifier for a stored item, using UUID v7 (time-sortable)
    ItemId
);

/// Opaque identifier of the user owning items and conflicts
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Create a user id, rejecting blank values
    pub fn new(value: impl Into<String>) -> crate::Result<Self> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(Error::Validation("user id must not be empty".into()));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Borrow the raw id
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Stable within a process; logged instead of the raw id
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.0.hash(&mut hasher);
        hasher.finish()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Kind of secret held in an item's encrypted payload
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    /// Type was never declared
    #[default]
    Unspecified,
    /// Login and password pair
    LoginPassword,
    /// Free text
    Text,
    /// Arbitrary binary blob
    Binary,
    /// Payment card
    BankCard,
}

impl DataType {
    /// Stable name used in storage and on the wire
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unspecified => "unspecified",
            Self::LoginPassword => "login_password",
            Self::Text => "text",
            Self::Binary => "binary",
            Self::BankCard => "bank_card",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unspecified" => Ok(Self::Unspecified),
            "login_password" => Ok(Self::LoginPassword),
            "text" => Ok(Self::Text),
            "binary" => Ok(Self::Binary),
            "bank_card" => Ok(Self::BankCard),
            other => Err(Error::Validation(format!("unknown data type: {other}"))),
        }
    }
}

/// Free-form key/value pair attached to an item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub key: String,
    pub value: String,
}

impl Metadata {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// An encrypted user record held by the item store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Unique identifier
    pub id: ItemId,
    /// Owning user
    pub user_id: UserId,
    /// Kind of secret stored in `data`
    pub data_type: DataType,
    /// Encrypted payload, opaque to the server
    pub data: Vec<u8>,
    /// Unencrypted labels
    pub metadata: Vec<Metadata>,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
    /// Last write timestamp (Unix ms), always assigned by the server
    pub updated_at: i64,
}
