use std::collections::HashMap;
use std::env;
use std::fmt;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub items_db_path: String,
    pub conflicts_db_path: String,
    /// Remote item service; the in-process one is used when unset
    pub items_service_url: Option<String>,
    pub remote_timeout: Duration,
    pub items_api_token: Option<String>,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("AppConfig")
            .field("bind_addr", &self.bind_addr)
            .field("items_db_path", &self.items_db_path)
            .field("conflicts_db_path", &self.conflicts_db_path)
            .field("items_service_url", &self.items_service_url)
            .field("remote_timeout", &self.remote_timeout)
            .field(
                "items_api_token",
                &self.items_api_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let values: HashMap<String, String> = env::vars().collect();
        Self::from_lookup(|name| values.get(name).cloned())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind_addr = value_or_default(&lookup, "LOCKER_API_BIND_ADDR", "127.0.0.1:8080");
        let items_db_path = value_or_default(&lookup, "LOCKER_ITEMS_DB_PATH", "locker-items.db");
        let conflicts_db_path =
            value_or_default(&lookup, "LOCKER_CONFLICTS_DB_PATH", "locker-conflicts.db");
        if items_db_path == conflicts_db_path {
            return Err(ConfigError::Invalid(
                "LOCKER_ITEMS_DB_PATH and LOCKER_CONFLICTS_DB_PATH must differ".to_string(),
            ));
        }

        let items_service_url = optional_trimmed(&lookup, "LOCKER_ITEMS_SERVICE_URL")
            .map(|value| trim_trailing(&value).to_string());
        if let Some(url) = items_service_url.as_deref() {
            if !is_http_url(url) {
                return Err(ConfigError::Invalid(
                    "LOCKER_ITEMS_SERVICE_URL must start with http:// or https://".to_string(),
                ));
            }
        }

        let timeout_secs = value_or_default(&lookup, "LOCKER_REMOTE_TIMEOUT_SECS", "10")
            .parse::<u64>()
            .map_err(|_| {
                ConfigError::Invalid(
                    "LOCKER_REMOTE_TIMEOUT_SECS must be an integer in [1, 120]".to_string(),
                )
            })?;
        if !(1..=120).contains(&timeout_secs) {
            return Err(ConfigError::Invalid(
                "LOCKER_REMOTE_TIMEOUT_SECS must be in [1, 120]".to_string(),
            ));
        }

        Ok(Self {
            bind_addr,
            items_db_path,
            conflicts_db_path,
            items_service_url,
            remote_timeout: Duration::from_secs(timeout_secs),
            items_api_token: optional_trimmed(&lookup, "LOCKER_ITEMS_API_TOKEN"),
        })
    }
}

fn value_or_default(lookup: impl Fn(&str) -> Option<String>, name: &str, default: &str) -> String {
    optional_trimmed(lookup, name).unwrap_or_else(|| default.to_string())
}

fn optional_trimmed(lookup: impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    lookup(name).and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

fn trim_trailing(value: &str) -> &str {
    value.trim_end_matches('/')
}
