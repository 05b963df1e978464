//! HTTP item client for an item service running as its own process.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::ItemClient;
use crate::models::{BatchResult, Item, ItemOperation, ItemUpdate, UserId};
use crate::{Error, Result};

#[derive(Clone)]
pub struct HttpItemClient {
    base_url: Url,
    token: Option<String>,
    client: reqwest::Client,
}

impl std::fmt::Debug for HttpItemClient {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("HttpItemClient")
            .field("base_url", &self.base_url.as_str())
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish_non_exhaustive()
    }
}

impl HttpItemClient {
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        token: Option<String>,
    ) -> Result<Self> {
        let base_url = normalize_base_url(base_url.into())?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| Error::Remote(error.to_string()))?;
        Ok(Self {
            base_url,
            token: token.filter(|token| !token.trim().is_empty()),
            client,
        })
    }

    /// Build `{base}/v1/users/{user}/items[/...]` with each segment escaped.
    fn items_url(&self, user_id: &UserId, rest: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| Error::Validation("item service URL cannot be a base".into()))?
            .pop_if_empty()
            .extend(["v1", "users", user_id.as_str(), "items"])
            .extend(rest);
        Ok(url)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let request = match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = request
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|error| Error::Remote(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = parse_api_error(status, &body);
            return Err(if status == StatusCode::NOT_FOUND {
                Error::NotFound(message)
            } else {
                Error::Remote(message)
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|error| Error::Remote(format!("invalid response body: {error}")))
    }
}

#[async_trait]
impl ItemClient for HttpItemClient {
    async fn list_data(&self, user_id: &UserId) -> Result<Vec<Item>> {
        let url = self.items_url(user_id, &[])?;
        self.send(self.client.get(url)).await
    }

    async fn update_data(&self, user_id: &UserId, update: ItemUpdate) -> Result<Item> {
        let item_id = update.id.as_str();
        let url = self.items_url(user_id, &[item_id.as_str()])?;
        self.send(self.client.put(url).json(&update)).await
    }

    async fn batch_process(
        &self,
        user_id: &UserId,
        operations: Vec<ItemOperation>,
    ) -> Result<Vec<BatchResult>> {
        let url = self.items_url(user_id, &["batch"])?;
        self.send(self.client.post(url).json(&operations)).await
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<String>,
    message: Option<String>,
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ApiErrorBody>(body) {
        if let Some(message) = payload.message.or(payload.error) {
            return format!("{} ({})", message.trim(), status.as_u16());
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{} ({})", trimmed, status.as_u16())
    }
}

fn normalize_base_url(raw: String) -> Result<Url> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(Error::Validation(
            "item service URL must not be empty".to_string(),
        ));
    }
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(Error::Validation(
            "item service URL must include http:// or https://".to_string(),
        ));
    }
    Url::parse(trimmed.trim_end_matches('/'))
        .map_err(|error| Error::Validation(format!("invalid item service URL: {error}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> HttpItemClient {
        HttpItemClient::new(base, Duration::from_secs(5), Some("secret".into())).unwrap()
    }

    #[test]
    fn normalize_base_url_rejects_invalid_values() {
        assert!(normalize_base_url(String::new()).is_err());
        assert!(normalize_base_url("items.internal:8080".to_string()).is_err());
        assert!(normalize_base_url("https://items.internal/".to_string()).is_ok());
    }

    #[test]
    fn items_url_escapes_user_id() {
        let client = client("http://items.internal:8080/");
        let user = UserId::new("team/alice").unwrap();
        let url = client.items_url(&user, &["batch"]).unwrap();
        assert_eq!(
            url.as_str(),
            "http://items.internal:8080/v1/users/team%2Falice/items/batch"
        );
    }

    #[test]
    fn items_url_keeps_base_path_prefix() {
        let client = client("https://gateway.example.com/items-svc");
        let user = UserId::new("alice").unwrap();
        let url = client.items_url(&user, &[]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://gateway.example.com/items-svc/v1/users/alice/items"
        );
    }

    #[test]
    fn parse_api_error_prefers_json_message() {
        let message =
            parse_api_error(StatusCode::NOT_FOUND, r#"{"error":"Not found: item 1"}"#);
        assert_eq!(message, "Not found: item 1 (404)");
        assert_eq!(
            parse_api_error(StatusCode::BAD_GATEWAY, "  "),
            "HTTP 502".to_string()
        );
    }

    #[test]
    fn debug_redacts_token() {
        let debug = format!("{:?}", client("http://items.internal"));
        assert!(!debug.contains("secret"));
        assert!(debug.contains("[REDACTED]"));
    }
}
