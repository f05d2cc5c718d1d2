//! Graph API client
//!
//! Thin wrapper over the remote graph: objects, their named connections, and
//! writes against those connections. Every call attaches the stored access
//! token and goes over the wire; there is no caching and no internal retry.
//!
//! A response carrying a top-level `error` object fails with
//! [`Error::RemoteApi`] whatever the HTTP status. Network failures, including
//! the per-request deadline, fail with [`Error::Transport`].

use crate::config::GraphApiConfig;
use crate::error::{Error, Result};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, instrument, warn};

/// One page of a connection
#[derive(Debug, Clone, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,
}

#[derive(Clone)]
pub struct GraphClient {
    http: Client,
    base_url: String,
    access_token: Option<String>,
}

impl std::fmt::Debug for GraphClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphClient")
            .field("base_url", &self.base_url)
            .field("access_token", &self.access_token.as_ref().map(|_| "****"))
            .finish()
    }
}

impl GraphClient {
    pub fn new(config: &GraphApiConfig, access_token: Option<String>) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("graph-research/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::transport("Failed to build HTTP client", e))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            access_token: access_token.or_else(|| config.access_token.clone()),
        })
    }

    pub fn has_access_token(&self) -> bool {
        self.access_token.is_some()
    }

    /// Fetch a single object from the graph.
    #[instrument(skip(self))]
    pub async fn fetch_object(&self, id: &str) -> Result<Value> {
        validate_id(id)?;
        self.get(id, &[]).await
    }

    /// Fetch several objects in one request, keyed by id.
    #[instrument(skip(self))]
    pub async fn fetch_objects(&self, ids: &[&str]) -> Result<HashMap<String, Value>> {
        if ids.is_empty() {
            return Err(Error::invalid_identifier(""));
        }
        for id in ids {
            validate_id(id)?;
        }

        let value = self.get("", &[("ids", ids.join(","))]).await?;
        serde_json::from_value(value)
            .map_err(|e| Error::invalid_response(format!("ids lookup is not an object map: {}", e)))
    }

    /// Fetch one page of a connection. The response is guaranteed to carry a `data` array.
    #[instrument(skip(self, params))]
    pub async fn fetch_connection(
        &self,
        id: &str,
        connection: &str,
        params: &[(&str, String)],
    ) -> Result<Value> {
        validate_id(id)?;
        validate_connection(connection)?;

        let value = self.get(&format!("{}/{}", id, connection), params).await?;
        if !value.get("data").map_or(false, Value::is_array) {
            return Err(Error::invalid_response(format!(
                "connection {}/{} has no data array",
                id, connection
            )));
        }
        Ok(value)
    }

    /// Fetch one page of a connection and decode its `data` entries.
    pub async fn fetch_connection_data<T: DeserializeOwned>(
        &self,
        id: &str,
        connection: &str,
        params: &[(&str, String)],
    ) -> Result<Vec<T>> {
        let value = self.fetch_connection(id, connection, params).await?;
        let page: Page<T> = serde_json::from_value(value).map_err(|e| {
            Error::invalid_response(format!("malformed {} entry: {}", connection, e))
        })?;
        Ok(page.data)
    }

    /// Write to a connection of the given parent object, e.g. `feed` or `comments`.
    #[instrument(skip(self, payload))]
    pub async fn write_connection(
        &self,
        id: &str,
        connection: &str,
        payload: &[(&str, String)],
    ) -> Result<Value> {
        validate_id(id)?;
        validate_connection(connection)?;
        self.require_token()?;
        self.post(&format!("{}/{}", id, connection), payload).await
    }

    /// Post a status message, with optional attachment fields (`link`, `name`, ...), to a wall.
    pub async fn put_wall_post(
        &self,
        profile_id: &str,
        message: &str,
        attachment: &[(&str, String)],
    ) -> Result<Value> {
        let mut payload = Vec::with_capacity(attachment.len() + 1);
        payload.push(("message", message.to_string()));
        payload.extend(attachment.iter().cloned());
        self.write_connection(profile_id, "feed", &payload).await
    }

    pub async fn put_comment(&self, object_id: &str, message: &str) -> Result<Value> {
        self.write_connection(object_id, "comments", &[("message", message.to_string())])
            .await
    }

    pub async fn put_like(&self, object_id: &str) -> Result<Value> {
        self.write_connection(object_id, "likes", &[]).await
    }

    #[instrument(skip(self))]
    pub async fn delete_object(&self, id: &str) -> Result<()> {
        validate_id(id)?;
        self.require_token()?;
        self.post(id, &[("method", "delete".to_string())]).await?;
        Ok(())
    }

    fn require_token(&self) -> Result<()> {
        if self.access_token.is_none() {
            return Err(Error::MissingAccessToken);
        }
        Ok(())
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn get(&self, path: &str, params: &[(&str, String)]) -> Result<Value> {
        let mut query: Vec<(&str, String)> = params.to_vec();
        if let Some(token) = &self.access_token {
            query.push(("access_token", token.clone()));
        }

        debug!("GET /{}", path);
        let response = self
            .http
            .get(self.url(path))
            .query(&query)
            .send()
            .await
            .map_err(|e| Error::transport(format!("GET /{} failed", path), e))?;

        Self::decode(path, response).await
    }

    async fn post(&self, path: &str, form: &[(&str, String)]) -> Result<Value> {
        let mut body: Vec<(&str, String)> = form.to_vec();
        if let Some(token) = &self.access_token {
            body.push(("access_token", token.clone()));
        }

        debug!("POST /{}", path);
        let response = self
            .http
            .post(self.url(path))
            .form(&body)
            .send()
            .await
            .map_err(|e| Error::transport(format!("POST /{} failed", path), e))?;

        Self::decode(path, response).await
    }

    async fn decode(path: &str, response: Response) -> Result<Value> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::transport(format!("reading /{} response failed", path), e))?;

        let value: Value = serde_json::from_str(&body).map_err(|_| {
            Error::invalid_response(format!("non-JSON body from /{} (status {})", path, status))
        })?;

        if let Some(err) = value.get("error").filter(|e| !e.is_null()) {
            let kind = err
                .get("type")
                .and_then(Value::as_str)
                .unwrap_or("UnknownError");
            let message = err
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("no message");
            warn!("Graph API error on /{}: {} ({})", path, message, kind);
            return Err(Error::remote_api(kind, message));
        }

        Ok(value)
    }
}

/// Object ids are numeric ids, `me`, usernames, or compound post ids (`123_456`).
/// Anything that could escape the path or the `ids` list is rejected before any request.
pub fn validate_id(id: &str) -> Result<()> {
    let valid = !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'));
    if valid {
        Ok(())
    } else {
        Err(Error::invalid_identifier(id))
    }
}

fn validate_connection(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(Error::invalid_identifier(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_id() {
        assert!(validate_id("me").is_ok());
        assert!(validate_id("100001234567").is_ok());
        assert!(validate_id("100001234567_987654").is_ok());
        assert!(validate_id("john.doe").is_ok());

        assert!(validate_id("").is_err());
        assert!(validate_id("me/friends").is_err());
        assert!(validate_id("1,2").is_err());
        assert!(validate_id("me?access_token=x").is_err());
        assert!(validate_id("a b").is_err());
    }

    #[test]
    fn test_validate_connection() {
        assert!(validate_connection("friends").is_ok());
        assert!(validate_connection("feed").is_ok());
        assert!(validate_connection("").is_err());
        assert!(validate_connection("feed/extra").is_err());
    }

    #[test]
    fn test_debug_hides_token() {
        let client =
            GraphClient::new(&GraphApiConfig::default(), Some("EAAB-secret".into())).unwrap();
        assert!(client.has_access_token());
        assert!(!format!("{:?}", client).contains("EAAB-secret"));
    }

    #[tokio::test]
    async fn test_invalid_ids_rejected_before_network() {
        // Unroutable base URL: any request would be a transport error, not an identifier error.
        let config = GraphApiConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            ..GraphApiConfig::default()
        };
        let client = GraphClient::new(&config, None).unwrap();

        assert!(matches!(
            client.fetch_object("a/b").await,
            Err(Error::InvalidIdentifier { .. })
        ));
        assert!(matches!(
            client.fetch_objects(&[]).await,
            Err(Error::InvalidIdentifier { .. })
        ));
        assert!(matches!(
            client.fetch_objects(&["1", "2,3"]).await,
            Err(Error::InvalidIdentifier { .. })
        ));
    }

    #[tokio::test]
    async fn test_writes_require_token() {
        let client = GraphClient::new(&GraphApiConfig::default(), None).unwrap();
        assert!(matches!(
            client.put_like("123_456").await,
            Err(Error::MissingAccessToken)
        ));
        assert!(matches!(
            client.delete_object("123_456").await,
            Err(Error::MissingAccessToken)
        ));
    }
}
