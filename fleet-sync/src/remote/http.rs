//! REST adapter for the remote data service
//!
//! Endpoints, relative to `base_url`:
//! - `GET    /{collection}`       list
//! - `POST   /{collection}`       create, responds `{"id": "..."}`
//! - `PATCH  /{collection}/{id}`  partial update
//! - `DELETE /{collection}/{id}`  delete

use super::RemoteService;
use crate::entity::{Collection, Entity, Payload};
use crate::error::{SyncError, SyncResult};
use crate::id::EntityId;
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// HTTP remote configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpRemoteConfig {
    /// Service base URL
    pub base_url: String,
    /// Bearer token sent with every request
    pub auth_token: Option<String>,
    /// Per-request timeout (seconds)
    pub timeout_secs: u64,
}

impl Default for HttpRemoteConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/api/v1".to_string(),
            auth_token: None,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CreatedResponse {
    id: String,
}

pub struct HttpRemote {
    config: HttpRemoteConfig,
    client: reqwest::Client,
}

impl HttpRemote {
    pub fn new(config: HttpRemoteConfig) -> SyncResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SyncError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    fn url(&self, collection: Collection, id: Option<&EntityId>) -> String {
        let base = self.config.base_url.trim_end_matches('/');
        match id {
            Some(id) => format!("{}/{}/{}", base, collection.path_segment(), id),
            None => format!("{}/{}", base, collection.path_segment()),
        }
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let req = self.client.request(method, url);
        match &self.config.auth_token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn send(&self, req: RequestBuilder) -> SyncResult<Response> {
        let response = req.send().await?;
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        let message = format!("{} {}", status, response.url());
        Err(match status {
            StatusCode::NOT_FOUND => SyncError::NotFound(message),
            StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT => {
                SyncError::Unreachable(message)
            }
            _ => SyncError::Remote(message),
        })
    }
}

#[async_trait]
impl RemoteService for HttpRemote {
    async fn get_all(&self, collection: Collection) -> SyncResult<Vec<Entity>> {
        let url = self.url(collection, None);
        let response = self.send(self.request(Method::GET, &url)).await?;
        Ok(response.json().await?)
    }

    async fn add(&self, collection: Collection, payload: Payload) -> SyncResult<EntityId> {
        let url = self.url(collection, None);
        let response = self
            .send(self.request(Method::POST, &url).json(&payload))
            .await?;
        let created: CreatedResponse = response.json().await?;
        Ok(EntityId::remote(created.id))
    }

    async fn update(&self, collection: Collection, id: &EntityId, patch: Payload) -> SyncResult<()> {
        let url = self.url(collection, Some(id));
        self.send(self.request(Method::PATCH, &url).json(&patch))
            .await?;
        Ok(())
    }

    async fn delete(&self, collection: Collection, id: &EntityId) -> SyncResult<()> {
        let url = self.url(collection, Some(id));
        self.send(self.request(Method::DELETE, &url)).await?;
        Ok(())
    }
}
