//! Client for the REST collaborator.
//!
//! Every request goes through [`ApiClient::send`], which attaches the stored
//! token as a bearer credential and enforces session expiry: a 401 while a
//! token is stored clears the token and user-id reference and surfaces as
//! [`BackendError::SessionRejected`], whatever endpoint was called.

use async_trait::async_trait;
use console_core::observability::{TracedClientExt, TracedRequest};
use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;

use crate::models::{PermissionGrant, RecordId, Role, User};
use crate::services::storage::TokenStore;

/// Error name the backend uses in 401 bodies for an expired token.
pub const TOKEN_EXPIRED_ERROR: &str = "TokenExpiredError";

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Backend unreachable: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("Backend returned {status} for {path}")]
    Status { status: StatusCode, path: String },

    #[error("Unexpected backend payload from {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    /// Record id that would not stay a single path segment.
    #[error("Invalid record id: {0:?}")]
    InvalidId(String),

    /// 401 while a token was stored. Stored credentials are already cleared.
    #[error("Session rejected by backend (expired: {expired})")]
    SessionRejected { expired: bool },
}

impl BackendError {
    pub fn is_session_rejected(&self) -> bool {
        matches!(self, BackendError::SessionRejected { .. })
    }
}

/// Lookups the auth session and permission registry depend on.
#[async_trait]
pub trait Directory: Send + Sync {
    /// `GET /users?email=<e>`
    async fn find_users_by_email(&self, email: &str) -> Result<Vec<User>, BackendError>;
    /// `GET /users/:id`
    async fn fetch_user(&self, id: &str) -> Result<User, BackendError>;
    /// `GET /roles`
    async fn fetch_roles(&self) -> Result<Vec<Role>, BackendError>;
    /// `GET /permissions?roleId=<id>`
    async fn fetch_grants(&self, role_id: &RecordId) -> Result<Vec<PermissionGrant>, BackendError>;
}

#[derive(Deserialize)]
struct RejectionBody {
    error: Option<RejectionDetail>,
}

#[derive(Deserialize)]
struct RejectionDetail {
    name: Option<String>,
}

#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    store: TokenStore,
    request_id: Option<String>,
}

impl ApiClient {
    pub fn new(client: Client, base_url: impl Into<String>, store: TokenStore) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            store,
            request_id: None,
        }
    }

    /// Forward the inbound correlation id on every backend call.
    pub fn with_request_id(mut self, request_id: Option<String>) -> Self {
        self.request_id = request_id;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// `/<resource>/<id>`, refusing ids that could climb out of `resource`.
    fn record_path(resource: &str, id: &str) -> Result<String, BackendError> {
        if !is_plain_segment(id) {
            tracing::warn!(%resource, id, "Rejected record id");
            return Err(BackendError::InvalidId(id.to_string()));
        }
        Ok(format!("/{}/{}", resource, id))
    }

    async fn send(
        &self,
        path: &str,
        request: TracedRequest,
    ) -> Result<reqwest::Response, BackendError> {
        let token = self.store.token().await.unwrap_or_else(|e| {
            tracing::warn!("Could not read stored token: {}", e);
            None
        });
        let had_token = token.is_some();

        let request = match token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = request
            .request_id(self.request_id.as_deref())
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to send request to {}: {}", path, e);
                BackendError::Transport(e)
            })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED && had_token {
            let expired = response
                .json::<RejectionBody>()
                .await
                .ok()
                .and_then(|body| body.error)
                .and_then(|detail| detail.name)
                .is_some_and(|name| name == TOKEN_EXPIRED_ERROR);

            tracing::warn!(%path, expired, "Backend rejected session token");
            metrics::counter!("console_session_rejections_total").increment(1);

            if let Err(e) = self.store.clear().await {
                tracing::error!("Failed to clear rejected session: {}", e);
            }
            return Err(BackendError::SessionRejected { expired });
        }

        if status == StatusCode::NOT_FOUND {
            return Err(BackendError::NotFound(path.to_string()));
        }

        if !status.is_success() {
            tracing::error!(%path, %status, "Backend request failed");
            return Err(BackendError::Status {
                status,
                path: path.to_string(),
            });
        }

        Ok(response)
    }

    async fn decode<T: DeserializeOwned>(
        path: &str,
        response: reqwest::Response,
    ) -> Result<T, BackendError> {
        response
            .json::<T>()
            .await
            .map_err(|source| BackendError::Decode {
                path: path.to_string(),
                source,
            })
    }

    /// `GET /<resource>?<query>`
    pub async fn list<T: DeserializeOwned>(
        &self,
        resource: &str,
        query: &[(&str, &str)],
    ) -> Result<Vec<T>, BackendError> {
        let path = format!("/{}", resource);
        let request = self.client.traced_get(&self.url(&path)).query(query);
        let response = self.send(&path, request).await?;
        Self::decode(&path, response).await
    }

    /// `GET /<resource>/:id`
    pub async fn get<T: DeserializeOwned>(&self, resource: &str, id: &str) -> Result<T, BackendError> {
        let path = Self::record_path(resource, id)?;
        let request = self.client.traced_get(&self.url(&path));
        let response = self.send(&path, request).await?;
        Self::decode(&path, response).await
    }

    /// `POST /<resource>`
    pub async fn create<B, T>(&self, resource: &str, body: &B) -> Result<T, BackendError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let path = format!("/{}", resource);
        let request = self.client.traced_post(&self.url(&path)).json(body);
        let response = self.send(&path, request).await?;
        Self::decode(&path, response).await
    }

    /// `PUT /<resource>/:id`
    pub async fn update<B, T>(&self, resource: &str, id: &str, body: &B) -> Result<T, BackendError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let path = Self::record_path(resource, id)?;
        let request = self.client.traced_put(&self.url(&path)).json(body);
        let response = self.send(&path, request).await?;
        Self::decode(&path, response).await
    }

    /// `DELETE /<resource>/:id`
    pub async fn delete(&self, resource: &str, id: &str) -> Result<(), BackendError> {
        let path = Self::record_path(resource, id)?;
        let request = self.client.traced_delete(&self.url(&path));
        self.send(&path, request).await?;
        Ok(())
    }
}

/// Ids are decoded path parameters; only a non-empty segment without
/// separators, escapes or dot-segments is forwarded.
fn is_plain_segment(id: &str) -> bool {
    !id.is_empty()
        && id != "."
        && id != ".."
        && !id
            .chars()
            .any(|c| matches!(c, '/' | '\\' | '?' | '#' | '%') || c.is_control() || c.is_whitespace())
}

#[async_trait]
impl Directory for ApiClient {
    async fn find_users_by_email(&self, email: &str) -> Result<Vec<User>, BackendError> {
        self.list("users", &[("email", email)]).await
    }

    async fn fetch_user(&self, id: &str) -> Result<User, BackendError> {
        self.get("users", id).await
    }

    async fn fetch_roles(&self) -> Result<Vec<Role>, BackendError> {
        self.list("roles", &[]).await
    }

    async fn fetch_grants(&self, role_id: &RecordId) -> Result<Vec<PermissionGrant>, BackendError> {
        let role_id = role_id.to_string();
        self.list("permissions", &[("roleId", role_id.as_str())])
            .await
    }
}
