//! Clockify API client for the day report.
//!
//! Implements [`ActivityGateway`] over the Clockify REST API
//! (`https://api.clockify.me/api/v1`).

mod wire;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use cday_core::{
    ActivityGateway, ApiKey, GatewayError, ReportWindow, TimeEntry, UserId, UserRecord,
    Workspace, WorkspaceId,
};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::wire::{WorkspacePayload, status_error};

pub const DEFAULT_BASE_URL: &str = "https://api.clockify.me/api/v1";

/// Default request timeout for API calls.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(45);

const DEFAULT_PAGE_SIZE: usize = 200;

/// Upper bound on pages followed for one listing.
const MAX_PAGES: usize = 50;

const USER_AGENT: &str = concat!("cday/", env!("CARGO_PKG_VERSION"));

/// Connection settings for [`Client`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub page_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Clockify API client.
///
/// Holds no credential; the API key is passed with every call.
///
/// # Thread Safety
///
/// The client is safe to clone and share across threads. Each clone shares
/// the underlying HTTP connection pool.
#[derive(Clone)]
pub struct Client {
    http: reqwest::Client,
    base_url: String,
    page_size: usize,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.base_url)
            .field("page_size", &self.page_size)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Creates a new client.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is empty or not HTTP(S), or if the
    /// HTTP client fails to build.
    pub fn new(config: ClientConfig) -> Result<Self, GatewayError> {
        let base_url = config.base_url.trim().trim_end_matches('/').to_string();
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(GatewayError::Transport {
                message: format!("invalid base URL: {:?}", config.base_url),
            });
        }

        // Build HTTP client with timeout
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|err| GatewayError::Transport {
                message: format!("failed to build HTTP client: {err}"),
            })?;

        Ok(Self {
            http,
            base_url,
            page_size: config.page_size.max(1),
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        api_key: &ApiKey,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, GatewayError> {
        let url = format!("{}{path}", self.base_url);
        tracing::debug!(%url, "Clockify request");

        let response = self
            .http
            .get(&url)
            .header("X-Api-Key", api_key.expose())
            .query(query)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;
        if !status.is_success() {
            let err = status_error(status.as_u16(), &body);
            tracing::warn!(%url, status = status.as_u16(), error = %err, "Clockify request failed");
            return Err(err);
        }

        serde_json::from_str(&body).map_err(|err| {
            tracing::warn!(%url, error = %err, "failed to decode Clockify response");
            GatewayError::InvalidResponse {
                message: err.to_string(),
            }
        })
    }

    /// Follows `page` until a page comes back shorter than `page-size`.
    async fn get_paged<T: DeserializeOwned>(
        &self,
        api_key: &ApiKey,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>, GatewayError> {
        let mut items = Vec::new();
        for page in 1..=MAX_PAGES {
            let mut params = query.to_vec();
            params.push(("page", page.to_string()));
            params.push(("page-size", self.page_size.to_string()));

            let batch: Vec<T> = self.get_json(api_key, path, &params).await?;
            let len = batch.len();
            items.extend(batch);
            if len < self.page_size {
                return Ok(items);
            }
        }
        tracing::warn!(path, pages = MAX_PAGES, "stopped following pages");
        Ok(items)
    }
}

fn transport_error(err: reqwest::Error) -> GatewayError {
    if err.is_timeout() {
        tracing::warn!(error = %err, "Clockify request timed out");
        GatewayError::Timeout
    } else {
        tracing::warn!(error = %err, "failed to reach Clockify");
        GatewayError::Transport {
            message: err.to_string(),
        }
    }
}

#[async_trait]
impl ActivityGateway for Client {
    async fn list_workspaces(&self, api_key: &ApiKey) -> Result<Vec<Workspace>, GatewayError> {
        let payloads: Vec<WorkspacePayload> = self.get_json(api_key, "/workspaces", &[]).await?;
        payloads.into_iter().map(Workspace::try_from).collect()
    }

    async fn get_workspace(
        &self,
        api_key: &ApiKey,
        workspace_id: &WorkspaceId,
    ) -> Result<Workspace, GatewayError> {
        let path = format!("/workspaces/{workspace_id}");
        let payload: WorkspacePayload = self.get_json(api_key, &path, &[]).await?;
        Workspace::try_from(payload)
    }

    async fn list_active_users(
        &self,
        api_key: &ApiKey,
        workspace_id: &WorkspaceId,
    ) -> Result<Vec<UserRecord>, GatewayError> {
        let path = format!("/workspaces/{workspace_id}/users");
        let query = [("status", "ACTIVE".to_string())];
        // Decoded per element so one bad record cannot fail the roster
        let values: Vec<Value> = self.get_paged(api_key, &path, &query).await?;
        Ok(values
            .into_iter()
            .enumerate()
            .map(|(position, value)| wire::user_record(position, value))
            .collect())
    }

    async fn list_time_entries(
        &self,
        api_key: &ApiKey,
        workspace_id: &WorkspaceId,
        user_id: &UserId,
        window: &ReportWindow,
    ) -> Result<Vec<TimeEntry>, GatewayError> {
        let path = format!("/workspaces/{workspace_id}/user/{user_id}/time-entries");
        let query = [
            ("start", window.start_param()),
            ("end", window.end_param()),
            ("hydrated", "true".to_string()),
            ("consider-duration-format", "true".to_string()),
        ];
        let values: Vec<Value> = self.get_paged(api_key, &path, &query).await?;
        Ok(values
            .into_iter()
            .enumerate()
            .filter_map(|(position, value)| wire::time_entry(position, value))
            .collect())
    }
}
