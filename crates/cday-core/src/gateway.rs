//! The boundary to the remote time-tracking service.

use async_trait::async_trait;
use thiserror::Error;

use crate::types::{ApiKey, TimeEntry, UserId, UserRecord, Workspace, WorkspaceId};
use crate::window::ReportWindow;

/// Gateway errors.
///
/// `Display` carries the technical detail for logs; use
/// [`GatewayError::user_message`] for anything shown to an end user.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// The service could not be reached.
    #[error("transport error: {message}")]
    Transport { message: String },
    /// The call did not complete within its time budget.
    #[error("request timed out")]
    Timeout,
    /// The credential was rejected.
    #[error("unauthorized: {message}")]
    Unauthorized { message: String },
    /// The service answered with a failure status.
    #[error("upstream error (HTTP {status}): {message}")]
    Upstream { status: u16, message: String },
    /// The service answered with a body we could not decode.
    #[error("invalid response: {message}")]
    InvalidResponse { message: String },
}

/// Coarse classification used to pick a user-facing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayErrorKind {
    Transport,
    Authorization,
    Upstream,
}

impl GatewayError {
    pub const fn kind(&self) -> GatewayErrorKind {
        match self {
            Self::Transport { .. } | Self::Timeout => GatewayErrorKind::Transport,
            Self::Unauthorized { .. } => GatewayErrorKind::Authorization,
            Self::Upstream { .. } | Self::InvalidResponse { .. } => GatewayErrorKind::Upstream,
        }
    }

    /// Message safe to show to an end user; never includes upstream detail.
    pub const fn user_message(&self) -> &'static str {
        match self.kind() {
            GatewayErrorKind::Transport => {
                "A network error occurred while contacting the API. Please try again."
            }
            GatewayErrorKind::Authorization => "Invalid API Key or insufficient permissions.",
            GatewayErrorKind::Upstream => "An error occurred while fetching data from Clockify.",
        }
    }
}

/// Read access to workspaces, rosters and time entries.
///
/// Implementations must be cheap to share; the aggregator calls
/// [`ActivityGateway::list_time_entries`] concurrently for different users.
#[async_trait]
pub trait ActivityGateway: Send + Sync {
    async fn list_workspaces(&self, api_key: &ApiKey) -> Result<Vec<Workspace>, GatewayError>;

    async fn get_workspace(
        &self,
        api_key: &ApiKey,
        workspace_id: &WorkspaceId,
    ) -> Result<Workspace, GatewayError>;

    /// Lists the active members of a workspace, in the service's order.
    async fn list_active_users(
        &self,
        api_key: &ApiKey,
        workspace_id: &WorkspaceId,
    ) -> Result<Vec<UserRecord>, GatewayError>;

    /// Lists a user's entries that fall inside `window`, with project,
    /// client and task names resolved.
    async fn list_time_entries(
        &self,
        api_key: &ApiKey,
        workspace_id: &WorkspaceId,
        user_id: &UserId,
        window: &ReportWindow,
    ) -> Result<Vec<TimeEntry>, GatewayError>;
}
