//! Clockify JSON payloads and their conversion into core types.

use cday_core::{GatewayError, TimeEntry, UserRecord, Workspace, WorkspaceId};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
pub(crate) struct WorkspacePayload {
    id: String,
    name: String,
}

impl TryFrom<WorkspacePayload> for Workspace {
    type Error = GatewayError;

    fn try_from(payload: WorkspacePayload) -> Result<Self, Self::Error> {
        let id = WorkspaceId::new(payload.id).map_err(|err| GatewayError::InvalidResponse {
            message: err.to_string(),
        })?;
        Ok(Self {
            id,
            name: payload.name,
        })
    }
}

/// Roster member; every field is optional so one bad record cannot fail the page.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct UserPayload {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    email: Option<String>,
}

impl From<UserPayload> for UserRecord {
    fn from(payload: UserPayload) -> Self {
        Self {
            id: payload.id,
            name: payload.name,
            email: payload.email,
        }
    }
}

/// A hydrated time entry (`hydrated=true`).
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TimeEntryPayload {
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    time_interval: Option<TimeIntervalPayload>,
    #[serde(default)]
    project: Option<ProjectPayload>,
    #[serde(default)]
    task: Option<TaskPayload>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct TimeIntervalPayload {
    #[serde(default)]
    start: Option<DateTime<Utc>>,
    #[serde(default)]
    end: Option<DateTime<Utc>>,
    #[serde(default)]
    duration: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ProjectPayload {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    client_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct TaskPayload {
    #[serde(default)]
    name: Option<String>,
}

impl From<TimeEntryPayload> for TimeEntry {
    fn from(payload: TimeEntryPayload) -> Self {
        let interval = payload.time_interval.unwrap_or_default();
        let (project_name, client_name) = payload
            .project
            .map_or((None, None), |project| {
                (non_empty(project.name), non_empty(project.client_name))
            });
        Self {
            description: non_empty(payload.description),
            project_name,
            client_name,
            task_name: payload.task.and_then(|task| non_empty(task.name)),
            start: interval.start,
            end: interval.end,
            raw_duration: non_empty(interval.duration),
        }
    }
}

/// Decodes one roster element.
///
/// An element that does not have the expected shape becomes an empty record,
/// which the aggregator skips with a notice.
pub(crate) fn user_record(position: usize, value: Value) -> UserRecord {
    match serde_json::from_value::<UserPayload>(value) {
        Ok(payload) => UserRecord::from(payload),
        Err(err) => {
            tracing::warn!(position, error = %err, "undecodable roster record");
            UserRecord::default()
        }
    }
}

/// Decodes one time entry; an undecodable entry is dropped.
pub(crate) fn time_entry(position: usize, value: Value) -> Option<TimeEntry> {
    match serde_json::from_value::<TimeEntryPayload>(value) {
        Ok(payload) => Some(TimeEntry::from(payload)),
        Err(err) => {
            tracing::warn!(position, error = %err, "dropping undecodable time entry");
            None
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|text| !text.trim().is_empty())
}

/// Clockify's error body, e.g. `{"message":"Api key does not exist","code":4003}`.
#[derive(Debug, Deserialize)]
struct ErrorPayload {
    message: Option<String>,
    code: Option<i64>,
}

/// Maps a non-success status and body to a gateway error.
pub(crate) fn status_error(status: u16, body: &str) -> GatewayError {
    let mut message = format!("API request failed (HTTP {status}).");
    if let Ok(payload) = serde_json::from_str::<ErrorPayload>(body) {
        if let Some(detail) = payload.message {
            message.push_str(&format!(" Clockify: {detail}"));
        }
        if let Some(code) = payload.code {
            message.push_str(&format!(" (Code: {code})"));
        }
    }

    match status {
        401 | 403 => GatewayError::Unauthorized { message },
        _ => GatewayError::Upstream { status, message },
    }
}
