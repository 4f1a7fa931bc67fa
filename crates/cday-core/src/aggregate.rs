//! Report aggregation.
//!
//! Fetches the roster for a workspace, then each user's entries inside the
//! window with bounded parallelism, and assembles a [`Report`].
//!
//! # Failure policy
//!
//! - Workspace lookup failure: the ID is used as the name.
//! - Roster failure: the whole report fails with [`ReportError::Roster`].
//! - Per-user failure: recorded on that user's [`UserReport`]; other users
//!   are unaffected.
//! - Malformed roster record: skipped with a [`ReportNotice::UserSkipped`].

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use futures::StreamExt;
use futures::stream;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::gateway::{ActivityGateway, GatewayError};
use crate::report::{FormattedEntry, ProgressEvent, Report, ReportNotice, UserReport};
use crate::types::{ApiKey, DayOffset, User, UserRecord, ValidationError, WorkspaceId, parse_timezone};
use crate::window::{ReportWindow, WindowError, compute_window};

/// Per-user fetches in flight at once.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Budget for each gateway call.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(45);

/// Errors that prevent a report from being produced at all.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReportError {
    /// The roster could not be fetched.
    #[error("failed to fetch workspace users: {0}")]
    Roster(#[source] GatewayError),
    /// The requested day could not be turned into a window.
    #[error(transparent)]
    Window(#[from] WindowError),
    /// The build was cancelled before the roster arrived.
    #[error("report cancelled")]
    Cancelled,
}

impl ReportError {
    pub const fn user_message(&self) -> &'static str {
        match self {
            Self::Roster(err) => err.user_message(),
            Self::Window(_) => "The requested day is out of range.",
            Self::Cancelled => "Report cancelled.",
        }
    }
}

/// Validated inputs for one report.
#[derive(Debug, Clone)]
pub struct ReportRequest {
    pub api_key: ApiKey,
    pub workspace_id: WorkspaceId,
    pub day_offset: DayOffset,
    pub timezone: Tz,
    /// Timezone for entry clock times; the report timezone when unset.
    pub display_timezone: Option<Tz>,
}

impl ReportRequest {
    /// Validates raw inputs; negative offsets are rejected.
    pub fn new(
        api_key: impl Into<String>,
        workspace_id: impl Into<String>,
        day_offset_days: i64,
        timezone_id: &str,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            api_key: ApiKey::new(api_key)?,
            workspace_id: WorkspaceId::new(workspace_id)?,
            day_offset: DayOffset::new(day_offset_days)?,
            timezone: parse_timezone(timezone_id)?,
            display_timezone: None,
        })
    }

    #[must_use]
    pub const fn with_display_timezone(mut self, timezone: Tz) -> Self {
        self.display_timezone = Some(timezone);
        self
    }
}

/// Tuning for the fan-out.
#[derive(Debug, Clone)]
pub struct AggregatorOptions {
    pub concurrency: usize,
    pub call_timeout: Duration,
}

impl Default for AggregatorOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }
}

/// Builds reports against an [`ActivityGateway`].
pub struct ReportAggregator {
    gateway: Arc<dyn ActivityGateway>,
    options: AggregatorOptions,
}

impl std::fmt::Debug for ReportAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportAggregator")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// Borrowed inputs shared by every per-user fetch.
struct Scope<'a> {
    api_key: &'a ApiKey,
    workspace_id: &'a WorkspaceId,
    window: &'a ReportWindow,
    display_timezone: Tz,
}

impl ReportAggregator {
    pub fn new(gateway: Arc<dyn ActivityGateway>) -> Self {
        Self {
            gateway,
            options: AggregatorOptions::default(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: AggregatorOptions) -> Self {
        self.options = AggregatorOptions {
            concurrency: options.concurrency.max(1),
            ..options
        };
        self
    }

    /// Computes the window for `request` relative to `now` and builds the report.
    pub async fn generate_report(
        &self,
        request: &ReportRequest,
        now: DateTime<Utc>,
    ) -> Result<Report, ReportError> {
        self.generate_report_with(request, now, &CancellationToken::new(), |_| {})
            .await
    }

    /// Like [`Self::generate_report`], with cancellation and progress reporting.
    pub async fn generate_report_with<F>(
        &self,
        request: &ReportRequest,
        now: DateTime<Utc>,
        cancel: &CancellationToken,
        progress: F,
    ) -> Result<Report, ReportError>
    where
        F: FnMut(ProgressEvent) + Send,
    {
        let window = compute_window(request.timezone, now, request.day_offset)?;
        let display_timezone = request.display_timezone.unwrap_or(request.timezone);
        let scope = Scope {
            api_key: &request.api_key,
            workspace_id: &request.workspace_id,
            window: &window,
            display_timezone,
        };
        let parts = self.collect(&scope, cancel, progress).await?;
        Ok(parts.into_report(window, request.workspace_id.clone(), display_timezone))
    }

    /// Builds a report for an already computed window.
    ///
    /// Clock times are shown in the window's timezone.
    pub async fn build_report(
        &self,
        api_key: &ApiKey,
        workspace_id: &WorkspaceId,
        window: ReportWindow,
    ) -> Result<Report, ReportError> {
        let scope = Scope {
            api_key,
            workspace_id,
            window: &window,
            display_timezone: window.timezone,
        };
        let parts = self
            .collect(&scope, &CancellationToken::new(), |_| {})
            .await?;
        let display_timezone = window.timezone;
        Ok(parts.into_report(window, workspace_id.clone(), display_timezone))
    }

    async fn collect<F>(
        &self,
        scope: &Scope<'_>,
        cancel: &CancellationToken,
        mut progress: F,
    ) -> Result<Collected, ReportError>
    where
        F: FnMut(ProgressEvent) + Send,
    {
        let mut notices = Vec::new();

        let workspace = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(ReportError::Cancelled),
            result = self.call(self.gateway.get_workspace(scope.api_key, scope.workspace_id)) => result,
        };
        let workspace_name = match workspace {
            Ok(workspace) => workspace.name,
            Err(err) => {
                tracing::warn!(workspace_id = %scope.workspace_id, error = %err, "failed to fetch workspace, using ID as name");
                notices.push(ReportNotice::WorkspaceNameUnavailable);
                scope.workspace_id.to_string()
            }
        };

        let roster = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(ReportError::Cancelled),
            result = self.call(self.gateway.list_active_users(scope.api_key, scope.workspace_id)) => result,
        };
        let roster = roster.map_err(|err| {
            tracing::warn!(workspace_id = %scope.workspace_id, error = %err, "failed to fetch workspace users");
            ReportError::Roster(err)
        })?;

        let roster_size = roster.len();
        progress(ProgressEvent::RosterLoaded { total: roster_size });
        tracing::debug!(roster_size, "fetched workspace users");

        let users = validate_roster(roster, &mut notices, &mut progress);
        let (user_reports, complete) = self.fan_out(scope, users, roster_size, cancel, &mut progress).await;
        let any_actions_found = user_reports.iter().any(|report| report.has_entries);

        Ok(Collected {
            workspace_name,
            roster_size,
            user_reports,
            notices,
            any_actions_found,
            complete,
        })
    }

    /// Fetches entries for every user, `concurrency` at a time.
    ///
    /// Returns the finished reports in roster order and whether every user
    /// was fetched before cancellation.
    async fn fan_out<F>(
        &self,
        scope: &Scope<'_>,
        users: Vec<(usize, User)>,
        roster_size: usize,
        cancel: &CancellationToken,
        progress: &mut F,
    ) -> (Vec<UserReport>, bool)
    where
        F: FnMut(ProgressEvent) + Send,
    {
        let total = users.len();
        let mut slots: Vec<Option<UserReport>> = (0..roster_size).map(|_| None).collect();
        let mut finished = 0;
        let mut complete = true;

        let mut fetches = stream::iter(users)
            .map(move |(position, user)| async move { (position, self.fetch_user(scope, user).await) })
            .buffer_unordered(self.options.concurrency);

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    tracing::info!(finished, total, "report cancelled, returning partial results");
                    complete = false;
                    break;
                }
                next = fetches.next() => {
                    let Some((position, report)) = next else { break };
                    finished += 1;
                    slots[position] = Some(report);
                    progress(ProgressEvent::UserFinished { position, finished, total });
                }
            }
        }

        (slots.into_iter().flatten().collect(), complete)
    }

    async fn fetch_user(&self, scope: &Scope<'_>, user: User) -> UserReport {
        let result = self
            .call(self.gateway.list_time_entries(
                scope.api_key,
                scope.workspace_id,
                &user.id,
                scope.window,
            ))
            .await;

        match result {
            Ok(entries) => {
                let entries: Vec<_> = entries
                    .into_iter()
                    .map(|entry| FormattedEntry::new(entry, scope.display_timezone))
                    .collect();
                tracing::debug!(user_id = %user.id, entry_count = entries.len(), "fetched time entries");
                UserReport {
                    user,
                    has_entries: !entries.is_empty(),
                    entries,
                    fetch_error: None,
                }
            }
            Err(err) => {
                tracing::warn!(user_id = %user.id, error = %err, "failed to fetch time entries");
                UserReport {
                    user,
                    entries: Vec::new(),
                    has_entries: false,
                    fetch_error: Some(err),
                }
            }
        }
    }

    async fn call<T>(
        &self,
        request: impl Future<Output = Result<T, GatewayError>>,
    ) -> Result<T, GatewayError> {
        tokio::time::timeout(self.options.call_timeout, request)
            .await
            .unwrap_or(Err(GatewayError::Timeout))
    }
}

/// Splits the roster into queryable users and skip notices.
fn validate_roster<F>(
    roster: Vec<UserRecord>,
    notices: &mut Vec<ReportNotice>,
    progress: &mut F,
) -> Vec<(usize, User)>
where
    F: FnMut(ProgressEvent),
{
    let mut users = Vec::with_capacity(roster.len());
    for (position, record) in roster.into_iter().enumerate() {
        match User::try_from(record.clone()) {
            Ok(user) => users.push((position, user)),
            Err(err) => {
                tracing::warn!(position, ?record, error = %err, "skipping user with incomplete data");
                notices.push(ReportNotice::UserSkipped {
                    position,
                    reason: err.to_string(),
                });
                progress(ProgressEvent::UserSkipped { position });
            }
        }
    }
    users
}

/// Report parts gathered before the window is moved in.
struct Collected {
    workspace_name: String,
    roster_size: usize,
    user_reports: Vec<UserReport>,
    notices: Vec<ReportNotice>,
    any_actions_found: bool,
    complete: bool,
}

impl Collected {
    fn into_report(self, window: ReportWindow, workspace_id: WorkspaceId, display_timezone: Tz) -> Report {
        Report {
            window,
            workspace_id,
            workspace_name: self.workspace_name,
            display_timezone,
            roster_size: self.roster_size,
            user_reports: self.user_reports,
            notices: self.notices,
            any_actions_found: self.any_actions_found,
            complete: self.complete,
        }
    }
}
