//! Report values produced by the aggregator.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use crate::duration::{DisplayDuration, RUNNING, UNKNOWN, format_duration};
use crate::gateway::GatewayError;
use crate::types::{TimeEntry, User, WorkspaceId};
use crate::window::ReportWindow;

/// A time entry with its display strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormattedEntry {
    #[serde(flatten)]
    pub entry: TimeEntry,
    pub display_start: String,
    pub display_end: String,
    pub display_duration: DisplayDuration,
}

impl FormattedEntry {
    /// Formats `entry` with clock times shown in `display_timezone`.
    pub fn new(entry: TimeEntry, display_timezone: Tz) -> Self {
        let display_duration = format_duration(entry.raw_duration.as_deref(), entry.end.is_some());
        let display_start = entry.start.map_or_else(
            || UNKNOWN.to_string(),
            |start| clock_time(start, display_timezone),
        );
        let display_end = match entry.end {
            Some(end) => clock_time(end, display_timezone),
            None if display_duration.is_running() => RUNNING.to_string(),
            None => UNKNOWN.to_string(),
        };
        Self {
            entry,
            display_start,
            display_end,
            display_duration,
        }
    }
}

/// `HH:MM:SS (ABBR)` in the given timezone.
fn clock_time(instant: DateTime<Utc>, timezone: Tz) -> String {
    instant
        .with_timezone(&timezone)
        .format("%H:%M:%S (%Z)")
        .to_string()
}

/// One user's section of the report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserReport {
    pub user: User,
    /// In the order the service returned them.
    pub entries: Vec<FormattedEntry>,
    pub has_entries: bool,
    pub fetch_error: Option<GatewayError>,
}

/// Non-fatal problems worth showing alongside the report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportNotice {
    /// The workspace lookup failed; its ID stands in for the name.
    WorkspaceNameUnavailable,
    /// A roster record lacked an ID or name and was not queried.
    UserSkipped { position: usize, reason: String },
}

impl ReportNotice {
    pub const fn message(&self) -> &'static str {
        match self {
            Self::WorkspaceNameUnavailable => "Could not fetch workspace name. Using ID.",
            Self::UserSkipped { .. } => "Skipping a user due to incomplete data.",
        }
    }
}

/// Everything needed to render one day's activity for a workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub window: ReportWindow,
    pub workspace_id: WorkspaceId,
    pub workspace_name: String,
    pub display_timezone: Tz,
    /// Records in the roster, including skipped ones.
    pub roster_size: usize,
    /// In roster order.
    pub user_reports: Vec<UserReport>,
    pub notices: Vec<ReportNotice>,
    /// At least one user had at least one entry in the window.
    pub any_actions_found: bool,
    /// False when the build was cancelled before every user was fetched.
    pub complete: bool,
}

impl Report {
    /// Every user was checked successfully and none had activity.
    pub fn is_all_clear(&self) -> bool {
        self.complete
            && !self.any_actions_found
            && !self.user_reports.is_empty()
            && self
                .user_reports
                .iter()
                .all(|report| report.fetch_error.is_none())
    }

    pub fn failed_users(&self) -> impl Iterator<Item = &UserReport> {
        self.user_reports
            .iter()
            .filter(|report| report.fetch_error.is_some())
    }
}

/// Progress signals emitted while a report is being built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressEvent {
    RosterLoaded { total: usize },
    UserSkipped { position: usize },
    UserFinished {
        position: usize,
        finished: usize,
        total: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::{America, Asia};

    fn entry(start: Option<(u32, u32)>, end: Option<(u32, u32)>, duration: Option<&str>) -> TimeEntry {
        let at = |(h, m): (u32, u32)| Utc.with_ymd_and_hms(2025, 1, 29, h, m, 0).unwrap();
        TimeEntry {
            description: Some("Review".to_string()),
            start: start.map(at),
            end: end.map(at),
            raw_duration: duration.map(str::to_string),
            ..TimeEntry::default()
        }
    }

    #[test]
    fn clock_times_use_display_timezone() {
        let formatted = FormattedEntry::new(
            entry(Some((6, 0)), Some((7, 30)), Some("PT1H30M")),
            Asia::Tehran,
        );
        assert!(formatted.display_start.starts_with("09:30:00 ("));
        assert!(formatted.display_end.starts_with("11:00:00 ("));
        assert_eq!(formatted.display_duration.to_string(), "1h 30m");

        let formatted = FormattedEntry::new(
            entry(Some((6, 0)), Some((7, 30)), Some("PT1H30M")),
            America::New_York,
        );
        assert_eq!(formatted.display_start, "01:00:00 (EST)");
    }

    #[test]
    fn running_entry_shows_running_end() {
        let formatted = FormattedEntry::new(entry(Some((6, 0)), None, None), Asia::Tehran);
        assert_eq!(formatted.display_end, "Running");
        assert_eq!(formatted.display_duration, DisplayDuration::Running);
    }

    #[test]
    fn missing_times_show_placeholder() {
        let formatted = FormattedEntry::new(entry(None, None, Some("PT5M")), Asia::Tehran);
        assert_eq!(formatted.display_start, "–");
        assert_eq!(formatted.display_end, "–");
        assert_eq!(formatted.display_duration.to_string(), "5m");
    }
}
