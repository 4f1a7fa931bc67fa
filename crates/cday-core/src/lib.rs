//! Core domain logic for the day report.
//!
//! This crate contains:
//! - Window calculation: one local calendar day as a UTC range
//! - Duration formatting: ISO-8601 durations to `1h 30m` style strings
//! - The gateway trait the remote time-tracking service is accessed through
//! - Aggregation: per-user fetches assembled into a [`Report`]

mod aggregate;
pub mod duration;
pub mod gateway;
mod report;
pub mod types;
pub mod window;

pub use aggregate::{
    AggregatorOptions, DEFAULT_CALL_TIMEOUT, DEFAULT_CONCURRENCY, ReportAggregator, ReportError,
    ReportRequest,
};
pub use duration::{DisplayDuration, format_duration};
pub use gateway::{ActivityGateway, GatewayError, GatewayErrorKind};
pub use report::{FormattedEntry, ProgressEvent, Report, ReportNotice, UserReport};
pub use types::{
    ApiKey, DayOffset, TimeEntry, User, UserId, UserRecord, ValidationError, Workspace,
    WorkspaceId, parse_timezone,
};
pub use window::{ReportWindow, WindowError, compute_window};

pub use chrono_tz::Tz;
pub use tokio_util::sync::CancellationToken;
