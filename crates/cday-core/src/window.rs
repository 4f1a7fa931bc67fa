//! Calendar-day windows anchored to a named timezone.
//!
//! A window covers local `00:00:00` through local `23:59:59` of one day.
//! Across a DST transition the UTC span is not 24h; the window follows the
//! wall clock, not elapsed time.

use chrono::{
    DateTime, Days, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, TimeDelta,
    TimeZone, Utc,
};
use chrono_tz::Tz;
use serde::Serialize;
use thiserror::Error;

use crate::types::DayOffset;

/// Largest DST gap we search across when a local time does not exist.
const MAX_GAP_MINUTES: i64 = 3 * 60;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WindowError {
    /// The requested day lies outside the representable calendar.
    #[error("cannot go back {offset} days from {today}")]
    OutOfRange { today: NaiveDate, offset: DayOffset },
    /// A local time could not be mapped to an instant in the timezone.
    #[error("local time {local} does not exist in {}", timezone.name())]
    Unresolvable { local: NaiveDateTime, timezone: Tz },
}

/// One local calendar day expressed as a UTC range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportWindow {
    pub timezone: Tz,
    pub local_date: NaiveDate,
    pub start_utc: DateTime<Utc>,
    pub end_utc: DateTime<Utc>,
    pub day_label: String,
}

impl ReportWindow {
    /// Lower query bound, e.g. `2025-01-28T20:30:00Z`.
    pub fn start_param(&self) -> String {
        self.start_utc.to_rfc3339_opts(SecondsFormat::Secs, true)
    }

    /// Upper query bound, e.g. `2025-01-29T20:29:59Z`.
    pub fn end_param(&self) -> String {
        self.end_utc.to_rfc3339_opts(SecondsFormat::Secs, true)
    }
}

/// Which instant to keep when a local time maps to zero or two instants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bias {
    /// Earlier of an ambiguous pair; first instant after a gap.
    Start,
    /// Later of an ambiguous pair; last instant before a gap.
    End,
}

/// Computes the window for the day `offset` days before `now` in `timezone`.
pub fn compute_window(
    timezone: Tz,
    now: DateTime<Utc>,
    offset: DayOffset,
) -> Result<ReportWindow, WindowError> {
    let today = now.with_timezone(&timezone).date_naive();
    let local_date = today
        .checked_sub_days(Days::new(u64::from(offset.days())))
        .ok_or(WindowError::OutOfRange { today, offset })?;

    let start_of_day = local_date.and_time(NaiveTime::MIN);
    let end_of_day = local_date.and_time(last_second());

    let start_utc = resolve_local(timezone, start_of_day, Bias::Start)?;
    let end_utc = resolve_local(timezone, end_of_day, Bias::End)?;

    tracing::debug!(
        timezone = timezone.name(),
        %local_date,
        start = %start_utc,
        end = %end_utc,
        "computed report window"
    );

    Ok(ReportWindow {
        timezone,
        local_date,
        start_utc,
        end_utc,
        day_label: offset.label(),
    })
}

fn last_second() -> NaiveTime {
    NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN)
}

/// Maps a local wall-clock time to UTC, stepping out of DST gaps.
fn resolve_local(
    timezone: Tz,
    local: NaiveDateTime,
    bias: Bias,
) -> Result<DateTime<Utc>, WindowError> {
    match timezone.from_local_datetime(&local) {
        LocalResult::Single(dt) => Ok(dt.with_timezone(&Utc)),
        LocalResult::Ambiguous(earlier, later) => Ok(match bias {
            Bias::Start => earlier.with_timezone(&Utc),
            Bias::End => later.with_timezone(&Utc),
        }),
        LocalResult::None => {
            // Walk minute by minute out of the gap; tz offsets are whole minutes,
            // so the first hit is the gap boundary.
            let step = match bias {
                Bias::Start => TimeDelta::minutes(1),
                Bias::End => TimeDelta::minutes(-1),
            };
            let mut candidate = local;
            for _ in 0..MAX_GAP_MINUTES {
                candidate += step;
                if let Some(dt) = timezone.from_local_datetime(&candidate).earliest() {
                    return Ok(dt.with_timezone(&Utc));
                }
            }
            Err(WindowError::Unresolvable { local, timezone })
        }
    }
}
