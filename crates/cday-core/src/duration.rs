//! Duration classification and formatting.
//!
//! Durations arrive as ISO-8601 strings (`PT1H30M`). Formatting is total:
//! anything that fails to parse is shown verbatim instead of failing the report.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Serialize, Serializer};

/// Marker shown for entries whose timer is still running.
pub const RUNNING: &str = "Running";

/// Placeholder for values the service did not provide.
pub const UNKNOWN: &str = "–";

/// Week, day and time components; years and months are rejected.
static ISO_DURATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^P(?:(\d+)W)?(?:(\d+)D)?(?:T(?:(\d+)H)?(?:(\d+)M)?(?:(\d+)S)?)?$").unwrap()
});

/// A duration split into the components shown to users.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HmsDuration {
    pub hours: u64,
    pub minutes: u64,
    pub seconds: u64,
}

impl fmt::Display for HmsDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::with_capacity(3);
        if self.hours > 0 {
            parts.push(format!("{}h", self.hours));
        }
        if self.minutes > 0 {
            parts.push(format!("{}m", self.minutes));
        }
        if self.seconds > 0 {
            parts.push(format!("{}s", self.seconds));
        }
        if parts.is_empty() {
            return f.write_str("0s");
        }
        f.write_str(&parts.join(" "))
    }
}

/// Outcome of parsing a raw duration string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedDuration {
    Parsed(HmsDuration),
    Unparseable(String),
}

/// Parses an ISO-8601 duration, never failing.
///
/// Weeks and days fold into hours so a 26-hour entry reads `26h`.
pub fn parse_iso_duration(raw: &str) -> ParsedDuration {
    let unparseable = || ParsedDuration::Unparseable(raw.to_string());

    let Some(caps) = ISO_DURATION_RE.captures(raw.trim()) else {
        return unparseable();
    };
    // "P" and "PT" match the pattern but carry no components
    if caps.iter().skip(1).all(|group| group.is_none()) || raw.trim().ends_with('T') {
        return unparseable();
    }

    let component = |index: usize| -> Option<u64> {
        caps.get(index)
            .map_or(Some(0), |m| m.as_str().parse::<u64>().ok())
    };
    let (Some(weeks), Some(days), Some(hours), Some(minutes), Some(seconds)) = (
        component(1),
        component(2),
        component(3),
        component(4),
        component(5),
    ) else {
        return unparseable();
    };

    let total_seconds = weeks
        .checked_mul(7 * 86_400)
        .and_then(|s| s.checked_add(days.checked_mul(86_400)?))
        .and_then(|s| s.checked_add(hours.checked_mul(3_600)?))
        .and_then(|s| s.checked_add(minutes.checked_mul(60)?))
        .and_then(|s| s.checked_add(seconds));
    let Some(total_seconds) = total_seconds else {
        return unparseable();
    };

    ParsedDuration::Parsed(HmsDuration {
        hours: total_seconds / 3_600,
        minutes: (total_seconds % 3_600) / 60,
        seconds: total_seconds % 60,
    })
}

/// How an entry's duration is presented.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayDuration {
    /// A parsed duration such as `1h 30m`.
    Formatted(String),
    /// The timer has not been stopped.
    Running,
    /// The entry ended but carried no duration.
    Unknown,
    /// The service sent something we could not parse; shown as-is.
    Raw(String),
}

impl DisplayDuration {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Formatted(text) | Self::Raw(text) => text,
            Self::Running => RUNNING,
            Self::Unknown => UNKNOWN,
        }
    }

    #[must_use]
    pub const fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }
}

impl fmt::Display for DisplayDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for DisplayDuration {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Classifies and formats an entry's duration.
pub fn format_duration(raw: Option<&str>, end_present: bool) -> DisplayDuration {
    match (raw, end_present) {
        (None, false) => DisplayDuration::Running,
        (None, true) => {
            tracing::debug!("entry has an end but no duration");
            DisplayDuration::Unknown
        }
        (Some(raw), _) => match parse_iso_duration(raw) {
            ParsedDuration::Parsed(duration) => DisplayDuration::Formatted(duration.to_string()),
            ParsedDuration::Unparseable(raw) => {
                tracing::warn!(duration = %raw, "failed to parse entry duration");
                DisplayDuration::Raw(raw)
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn formatted(raw: &str) -> String {
        format_duration(Some(raw), true).to_string()
    }

    #[test]
    fn hours_and_minutes() {
        assert_eq!(formatted("PT1H30M"), "1h 30m");
        assert_eq!(formatted("PT1H30M0S"), "1h 30m");
    }

    #[test]
    fn all_components() {
        assert_eq!(formatted("PT2H5M9S"), "2h 5m 9s");
        assert_eq!(formatted("PT45S"), "45s");
        assert_eq!(formatted("PT1H5S"), "1h 5s");
    }

    #[test]
    fn zero_duration() {
        assert_eq!(formatted("PT0S"), "0s");
        assert_eq!(formatted("PT0H0M0S"), "0s");
    }

    #[test]
    fn days_and_weeks_fold_into_hours() {
        assert_eq!(formatted("P1DT2H"), "26h");
        assert_eq!(formatted("P1W"), "168h");
    }

    #[test]
    fn overlong_minutes_carry_into_hours() {
        assert_eq!(formatted("PT90M"), "1h 30m");
    }

    #[test]
    fn running_when_duration_and_end_absent() {
        assert_eq!(format_duration(None, false), DisplayDuration::Running);
        assert_eq!(format_duration(None, false).to_string(), "Running");
    }

    #[test]
    fn unknown_when_end_present_without_duration() {
        assert_eq!(format_duration(None, true), DisplayDuration::Unknown);
        assert_eq!(format_duration(None, true).to_string(), "–");
    }

    #[test]
    fn malformed_duration_is_shown_raw() {
        for raw in ["1:30:00", "P", "PT", "P1Y", "PT1.5H", "", "PT1H30"] {
            assert_eq!(
                format_duration(Some(raw), true),
                DisplayDuration::Raw(raw.to_string()),
                "{raw:?} should be shown verbatim"
            );
        }
    }

    #[test]
    fn overflowing_duration_is_unparseable() {
        let raw = format!("PT{}H", u64::MAX);
        assert_eq!(parse_iso_duration(&raw), ParsedDuration::Unparseable(raw.clone()));
    }

    #[test]
    fn duration_present_on_open_entry_is_still_formatted() {
        assert_eq!(format_duration(Some("PT10M"), false).to_string(), "10m");
    }
}
