//! Core type definitions with validation.

use std::fmt;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for core types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The provided value was empty.
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    /// A negative number of days back was requested.
    #[error("day offset must be non-negative, got {value}")]
    NegativeDayOffset { value: i64 },

    /// The day offset does not fit the supported range.
    #[error("day offset is too large: {value}")]
    DayOffsetTooLarge { value: i64 },

    /// The timezone identifier is not in the IANA database.
    #[error("unknown timezone: {value}")]
    UnknownTimezone { value: String },
}

/// Generates a validated string ID newtype with common trait implementations.
macro_rules! define_string_id {
    (
        $(#[$meta:meta])*
        $name:ident, $field_name:literal
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Creates a new ID after validation.
            pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
                let id = id.into();
                if id.trim().is_empty() {
                    return Err(ValidationError::Empty { field: $field_name });
                }
                Ok(Self(id))
            }

            /// Returns the ID as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_string_id!(
    /// A validated workspace identifier.
    WorkspaceId, "workspace ID"
);

define_string_id!(
    /// A validated user identifier.
    ///
    /// Roster records without one are skipped rather than queried.
    UserId, "user ID"
);

/// A credential for the time-tracking service.
///
/// The key is never printed; `Debug` shows a placeholder.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Creates a key, trimming surrounding whitespace.
    pub fn new(key: impl Into<String>) -> Result<Self, ValidationError> {
        let key = key.into();
        let trimmed = key.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::Empty { field: "API key" });
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Returns the raw key for use in request headers.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey([REDACTED])")
    }
}

/// Number of whole local days before today.
///
/// `0` is today, `1` is yesterday.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct DayOffset(u32);

impl DayOffset {
    pub const TODAY: Self = Self(0);

    /// Validates a caller-supplied offset, rejecting negative values.
    pub fn new(days: i64) -> Result<Self, ValidationError> {
        if days < 0 {
            return Err(ValidationError::NegativeDayOffset { value: days });
        }
        u32::try_from(days)
            .map(Self)
            .map_err(|_| ValidationError::DayOffsetTooLarge { value: days })
    }

    #[must_use]
    pub const fn days(self) -> u32 {
        self.0
    }

    /// Human label for the offset: "Today", "Yesterday" or "N days ago".
    pub fn label(self) -> String {
        match self.0 {
            0 => "Today".to_string(),
            1 => "Yesterday".to_string(),
            n => format!("{n} days ago"),
        }
    }
}

impl fmt::Display for DayOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Parses an IANA timezone name such as `Asia/Tehran`.
pub fn parse_timezone(name: &str) -> Result<Tz, ValidationError> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| ValidationError::UnknownTimezone {
            value: name.to_string(),
        })
}

/// A workspace as reported by the time-tracking service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Workspace {
    pub id: WorkspaceId,
    pub name: String,
}

/// A roster record exactly as the service returned it.
///
/// Fields are optional because the service does not guarantee them;
/// [`User::try_from`] decides whether the record is usable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserRecord {
    pub id: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
}

/// A validated workspace member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl TryFrom<UserRecord> for User {
    type Error = ValidationError;

    fn try_from(record: UserRecord) -> Result<Self, Self::Error> {
        let id = UserId::new(record.id.unwrap_or_default())?;
        let name = record
            .name
            .filter(|name| !name.trim().is_empty())
            .ok_or(ValidationError::Empty { field: "user name" })?;
        Ok(Self {
            id,
            name,
            email: record.email,
        })
    }
}

/// A single time-tracking record, hydrated with project, client and task names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TimeEntry {
    pub description: Option<String>,
    pub project_name: Option<String>,
    pub client_name: Option<String>,
    pub task_name: Option<String>,
    pub start: Option<DateTime<Utc>>,
    /// Absent while the timer is still running.
    pub end: Option<DateTime<Utc>>,
    /// ISO-8601 duration such as `PT1H30M`.
    pub raw_duration: Option<String>,
}

impl TimeEntry {
    /// An entry is running when it has neither an end nor a duration.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.end.is_none() && self.raw_duration.is_none()
    }
}
