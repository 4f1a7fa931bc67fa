//! Configuration loading and management.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

/// Timezone that defines a report day unless configured otherwise.
pub const DEFAULT_TIMEZONE: &str = "Asia/Tehran";

/// Application configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Clockify API key.
    pub api_key: Option<String>,
    /// Workspace reported on when `--workspace` is not given.
    pub workspace_id: Option<String>,
    /// IANA timezone that defines the report day.
    pub timezone: String,
    /// Timezone for entry clock times; `local` means this machine's zone.
    pub display_timezone: Option<String>,
    /// Clockify API root.
    pub base_url: String,
    /// Maximum number of users fetched at once.
    pub concurrency: usize,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("workspace_id", &self.workspace_id)
            .field("timezone", &self.timezone)
            .field("display_timezone", &self.display_timezone)
            .field("base_url", &self.base_url)
            .field("concurrency", &self.concurrency)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            workspace_id: None,
            timezone: DEFAULT_TIMEZONE.to_string(),
            display_timezone: None,
            base_url: cday_clockify::DEFAULT_BASE_URL.to_string(),
            concurrency: cday_core::DEFAULT_CONCURRENCY,
            request_timeout_secs: cday_clockify::DEFAULT_TIMEOUT.as_secs(),
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (CDAY_*)
        figment = figment.merge(Env::prefixed("CDAY_"));

        figment.extract()
    }

    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Returns the platform-specific config directory for cday.
///
/// On Linux: `~/.config/cday`
pub fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("cday"))
}
