//! Shared utilities for CLI commands.

use anyhow::{Context, Result};
use cday_clockify::{Client, ClientConfig};
use cday_core::{ApiKey, GatewayError, Tz, parse_timezone};

use crate::Config;

/// `--display-timezone` value that selects this machine's timezone.
pub const LOCAL_TIMEZONE: &str = "local";

/// Builds the runtime the async report pipeline runs on.
pub fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")
}

/// Builds a Clockify client from configuration.
pub fn build_client(config: &Config) -> Result<Client> {
    Client::new(ClientConfig {
        base_url: config.base_url.clone(),
        timeout: config.request_timeout(),
        ..ClientConfig::default()
    })
    .context("failed to create Clockify client")
}

/// Picks the API key from `--api-key`, falling back to configuration.
pub fn require_api_key(api_key_override: Option<&str>, config: &Config) -> Result<ApiKey> {
    let Some(raw) = api_key_override.or(config.api_key.as_deref()) else {
        anyhow::bail!(
            "No Clockify API key configured. Pass --api-key, set CDAY_API_KEY, or add api_key to config.toml"
        );
    };
    ApiKey::new(raw).context("invalid API key")
}

/// Resolves a display timezone name; `local` asks the operating system.
///
/// Returns `None` when no name is given so the report timezone is used.
pub fn resolve_display_timezone(name: Option<&str>) -> Result<Option<Tz>> {
    let Some(name) = name else {
        return Ok(None);
    };
    if !name.eq_ignore_ascii_case(LOCAL_TIMEZONE) {
        return parse_timezone(name)
            .map(Some)
            .with_context(|| format!("invalid display timezone: {name}"));
    }

    match iana_time_zone::get_timezone() {
        Ok(local) => parse_timezone(&local)
            .map(Some)
            .with_context(|| format!("unsupported local timezone: {local}")),
        Err(err) => {
            tracing::warn!(error = %err, "could not detect local timezone, using report timezone");
            Ok(None)
        }
    }
}

/// Logs the technical detail and returns the message fit for the user.
pub fn gateway_failure(err: &GatewayError) -> anyhow::Error {
    tracing::error!(error = %err, "Clockify request failed");
    anyhow::anyhow!(err.user_message())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_key_override_wins() {
        let config = Config {
            api_key: Some("from-config".to_string()),
            ..Config::default()
        };
        let key = require_api_key(Some("from-flag"), &config).unwrap();
        assert_eq!(key.expose(), "from-flag");
    }

    #[test]
    fn test_api_key_from_config() {
        let config = Config {
            api_key: Some("  from-config  ".to_string()),
            ..Config::default()
        };
        let key = require_api_key(None, &config).unwrap();
        assert_eq!(key.expose(), "from-config");
    }

    #[test]
    fn test_missing_api_key_is_error() {
        let err = require_api_key(None, &Config::default()).unwrap_err();
        assert!(err.to_string().contains("No Clockify API key"));
    }

    #[test]
    fn test_blank_api_key_is_error() {
        assert!(require_api_key(Some("   "), &Config::default()).is_err());
    }

    #[test]
    fn test_display_timezone_unset() {
        assert_eq!(resolve_display_timezone(None).unwrap(), None);
    }

    #[test]
    fn test_display_timezone_named() {
        assert_eq!(
            resolve_display_timezone(Some("UTC")).unwrap(),
            Some(chrono_tz::UTC)
        );
        assert!(resolve_display_timezone(Some("Mars/Olympus")).is_err());
    }

    #[test]
    fn test_gateway_failure_hides_detail() {
        let err = gateway_failure(&GatewayError::Unauthorized {
            message: "API request failed (HTTP 401). Clockify: secret detail".to_string(),
        });
        assert_eq!(err.to_string(), "Invalid API Key or insufficient permissions.");
    }

    #[test]
    fn test_build_client_rejects_bad_base_url() {
        let config = Config {
            base_url: "not a url".to_string(),
            ..Config::default()
        };
        assert!(build_client(&config).is_err());
    }
}
