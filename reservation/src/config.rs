//! Configuration management for the reservation wizard.
//!
//! Loads configuration from environment variables with sensible defaults.

use chrono::{FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Offset of Asia/Ho_Chi_Minh, in minutes
const DEFAULT_UTC_OFFSET_MINUTES: i32 = 7 * 60;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Restaurant API configuration
    pub api: ApiConfig,
    /// Wizard behaviour
    pub wizard: WizardConfig,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Run against the in-memory demo data instead of the API
    pub offline: bool,
}

/// Restaurant API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL; `/api` is appended to every path
    pub base_url: String,
    /// Bearer token of the signed-in customer
    pub token: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

/// Wizard behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WizardConfig {
    /// Restaurant's offset from UTC in minutes, used for "today" and submissions
    pub utc_offset_minutes: i32,
    /// Pause between the success notice and the payment redirect, in milliseconds
    pub payment_redirect_delay_ms: u64,
}

/// Invalid configuration
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// The API URL is not an absolute http(s) URL
    #[error("MAISON_API_URL must be an absolute http(s) URL, got {0:?}")]
    InvalidApiUrl(String),
    /// A zero timeout would fail every request
    #[error("MAISON_HTTP_TIMEOUT_SECS must be positive")]
    ZeroTimeout,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Unset or unparsable variables fall back to their defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            api: ApiConfig {
                base_url: env::var("MAISON_API_URL").unwrap_or_else(|_| "http://localhost:8000".to_string()),
                token: env::var("MAISON_API_TOKEN").ok().filter(|token| !token.trim().is_empty()),
                timeout_secs: env::var("MAISON_HTTP_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            },
            wizard: WizardConfig {
                utc_offset_minutes: env::var("MAISON_UTC_OFFSET_MINUTES")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .filter(|minutes: &i32| offset_from_minutes(*minutes).is_some())
                    .unwrap_or(DEFAULT_UTC_OFFSET_MINUTES),
                payment_redirect_delay_ms: env::var("MAISON_PAYMENT_REDIRECT_DELAY_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(1500),
            },
            log_level: env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            offline: env::var("MAISON_OFFLINE")
                .ok()
                .is_some_and(|s| matches!(s.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes")),
        }
    }

    /// Checks values `from_env` cannot repair on its own
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.api.base_url.trim();
        let has_scheme = url.starts_with("http://") || url.starts_with("https://");
        let has_host = url.split_once("://").is_some_and(|(_, rest)| !rest.is_empty());
        if !has_scheme || !has_host {
            return Err(ConfigError::InvalidApiUrl(self.api.base_url.clone()));
        }
        if self.api.timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }
}

impl ApiConfig {
    /// Request timeout
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl WizardConfig {
    /// Restaurant offset; the default +07:00 if the configured value is out of range
    #[must_use]
    pub fn utc_offset(&self) -> FixedOffset {
        offset_from_minutes(self.utc_offset_minutes)
            .or_else(|| offset_from_minutes(DEFAULT_UTC_OFFSET_MINUTES))
            .unwrap_or_else(|| Utc.fix())
    }

    /// Redirect pause
    #[must_use]
    pub const fn payment_redirect_delay(&self) -> Duration {
        Duration::from_millis(self.payment_redirect_delay_ms)
    }
}

fn offset_from_minutes(minutes: i32) -> Option<FixedOffset> {
    minutes.checked_mul(60).and_then(FixedOffset::east_opt)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig {
                base_url: "http://localhost:8000".to_string(),
                token: None,
                timeout_secs: 30,
            },
            wizard: WizardConfig::default(),
            log_level: "info".to_string(),
            offline: false,
        }
    }
}

impl Default for WizardConfig {
    fn default() -> Self {
        Self {
            utc_offset_minutes: DEFAULT_UTC_OFFSET_MINUTES,
            payment_redirect_delay_ms: 1500,
        }
    }
}
