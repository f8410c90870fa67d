//! Client configuration loaded from environment variables.
//!
//! Every setting has a default so a review session can be opened with zero
//! configuration against a local API service.

use std::str::FromStr;
use std::time::Duration;

use crate::error::{Result, ReviewError};
use crate::poller::PollPolicy;

/// Markup core configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewConfig {
    /// Base URL of the markup API.
    /// Env: `PORTAL_API_URL`
    /// Default: `http://127.0.0.1:3000`
    pub api_base_url: String,

    /// Poll interval while the viewer is in use.
    /// Env: `PORTAL_POLL_ACTIVE_MS`
    /// Default: `3000`
    pub active_interval: Duration,

    /// Poll interval after the viewer has gone quiet.
    /// Env: `PORTAL_POLL_IDLE_MS`
    /// Default: `15000`
    pub idle_interval: Duration,

    /// Inactivity after which polling slows down.
    /// Env: `PORTAL_IDLE_AFTER_SECS`
    /// Default: `60`
    pub idle_after: Duration,

    /// Timeout applied to every HTTP request.
    /// Env: `PORTAL_REQUEST_TIMEOUT_SECS`
    /// Default: `15`
    pub request_timeout: Duration,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:3000".to_string(),
            active_interval: Duration::from_millis(3000),
            idle_interval: Duration::from_millis(15000),
            idle_after: Duration::from_secs(60),
            request_timeout: Duration::from_secs(15),
        }
    }
}

impl ReviewConfig {
    /// Build the configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let api_base_url = lookup("PORTAL_API_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or(defaults.api_base_url);

        let active_interval = parse_var(&lookup, "PORTAL_POLL_ACTIVE_MS")?
            .map(Duration::from_millis)
            .unwrap_or(defaults.active_interval);
        let idle_interval = parse_var(&lookup, "PORTAL_POLL_IDLE_MS")?
            .map(Duration::from_millis)
            .unwrap_or(defaults.idle_interval);
        let idle_after = parse_var(&lookup, "PORTAL_IDLE_AFTER_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.idle_after);
        let request_timeout = parse_var(&lookup, "PORTAL_REQUEST_TIMEOUT_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.request_timeout);

        if active_interval.is_zero() || idle_interval.is_zero() {
            return Err(ReviewError::Config("poll intervals must be non-zero".into()));
        }

        Ok(Self {
            api_base_url,
            active_interval,
            idle_interval,
            idle_after,
            request_timeout,
        })
    }

    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            active_interval: self.active_interval,
            idle_interval: self.idle_interval,
            idle_after: self.idle_after,
        }
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ReviewError::Config(format!("{key} has an invalid value '{raw}'"))),
    }
}
