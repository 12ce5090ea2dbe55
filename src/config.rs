//! Client configuration from the environment

use crate::session::{StreamTimeouts, DEFAULT_CONNECT_TIMEOUT, DEFAULT_IDLE_TIMEOUT};
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_USER_ID: u64 = 1;

const BASE_URL_VAR: &str = "SHOP_CHAT_BASE_URL";
const USER_ID_VAR: &str = "SHOP_CHAT_USER_ID";
const CONNECT_TIMEOUT_VAR: &str = "SHOP_CHAT_CONNECT_TIMEOUT_SECS";
const IDLE_TIMEOUT_VAR: &str = "SHOP_CHAT_IDLE_TIMEOUT_SECS";

/// Configuration for the chat client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Backend origin, e.g. `http://localhost:8000`
    pub base_url: String,
    /// Owner of the cart shown by `/cart`
    pub user_id: u64,
    pub connect_timeout: Duration,
    pub idle_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            user_id: DEFAULT_USER_ID,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Invalid values fall back to the
    /// default with a warning.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let base_url = lookup(BASE_URL_VAR)
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty())
            .unwrap_or(defaults.base_url);

        Self {
            base_url,
            user_id: parse_or(&lookup, USER_ID_VAR, defaults.user_id),
            connect_timeout: seconds_or(&lookup, CONNECT_TIMEOUT_VAR, defaults.connect_timeout),
            idle_timeout: seconds_or(&lookup, IDLE_TIMEOUT_VAR, defaults.idle_timeout),
        }
    }

    pub fn timeouts(&self) -> StreamTimeouts {
        StreamTimeouts {
            connect: self.connect_timeout,
            idle: self.idle_timeout,
        }
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr + Copy + std::fmt::Debug,
{
    let Some(raw) = lookup(key) else {
        return default;
    };
    match raw.trim().parse() {
        Ok(value) => value,
        Err(_) => {
            tracing::warn!(var = key, value = %raw, default = ?default, "Invalid config value, using default");
            default
        }
    }
}

fn seconds_or(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: Duration) -> Duration {
    match parse_or(lookup, key, default.as_secs()) {
        0 => {
            tracing::warn!(var = key, "Timeout must be positive, using default");
            default
        }
        secs => Duration::from_secs(secs),
    }
}
