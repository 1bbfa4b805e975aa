//! Runtime configuration from the environment

use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 8084;
pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub return_service_url: String,
    pub return_service_token: Option<String>,
    pub request_timeout: Duration,
    pub page_size: u32,
    pub port: u16,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("{key} has an invalid value: {value}")]
    Invalid { key: &'static str, value: String },
}

impl Config {
    /// Reads the process environment. Call `dotenvy::dotenv()` first to pick up a `.env` file.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let return_service_url = lookup("RETURN_SERVICE_URL")
            .map(|u| u.trim().trim_end_matches('/').to_string())
            .filter(|u| !u.is_empty())
            .ok_or(ConfigError::Missing("RETURN_SERVICE_URL"))?;
        let return_service_token = lookup("RETURN_SERVICE_TOKEN").filter(|t| !t.trim().is_empty());
        let timeout_secs: u64 = parse_or(&lookup, "RETURN_SERVICE_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?;
        let page_size: u32 = parse_or(&lookup, "RETURN_CLAIMS_PAGE_SIZE", DEFAULT_PAGE_SIZE)?;
        let port: u16 = parse_or(&lookup, "PORT", DEFAULT_PORT)?;

        Ok(Self {
            return_service_url,
            return_service_token,
            request_timeout: Duration::from_secs(timeout_secs),
            page_size: page_size.clamp(1, 100),
            port,
        })
    }
}

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid { key, value: raw }),
    }
}
