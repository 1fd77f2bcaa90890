use anyhow::Result;
use std::env;
use crate::constants::{
    DEFAULT_LEDGER_RETENTION_DAYS, DEFAULT_SEARCH_API_URL, DEFAULT_SEARCH_TIMEOUT_SECS,
    DEFAULT_SERVER_PORT, DEFAULT_SWEEP_INTERVAL_SECS, DEFAULT_TX_MAX_ATTEMPTS,
};

/// Service settings. Database settings live in [`DatabaseConfig`](crate::db::DatabaseConfig).
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub search_api_url: String,
    /// Required by the server, unused by the sweeper.
    pub search_api_key: Option<String>,
    pub search_timeout_secs: u64,
    pub tx_max_attempts: u32,
    pub allowed_origins: Vec<String>,
    pub sweep_interval_secs: u64,
    pub ledger_retention_days: i64,
}

pub(crate) fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            port: env_or("PORT", DEFAULT_SERVER_PORT),
            search_api_url: env::var("SEARCH_API_URL")
                .unwrap_or_else(|_| DEFAULT_SEARCH_API_URL.to_string()),
            search_api_key: env::var("SEARCH_API_KEY").ok().filter(|key| !key.is_empty()),
            search_timeout_secs: env_or("SEARCH_TIMEOUT_SECS", DEFAULT_SEARCH_TIMEOUT_SECS),
            tx_max_attempts: env_or("TX_MAX_ATTEMPTS", DEFAULT_TX_MAX_ATTEMPTS),
            allowed_origins: env::var("ALLOWED_ORIGINS")
                .map(|origins| parse_origins(&origins))
                .unwrap_or_default(),
            sweep_interval_secs: env_or("SWEEP_INTERVAL_SECS", DEFAULT_SWEEP_INTERVAL_SECS),
            ledger_retention_days: env_or("LEDGER_RETENTION_DAYS", DEFAULT_LEDGER_RETENTION_DAYS),
        })
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(String::from)
        .collect()
}
