use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use dotenvy::var;
use eyre::{eyre, Result};
use tracing::{debug, info};

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8000";
const DEFAULT_DB_POOL_SIZE: &str = "10";
const DEFAULT_SESSION_TTL_SECS: &str = "1209600";

/// Settings read from the environment, after loading `.env` if present.
#[derive(Debug, Clone)]
pub struct Config {
    /// `BIND_ADDR`
    pub bind_addr: String,
    /// `DATABASE_URL`; data is kept in memory when unset.
    pub database_url: Option<String>,
    /// `DB_POOL_SIZE`
    pub db_pool_size: u32,
    /// `SESSION_TTL_SECS`
    pub session_ttl: Duration,
}

impl Config {
    pub fn load() -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            debug!("loaded environment from {}", path.display());
        }
        Ok(Self {
            bind_addr: var("BIND_ADDR").unwrap_or(DEFAULT_BIND_ADDR.to_string()),
            database_url: var("DATABASE_URL").ok().filter(|url| !url.is_empty()),
            db_pool_size: try_load("DB_POOL_SIZE", DEFAULT_DB_POOL_SIZE)?,
            session_ttl: Duration::from_secs(try_load("SESSION_TTL_SECS", DEFAULT_SESSION_TTL_SECS)?),
        })
    }
}

fn try_load<T: FromStr>(key: &str, default: &str) -> Result<T>
where
    T::Err: Display,
{
    var(key)
        .unwrap_or_else(|_| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e| eyre!("Invalid {key} value: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_values_fall_back_to_defaults() {
        let size: u32 = try_load("TWITLINE_TEST_UNSET_POOL_SIZE", DEFAULT_DB_POOL_SIZE).unwrap();
        assert_eq!(size, 10);
    }

    #[test]
    fn default_session_ttl_matches_the_service_default() {
        let secs: u64 = try_load("TWITLINE_TEST_UNSET_SESSION_TTL", DEFAULT_SESSION_TTL_SECS).unwrap();
        assert_eq!(Duration::from_secs(secs), crate::service::DEFAULT_SESSION_TTL);
    }

    #[test]
    fn malformed_default_is_an_error() {
        assert!(try_load::<u32>("TWITLINE_TEST_UNSET_POOL_SIZE", "ten").is_err());
    }
}
