//! PostgreSQL connection settings.

use crate::utils::error::Result;
use serde::Deserialize;
use sqlx::postgres::PgConnectOptions;
use std::fmt;
use std::time::Duration;

/// Database configuration loaded from environment variables.
///
/// The variable names match the ones the official Postgres image reads, so a
/// single `.env` serves both containers:
/// - `POSTGRES_HOST` (default "localhost")
/// - `POSTGRES_PORT` (default 5432)
/// - `POSTGRES_USER` (default "postgres")
/// - `POSTGRES_PASSWORD`
/// - `POSTGRES_DB` (default "postgres")
///
/// Pool and startup tuning:
/// - `POSTGRES_MAX_CONNECTIONS` (default 5)
/// - `POSTGRES_CONNECT_RETRIES` (default 10)
/// - `POSTGRES_RETRY_INTERVAL_SECS` (default 2)
/// - `POSTGRES_ACQUIRE_TIMEOUT_SECS` (default 30)
#[derive(Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_user")]
    pub user: String,

    #[serde(default)]
    pub password: String,

    #[serde(default = "default_database")]
    pub db: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_connect_retries")]
    pub connect_retries: u32,

    #[serde(default = "default_retry_interval_secs")]
    pub retry_interval_secs: u64,

    #[serde(default = "default_acquire_timeout_secs")]
    pub acquire_timeout_secs: u64,
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    5432
}

fn default_user() -> String {
    "postgres".to_string()
}

fn default_database() -> String {
    "postgres".to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_connect_retries() -> u32 {
    10
}

fn default_retry_interval_secs() -> u64 {
    2
}

fn default_acquire_timeout_secs() -> u64 {
    30
}

impl DatabaseConfig {
    pub fn from_env() -> Result<Self> {
        Ok(envy::prefixed("POSTGRES_").from_env::<DatabaseConfig>()?)
    }

    pub fn from_pairs<I>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        Ok(envy::prefixed("POSTGRES_").from_iter::<_, DatabaseConfig>(pairs)?)
    }

    pub fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(&self.password)
            .database(&self.db)
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_secs(self.retry_interval_secs)
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"***")
            .field("db", &self.db)
            .field("max_connections", &self.max_connections)
            .field("connect_retries", &self.connect_retries)
            .field("retry_interval_secs", &self.retry_interval_secs)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(entries: &[(&str, &str)]) -> Vec<(String, String)> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config = DatabaseConfig::from_pairs(Vec::new()).unwrap();
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 5432);
        assert_eq!(config.db, "postgres");
        assert_eq!(config.connect_retries, 10);
        assert_eq!(config.retry_interval(), Duration::from_secs(2));
    }

    #[test]
    fn test_reads_prefixed_variables() {
        let config = DatabaseConfig::from_pairs(pairs(&[
            ("POSTGRES_HOST", "postgres"),
            ("POSTGRES_PORT", "6543"),
            ("POSTGRES_USER", "loader"),
            ("POSTGRES_PASSWORD", "secret"),
            ("POSTGRES_DB", "market"),
            ("POSTGRES_CONNECT_RETRIES", "3"),
            ("UNRELATED", "ignored"),
        ]))
        .unwrap();

        assert_eq!(config.host, "postgres");
        assert_eq!(config.port, 6543);
        assert_eq!(config.user, "loader");
        assert_eq!(config.db, "market");
        assert_eq!(config.connect_retries, 3);
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        let result = DatabaseConfig::from_pairs(pairs(&[("POSTGRES_PORT", "not-a-port")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_debug_hides_password() {
        let config = DatabaseConfig::from_pairs(pairs(&[("POSTGRES_PASSWORD", "secret")])).unwrap();
        assert!(!format!("{:?}", config).contains("secret"));
    }
}
