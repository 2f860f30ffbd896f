use std::time::Duration;

use crate::{env_parse, env_required, ConfigError, FromEnv};

/// Database configuration for the PostgreSQL task store
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub url: String,
    /// Upper bound of the connection pool
    pub max_connections: u32,
    pub connect_timeout: Duration,
    /// Extra connection attempts after the first one fails
    pub connect_retries: u32,
}

impl DatabaseConfig {
    pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;
    pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 8;
    pub const DEFAULT_CONNECT_RETRIES: u32 = 3;

    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: Self::DEFAULT_MAX_CONNECTIONS,
            connect_timeout: Duration::from_secs(Self::DEFAULT_CONNECT_TIMEOUT_SECS),
            connect_retries: Self::DEFAULT_CONNECT_RETRIES,
        }
    }
}

impl FromEnv for DatabaseConfig {
    /// Requires DATABASE_URL; pool settings fall back to defaults
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            url: env_required("DATABASE_URL")?,
            max_connections: env_parse("DATABASE_MAX_CONNECTIONS", Self::DEFAULT_MAX_CONNECTIONS)?,
            connect_timeout: Duration::from_secs(env_parse(
                "DATABASE_CONNECT_TIMEOUT_SECS",
                Self::DEFAULT_CONNECT_TIMEOUT_SECS,
            )?),
            connect_retries: env_parse("DATABASE_CONNECT_RETRIES", Self::DEFAULT_CONNECT_RETRIES)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VARS: [&str; 3] = [
        "DATABASE_MAX_CONNECTIONS",
        "DATABASE_CONNECT_TIMEOUT_SECS",
        "DATABASE_CONNECT_RETRIES",
    ];

    #[test]
    fn test_database_config_from_env_defaults() {
        let mut vars: Vec<(&str, Option<&str>)> = VARS.iter().map(|k| (*k, None)).collect();
        vars.push(("DATABASE_URL", Some("postgres://localhost/tasks")));

        temp_env::with_vars(vars, || {
            let config = DatabaseConfig::from_env().unwrap();
            assert_eq!(config, DatabaseConfig::new("postgres://localhost/tasks"));
        });
    }

    #[test]
    fn test_database_config_from_env_overrides() {
        temp_env::with_vars(
            [
                ("DATABASE_URL", Some("postgres://db/tasks")),
                ("DATABASE_MAX_CONNECTIONS", Some("25")),
                ("DATABASE_CONNECT_TIMEOUT_SECS", Some("2")),
                ("DATABASE_CONNECT_RETRIES", Some("0")),
            ],
            || {
                let config = DatabaseConfig::from_env().unwrap();
                assert_eq!(config.max_connections, 25);
                assert_eq!(config.connect_timeout, Duration::from_secs(2));
                assert_eq!(config.connect_retries, 0);
            },
        );
    }

    #[test]
    fn test_database_config_from_env_missing_url() {
        temp_env::with_var_unset("DATABASE_URL", || {
            let err = DatabaseConfig::from_env().unwrap_err();
            assert!(err.to_string().contains("DATABASE_URL"));
            assert!(err.to_string().contains("required"));
        });
    }

    #[test]
    fn test_database_config_rejects_malformed_pool_size() {
        temp_env::with_vars(
            [
                ("DATABASE_URL", Some("postgres://db/tasks")),
                ("DATABASE_MAX_CONNECTIONS", Some("lots")),
            ],
            || {
                let err = DatabaseConfig::from_env().unwrap_err();
                assert!(err.to_string().contains("DATABASE_MAX_CONNECTIONS"));
            },
        );
    }
}
