//! Configuration for the task manager

use core_config::{database::DatabaseConfig, ConfigError, Environment, FromEnv};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: Environment,
    pub database: DatabaseConfig,
}

impl FromEnv for AppConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            environment: Environment::from_env(),
            database: DatabaseConfig::from_env()?,
        })
    }
}
