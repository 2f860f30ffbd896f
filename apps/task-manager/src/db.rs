//! PostgreSQL connection with retry, and schema migration

use std::future::Future;
use std::time::Duration;

use core_config::database::DatabaseConfig;
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use tracing::{debug, info, warn};

/// Exponential backoff between connection attempts
#[derive(Debug, Clone)]
pub struct Backoff {
    /// Attempts after the first failure
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Backoff {
    pub fn with_max_retries(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            max_retries: DatabaseConfig::DEFAULT_CONNECT_RETRIES,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
        }
    }
}

/// Run `operation` until it succeeds or the retry budget is spent
pub async fn retry_with_backoff<F, Fut, T, E>(mut operation: F, backoff: &Backoff) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt = 0;
    let mut delay = backoff.initial_delay;

    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 0 {
                    debug!(attempt, "Operation succeeded after retrying");
                }
                return Ok(value);
            }
            Err(e) if attempt >= backoff.max_retries => {
                warn!(attempts = attempt + 1, error = %e, "Giving up");
                return Err(e);
            }
            Err(e) => {
                attempt += 1;
                debug!(
                    attempt,
                    max_retries = backoff.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Operation failed, retrying"
                );
                tokio::time::sleep(delay).await;
                delay = (delay * 2).min(backoff.max_delay);
            }
        }
    }
}

pub fn connect_options(config: &DatabaseConfig) -> ConnectOptions {
    let mut options = ConnectOptions::new(config.url.clone());
    options
        .max_connections(config.max_connections)
        .min_connections(1)
        .connect_timeout(config.connect_timeout)
        .acquire_timeout(config.connect_timeout)
        .sqlx_logging(false);
    options
}

/// Open the connection pool, retrying per `config.connect_retries`
pub async fn connect(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let options = connect_options(config);
    let backoff = Backoff::with_max_retries(config.connect_retries);

    let db = retry_with_backoff(|| Database::connect(options.clone()), &backoff).await?;
    info!("Connected to PostgreSQL");
    Ok(db)
}

/// Apply every pending migration
pub async fn run_migrations(db: &DatabaseConnection) -> Result<(), DbErr> {
    info!("Running task manager migrations");
    Migrator::up(db, None).await?;
    info!("Migrations complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn fast(max_retries: u32) -> Backoff {
        Backoff {
            max_retries,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
        }
    }

    #[tokio::test]
    async fn test_retry_succeeds_first_attempt() {
        let calls = Arc::new(AtomicU32::new(0));

        let result = retry_with_backoff(
            || {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, String>("connected")
                }
            },
            &fast(3),
        )
        .await;

        assert_eq!(result.unwrap(), "connected");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retry_recovers_after_failures() {
        let calls = Arc::new(AtomicU32::new(0));

        let result = retry_with_backoff(
            || {
                let calls = Arc::clone(&calls);
                async move {
                    if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err("connection refused".to_string())
                    } else {
                        Ok(42)
                    }
                }
            },
            &fast(3),
        )
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_gives_up_after_budget() {
        let calls = Arc::new(AtomicU32::new(0));

        let result: Result<(), String> = retry_with_backoff(
            || {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err("connection refused".to_string())
                }
            },
            &fast(2),
        )
        .await;

        assert_eq!(result.unwrap_err(), "connection refused");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_zero_retries_tries_once() {
        let calls = Arc::new(AtomicU32::new(0));

        let result: Result<(), String> = retry_with_backoff(
            || {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err("down".to_string())
                }
            },
            &fast(0),
        )
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_connect_options_follow_config() {
        let mut config = DatabaseConfig::new("postgres://localhost/tasks");
        config.max_connections = 4;

        let options = connect_options(&config);

        assert_eq!(options.get_url(), "postgres://localhost/tasks");
        assert_eq!(options.get_max_connections(), Some(4));
    }
}
