//! Database connection and readiness probing

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use sqlx::Connection;
use std::time::Duration;

use super::config::WaitPolicy;
use super::migrations;
use super::startup::StartupError;

const POOL_SIZE: u32 = 10;

/// Open a pooled connection without touching the schema.
pub async fn connect(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(database_url.to_owned());
    options.sqlx_logging(false);
    if database_url.contains(":memory:") {
        // every pooled connection would open its own empty database
        options.max_connections(1).min_connections(1);
    } else if !is_sqlite(database_url) {
        options
            .max_connections(POOL_SIZE)
            .connect_timeout(Duration::from_secs(5));
    }
    Database::connect(options).await
}

/// Connect and bring the schema up to date.
pub async fn init_db(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    let db = connect(database_url).await?;

    migrations::run_migrations(&db).await?;

    Ok(db)
}

fn is_sqlite(database_url: &str) -> bool {
    database_url.starts_with("sqlite:")
}

/// Open and ping a single, unpooled connection.
pub async fn probe(database_url: &str) -> Result<(), sqlx::Error> {
    if is_sqlite(database_url) {
        let mut conn = sqlx::SqliteConnection::connect(database_url).await?;
        conn.ping().await?;
        conn.close().await
    } else {
        let mut conn = sqlx::PgConnection::connect(database_url).await?;
        conn.ping().await?;
        conn.close().await
    }
}

/// Block until the database accepts a connection or the policy is exhausted.
///
/// Returns the number of attempts it took.
pub async fn wait_for_db(database_url: &str, policy: WaitPolicy) -> Result<u32, StartupError> {
    let attempts = policy.attempts.max(1);
    tracing::info!("Waiting for database...");

    let mut last_error = String::new();
    for attempt in 1..=attempts {
        let outcome = match tokio::time::timeout(policy.timeout, probe(database_url)).await {
            Ok(result) => result.map_err(|e| e.to_string()),
            Err(_) => Err(format!("timed out after {:?}", policy.timeout)),
        };
        match outcome {
            Ok(()) => {
                tracing::info!(attempt, "Database available!");
                return Ok(attempt);
            }
            Err(e) => {
                tracing::warn!(
                    attempt,
                    max_attempts = attempts,
                    error = %e,
                    "Database unavailable, waiting..."
                );
                last_error = e;
                if attempt < attempts {
                    tokio::time::sleep(policy.interval).await;
                }
            }
        }
    }

    Err(StartupError::DatabaseUnavailable {
        attempts,
        last_error,
    })
}
