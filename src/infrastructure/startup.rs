//! Container startup sequence: wait for the database, migrate, serve.
//!
//! Each step is also exposed on its own so the orchestrator can chain them
//! with `&&`.

use std::fmt;

use secrecy::ExposeSecret;

use super::config::Config;
use super::migrations::MigrationReport;
use super::{db, migrations, seed, server};

#[derive(Debug)]
pub enum StartupError {
    /// Invalid or incomplete configuration
    Config(String),
    /// The readiness check gave up
    DatabaseUnavailable { attempts: u32, last_error: String },
    /// Connecting after the database was reported ready failed
    Database(String),
    /// A migration failed; nothing from the run was committed
    Migration(String),
    /// Export or import rejected the data
    Data(String),
    /// Binding or serving failed
    Io(std::io::Error),
}

impl fmt::Display for StartupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartupError::Config(msg) => write!(f, "Configuration error: {}", msg),
            StartupError::DatabaseUnavailable {
                attempts,
                last_error,
            } => write!(
                f,
                "Database unavailable after {} attempts: {}",
                attempts, last_error
            ),
            StartupError::Database(msg) => write!(f, "Database error: {}", msg),
            StartupError::Migration(msg) => write!(f, "Migration failed: {}", msg),
            StartupError::Data(msg) => write!(f, "Data error: {}", msg),
            StartupError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for StartupError {}

impl From<std::io::Error> for StartupError {
    fn from(e: std::io::Error) -> Self {
        StartupError::Io(e)
    }
}

pub async fn wait_for_db(config: &Config) -> Result<(), StartupError> {
    let url = config.database.connection_url()?;
    db::wait_for_db(url.expose_secret(), config.wait).await?;
    Ok(())
}

pub async fn migrate(config: &Config) -> Result<MigrationReport, StartupError> {
    let url = config.database.connection_url()?;
    let conn = db::connect(url.expose_secret())
        .await
        .map_err(|e| StartupError::Database(e.to_string()))?;

    let report = migrations::run_migrations(&conn)
        .await
        .map_err(|e| StartupError::Migration(e.to_string()))?;

    if report.applied.is_empty() {
        tracing::info!("No migrations to apply.");
    } else {
        for (version, name) in &report.applied {
            tracing::info!(version, name, "Applied migration");
        }
    }
    Ok(report)
}

pub async fn serve(config: &Config) -> Result<(), StartupError> {
    if config.secret_key.expose_secret().is_empty() {
        tracing::warn!("SECRET_KEY is not set");
    }

    let url = config.database.connection_url()?;
    let conn = db::connect(url.expose_secret())
        .await
        .map_err(|e| StartupError::Database(e.to_string()))?;

    let state = server::build_state(conn, config);

    if config.seed_demo {
        tracing::info!("Seeding demo data...");
        match seed::seed_demo_data(&state).await {
            Ok(true) => tracing::info!("Demo data seeded successfully."),
            Ok(false) => tracing::info!("Demo data already present, skipping."),
            Err(e) => tracing::error!("Failed to seed data: {}", e),
        }
    }

    server::serve(state, config).await
}

/// All three steps in order; stops at the first failure.
pub async fn start(config: &Config) -> Result<(), StartupError> {
    wait_for_db(config).await?;
    migrate(config).await?;
    serve(config).await
}
