use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use secrecy::ExposeSecret;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use school_registry::infrastructure::export::{export_csv, CsvResource};
use school_registry::infrastructure::import::import_csv;
use school_registry::startup::{self, StartupError};
use school_registry::{config::Config, db, server};

#[derive(Parser)]
#[command(name = "school-registry", version, about = "School registry API service")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Block until the database accepts connections
    WaitForDb,
    /// Apply pending schema migrations
    Migrate,
    /// Serve the HTTP API
    Serve,
    /// wait-for-db, migrate, then serve
    Start,
    /// Write one resource as CSV to stdout
    Export {
        #[arg(value_enum)]
        resource: CsvResource,
    },
    /// Load one resource from a CSV file, matching rows by natural key
    Import {
        #[arg(value_enum)]
        resource: CsvResource,
        /// CSV file as written by `export`
        path: PathBuf,
    },
}

async fn export(config: &Config, resource: CsvResource) -> Result<(), StartupError> {
    let url = config.database.connection_url()?;
    let conn = db::connect(url.expose_secret())
        .await
        .map_err(|e| StartupError::Database(e.to_string()))?;
    let state = server::build_state(conn, config);

    let csv = export_csv(&state, resource)
        .await
        .map_err(|e| StartupError::Data(e.to_string()))?;
    std::io::stdout().write_all(&csv)?;
    Ok(())
}

async fn import(config: &Config, resource: CsvResource, path: PathBuf) -> Result<(), StartupError> {
    let data = std::fs::read(&path)?;
    let url = config.database.connection_url()?;
    let conn = db::connect(url.expose_secret())
        .await
        .map_err(|e| StartupError::Database(e.to_string()))?;

    let report = import_csv(&conn, resource, &data)
        .await
        .map_err(|e| StartupError::Data(e.to_string()))?;
    tracing::info!(
        file = %path.display(),
        created = report.created,
        updated = report.updated,
        "Import finished"
    );
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.default_log_filter().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::WaitForDb => startup::wait_for_db(&config).await,
        Command::Migrate => startup::migrate(&config).await.map(|_| ()),
        Command::Serve => startup::serve(&config).await,
        Command::Start => startup::start(&config).await,
        Command::Export { resource } => export(&config, resource).await,
        Command::Import { resource, path } => import(&config, resource, path).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
