// Server module - HTTP router assembly and the serve loop

use axum::http::HeaderValue;
use axum::Router;
use sea_orm::DatabaseConnection;
use std::net::SocketAddr;
use tower::Layer;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::normalize_path::NormalizePathLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use super::config::Config;
use super::media::MediaStore;
use super::startup::StartupError;
use crate::api;
use crate::api_docs::ApiDoc;
use crate::infrastructure::AppState;

pub fn build_state(db: DatabaseConnection, config: &Config) -> AppState {
    AppState::new(db, MediaStore::new(config.media_root.clone()))
}

fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::error!("Failed to parse CORS origin '{}': {}", origin, e);
                None
            }
        })
        .collect();

    let allow_origin = if origins.is_empty() {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Full application router: API, docs and media files.
///
/// Trailing slashes are trimmed before API routing so `/api/v1/schools/`
/// and `/api/v1/schools` hit the same handler.
pub fn build_router(state: AppState, config: &Config) -> Router {
    let media = ServeDir::new(state.media.root());
    let api = NormalizePathLayer::trim_trailing_slash().layer(api::api_router(state));

    Router::new()
        .merge(SwaggerUi::new("/swagger").url("/swagger.json", ApiDoc::openapi()))
        .nest_service("/api", api)
        .nest_service("/media", media)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(config))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received, draining connections");
}

/// Bind `0.0.0.0:PORT` and serve until Ctrl-C / SIGTERM.
pub async fn serve(state: AppState, config: &Config) -> Result<(), StartupError> {
    let app = build_router(state, config);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("School registry listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}
