//! Infrastructure layer - Framework implementations
//!
//! This layer contains:
//! - Configuration loading (config)
//! - Database connection and readiness checks (db)
//! - Versioned schema migrations (migrations)
//! - Repository implementations (repositories)
//! - Uploaded media storage (media)
//! - CSV export and import (export, import)
//! - HTTP server setup (server) and the startup sequence (startup)
//! - Application state (state)

pub mod config;
pub mod db;
pub mod export;
pub mod import;
pub mod media;
pub mod migrations;
pub mod repositories;
pub mod seed;
pub mod server;
pub mod startup;
pub mod state;

pub use repositories::*;
pub use state::AppState;
