// Core modules
pub mod api;
pub mod auth;
pub mod db;
pub mod error;
pub mod types;

// Re-export key types and functions
pub use api::{AppState, create_router};
pub use auth::{AuthConfig, ConfigError, Environment, SessionMode, UserContext};
pub use db::{DatabaseConfig, Db, create_connection, ensure_schema};
pub use error::{ApiError, ApiResult};

use anyhow::Result;
use axum::Router;
use tracing::info;

/// Convenience function to create the fully wired HTTP application.
///
/// The auth configuration is checked before anything touches the database;
/// a bad configuration never gets as far as serving a request.
pub async fn build_app(db_config: DatabaseConfig, auth_config: &AuthConfig) -> Result<Router> {
    auth_config.validate()?;

    let db = create_connection(db_config).await?;
    ensure_schema(&db).await?;

    let state = AppState::new(db, auth_config)?;
    info!(
        session_mode = ?auth_config.session_mode,
        environment = ?auth_config.environment,
        "Application state ready"
    );

    Ok(create_router(state))
}
