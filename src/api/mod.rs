// REST API for the storefront

use axum::{
    Json, Router,
    extract::{FromRequest, Request, rejection::JsonRejection},
    middleware,
    response::IntoResponse,
    routing::{MethodRouter, get},
};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::auth::{
    AuthConfig, ConfigError, SessionManager, UserStore, authenticate, authorize_permissions,
    require_role,
};
use crate::db::Db;
use crate::error::ApiError;
use crate::types::Role;

mod auth;
mod orders;
mod products;
mod reviews;
mod users;


/// Shared, read-only state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub users: Arc<UserStore>,
    pub sessions: Arc<SessionManager>,
}

impl AppState {
    /// Wire up the stores and session handling. Fails on bad auth config.
    pub fn new(db: Db, config: &AuthConfig) -> Result<Self, ConfigError> {
        let sessions = SessionManager::new(config)?;

        Ok(Self {
            users: Arc::new(UserStore::new(db.clone(), config.bcrypt_cost)),
            sessions: Arc::new(sessions),
            db,
        })
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1/auth", auth::router())
        .nest("/api/v1/users", users::router(&state))
        .nest("/api/v1/products", products::router(&state))
        .nest("/api/v1/reviews", reviews::router(&state))
        .nest("/api/v1/orders", orders::router(&state))
        .fallback(route_not_found)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

/// Require a valid session for `route`.
fn authenticated(state: &AppState, route: MethodRouter<AppState>) -> MethodRouter<AppState> {
    route.route_layer(middleware::from_fn_with_state(
        state.sessions.clone(),
        authenticate,
    ))
}

/// Require a valid session held by an admin.
fn admin_only(state: &AppState, route: MethodRouter<AppState>) -> MethodRouter<AppState> {
    // Layers added later run first: authenticate, then check the role.
    let gated = route.route_layer(middleware::from_fn_with_state(
        authorize_permissions(&[Role::Admin]),
        require_role,
    ));
    authenticated(state, gated)
}

async fn health_check() -> Json<Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn route_not_found() -> impl IntoResponse {
    ApiError::NotFound("Route does not exist".to_string())
}

/// JSON body extractor whose rejections use the API error shape.
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(JsonBody(value)),
            Err(rejection) => Err(ApiError::BadRequest(rejection.body_text())),
        }
    }
}
