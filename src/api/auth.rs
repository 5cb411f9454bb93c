// Registration, login, and logout

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use tracing::info;

use super::{AppState, JsonBody};
use crate::auth::{ClaimSet, NewUser, SessionMode};
use crate::db::{UserProfile, UserRecord};
use crate::error::ApiResult;

pub(super) fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", get(logout))
}

#[derive(Debug, Deserialize)]
struct RegisterRequest {
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

/// Issue a session for `user` and answer with their public profile.
///
/// Cookie deployments get a `Set-Cookie` header; bearer deployments find
/// the token in the body.
pub(super) fn session_response(state: &AppState, user: &UserRecord, status: StatusCode) -> ApiResult<Response> {
    let mut headers = HeaderMap::new();
    let token = state.sessions.attach(&mut headers, &ClaimSet::for_user(user))?;

    let mut body = serde_json::json!({
        "status": "success",
        "user": UserProfile::from(user),
    });
    if state.sessions.mode() == SessionMode::Bearer {
        body["token"] = token.into();
    }

    Ok((status, headers, Json(body)).into_response())
}

async fn register(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<RegisterRequest>,
) -> ApiResult<Response> {
    let user = state
        .users
        .create(NewUser {
            name: body.name,
            email: body.email,
            password: body.password,
        })
        .await?;

    session_response(&state, &user, StatusCode::CREATED)
}

async fn login(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<LoginRequest>,
) -> ApiResult<Response> {
    let user = state.users.authenticate(&body.email, &body.password).await?;
    info!(user_id = %user.user_id, "User logged in");

    session_response(&state, &user, StatusCode::OK)
}

async fn logout(State(state): State<AppState>) -> ApiResult<Response> {
    let mut headers = HeaderMap::new();
    state.sessions.clear(&mut headers)?;

    let body = Json(serde_json::json!({
        "status": "success",
        "message": "User logged out!",
    }));
    Ok((StatusCode::OK, headers, body).into_response())
}
