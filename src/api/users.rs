// Account endpoints. Every route requires a session.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::Response,
    routing::{get, patch},
};
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use super::auth::session_response;
use super::{AppState, JsonBody, admin_only, authenticated};
use crate::auth::{INVALID_CREDENTIALS_MESSAGE, UserContext, check_permission};
use crate::db::UserProfile;
use crate::error::{ApiError, ApiResult};
use crate::types::{Role, UserId};

pub(super) fn router(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/", admin_only(state, get(get_all_users)))
        .route("/showMe", authenticated(state, get(show_current_user)))
        .route("/updateUser", authenticated(state, patch(update_user)))
        .route(
            "/updateUserPassword",
            authenticated(state, patch(update_user_password)),
        )
        .route("/{id}", authenticated(state, get(get_single_user)))
}

#[derive(Debug, Deserialize)]
struct UpdateUserRequest {
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdatePasswordRequest {
    #[serde(default)]
    old_password: String,
    #[serde(default)]
    new_password: String,
}

async fn get_all_users(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let users: Vec<UserProfile> = state
        .users
        .list_by_role(Role::User)
        .await?
        .iter()
        .map(UserProfile::from)
        .collect();

    Ok(Json(serde_json::json!({
        "status": "success",
        "count": users.len(),
        "users": users,
    })))
}

async fn get_single_user(
    State(state): State<AppState>,
    context: UserContext,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    // Ownership first: a non-admin gets 403 whether or not the id exists
    check_permission(&context, &id)?;

    let user = state
        .users
        .find_by_id(&UserId::new(id.as_str()))
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("No user with id : {}", id)))?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "user": UserProfile::from(&user),
    })))
}

async fn show_current_user(context: UserContext) -> Json<Value> {
    Json(serde_json::json!({
        "status": "success",
        "user": context,
    }))
}

async fn update_user(
    State(state): State<AppState>,
    context: UserContext,
    JsonBody(body): JsonBody<UpdateUserRequest>,
) -> ApiResult<Response> {
    if body.name.trim().is_empty() || body.email.trim().is_empty() {
        return Err(ApiError::BadRequest("Please provide all values".to_string()));
    }

    let user = state
        .users
        .update_profile(context.user_id(), &body.name, &body.email)
        .await?;
    info!(user_id = %user.user_id, "Profile updated");

    // Fresh claims so the new name and email are visible immediately
    session_response(&state, &user, StatusCode::OK)
}

async fn update_user_password(
    State(state): State<AppState>,
    context: UserContext,
    JsonBody(body): JsonBody<UpdatePasswordRequest>,
) -> ApiResult<Json<Value>> {
    if body.old_password.is_empty() || body.new_password.is_empty() {
        return Err(ApiError::BadRequest("Please provide both values".to_string()));
    }

    let user = state
        .users
        .find_by_id(context.user_id())
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("No user with id : {}", context.user_id())))?;

    if !state
        .users
        .compare_password(&body.old_password, &user.password_hash)
        .await?
    {
        return Err(ApiError::Unauthenticated(
            INVALID_CREDENTIALS_MESSAGE.to_string(),
        ));
    }

    state.users.update_password(&user, &body.new_password).await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "message": "Success! Password Updated.",
    })))
}
