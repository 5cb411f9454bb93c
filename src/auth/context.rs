//! User context for request-scoped identity.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use serde::{Deserialize, Serialize};

use crate::auth::token::ClaimSet;
use crate::error::ApiError;
use crate::types::{Role, UserId};

/// Identity of the caller, taken from a verified session token.
///
/// Inserted into the request extensions by the authentication middleware
/// and never refreshed from the store during the request. It is immutable
/// once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserContext {
    /// Account identifier
    user_id: UserId,
    /// Display name at login time
    name: String,
    /// Role at login time
    role: Role,
    /// Email at login time
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<String>,
}

impl UserContext {
    /// Create a new user context.
    pub fn new(user_id: UserId, name: impl Into<String>, role: Role, email: Option<String>) -> Self {
        Self {
            user_id,
            name: name.into(),
            role,
            email,
        }
    }

    /// Get the account ID.
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// Get the display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the role.
    pub fn role(&self) -> Role {
        self.role
    }

    /// Get the email if the token carried one.
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl From<ClaimSet> for UserContext {
    fn from(claims: ClaimSet) -> Self {
        Self {
            user_id: claims.user_id,
            name: claims.name,
            role: claims.role,
            email: claims.email,
        }
    }
}

impl<S> FromRequestParts<S> for UserContext
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<UserContext>()
            .cloned()
            .ok_or_else(|| ApiError::Unauthenticated("Authentication invalid".to_string()))
    }
}
