//! Authorization checks: role gates for routes, ownership checks for
//! individual resources.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use tracing::debug;

use crate::auth::context::UserContext;
use crate::error::{ApiError, ApiResult};
use crate::types::Role;

/// Allow-list of roles for a group of routes.
#[derive(Debug, Clone)]
pub struct RoleGate {
    allowed: Arc<[Role]>,
}

impl RoleGate {
    pub fn new(roles: &[Role]) -> Self {
        Self {
            allowed: roles.into(),
        }
    }

    /// Ok when the caller's role is on the list.
    pub fn check(&self, context: &UserContext) -> ApiResult<()> {
        if self.allowed.contains(&context.role()) {
            return Ok(());
        }

        debug!(
            user_id = %context.user_id(),
            role = %context.role(),
            "Role not permitted for route"
        );
        Err(ApiError::Forbidden(
            "Unauthorized to access this route".to_string(),
        ))
    }
}

/// Build a role gate to hand to [`require_role`] as middleware state.
pub fn authorize_permissions(roles: &[Role]) -> RoleGate {
    RoleGate::new(roles)
}

/// Middleware enforcing a [`RoleGate`]. Must run after authentication.
pub async fn require_role(State(gate): State<RoleGate>, req: Request, next: Next) -> Result<Response, ApiError> {
    let context = req
        .extensions()
        .get::<UserContext>()
        .ok_or_else(|| ApiError::Unauthenticated("Authentication invalid".to_string()))?;

    gate.check(context)?;
    Ok(next.run(req).await)
}

/// Ownership check for a single resource.
///
/// Admins may act on anything; everyone else only on resources whose owner
/// id matches their own.
pub fn check_permission(context: &UserContext, owner_id: impl AsRef<str>) -> ApiResult<()> {
    if context.is_admin() || context.user_id().as_str() == owner_id.as_ref() {
        return Ok(());
    }

    Err(ApiError::Forbidden(
        "Not authorized to access this route".to_string(),
    ))
}
