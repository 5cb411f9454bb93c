//! Request authentication.
//!
//! Resolves the session artifact carried by a request into a
//! [`UserContext`] and stores it in the request extensions for the
//! handlers (and the role gate) further down the stack.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use tracing::debug;

use crate::auth::config::SessionMode;
use crate::auth::context::UserContext;
use crate::auth::session::{PresentedArtifact, SessionManager};
use crate::auth::token::INVALID_TOKEN_MESSAGE;
use crate::error::{ApiError, ApiResult};

/// Resolve the caller's identity from request headers.
pub fn authenticate_headers(sessions: &SessionManager, headers: &HeaderMap) -> ApiResult<UserContext> {
    let token = match sessions.presented_artifact(headers) {
        PresentedArtifact::Token(token) => token,
        PresentedArtifact::Missing => {
            let message = match sessions.mode() {
                SessionMode::Bearer => "No token provided",
                SessionMode::Cookie => "Authentication token not found",
            };
            return Err(ApiError::Unauthenticated(message.to_string()));
        }
        PresentedArtifact::Malformed => {
            debug!("Malformed session artifact");
            return Err(ApiError::Unauthenticated(INVALID_TOKEN_MESSAGE.to_string()));
        }
    };

    let claims = sessions.codec().verify(&token)?;
    Ok(UserContext::from(claims))
}

/// Middleware that rejects unauthenticated requests.
///
/// On success the resolved [`UserContext`] is available to handlers via
/// the extractor.
pub async fn authenticate(
    State(sessions): State<Arc<SessionManager>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let context = authenticate_headers(&sessions, req.headers())?;
    debug!(user_id = %context.user_id(), role = %context.role(), "Authenticated request");

    req.extensions_mut().insert(context);
    Ok(next.run(req).await)
}
