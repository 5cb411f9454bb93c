//! Authentication and authorization.
//!
//! Sessions are HS256 tokens carried in exactly one way per deployment:
//!
//! - **Cookie**: a signed, http-only `token` cookie (default)
//! - **Bearer**: an `Authorization: Bearer <token>` header
//!
//! ## Request flow
//!
//! - [`authenticate`] resolves the artifact into a [`UserContext`] and puts
//!   it in the request extensions
//! - [`require_role`] gates whole route groups by role
//! - handlers call [`check_permission`] once they know who owns a resource
//!
//! The context is never re-read from the store during a request, so role
//! and name changes show up with the next issued session.
//!
//! ## Usage
//!
//! ```ignore
//! let sessions = Arc::new(SessionManager::new(&config)?);
//!
//! let admin_only = get(list_users)
//!     .route_layer(middleware::from_fn_with_state(
//!         authorize_permissions(&[Role::Admin]),
//!         require_role,
//!     ))
//!     .route_layer(middleware::from_fn_with_state(sessions, authenticate));
//! ```

pub mod config;
mod context;
mod middleware;
pub mod password;
mod policy;
mod session;
pub mod token;
mod user_store;

pub use config::{AuthConfig, ConfigError, Environment, SessionMode};
pub use context::UserContext;
pub use middleware::{authenticate, authenticate_headers};
pub use policy::{RoleGate, authorize_permissions, check_permission, require_role};
pub use session::{PresentedArtifact, SESSION_COOKIE_NAME, SessionManager};
pub use token::{ClaimSet, INVALID_TOKEN_MESSAGE, TokenCodec, TokenError};
pub use user_store::{INVALID_CREDENTIALS_MESSAGE, NewUser, UserStore};
