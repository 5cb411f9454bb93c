//! Password hashing and validation.

use bcrypt::{hash, verify};

use crate::error::{ApiError, ApiResult};

/// Default bcrypt cost factor.
pub const DEFAULT_BCRYPT_COST: u32 = 10;

/// Minimum password length, counted on the raw input.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Maximum password length in bytes (bcrypt ignores anything past 72).
pub const MAX_PASSWORD_LENGTH: usize = 72;

/// Hash a password with bcrypt on the blocking pool.
///
/// The salt is generated per call and embedded in the returned hash.
pub async fn hash_password(password: &str, cost: u32) -> ApiResult<String> {
    let password = password.to_string();

    tokio::task::spawn_blocking(move || {
        hash(password, cost).map_err(|e| ApiError::Internal(format!("bcrypt hash failed: {}", e)))
    })
    .await?
}

/// Check a candidate password against a stored bcrypt hash.
///
/// `Ok(false)` means the password does not match. A malformed stored hash
/// is an internal error, not a mismatch.
pub async fn verify_password(candidate: &str, password_hash: &str) -> ApiResult<bool> {
    let candidate = candidate.to_string();
    let password_hash = password_hash.to_string();

    tokio::task::spawn_blocking(move || {
        verify(candidate, &password_hash)
            .map_err(|e| ApiError::Internal(format!("bcrypt verify failed: {}", e)))
    })
    .await?
}

/// Validate a raw password before it is hashed.
pub fn validate_password(password: &str) -> ApiResult<()> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ApiError::BadRequest(format!(
            "Your password cannot be less than {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }

    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(ApiError::BadRequest(format!(
            "Your password cannot be more than {} bytes",
            MAX_PASSWORD_LENGTH
        )));
    }

    Ok(())
}
