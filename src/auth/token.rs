//! Session token issuance and verification.

use std::time::Duration;

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::auth::config::{AuthConfig, ConfigError, MAX_TOKEN_LIFETIME_SECS};
use crate::db::UserRecord;
use crate::error::ApiError;
use crate::types::{Role, UserId};

/// Message for every rejected token, whatever the cause.
pub const INVALID_TOKEN_MESSAGE: &str = "Not authorized to access this route";

/// Identity fields carried inside a session token.
///
/// Deliberately minimal: enough to authorize a request without a store
/// lookup. Changes to the account show up only in the next issued token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimSet {
    pub name: String,
    pub user_id: UserId,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl ClaimSet {
    pub fn for_user(user: &UserRecord) -> Self {
        Self {
            name: user.name.clone(),
            user_id: user.user_id.clone(),
            role: user.role,
            email: Some(user.email.clone()),
        }
    }
}

/// Wire format of the token payload.
#[derive(Debug, Serialize, Deserialize)]
struct SessionClaims {
    #[serde(flatten)]
    identity: ClaimSet,
    /// Issued at (Unix timestamp)
    iat: i64,
    /// Expiration time (Unix timestamp)
    exp: i64,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// Bad signature, malformed structure, or expired. Callers are not
    /// told which.
    #[error("invalid token")]
    InvalidToken,
    #[error("token encoding failed: {0}")]
    Encoding(String),
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::InvalidToken => ApiError::Unauthenticated(INVALID_TOKEN_MESSAGE.to_string()),
            TokenError::Encoding(msg) => ApiError::Internal(msg),
        }
    }
}

/// HS256 codec bound to the process-wide secret.
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    lifetime: Duration,
}

impl TokenCodec {
    /// Build the codec. Fails when no secret is configured.
    pub fn new(config: &AuthConfig) -> Result<Self, ConfigError> {
        if config.jwt_secret.trim().is_empty() {
            return Err(ConfigError::MissingJwtSecret);
        }
        if config.token_lifetime_secs == 0 {
            return Err(ConfigError::ZeroLifetime);
        }
        if config.token_lifetime_secs > MAX_TOKEN_LIFETIME_SECS {
            return Err(ConfigError::LifetimeTooLong(config.token_lifetime_secs));
        }

        let secret = config.jwt_secret.as_bytes();

        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is exact: valid up to and including `exp`.
        validation.leeway = 0;
        validation.validate_exp = true;

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            lifetime: config.token_lifetime(),
        })
    }

    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    /// Sign a token for `claims` that expires one lifetime from now.
    pub fn issue(&self, claims: &ClaimSet) -> Result<String, TokenError> {
        self.issue_at(claims, chrono::Utc::now().timestamp())
    }

    /// Sign a token as if issued at `issued_at` (Unix seconds).
    pub fn issue_at(&self, claims: &ClaimSet, issued_at: i64) -> Result<String, TokenError> {
        let exp = i64::try_from(self.lifetime.as_secs())
            .ok()
            .and_then(|secs| issued_at.checked_add(secs))
            .ok_or_else(|| TokenError::Encoding("token expiry out of range".to_string()))?;
        let payload = SessionClaims {
            identity: claims.clone(),
            iat: issued_at,
            exp,
        };

        encode(&Header::new(Algorithm::HS256), &payload, &self.encoding_key)
            .map_err(|e| TokenError::Encoding(e.to_string()))
    }

    /// Verify signature and expiry and return the embedded claims.
    pub fn verify(&self, token: &str) -> Result<ClaimSet, TokenError> {
        match decode::<SessionClaims>(token, &self.decoding_key, &self.validation) {
            Ok(data) => Ok(data.claims.identity),
            Err(e) => {
                debug!("Session token rejected: {:?}", e.kind());
                Err(TokenError::InvalidToken)
            }
        }
    }
}
