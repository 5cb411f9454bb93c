//! Authentication configuration.
//!
//! Built once at process start and shared read-only afterwards. Nothing in
//! the auth subsystem reads the environment on its own.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use cookie::Key;
use thiserror::Error;

use crate::auth::password::DEFAULT_BCRYPT_COST;

/// Default session lifetime: one day.
pub const DEFAULT_TOKEN_LIFETIME_SECS: u64 = 60 * 60 * 24;

/// Upper bound on the session lifetime: ten years.
pub const MAX_TOKEN_LIFETIME_SECS: u64 = 60 * 60 * 24 * 365 * 10;

/// Minimum amount of key material for signing cookies.
pub const MIN_COOKIE_KEY_LEN: usize = 32;

/// Start-up configuration failures. These are fatal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("JWT secret is not configured")]
    MissingJwtSecret,
    #[error("cookie signing key needs at least 32 bytes, got {0}")]
    CookieKeyTooShort(usize),
    #[error("token lifetime must be greater than zero")]
    ZeroLifetime,
    #[error("token lifetime must be at most 315360000 seconds (ten years), got {0}")]
    LifetimeTooLong(u64),
    #[error("bcrypt cost must be between 4 and 31, got {0}")]
    InvalidBcryptCost(u32),
    #[error("unknown value `{value}` for {setting}")]
    UnknownValue { setting: &'static str, value: String },
}

/// How the session artifact travels. A deployment uses exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionMode {
    /// Signed `token` cookie.
    #[default]
    Cookie,
    /// `Authorization: Bearer <token>` header.
    Bearer,
}

impl FromStr for SessionMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cookie" => Ok(SessionMode::Cookie),
            "bearer" => Ok(SessionMode::Bearer),
            _ => Err(ConfigError::UnknownValue {
                setting: "session mode",
                value: s.to_string(),
            }),
        }
    }
}

/// Deployment environment. Production restricts cookies to secure transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            _ => Err(ConfigError::UnknownValue {
                setting: "environment",
                value: s.to_string(),
            }),
        }
    }
}

/// Authentication configuration.
#[derive(Clone)]
pub struct AuthConfig {
    /// Shared HS256 secret for session tokens.
    pub jwt_secret: String,
    /// Key material for cookie signatures. Falls back to `jwt_secret`.
    pub cookie_secret: Option<String>,
    /// Session lifetime in seconds.
    pub token_lifetime_secs: u64,
    pub environment: Environment,
    pub session_mode: SessionMode,
    pub bcrypt_cost: u32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            cookie_secret: None,
            token_lifetime_secs: DEFAULT_TOKEN_LIFETIME_SECS,
            environment: Environment::Development,
            session_mode: SessionMode::Cookie,
            bcrypt_cost: DEFAULT_BCRYPT_COST,
        }
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"<redacted>")
            .field("cookie_secret", &self.cookie_secret.as_ref().map(|_| "<redacted>"))
            .field("token_lifetime_secs", &self.token_lifetime_secs)
            .field("environment", &self.environment)
            .field("session_mode", &self.session_mode)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .finish()
    }
}

impl AuthConfig {
    /// Create a cookie-mode config with the given secret.
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            ..Default::default()
        }
    }

    /// Create a bearer-header config with the given secret.
    pub fn with_bearer(jwt_secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            session_mode: SessionMode::Bearer,
            ..Default::default()
        }
    }

    pub fn token_lifetime(&self) -> Duration {
        Duration::from_secs(self.token_lifetime_secs)
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    fn cookie_key_material(&self) -> &str {
        self.cookie_secret.as_deref().unwrap_or(&self.jwt_secret)
    }

    /// Reject configurations the server cannot safely run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_secret.trim().is_empty() {
            return Err(ConfigError::MissingJwtSecret);
        }

        if self.token_lifetime_secs == 0 {
            return Err(ConfigError::ZeroLifetime);
        }
        if self.token_lifetime_secs > MAX_TOKEN_LIFETIME_SECS {
            return Err(ConfigError::LifetimeTooLong(self.token_lifetime_secs));
        }

        if !(4..=31).contains(&self.bcrypt_cost) {
            return Err(ConfigError::InvalidBcryptCost(self.bcrypt_cost));
        }

        if self.session_mode == SessionMode::Cookie {
            let len = self.cookie_key_material().len();
            if len < MIN_COOKIE_KEY_LEN {
                return Err(ConfigError::CookieKeyTooShort(len));
            }
        }

        Ok(())
    }

    /// Derive the cookie signing key. Only available in cookie mode.
    pub fn cookie_key(&self) -> Result<Option<Key>, ConfigError> {
        if self.session_mode != SessionMode::Cookie {
            return Ok(None);
        }

        let material = self.cookie_key_material().as_bytes();
        if material.len() < MIN_COOKIE_KEY_LEN {
            return Err(ConfigError::CookieKeyTooShort(material.len()));
        }

        Ok(Some(Key::derive_from(material)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    #[test]
    fn test_auth_config_default() {
        let config = AuthConfig::default();
        assert_eq!(config.token_lifetime(), Duration::from_secs(86_400));
        assert_eq!(config.session_mode, SessionMode::Cookie);
        assert_eq!(config.bcrypt_cost, 10);
        assert!(!config.is_production());
    }

    #[test]
    fn test_missing_secret_is_rejected() {
        let config = AuthConfig::default();
        assert_eq!(config.validate(), Err(ConfigError::MissingJwtSecret));

        let config = AuthConfig::new("   ");
        assert_eq!(config.validate(), Err(ConfigError::MissingJwtSecret));
    }

    #[test]
    fn test_cookie_mode_needs_long_key() {
        let config = AuthConfig::new("short-secret");
        assert_eq!(config.validate(), Err(ConfigError::CookieKeyTooShort(12)));

        let config = AuthConfig {
            cookie_secret: Some(SECRET.to_string()),
            ..AuthConfig::new("short-secret")
        };
        assert!(config.validate().is_ok());
        assert!(config.cookie_key().unwrap().is_some());
    }

    #[test]
    fn test_bearer_mode_accepts_short_secret() {
        let config = AuthConfig::with_bearer("short-secret");
        assert!(config.validate().is_ok());
        assert!(config.cookie_key().unwrap().is_none());
    }

    #[test]
    fn test_invalid_numbers_are_rejected() {
        let config = AuthConfig {
            token_lifetime_secs: 0,
            ..AuthConfig::new(SECRET)
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroLifetime));

        let config = AuthConfig {
            token_lifetime_secs: 400_000_000_000,
            ..AuthConfig::new(SECRET)
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::LifetimeTooLong(400_000_000_000))
        );

        let config = AuthConfig {
            token_lifetime_secs: MAX_TOKEN_LIFETIME_SECS,
            ..AuthConfig::new(SECRET)
        };
        assert!(config.validate().is_ok());

        let config = AuthConfig {
            bcrypt_cost: 2,
            ..AuthConfig::new(SECRET)
        };
        assert_eq!(config.validate(), Err(ConfigError::InvalidBcryptCost(2)));
    }

    #[test]
    fn test_parse_modes() {
        assert_eq!("bearer".parse::<SessionMode>().unwrap(), SessionMode::Bearer);
        assert_eq!("Cookie".parse::<SessionMode>().unwrap(), SessionMode::Cookie);
        assert!("header".parse::<SessionMode>().is_err());
        assert_eq!(
            "production".parse::<Environment>().unwrap(),
            Environment::Production
        );
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = AuthConfig::new(SECRET);
        let debug = format!("{:?}", config);
        assert!(!debug.contains(SECRET));
        assert!(debug.contains("<redacted>"));
    }
}
