//! Session artifacts: issuing, clearing, and reading the signed `token`
//! cookie, plus bearer-header extraction.

use axum::http::header::{AUTHORIZATION, COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue};
use cookie::time::{Duration as CookieDuration, OffsetDateTime};
use cookie::{Cookie, CookieJar, Key};
use tracing::debug;

use crate::auth::config::{AuthConfig, ConfigError, SessionMode};
use crate::auth::token::{ClaimSet, TokenCodec};
use crate::error::{ApiError, ApiResult};

/// Cookie name for the session token
pub const SESSION_COOKIE_NAME: &str = "token";

/// What a request carried in place of a session artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresentedArtifact {
    /// Nothing at all.
    Missing,
    /// Something, but not in a usable shape (no `Bearer ` prefix, or a
    /// cookie whose signature does not check out).
    Malformed,
    /// A token string that still has to pass the codec.
    Token(String),
}

/// Issues and reads session artifacts for the configured [`SessionMode`].
#[derive(Clone)]
pub struct SessionManager {
    codec: TokenCodec,
    mode: SessionMode,
    cookie_key: Option<Key>,
    secure: bool,
}

impl SessionManager {
    /// Build from a validated configuration. Any error here is fatal.
    pub fn new(config: &AuthConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        Ok(Self {
            codec: TokenCodec::new(config)?,
            mode: config.session_mode,
            cookie_key: config.cookie_key()?,
            secure: config.is_production(),
        })
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    /// Issue a token for `claims` and attach it to the response headers.
    ///
    /// In cookie mode a signed, http-only `token` cookie is appended; it is
    /// also marked secure in production. The token is returned so bearer
    /// deployments can put it in the response body.
    pub fn attach(&self, headers: &mut HeaderMap, claims: &ClaimSet) -> ApiResult<String> {
        let token = self.codec.issue(claims)?;

        if let Some(key) = &self.cookie_key {
            let expires = i64::try_from(self.codec.lifetime().as_secs())
                .ok()
                .and_then(|secs| OffsetDateTime::now_utc().checked_add(CookieDuration::seconds(secs)))
                .ok_or_else(|| ApiError::Internal("session cookie expiry out of range".to_string()))?;
            let cookie = Cookie::build((SESSION_COOKIE_NAME, token.clone()))
                .path("/")
                .http_only(true)
                .secure(self.secure)
                .expires(expires)
                .build();

            let mut jar = CookieJar::new();
            jar.signed_mut(key).add(cookie);

            let signed = jar
                .get(SESSION_COOKIE_NAME)
                .ok_or_else(|| ApiError::Internal("signed session cookie missing".to_string()))?;
            append_set_cookie(headers, signed)?;
        }

        Ok(token)
    }

    /// Overwrite the session cookie with an empty, already-expired one.
    ///
    /// Bearer tokens live on the client; there is nothing to clear for them.
    pub fn clear(&self, headers: &mut HeaderMap) -> ApiResult<()> {
        if self.mode != SessionMode::Cookie {
            return Ok(());
        }

        let cookie = Cookie::build((SESSION_COOKIE_NAME, ""))
            .path("/")
            .http_only(true)
            .secure(self.secure)
            .expires(OffsetDateTime::UNIX_EPOCH)
            .build();

        append_set_cookie(headers, &cookie)
    }

    /// Pull the session artifact out of the request headers.
    pub fn presented_artifact(&self, headers: &HeaderMap) -> PresentedArtifact {
        match self.mode {
            SessionMode::Bearer => bearer_token(headers),
            SessionMode::Cookie => match &self.cookie_key {
                Some(key) => signed_cookie_token(headers, key),
                None => PresentedArtifact::Missing,
            },
        }
    }
}

fn append_set_cookie(headers: &mut HeaderMap, cookie: &Cookie<'_>) -> ApiResult<()> {
    let value = HeaderValue::from_str(&cookie.to_string())
        .map_err(|e| ApiError::Internal(format!("invalid Set-Cookie value: {}", e)))?;
    headers.append(SET_COOKIE, value);
    Ok(())
}

fn bearer_token(headers: &HeaderMap) -> PresentedArtifact {
    let Some(value) = headers.get(AUTHORIZATION) else {
        return PresentedArtifact::Missing;
    };

    match value.to_str().ok().and_then(|v| v.strip_prefix("Bearer ")) {
        Some(token) if !token.trim().is_empty() => PresentedArtifact::Token(token.trim().to_string()),
        _ => PresentedArtifact::Malformed,
    }
}

fn signed_cookie_token(headers: &HeaderMap, key: &Key) -> PresentedArtifact {
    let mut jar = CookieJar::new();
    for value in headers.get_all(COOKIE) {
        let Ok(raw) = value.to_str() else { continue };
        for cookie in Cookie::split_parse(raw).flatten() {
            jar.add_original(cookie.into_owned());
        }
    }

    if jar.get(SESSION_COOKIE_NAME).is_none() {
        return PresentedArtifact::Missing;
    }

    match jar.signed(key).get(SESSION_COOKIE_NAME) {
        Some(cookie) => PresentedArtifact::Token(cookie.value().to_string()),
        None => {
            debug!("Session cookie failed signature check");
            PresentedArtifact::Malformed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::config::Environment;
    use crate::types::{Role, UserId};

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn claims() -> ClaimSet {
        ClaimSet {
            name: "Ann".to_string(),
            user_id: UserId::new("u-1"),
            role: Role::User,
            email: Some("a@x.com".to_string()),
        }
    }

    fn set_cookie_values(headers: &HeaderMap) -> Vec<String> {
        headers
            .get_all(SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect()
    }

    /// Turn a Set-Cookie line into the Cookie header a browser would send.
    fn echo_cookie(set_cookie: &str) -> HeaderMap {
        let parsed = Cookie::parse(set_cookie.to_string()).unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_str(&format!("{}={}", parsed.name(), parsed.value())).unwrap(),
        );
        headers
    }

    #[test]
    fn test_attach_sets_http_only_signed_cookie() {
        let sessions = SessionManager::new(&AuthConfig::new(SECRET)).unwrap();
        let mut headers = HeaderMap::new();

        let token = sessions.attach(&mut headers, &claims()).unwrap();
        let values = set_cookie_values(&headers);
        assert_eq!(values.len(), 1);

        let cookie = Cookie::parse(values[0].clone()).unwrap();
        assert_eq!(cookie.name(), SESSION_COOKIE_NAME);
        assert_eq!(cookie.http_only(), Some(true));
        assert_ne!(cookie.secure(), Some(true));
        assert_eq!(cookie.path(), Some("/"));
        // Signed: the raw token is wrapped, not sent as-is
        assert_ne!(cookie.value(), token);
        assert!(cookie.value().ends_with(&token));

        let expires = cookie.expires_datetime().unwrap();
        let remaining = expires - OffsetDateTime::now_utc();
        assert!(remaining > CookieDuration::hours(23));
        assert!(remaining <= CookieDuration::hours(24));
    }

    #[test]
    fn test_lifetime_is_bounded_at_construction() {
        let config = AuthConfig {
            token_lifetime_secs: 400_000_000_000,
            ..AuthConfig::new(SECRET)
        };
        assert!(matches!(
            SessionManager::new(&config),
            Err(ConfigError::LifetimeTooLong(_))
        ));

        let config = AuthConfig {
            token_lifetime_secs: crate::auth::config::MAX_TOKEN_LIFETIME_SECS,
            ..AuthConfig::new(SECRET)
        };
        let sessions = SessionManager::new(&config).unwrap();
        let mut headers = HeaderMap::new();
        sessions.attach(&mut headers, &claims()).unwrap();
        assert_eq!(set_cookie_values(&headers).len(), 1);
    }

    #[test]
    fn test_production_cookie_is_secure() {
        let config = AuthConfig {
            environment: Environment::Production,
            ..AuthConfig::new(SECRET)
        };
        let sessions = SessionManager::new(&config).unwrap();
        let mut headers = HeaderMap::new();
        sessions.attach(&mut headers, &claims()).unwrap();

        let cookie = Cookie::parse(set_cookie_values(&headers)[0].clone()).unwrap();
        assert_eq!(cookie.secure(), Some(true));
    }

    #[test]
    fn test_attached_cookie_reads_back() {
        let sessions = SessionManager::new(&AuthConfig::new(SECRET)).unwrap();
        let mut headers = HeaderMap::new();
        let token = sessions.attach(&mut headers, &claims()).unwrap();

        let request = echo_cookie(&set_cookie_values(&headers)[0]);
        assert_eq!(
            sessions.presented_artifact(&request),
            PresentedArtifact::Token(token)
        );
    }

    #[test]
    fn test_unsigned_cookie_is_malformed() {
        let sessions = SessionManager::new(&AuthConfig::new(SECRET)).unwrap();
        let token = sessions.codec().issue(&claims()).unwrap();

        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_str(&format!("theme=dark; token={}", token)).unwrap(),
        );
        assert_eq!(
            sessions.presented_artifact(&headers),
            PresentedArtifact::Malformed
        );

        assert_eq!(
            sessions.presented_artifact(&HeaderMap::new()),
            PresentedArtifact::Missing
        );
    }

    #[test]
    fn test_clear_expires_cookie() {
        let sessions = SessionManager::new(&AuthConfig::new(SECRET)).unwrap();
        let mut headers = HeaderMap::new();
        sessions.clear(&mut headers).unwrap();

        let cookie = Cookie::parse(set_cookie_values(&headers)[0].clone()).unwrap();
        assert_eq!(cookie.name(), SESSION_COOKIE_NAME);
        assert_eq!(cookie.value(), "");
        assert!(cookie.expires_datetime().unwrap() < OffsetDateTime::now_utc());

        // A browser echoing the cleared value presents no valid session
        let request = echo_cookie(&set_cookie_values(&headers)[0]);
        assert_eq!(
            sessions.presented_artifact(&request),
            PresentedArtifact::Malformed
        );
    }

    #[test]
    fn test_bearer_mode_reads_header_and_sets_no_cookie() {
        let sessions = SessionManager::new(&AuthConfig::with_bearer("secret")).unwrap();
        let mut headers = HeaderMap::new();
        let token = sessions.attach(&mut headers, &claims()).unwrap();
        assert!(headers.get(SET_COOKIE).is_none());

        sessions.clear(&mut headers).unwrap();
        assert!(headers.get(SET_COOKIE).is_none());

        let mut request = HeaderMap::new();
        request.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
        );
        assert_eq!(
            sessions.presented_artifact(&request),
            PresentedArtifact::Token(token.clone())
        );

        let mut request = HeaderMap::new();
        request.insert(AUTHORIZATION, HeaderValue::from_str(&token).unwrap());
        assert_eq!(
            sessions.presented_artifact(&request),
            PresentedArtifact::Malformed
        );
    }
}
