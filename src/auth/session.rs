//! Signed session cookies.
//!
//! The cookie carries an HS256 JWT with the user id as `sub` and an `exp`
//! claim. Nothing is stored server-side.

use std::sync::Arc;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{DateTime, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{api::errors::AppError, config::Config};

pub const COOKIE_NAME: &str = "session";

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("malformed session token")]
    Malformed,
    #[error("session signature mismatch")]
    BadSignature,
    #[error("session expired")]
    Expired,
}

impl From<jsonwebtoken::errors::Error> for SessionError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        match e.kind() {
            ErrorKind::ExpiredSignature => Self::Expired,
            ErrorKind::InvalidSignature => Self::BadSignature,
            _ => Self::Malformed,
        }
    }
}

/// Session token payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: i64,
    /// Expiry, unix seconds.
    pub exp: i64,
}

#[derive(Clone)]
pub struct SessionSigner {
    inner: Arc<Inner>,
}

struct Inner {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl_secs: i64,
    secure: bool,
}

impl std::fmt::Debug for SessionSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionSigner")
            .field("ttl_secs", &self.inner.ttl_secs)
            .field("secure", &self.inner.secure)
            .finish_non_exhaustive()
    }
}

impl SessionSigner {
    pub fn new(secret: &str, ttl_secs: i64, secure: bool) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);
        Self {
            inner: Arc::new(Inner {
                encoding: EncodingKey::from_secret(secret.as_bytes()),
                decoding: DecodingKey::from_secret(secret.as_bytes()),
                validation,
                ttl_secs,
                secure,
            }),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            &config.secret_key,
            config.session_ttl_secs,
            config.session_cookie_secure,
        )
    }

    /// Token for `user_id`, valid for the configured lifetime from `now`.
    pub fn sign(&self, user_id: i64, now: DateTime<Utc>) -> anyhow::Result<String> {
        let claims = Claims {
            sub: user_id,
            exp: now.timestamp() + self.inner.ttl_secs,
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.inner.encoding)?;
        debug!(user_id, "Session signed");
        Ok(token)
    }

    /// User id of a valid, unexpired token.
    pub fn verify(&self, token: &str) -> Result<i64, SessionError> {
        let data = decode::<Claims>(token, &self.inner.decoding, &self.inner.validation)?;
        Ok(data.claims.sub)
    }

    /// `Set-Cookie` value logging `user_id` in.
    pub fn issue_cookie(&self, user_id: i64, now: DateTime<Utc>) -> anyhow::Result<String> {
        let token = self.sign(user_id, now)?;
        Ok(self.cookie(token, self.inner.ttl_secs))
    }

    /// `Set-Cookie` value that removes the session cookie.
    pub fn clear_cookie(&self) -> String {
        self.cookie(String::new(), 0)
    }

    fn cookie(&self, value: String, max_age: i64) -> String {
        Cookie::build((COOKIE_NAME, value))
            .path("/")
            .max_age(time::Duration::seconds(max_age))
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.inner.secure)
            .build()
            .to_string()
    }
}

/// Id of the logged-in user. Rejects with 401 when the session cookie is
/// missing, tampered with or expired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser(pub i64);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    SessionSigner: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let token = jar
            .get(COOKIE_NAME)
            .map(Cookie::value)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::Unauthorized("Authentication required".into()))?;

        SessionSigner::from_ref(state)
            .verify(token)
            .map(AuthUser)
            .map_err(|e| {
                debug!(error = %e, "Rejected session cookie");
                AppError::Unauthorized("Authentication required".into())
            })
    }
}

#[cfg(test)]
mod tests {
    use axum::http::{header, HeaderMap, HeaderValue};
    use chrono::Duration;

    use super::*;

    fn signer() -> SessionSigner {
        SessionSigner::new("test-secret", 3600, false)
    }

    #[test]
    fn sign_then_verify() {
        let token = signer().sign(42, Utc::now()).unwrap();
        assert_eq!(token.split('.').count(), 3);
        assert_eq!(signer().verify(&token), Ok(42));
    }

    #[test]
    fn expired_token_is_rejected() {
        let issued = Utc::now() - Duration::seconds(3601);
        let token = signer().sign(42, issued).unwrap();
        assert_eq!(signer().verify(&token), Err(SessionError::Expired));
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let token = signer().sign(42, Utc::now()).unwrap();
        let other = signer().sign(43, Utc::now()).unwrap();
        let (header_b64, rest) = token.split_once('.').unwrap();
        let (_, signature) = rest.split_once('.').unwrap();
        let other_payload = other.split('.').nth(1).unwrap();
        let forged = format!("{header_b64}.{other_payload}.{signature}");
        assert_eq!(signer().verify(&forged), Err(SessionError::BadSignature));
    }

    #[test]
    fn other_key_is_rejected() {
        let token = SessionSigner::new("other", 3600, false).sign(42, Utc::now()).unwrap();
        assert_eq!(signer().verify(&token), Err(SessionError::BadSignature));
    }

    #[test]
    fn garbage_is_malformed() {
        for token in ["", "abc", "1.2", "x.2.00", "1.2.zz"] {
            assert_eq!(signer().verify(token), Err(SessionError::Malformed), "{token}");
        }
    }

    #[test]
    fn cookie_attributes() {
        let cookie = signer().issue_cookie(7, Utc::now()).unwrap();
        assert!(cookie.starts_with("session=ey"), "{cookie}");
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(cookie.contains("Path=/"));
        assert!(cookie.contains("Max-Age=3600"));
        assert!(!cookie.contains("Secure"));

        let secure = SessionSigner::new("k", 60, true).clear_cookie();
        assert!(secure.starts_with("session=;"), "{secure}");
        assert!(secure.contains("Max-Age=0"));
        assert!(secure.contains("Secure"));
    }

    #[test]
    fn issued_cookie_round_trips_through_request_headers() {
        let token = signer().sign(9, Utc::now()).unwrap();
        let mut headers = HeaderMap::new();
        headers.append(
            header::COOKIE,
            HeaderValue::from_str(&format!("theme=dark; {COOKIE_NAME}={token}")).unwrap(),
        );
        headers.append(header::COOKIE, HeaderValue::from_static("other=1"));

        let jar = CookieJar::from_headers(&headers);
        let value = jar.get(COOKIE_NAME).map(Cookie::value).unwrap();
        assert_eq!(signer().verify(value), Ok(9));
        assert_eq!(jar.get("other").map(Cookie::value), Some("1"));
        assert!(jar.get("missing").is_none());
    }
}
