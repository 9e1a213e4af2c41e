use std::time::Duration;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{debug, warn};
use uuid::Uuid;

use super::claims::{Claims, TokenKind};
use crate::{config::JwtConfig, error::ApiError, state::AppState};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("invalid signature")]
    InvalidSignature,
    #[error("token expired")]
    Expired,
}

/// Signing and verification keys. Access and refresh tokens use independent
/// secrets, so possession of one key never allows forging the other kind.
#[derive(Clone)]
pub struct JwtKeys {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    pub issuer: String,
    pub audience: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        let JwtConfig {
            access_secret,
            refresh_secret,
            issuer,
            audience,
            access_ttl_minutes,
            refresh_ttl_minutes,
        } = state.config.jwt.clone();
        Self {
            access_encoding: EncodingKey::from_secret(access_secret.as_bytes()),
            access_decoding: DecodingKey::from_secret(access_secret.as_bytes()),
            refresh_encoding: EncodingKey::from_secret(refresh_secret.as_bytes()),
            refresh_decoding: DecodingKey::from_secret(refresh_secret.as_bytes()),
            issuer,
            audience,
            access_ttl: Duration::from_secs((access_ttl_minutes as u64) * 60),
            refresh_ttl: Duration::from_secs((refresh_ttl_minutes as u64) * 60),
        }
    }
}

impl JwtKeys {
    fn sign_with_kind(&self, user_id: Uuid, kind: TokenKind, jti: Option<Uuid>) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let (key, ttl) = match kind {
            TokenKind::Access => (&self.access_encoding, self.access_ttl),
            TokenKind::Refresh => (&self.refresh_encoding, self.refresh_ttl),
        };
        let exp = now + TimeDuration::seconds(ttl.as_secs() as i64);
        let claims = Claims {
            sub: user_id,
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            kind,
            jti,
        };
        let token = encode(&Header::default(), &claims, key)?;
        debug!(user_id = %user_id, kind = ?kind, "jwt signed");
        Ok(token)
    }

    pub fn sign_access(&self, user_id: Uuid) -> anyhow::Result<String> {
        self.sign_with_kind(user_id, TokenKind::Access, None)
    }

    pub fn sign_refresh(&self, user_id: Uuid, jti: Uuid) -> anyhow::Result<String> {
        self.sign_with_kind(user_id, TokenKind::Refresh, Some(jti))
    }

    /// Verify signature, expiry, issuer and audience with the key for the
    /// expected kind; a token of the wrong kind never verifies.
    pub fn verify(&self, token: &str, expected: TokenKind) -> Result<Claims, TokenError> {
        let decoding = match expected {
            TokenKind::Access => &self.access_decoding,
            TokenKind::Refresh => &self.refresh_decoding,
        };
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));

        let data = decode::<Claims>(token, decoding, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::InvalidSignature,
            }
        })?;
        if data.claims.kind != expected {
            return Err(TokenError::InvalidSignature);
        }
        debug!(user_id = %data.claims.sub, kind = ?data.claims.kind, "jwt verified");
        Ok(data.claims)
    }

    /// Expiry embedded in a refresh token we signed ourselves. Used at
    /// issuance to persist the ledger expiry without re-deriving it.
    pub fn refresh_expiry(&self, token: &str) -> Option<OffsetDateTime> {
        let claims = self.verify(token, TokenKind::Refresh).ok()?;
        OffsetDateTime::from_unix_timestamp(claims.exp as i64).ok()
    }
}

/// Extracts the caller's user id from a bearer access token.
pub struct AuthUser(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = JwtKeys::from_ref(state);
        let auth_header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(ApiError::Unauthorized("UNAUTHORIZED"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .or_else(|| auth_header.strip_prefix("bearer "))
            .ok_or(ApiError::Unauthorized("UNAUTHORIZED"))?;

        let claims = keys.verify(token, TokenKind::Access).map_err(|e| {
            warn!(error = %e, "invalid or expired access token");
            ApiError::Unauthorized("INVALID_TOKEN")
        })?;

        Ok(AuthUser(claims.sub))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_keys() -> JwtKeys {
        let state = AppState::fake();
        JwtKeys::from_ref(&state)
    }

    #[tokio::test]
    async fn sign_and_verify_access_token() {
        let keys = make_keys();
        let user_id = Uuid::new_v4();
        let token = keys.sign_access(user_id).expect("sign access");
        let claims = keys.verify(&token, TokenKind::Access).expect("verify token");
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.iss, "test-issuer");
        assert_eq!(claims.aud, "test-aud");
        assert_eq!(claims.kind, TokenKind::Access);
        assert_eq!(claims.jti, None);
    }

    #[tokio::test]
    async fn sign_and_verify_refresh_token_carries_jti() {
        let keys = make_keys();
        let user_id = Uuid::new_v4();
        let jti = Uuid::new_v4();
        let token = keys.sign_refresh(user_id, jti).expect("sign refresh");
        let claims = keys.verify(&token, TokenKind::Refresh).expect("verify refresh");
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.kind, TokenKind::Refresh);
        assert_eq!(claims.jti, Some(jti));
    }

    #[tokio::test]
    async fn access_token_does_not_verify_as_refresh() {
        let keys = make_keys();
        let token = keys.sign_access(Uuid::new_v4()).expect("sign access");
        // Different secret, so this fails at the signature layer already.
        let err = keys.verify(&token, TokenKind::Refresh).unwrap_err();
        assert_eq!(err, TokenError::InvalidSignature);
    }

    #[tokio::test]
    async fn refresh_token_does_not_verify_as_access() {
        let keys = make_keys();
        let token = keys
            .sign_refresh(Uuid::new_v4(), Uuid::new_v4())
            .expect("sign refresh");
        let err = keys.verify(&token, TokenKind::Access).unwrap_err();
        assert_eq!(err, TokenError::InvalidSignature);
    }

    #[tokio::test]
    async fn garbage_token_is_invalid_signature() {
        let keys = make_keys();
        let err = keys.verify("not.a.jwt", TokenKind::Access).unwrap_err();
        assert_eq!(err, TokenError::InvalidSignature);
    }

    #[tokio::test]
    async fn refresh_expiry_is_in_the_future() {
        let keys = make_keys();
        let token = keys
            .sign_refresh(Uuid::new_v4(), Uuid::new_v4())
            .expect("sign refresh");
        let exp = keys.refresh_expiry(&token).expect("decodable expiry");
        assert!(exp > OffsetDateTime::now_utc());
    }
}
