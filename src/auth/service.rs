use axum::extract::FromRef;
use axum::http::HeaderMap;
use thiserror::Error;
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{error, info, warn};
use uuid::Uuid;

use super::claims::TokenKind;
use super::hash::{generate_raw_token, sha256_hex};
use super::jwt::{JwtKeys, TokenError};
use super::password::{hash_password, verify_password};
use super::repo::{PasswordResetRecord, RefreshTokenRecord, User};
use crate::state::AppState;

use lazy_static::lazy_static;
use regex::Regex;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Client metadata stored alongside issued tokens.
#[derive(Debug, Clone, Default)]
pub struct SessionMeta {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

impl SessionMeta {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let ip = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(|v| v.trim().to_string());
        let user_agent = headers
            .get(axum::http::header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string());
        Self { ip, user_agent }
    }
}

#[derive(Debug)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Domain failures of the token and reset flows. Mapped to transport
/// status codes at the handler boundary, never matched by message text.
#[derive(Debug, Error)]
pub enum AuthFlowError {
    #[error("invalid token")]
    InvalidToken,
    #[error("token not found")]
    TokenNotFound,
    #[error("token revoked")]
    TokenRevoked,
    #[error("token expired")]
    TokenExpired,
    #[error("token already used")]
    TokenUsed,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AuthFlowError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidToken => "INVALID_TOKEN",
            Self::TokenNotFound => "TOKEN_NOT_FOUND",
            Self::TokenRevoked => "TOKEN_REVOKED",
            Self::TokenExpired => "TOKEN_EXPIRED",
            Self::TokenUsed => "TOKEN_USED",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::Internal(_) => "INTERNAL",
        }
    }
}

impl From<TokenError> for AuthFlowError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::InvalidSignature => Self::InvalidToken,
            TokenError::Expired => Self::TokenExpired,
        }
    }
}

/// Ledger-side state checks for a refresh record, applied after the hash
/// lookup. Revocation takes precedence over expiry; the row's expires_at is
/// enforced independently of the signed exp claim.
fn check_refresh_record(rec: &RefreshTokenRecord, now: OffsetDateTime) -> Result<(), AuthFlowError> {
    if rec.revoked_at.is_some() {
        return Err(AuthFlowError::TokenRevoked);
    }
    if rec.expires_at <= now {
        return Err(AuthFlowError::TokenExpired);
    }
    Ok(())
}

/// State checks for a reset record: used wins over expired, and an expired
/// but never-consumed token still fails.
fn check_reset_record(rec: &PasswordResetRecord, now: OffsetDateTime) -> Result<(), AuthFlowError> {
    if rec.used_at.is_some() {
        return Err(AuthFlowError::TokenUsed);
    }
    if rec.expires_at <= now {
        return Err(AuthFlowError::TokenExpired);
    }
    Ok(())
}

/// Mint an access/refresh pair and record the refresh token in the ledger.
/// If the ledger insert fails no tokens are handed out.
pub async fn issue_tokens(
    state: &AppState,
    user_id: Uuid,
    meta: &SessionMeta,
) -> anyhow::Result<TokenPair> {
    let keys = JwtKeys::from_ref(state);
    let jti = Uuid::new_v4();

    let access_token = keys.sign_access(user_id)?;
    let refresh_token = keys.sign_refresh(user_id, jti)?;

    // Ledger expiry comes from the signed token itself; the fixed window is
    // only a fallback should the claim ever be undecodable.
    let expires_at = keys.refresh_expiry(&refresh_token).unwrap_or_else(|| {
        OffsetDateTime::now_utc() + TimeDuration::minutes(state.config.jwt.refresh_ttl_minutes)
    });

    RefreshTokenRecord::record(
        &state.db,
        user_id,
        &sha256_hex(&refresh_token),
        meta.user_agent.as_deref(),
        meta.ip.as_deref(),
        expires_at,
    )
    .await?;

    info!(user_id = %user_id, "session issued");
    Ok(TokenPair {
        access_token,
        refresh_token,
    })
}

/// Refresh rotation: a raw refresh token buys exactly one new pair, and the
/// old token becomes permanently unusable even if replayed.
pub async fn rotate(
    state: &AppState,
    raw_refresh: &str,
    meta: &SessionMeta,
) -> Result<(User, TokenPair), AuthFlowError> {
    let keys = JwtKeys::from_ref(state);
    let claims = keys.verify(raw_refresh, TokenKind::Refresh)?;

    let rec = RefreshTokenRecord::find_by_hash(&state.db, &sha256_hex(raw_refresh))
        .await?
        .ok_or(AuthFlowError::TokenNotFound)?;

    if let Err(e) = check_refresh_record(&rec, OffsetDateTime::now_utc()) {
        if matches!(e, AuthFlowError::TokenRevoked) {
            warn!(user_id = %rec.user_id, token_id = %rec.id, "replay of revoked refresh token");
        }
        return Err(e);
    }

    // Conditional update decides the winner under concurrent rotation.
    if !RefreshTokenRecord::revoke_if_active(&state.db, rec.id).await? {
        warn!(user_id = %rec.user_id, token_id = %rec.id, "lost rotation race");
        return Err(AuthFlowError::TokenRevoked);
    }

    let user = User::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or(AuthFlowError::InvalidToken)?;

    let pair = issue_tokens(state, user.id, meta).await?;
    info!(user_id = %user.id, rotated = %rec.id, "refresh token rotated");
    Ok((user, pair))
}

/// Revoke the refresh token carried in a logout request. Idempotent: an
/// unknown or already-revoked token is not an error.
pub async fn logout(state: &AppState, raw_refresh: &str) -> anyhow::Result<()> {
    let revoked = RefreshTokenRecord::revoke_by_hash(&state.db, &sha256_hex(raw_refresh)).await?;
    info!(revoked, "logout");
    Ok(())
}

/// Create a reset record and hand the link to the mailer. The caller always
/// receives a generic ok; whether the email exists is never revealed, and a
/// mailer failure never fails the request.
pub async fn request_password_reset(
    state: &AppState,
    email: &str,
    meta: &SessionMeta,
) -> anyhow::Result<()> {
    let Some(user) = User::find_by_email(&state.db, email).await? else {
        return Ok(());
    };

    let raw_token = generate_raw_token();
    let expires_at =
        OffsetDateTime::now_utc() + TimeDuration::minutes(state.config.reset_ttl_minutes);

    PasswordResetRecord::create(
        &state.db,
        user.id,
        &sha256_hex(&raw_token),
        meta.ip.as_deref(),
        meta.user_agent.as_deref(),
        expires_at,
    )
    .await?;

    let reset_link = state.config.reset_link(&raw_token);
    let mailer = state.mailer.clone();
    let to = user.email.clone();
    tokio::spawn(async move {
        if let Err(e) = mailer.send_password_reset(&to, &reset_link).await {
            error!(error = %e, "password reset notification failed");
        }
    });

    info!(user_id = %user.id, "password reset requested");
    Ok(())
}

/// Consume a reset token: set the new password hash, revoke every session
/// and mark the record used, all in one transaction. A concurrent consumer
/// of the same token loses on the conditional mark-used update.
pub async fn reset_password(
    state: &AppState,
    raw_token: &str,
    new_password: &str,
) -> Result<(), AuthFlowError> {
    let rec = PasswordResetRecord::find_by_hash(&state.db, &sha256_hex(raw_token))
        .await?
        .ok_or(AuthFlowError::TokenNotFound)?;

    check_reset_record(&rec, OffsetDateTime::now_utc())?;

    let new_hash = hash_password(new_password)?;

    let mut tx = state.db.begin().await.map_err(anyhow::Error::from)?;

    let marked = sqlx::query(
        r#"
        UPDATE password_resets SET used_at = now()
        WHERE id = $1 AND used_at IS NULL
        "#,
    )
    .bind(rec.id)
    .execute(&mut *tx)
    .await
    .map_err(anyhow::Error::from)?;
    if marked.rows_affected() == 0 {
        return Err(AuthFlowError::TokenUsed);
    }

    sqlx::query(r#"UPDATE users SET password_hash = $2 WHERE id = $1"#)
        .bind(rec.user_id)
        .bind(&new_hash)
        .execute(&mut *tx)
        .await
        .map_err(anyhow::Error::from)?;

    sqlx::query(
        r#"
        UPDATE refresh_tokens SET revoked_at = now()
        WHERE user_id = $1 AND revoked_at IS NULL
        "#,
    )
    .bind(rec.user_id)
    .execute(&mut *tx)
    .await
    .map_err(anyhow::Error::from)?;

    tx.commit().await.map_err(anyhow::Error::from)?;

    info!(user_id = %rec.user_id, "password reset completed, all sessions revoked");
    Ok(())
}

/// Authenticated password change. Same coupling as reset: the new hash and
/// the revoke-all are committed together.
pub async fn change_password(
    state: &AppState,
    user_id: Uuid,
    current_password: &str,
    new_password: &str,
) -> Result<(), AuthFlowError> {
    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or(AuthFlowError::InvalidCredentials)?;

    if !verify_password(current_password, &user.password_hash)? {
        return Err(AuthFlowError::InvalidCredentials);
    }

    let new_hash = hash_password(new_password)?;

    let mut tx = state.db.begin().await.map_err(anyhow::Error::from)?;

    sqlx::query(r#"UPDATE users SET password_hash = $2 WHERE id = $1"#)
        .bind(user_id)
        .bind(&new_hash)
        .execute(&mut *tx)
        .await
        .map_err(anyhow::Error::from)?;

    sqlx::query(
        r#"
        UPDATE refresh_tokens SET revoked_at = now()
        WHERE user_id = $1 AND revoked_at IS NULL
        "#,
    )
    .bind(user_id)
    .execute(&mut *tx)
    .await
    .map_err(anyhow::Error::from)?;

    tx.commit().await.map_err(anyhow::Error::from)?;

    info!(user_id = %user_id, "password changed, all sessions revoked");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn refresh_record(
        revoked_at: Option<OffsetDateTime>,
        expires_at: OffsetDateTime,
    ) -> RefreshTokenRecord {
        RefreshTokenRecord {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            token_hash: "hash".into(),
            user_agent: None,
            ip: None,
            created_at: OffsetDateTime::now_utc(),
            expires_at,
            revoked_at,
        }
    }

    fn reset_record(
        used_at: Option<OffsetDateTime>,
        expires_at: OffsetDateTime,
    ) -> PasswordResetRecord {
        PasswordResetRecord {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            token_hash: "hash".into(),
            ip: None,
            user_agent: None,
            created_at: OffsetDateTime::now_utc(),
            expires_at,
            used_at,
        }
    }

    #[test]
    fn email_validation() {
        assert!(is_valid_email("a@x.com"));
        assert!(is_valid_email("first.last@sub.domain.org"));
        assert!(is_valid_email("Mixed.Case@Example.COM"));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("a b@x.com"));
    }

    #[test]
    fn live_refresh_record_passes() {
        let now = OffsetDateTime::now_utc();
        let rec = refresh_record(None, now + TimeDuration::days(1));
        assert!(check_refresh_record(&rec, now).is_ok());
    }

    #[test]
    fn revoked_refresh_record_is_rejected() {
        let now = OffsetDateTime::now_utc();
        let rec = refresh_record(Some(now), now + TimeDuration::days(1));
        assert!(matches!(
            check_refresh_record(&rec, now),
            Err(AuthFlowError::TokenRevoked)
        ));
    }

    #[test]
    fn stored_expiry_is_enforced_independently_of_the_jwt() {
        // The row can outlive or undercut the signed exp claim; the ledger
        // check alone must reject a stale row.
        let now = OffsetDateTime::now_utc();
        let rec = refresh_record(None, now - TimeDuration::seconds(1));
        assert!(matches!(
            check_refresh_record(&rec, now),
            Err(AuthFlowError::TokenExpired)
        ));
        // Boundary: expires_at == now counts as expired.
        let rec = refresh_record(None, now);
        assert!(matches!(
            check_refresh_record(&rec, now),
            Err(AuthFlowError::TokenExpired)
        ));
    }

    #[test]
    fn revocation_wins_over_expiry_for_refresh_records() {
        let now = OffsetDateTime::now_utc();
        let rec = refresh_record(Some(now), now - TimeDuration::days(1));
        assert!(matches!(
            check_refresh_record(&rec, now),
            Err(AuthFlowError::TokenRevoked)
        ));
    }

    #[test]
    fn live_reset_record_passes() {
        let now = OffsetDateTime::now_utc();
        let rec = reset_record(None, now + TimeDuration::minutes(15));
        assert!(check_reset_record(&rec, now).is_ok());
    }

    #[test]
    fn used_reset_record_is_rejected() {
        let now = OffsetDateTime::now_utc();
        let rec = reset_record(Some(now), now + TimeDuration::minutes(15));
        assert!(matches!(
            check_reset_record(&rec, now),
            Err(AuthFlowError::TokenUsed)
        ));
    }

    #[test]
    fn expired_reset_record_fails_even_if_never_used() {
        let now = OffsetDateTime::now_utc();
        let rec = reset_record(None, now - TimeDuration::minutes(1));
        assert!(matches!(
            check_reset_record(&rec, now),
            Err(AuthFlowError::TokenExpired)
        ));
    }

    #[test]
    fn used_wins_over_expired_for_reset_records() {
        let now = OffsetDateTime::now_utc();
        let rec = reset_record(Some(now), now - TimeDuration::minutes(1));
        assert!(matches!(
            check_reset_record(&rec, now),
            Err(AuthFlowError::TokenUsed)
        ));
    }

    #[test]
    fn error_codes_are_stable() {
        assert_eq!(AuthFlowError::InvalidToken.code(), "INVALID_TOKEN");
        assert_eq!(AuthFlowError::TokenNotFound.code(), "TOKEN_NOT_FOUND");
        assert_eq!(AuthFlowError::TokenRevoked.code(), "TOKEN_REVOKED");
        assert_eq!(AuthFlowError::TokenExpired.code(), "TOKEN_EXPIRED");
        assert_eq!(AuthFlowError::TokenUsed.code(), "TOKEN_USED");
        assert_eq!(AuthFlowError::InvalidCredentials.code(), "INVALID_CREDENTIALS");
    }

    #[test]
    fn token_error_maps_into_flow_error() {
        assert!(matches!(
            AuthFlowError::from(TokenError::InvalidSignature),
            AuthFlowError::InvalidToken
        ));
        assert!(matches!(
            AuthFlowError::from(TokenError::Expired),
            AuthFlowError::TokenExpired
        ));
    }

    #[test]
    fn session_meta_from_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "10.0.0.1, 172.16.0.1".parse().unwrap());
        headers.insert(axum::http::header::USER_AGENT, "test-agent".parse().unwrap());
        let meta = SessionMeta::from_headers(&headers);
        assert_eq!(meta.ip.as_deref(), Some("10.0.0.1"));
        assert_eq!(meta.user_agent.as_deref(), Some("test-agent"));
    }

    #[test]
    fn session_meta_tolerates_missing_headers() {
        let meta = SessionMeta::from_headers(&HeaderMap::new());
        assert_eq!(meta.ip, None);
        assert_eq!(meta.user_agent, None);
    }
}
