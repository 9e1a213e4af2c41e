use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub name: Option<String>,
    pub created_at: OffsetDateTime,
}

impl User {
    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, name, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, name, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Create a new user with hashed password. Relies on the unique index on
    /// email; concurrent duplicate inserts surface as a database error.
    pub async fn create(
        db: &PgPool,
        email: &str,
        password_hash: &str,
        name: Option<&str>,
    ) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, password_hash, name)
            VALUES ($1, $2, $3)
            RETURNING id, email, password_hash, name, created_at
            "#,
        )
        .bind(email)
        .bind(password_hash)
        .bind(name)
        .fetch_one(db)
        .await
    }

    pub async fn update_name(db: &PgPool, id: Uuid, name: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET name = $2
            WHERE id = $1
            RETURNING id, email, password_hash, name, created_at
            "#,
        )
        .bind(id)
        .bind(name)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }
}

/// Ledger row for one issued refresh token. Holds only the sha256 of the
/// raw token; a row with revoked_at set is permanently inert.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RefreshTokenRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(skip_serializing)]
    pub token_hash: String,
    pub user_agent: Option<String>,
    pub ip: Option<String>,
    pub created_at: OffsetDateTime,
    pub expires_at: OffsetDateTime,
    pub revoked_at: Option<OffsetDateTime>,
}

impl RefreshTokenRecord {
    pub async fn record(
        db: &PgPool,
        user_id: Uuid,
        token_hash: &str,
        user_agent: Option<&str>,
        ip: Option<&str>,
        expires_at: OffsetDateTime,
    ) -> anyhow::Result<RefreshTokenRecord> {
        let rec = sqlx::query_as::<_, RefreshTokenRecord>(
            r#"
            INSERT INTO refresh_tokens (user_id, token_hash, user_agent, ip, expires_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, token_hash, user_agent, ip, created_at, expires_at, revoked_at
            "#,
        )
        .bind(user_id)
        .bind(token_hash)
        .bind(user_agent)
        .bind(ip)
        .bind(expires_at)
        .fetch_one(db)
        .await?;
        Ok(rec)
    }

    pub async fn find_by_hash(
        db: &PgPool,
        token_hash: &str,
    ) -> anyhow::Result<Option<RefreshTokenRecord>> {
        let rec = sqlx::query_as::<_, RefreshTokenRecord>(
            r#"
            SELECT id, user_id, token_hash, user_agent, ip, created_at, expires_at, revoked_at
            FROM refresh_tokens
            WHERE token_hash = $1
            "#,
        )
        .bind(token_hash)
        .fetch_optional(db)
        .await?;
        Ok(rec)
    }

    pub async fn find_for_user(
        db: &PgPool,
        id: Uuid,
        user_id: Uuid,
    ) -> anyhow::Result<Option<RefreshTokenRecord>> {
        let rec = sqlx::query_as::<_, RefreshTokenRecord>(
            r#"
            SELECT id, user_id, token_hash, user_agent, ip, created_at, expires_at, revoked_at
            FROM refresh_tokens
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(db)
        .await?;
        Ok(rec)
    }

    /// Conditional revoke: only flips a live row. Returns whether this call
    /// won; under two concurrent rotations of one token exactly one caller
    /// sees `true`.
    pub async fn revoke_if_active(db: &PgPool, id: Uuid) -> anyhow::Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE refresh_tokens SET revoked_at = now()
            WHERE id = $1 AND revoked_at IS NULL
            "#,
        )
        .bind(id)
        .execute(db)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Idempotent revoke by raw-token hash, used by logout.
    pub async fn revoke_by_hash(db: &PgPool, token_hash: &str) -> anyhow::Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE refresh_tokens SET revoked_at = now()
            WHERE token_hash = $1 AND revoked_at IS NULL
            "#,
        )
        .bind(token_hash)
        .execute(db)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn revoke_all_for_user(db: &PgPool, user_id: Uuid) -> anyhow::Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE refresh_tokens SET revoked_at = now()
            WHERE user_id = $1 AND revoked_at IS NULL
            "#,
        )
        .bind(user_id)
        .execute(db)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn list_for_user(
        db: &PgPool,
        user_id: Uuid,
    ) -> anyhow::Result<Vec<RefreshTokenRecord>> {
        let rows = sqlx::query_as::<_, RefreshTokenRecord>(
            r#"
            SELECT id, user_id, token_hash, user_agent, ip, created_at, expires_at, revoked_at
            FROM refresh_tokens
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }
}

/// Single-use password-reset record; once used_at is set it is inert.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PasswordResetRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(skip_serializing)]
    pub token_hash: String,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: OffsetDateTime,
    pub expires_at: OffsetDateTime,
    pub used_at: Option<OffsetDateTime>,
}

impl PasswordResetRecord {
    pub async fn create(
        db: &PgPool,
        user_id: Uuid,
        token_hash: &str,
        ip: Option<&str>,
        user_agent: Option<&str>,
        expires_at: OffsetDateTime,
    ) -> anyhow::Result<PasswordResetRecord> {
        let rec = sqlx::query_as::<_, PasswordResetRecord>(
            r#"
            INSERT INTO password_resets (user_id, token_hash, ip, user_agent, expires_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, token_hash, ip, user_agent, created_at, expires_at, used_at
            "#,
        )
        .bind(user_id)
        .bind(token_hash)
        .bind(ip)
        .bind(user_agent)
        .bind(expires_at)
        .fetch_one(db)
        .await?;
        Ok(rec)
    }

    pub async fn find_by_hash(
        db: &PgPool,
        token_hash: &str,
    ) -> anyhow::Result<Option<PasswordResetRecord>> {
        let rec = sqlx::query_as::<_, PasswordResetRecord>(
            r#"
            SELECT id, user_id, token_hash, ip, user_agent, created_at, expires_at, used_at
            FROM password_resets
            WHERE token_hash = $1
            "#,
        )
        .bind(token_hash)
        .fetch_optional(db)
        .await?;
        Ok(rec)
    }
}
