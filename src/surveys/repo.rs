use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

/// Survey owned by exactly one user; questions and choices hang off it.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Survey {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub is_published: bool,
    pub created_at: OffsetDateTime,
}

impl Survey {
    pub async fn create(
        db: &PgPool,
        owner_id: Uuid,
        title: &str,
        description: Option<&str>,
    ) -> anyhow::Result<Survey> {
        let survey = sqlx::query_as::<_, Survey>(
            r#"
            INSERT INTO surveys (owner_id, title, description)
            VALUES ($1, $2, $3)
            RETURNING id, owner_id, title, description, is_published, created_at
            "#,
        )
        .bind(owner_id)
        .bind(title)
        .bind(description)
        .fetch_one(db)
        .await?;
        Ok(survey)
    }

    pub async fn list_by_owner(db: &PgPool, owner_id: Uuid) -> anyhow::Result<Vec<Survey>> {
        let rows = sqlx::query_as::<_, Survey>(
            r#"
            SELECT id, owner_id, title, description, is_published, created_at
            FROM surveys
            WHERE owner_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(owner_id)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    pub async fn find_owned(
        db: &PgPool,
        id: Uuid,
        owner_id: Uuid,
    ) -> anyhow::Result<Option<Survey>> {
        let survey = sqlx::query_as::<_, Survey>(
            r#"
            SELECT id, owner_id, title, description, is_published, created_at
            FROM surveys
            WHERE id = $1 AND owner_id = $2
            "#,
        )
        .bind(id)
        .bind(owner_id)
        .fetch_optional(db)
        .await?;
        Ok(survey)
    }

    /// Field-by-field patch: a bound NULL leaves the column as-is.
    pub async fn update_owned(
        db: &PgPool,
        id: Uuid,
        owner_id: Uuid,
        title: Option<&str>,
        description: Option<&str>,
        is_published: Option<bool>,
    ) -> anyhow::Result<Option<Survey>> {
        let survey = sqlx::query_as::<_, Survey>(
            r#"
            UPDATE surveys SET
                title = COALESCE($3, title),
                description = COALESCE($4, description),
                is_published = COALESCE($5, is_published)
            WHERE id = $1 AND owner_id = $2
            RETURNING id, owner_id, title, description, is_published, created_at
            "#,
        )
        .bind(id)
        .bind(owner_id)
        .bind(title)
        .bind(description)
        .bind(is_published)
        .fetch_optional(db)
        .await?;
        Ok(survey)
    }

    pub async fn delete_owned(db: &PgPool, id: Uuid, owner_id: Uuid) -> anyhow::Result<bool> {
        let result = sqlx::query(r#"DELETE FROM surveys WHERE id = $1 AND owner_id = $2"#)
            .bind(id)
            .bind(owner_id)
            .execute(db)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
