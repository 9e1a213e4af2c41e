use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

/// Question inside a survey. Ownership is derived through the survey.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: Uuid,
    pub survey_id: Uuid,
    pub title: String,
    #[serde(rename = "type")]
    pub qtype: String,
    pub required: bool,
    #[serde(rename = "order")]
    pub position: i32,
    pub created_at: OffsetDateTime,
}

impl Question {
    pub async fn create(
        db: &PgPool,
        survey_id: Uuid,
        title: &str,
        qtype: &str,
        required: bool,
        position: i32,
    ) -> anyhow::Result<Question> {
        let question = sqlx::query_as::<_, Question>(
            r#"
            INSERT INTO questions (survey_id, title, qtype, required, position)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, survey_id, title, qtype, required, position, created_at
            "#,
        )
        .bind(survey_id)
        .bind(title)
        .bind(qtype)
        .bind(required)
        .bind(position)
        .fetch_one(db)
        .await?;
        Ok(question)
    }

    pub async fn list_for_survey(db: &PgPool, survey_id: Uuid) -> anyhow::Result<Vec<Question>> {
        let rows = sqlx::query_as::<_, Question>(
            r#"
            SELECT id, survey_id, title, qtype, required, position, created_at
            FROM questions
            WHERE survey_id = $1
            ORDER BY position ASC, created_at ASC
            "#,
        )
        .bind(survey_id)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    /// Lookup gated on the survey's owner; the caller never sees questions
    /// from surveys it does not own.
    pub async fn find_owned(
        db: &PgPool,
        id: Uuid,
        owner_id: Uuid,
    ) -> anyhow::Result<Option<Question>> {
        let question = sqlx::query_as::<_, Question>(
            r#"
            SELECT q.id, q.survey_id, q.title, q.qtype, q.required, q.position, q.created_at
            FROM questions q
            JOIN surveys s ON s.id = q.survey_id
            WHERE q.id = $1 AND s.owner_id = $2
            "#,
        )
        .bind(id)
        .bind(owner_id)
        .fetch_optional(db)
        .await?;
        Ok(question)
    }

    /// Patch gated on the survey's owner in the same statement, so a
    /// concurrent delete or ownership miss surfaces as absence, not an error.
    pub async fn update_owned(
        db: &PgPool,
        id: Uuid,
        owner_id: Uuid,
        title: Option<&str>,
        qtype: Option<&str>,
        required: Option<bool>,
        position: Option<i32>,
    ) -> anyhow::Result<Option<Question>> {
        let question = sqlx::query_as::<_, Question>(
            r#"
            UPDATE questions q SET
                title = COALESCE($3, title),
                qtype = COALESCE($4, qtype),
                required = COALESCE($5, required),
                position = COALESCE($6, position)
            FROM surveys s
            WHERE q.id = $1 AND s.id = q.survey_id AND s.owner_id = $2
            RETURNING q.id, q.survey_id, q.title, q.qtype, q.required, q.position, q.created_at
            "#,
        )
        .bind(id)
        .bind(owner_id)
        .bind(title)
        .bind(qtype)
        .bind(required)
        .bind(position)
        .fetch_optional(db)
        .await?;
        Ok(question)
    }

    pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<()> {
        sqlx::query(r#"DELETE FROM questions WHERE id = $1"#)
            .bind(id)
            .execute(db)
            .await?;
        Ok(())
    }
}
