use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

/// Choice of a question. Ownership is derived through question and survey.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Choice {
    pub id: Uuid,
    pub question_id: Uuid,
    pub label: String,
    pub value: String,
    #[serde(rename = "order")]
    pub position: i32,
    pub created_at: OffsetDateTime,
}

impl Choice {
    pub async fn create(
        db: &PgPool,
        question_id: Uuid,
        label: &str,
        value: &str,
        position: i32,
    ) -> anyhow::Result<Choice> {
        let choice = sqlx::query_as::<_, Choice>(
            r#"
            INSERT INTO choices (question_id, label, value, position)
            VALUES ($1, $2, $3, $4)
            RETURNING id, question_id, label, value, position, created_at
            "#,
        )
        .bind(question_id)
        .bind(label)
        .bind(value)
        .bind(position)
        .fetch_one(db)
        .await?;
        Ok(choice)
    }

    pub async fn list_for_question(db: &PgPool, question_id: Uuid) -> anyhow::Result<Vec<Choice>> {
        let rows = sqlx::query_as::<_, Choice>(
            r#"
            SELECT id, question_id, label, value, position, created_at
            FROM choices
            WHERE question_id = $1
            ORDER BY position ASC, created_at ASC
            "#,
        )
        .bind(question_id)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    /// All choices under one survey, for assembling the nested detail view.
    pub async fn list_for_survey(db: &PgPool, survey_id: Uuid) -> anyhow::Result<Vec<Choice>> {
        let rows = sqlx::query_as::<_, Choice>(
            r#"
            SELECT c.id, c.question_id, c.label, c.value, c.position, c.created_at
            FROM choices c
            JOIN questions q ON q.id = c.question_id
            WHERE q.survey_id = $1
            ORDER BY c.position ASC, c.created_at ASC
            "#,
        )
        .bind(survey_id)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    /// Lookup gated on the full ownership chain choice → question → survey.
    pub async fn find_owned(
        db: &PgPool,
        id: Uuid,
        owner_id: Uuid,
    ) -> anyhow::Result<Option<Choice>> {
        let choice = sqlx::query_as::<_, Choice>(
            r#"
            SELECT c.id, c.question_id, c.label, c.value, c.position, c.created_at
            FROM choices c
            JOIN questions q ON q.id = c.question_id
            JOIN surveys s ON s.id = q.survey_id
            WHERE c.id = $1 AND s.owner_id = $2
            "#,
        )
        .bind(id)
        .bind(owner_id)
        .fetch_optional(db)
        .await?;
        Ok(choice)
    }

    /// Patch gated on the full ownership chain in the same statement, so a
    /// concurrent delete or ownership miss surfaces as absence, not an error.
    pub async fn update_owned(
        db: &PgPool,
        id: Uuid,
        owner_id: Uuid,
        label: Option<&str>,
        value: Option<&str>,
        position: Option<i32>,
    ) -> anyhow::Result<Option<Choice>> {
        let choice = sqlx::query_as::<_, Choice>(
            r#"
            UPDATE choices c SET
                label = COALESCE($3, label),
                value = COALESCE($4, value),
                position = COALESCE($5, position)
            FROM questions q
            JOIN surveys s ON s.id = q.survey_id
            WHERE c.id = $1 AND q.id = c.question_id AND s.owner_id = $2
            RETURNING c.id, c.question_id, c.label, c.value, c.position, c.created_at
            "#,
        )
        .bind(id)
        .bind(owner_id)
        .bind(label)
        .bind(value)
        .bind(position)
        .fetch_optional(db)
        .await?;
        Ok(choice)
    }

    pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<()> {
        sqlx::query(r#"DELETE FROM choices WHERE id = $1"#)
            .bind(id)
            .execute(db)
            .await?;
        Ok(())
    }
}
