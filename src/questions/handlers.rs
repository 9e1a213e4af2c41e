use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{patch, post},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::dto::{CreateQuestionRequest, QuestionResponse, UpdateQuestionRequest};
use super::repo::Question;
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;
use crate::surveys::repo::Survey;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/surveys/:survey_id/questions", post(create_question))
        .route(
            "/questions/:id",
            patch(update_question).delete(delete_question),
        )
}

#[instrument(skip(state, payload))]
pub async fn create_question(
    State(state): State<AppState>,
    AuthUser(owner_id): AuthUser,
    Path(survey_id): Path<Uuid>,
    Json(payload): Json<CreateQuestionRequest>,
) -> Result<(StatusCode, Json<QuestionResponse>), ApiError> {
    if payload.title.trim().is_empty() {
        return Err(ApiError::Validation("INVALID_TITLE"));
    }

    let survey = Survey::find_owned(&state.db, survey_id, owner_id)
        .await?
        .ok_or(ApiError::NotFound("SURVEY_NOT_FOUND"))?;

    let question = Question::create(
        &state.db,
        survey.id,
        payload.title.trim(),
        &payload.qtype,
        payload.required,
        payload.position,
    )
    .await?;

    info!(question_id = %question.id, survey_id = %survey.id, "question created");
    Ok((StatusCode::CREATED, Json(QuestionResponse { question })))
}

#[instrument(skip(state, payload))]
pub async fn update_question(
    State(state): State<AppState>,
    AuthUser(owner_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateQuestionRequest>,
) -> Result<Json<QuestionResponse>, ApiError> {
    let question = Question::update_owned(
        &state.db,
        id,
        owner_id,
        payload.title.as_deref(),
        payload.qtype.as_deref(),
        payload.required,
        payload.position,
    )
    .await?
    .ok_or(ApiError::NotFound("QUESTION_NOT_FOUND"))?;

    Ok(Json(QuestionResponse { question }))
}

#[instrument(skip(state))]
pub async fn delete_question(
    State(state): State<AppState>,
    AuthUser(owner_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let existing = Question::find_owned(&state.db, id, owner_id)
        .await?
        .ok_or(ApiError::NotFound("QUESTION_NOT_FOUND"))?;

    Question::delete(&state.db, existing.id).await?;
    info!(question_id = %id, "question deleted");
    Ok(Json(serde_json::json!({ "ok": true })))
}
