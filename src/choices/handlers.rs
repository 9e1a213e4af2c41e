use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::dto::{ChoiceResponse, ChoicesResponse, CreateChoiceRequest, UpdateChoiceRequest};
use super::repo::Choice;
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::questions::repo::Question;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/questions/:question_id/choices",
            get(list_choices).post(create_choice),
        )
        .route("/choices/:id", patch(update_choice).delete(delete_choice))
}

#[instrument(skip(state, payload))]
pub async fn create_choice(
    State(state): State<AppState>,
    AuthUser(owner_id): AuthUser,
    Path(question_id): Path<Uuid>,
    Json(payload): Json<CreateChoiceRequest>,
) -> Result<(StatusCode, Json<ChoiceResponse>), ApiError> {
    if payload.label.trim().is_empty() || payload.value.trim().is_empty() {
        return Err(ApiError::Validation("LABEL_AND_VALUE_REQUIRED"));
    }

    let question = Question::find_owned(&state.db, question_id, owner_id)
        .await?
        .ok_or(ApiError::NotFound("QUESTION_NOT_FOUND"))?;

    let choice = Choice::create(
        &state.db,
        question.id,
        payload.label.trim(),
        payload.value.trim(),
        payload.position,
    )
    .await?;

    info!(choice_id = %choice.id, question_id = %question.id, "choice created");
    Ok((StatusCode::CREATED, Json(ChoiceResponse { choice })))
}

#[instrument(skip(state))]
pub async fn list_choices(
    State(state): State<AppState>,
    AuthUser(owner_id): AuthUser,
    Path(question_id): Path<Uuid>,
) -> Result<Json<ChoicesResponse>, ApiError> {
    let question = Question::find_owned(&state.db, question_id, owner_id)
        .await?
        .ok_or(ApiError::NotFound("QUESTION_NOT_FOUND"))?;

    let items = Choice::list_for_question(&state.db, question.id).await?;
    Ok(Json(ChoicesResponse { items }))
}

#[instrument(skip(state, payload))]
pub async fn update_choice(
    State(state): State<AppState>,
    AuthUser(owner_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateChoiceRequest>,
) -> Result<Json<ChoiceResponse>, ApiError> {
    let choice = Choice::update_owned(
        &state.db,
        id,
        owner_id,
        payload.label.as_deref(),
        payload.value.as_deref(),
        payload.position,
    )
    .await?
    .ok_or(ApiError::NotFound("CHOICE_NOT_FOUND"))?;

    Ok(Json(ChoiceResponse { choice }))
}

#[instrument(skip(state))]
pub async fn delete_choice(
    State(state): State<AppState>,
    AuthUser(owner_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let existing = Choice::find_owned(&state.db, id, owner_id)
        .await?
        .ok_or(ApiError::NotFound("CHOICE_NOT_FOUND"))?;

    Choice::delete(&state.db, existing.id).await?;
    info!(choice_id = %id, "choice deleted");
    Ok(Json(serde_json::json!({ "ok": true })))
}
