use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::dto::{
    CreateSurveyRequest, SurveyDetail, SurveyDetailResponse, SurveyResponse, SurveysResponse,
    UpdateSurveyRequest,
};
use super::repo::Survey;
use crate::auth::AuthUser;
use crate::choices::repo::Choice;
use crate::error::ApiError;
use crate::questions::repo::Question;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/surveys", get(list_surveys).post(create_survey))
        .route(
            "/surveys/:id",
            get(get_survey).patch(update_survey).delete(delete_survey),
        )
}

#[instrument(skip(state, payload))]
pub async fn create_survey(
    State(state): State<AppState>,
    AuthUser(owner_id): AuthUser,
    Json(payload): Json<CreateSurveyRequest>,
) -> Result<(StatusCode, Json<SurveyResponse>), ApiError> {
    if payload.title.trim().is_empty() {
        return Err(ApiError::Validation("INVALID_TITLE"));
    }

    let survey = Survey::create(
        &state.db,
        owner_id,
        payload.title.trim(),
        payload.description.as_deref(),
    )
    .await?;

    info!(survey_id = %survey.id, owner_id = %owner_id, "survey created");
    Ok((StatusCode::CREATED, Json(SurveyResponse { survey })))
}

#[instrument(skip(state))]
pub async fn list_surveys(
    State(state): State<AppState>,
    AuthUser(owner_id): AuthUser,
) -> Result<Json<SurveysResponse>, ApiError> {
    let items = Survey::list_by_owner(&state.db, owner_id).await?;
    Ok(Json(SurveysResponse { items }))
}

#[instrument(skip(state))]
pub async fn get_survey(
    State(state): State<AppState>,
    AuthUser(owner_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<SurveyDetailResponse>, ApiError> {
    let survey = Survey::find_owned(&state.db, id, owner_id)
        .await?
        .ok_or(ApiError::NotFound("SURVEY_NOT_FOUND"))?;

    let questions = Question::list_for_survey(&state.db, survey.id).await?;
    let choices = Choice::list_for_survey(&state.db, survey.id).await?;

    Ok(Json(SurveyDetailResponse {
        survey: SurveyDetail::assemble(survey, questions, choices),
    }))
}

#[instrument(skip(state, payload))]
pub async fn update_survey(
    State(state): State<AppState>,
    AuthUser(owner_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateSurveyRequest>,
) -> Result<Json<SurveyResponse>, ApiError> {
    let survey = Survey::update_owned(
        &state.db,
        id,
        owner_id,
        payload.title.as_deref(),
        payload.description.as_deref(),
        payload.is_published,
    )
    .await?
    .ok_or(ApiError::NotFound("SURVEY_NOT_FOUND"))?;

    Ok(Json(SurveyResponse { survey }))
}

#[instrument(skip(state))]
pub async fn delete_survey(
    State(state): State<AppState>,
    AuthUser(owner_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if !Survey::delete_owned(&state.db, id, owner_id).await? {
        return Err(ApiError::NotFound("SURVEY_NOT_FOUND"));
    }
    info!(survey_id = %id, owner_id = %owner_id, "survey deleted");
    Ok(Json(serde_json::json!({ "ok": true })))
}
