use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, patch, post},
    Json, Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{
        dto::{
            AuthResponse, ChangePasswordRequest, ForgotRequest, LoginRequest, OkResponse,
            PublicUser, RefreshRequest, RegisterRequest, ResetRequest, SessionsResponse,
            UpdateProfileRequest, UserResponse,
        },
        jwt::AuthUser,
        password::{hash_password, verify_password},
        repo::{RefreshTokenRecord, User},
        service::{self, is_valid_email, AuthFlowError, SessionMeta},
    },
    error::ApiError,
    state::AppState,
};

pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout", post(logout))
        .route("/auth/forgot", post(forgot))
        .route("/auth/reset", post(reset))
}

pub fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/me", get(get_me))
        .route("/auth/profile", patch(update_profile))
        .route("/auth/change-password", post(change_password))
        .route("/auth/sessions", get(list_sessions))
        .route("/auth/sessions/:id/revoke", post(revoke_session))
        .route("/auth/logout-all", post(logout_all))
}

/// Token-flow failures surface as a generic 401 with the domain code;
/// internals stay internal.
fn unauthorized(e: AuthFlowError) -> ApiError {
    match e {
        AuthFlowError::Internal(err) => ApiError::Internal(err),
        other => ApiError::Unauthorized(other.code()),
    }
}

#[instrument(skip(state, headers, payload))]
pub async fn register(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    // The email is the key exactly as sent; no case folding or trimming.
    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(ApiError::Validation("INVALID_EMAIL"));
    }
    if payload.password.len() < 8 {
        warn!("password too short");
        return Err(ApiError::Validation("PASSWORD_TOO_SHORT"));
    }

    if User::find_by_email(&state.db, &payload.email).await?.is_some() {
        warn!(email = %payload.email, "email already registered");
        return Err(ApiError::Conflict("EMAIL_TAKEN"));
    }

    let hash = hash_password(&payload.password)?;
    let user = match User::create(&state.db, &payload.email, &hash, payload.name.as_deref()).await {
        Ok(u) => u,
        // The unique index catches the register/register race the pre-check
        // cannot see.
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            warn!(email = %payload.email, "email registered concurrently");
            return Err(ApiError::Conflict("EMAIL_TAKEN"));
        }
        Err(e) => return Err(ApiError::internal(e)),
    };

    let meta = SessionMeta::from_headers(&headers);
    let pair = service::issue_tokens(&state, user.id, &meta).await?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            user: PublicUser::from(user),
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
        }),
    ))
}

#[instrument(skip(state, headers, payload))]
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(ApiError::Validation("INVALID_EMAIL"));
    }

    // Unknown email and wrong password are indistinguishable to the caller.
    let Some(user) = User::find_by_email(&state.db, &payload.email).await? else {
        warn!(email = %payload.email, "login unknown email");
        return Err(ApiError::Unauthorized("INVALID_CREDENTIALS"));
    };
    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(ApiError::Unauthorized("INVALID_CREDENTIALS"));
    }

    let meta = SessionMeta::from_headers(&headers);
    let pair = service::issue_tokens(&state, user.id, &meta).await?;

    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok(Json(AuthResponse {
        user: PublicUser::from(user),
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
    }))
}

#[instrument(skip(state, headers, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let meta = SessionMeta::from_headers(&headers);
    let (user, pair) = service::rotate(&state, &payload.refresh_token, &meta)
        .await
        .map_err(unauthorized)?;

    Ok(Json(AuthResponse {
        user: PublicUser::from(user),
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
    }))
}

#[instrument(skip(state, payload))]
pub async fn logout(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<OkResponse>, ApiError> {
    service::logout(&state, &payload.refresh_token).await?;
    Ok(Json(OkResponse::new()))
}

#[instrument(skip(state, headers, payload))]
pub async fn forgot(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<ForgotRequest>,
) -> Result<Json<OkResponse>, ApiError> {
    // Same response whether or not the email exists.
    let meta = SessionMeta::from_headers(&headers);
    service::request_password_reset(&state, &payload.email, &meta).await?;
    Ok(Json(OkResponse::new()))
}

#[instrument(skip(state, payload))]
pub async fn reset(
    State(state): State<AppState>,
    Json(payload): Json<ResetRequest>,
) -> Result<Json<OkResponse>, ApiError> {
    if payload.new_password.len() < 8 {
        return Err(ApiError::Validation("PASSWORD_TOO_SHORT"));
    }

    service::reset_password(&state, &payload.token, &payload.new_password)
        .await
        .map_err(|e| match e {
            AuthFlowError::Internal(err) => ApiError::Internal(err),
            other => ApiError::BadToken(other.code()),
        })?;
    Ok(Json(OkResponse::new()))
}

#[instrument(skip(state, payload))]
pub async fn change_password(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Json<OkResponse>, ApiError> {
    if payload.new_password.len() < 8 {
        return Err(ApiError::Validation("PASSWORD_TOO_SHORT"));
    }

    service::change_password(
        &state,
        user_id,
        &payload.current_password,
        &payload.new_password,
    )
    .await
    .map_err(|e| match e {
        AuthFlowError::InvalidCredentials => ApiError::Validation("INVALID_PASSWORD"),
        AuthFlowError::Internal(err) => ApiError::Internal(err),
        other => ApiError::BadToken(other.code()),
    })?;
    Ok(Json(OkResponse::new()))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<UserResponse>, ApiError> {
    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or(ApiError::NotFound("USER_NOT_FOUND"))?;
    Ok(Json(UserResponse {
        user: PublicUser::from(user),
    }))
}

#[instrument(skip(state, payload))]
pub async fn update_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = match payload.name {
        Some(name) if !name.trim().is_empty() => User::update_name(&state.db, user_id, name.trim())
            .await?
            .ok_or(ApiError::NotFound("USER_NOT_FOUND"))?,
        Some(_) => return Err(ApiError::Validation("INVALID_NAME")),
        None => User::find_by_id(&state.db, user_id)
            .await?
            .ok_or(ApiError::NotFound("USER_NOT_FOUND"))?,
    };
    Ok(Json(UserResponse {
        user: PublicUser::from(user),
    }))
}

#[instrument(skip(state))]
pub async fn list_sessions(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<SessionsResponse>, ApiError> {
    let items = RefreshTokenRecord::list_for_user(&state.db, user_id)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();
    Ok(Json(SessionsResponse { items }))
}

#[instrument(skip(state))]
pub async fn revoke_session(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<OkResponse>, ApiError> {
    let rec = RefreshTokenRecord::find_for_user(&state.db, id, user_id)
        .await?
        .ok_or(ApiError::NotFound("SESSION_NOT_FOUND"))?;

    // Already-revoked stays a success; the record is inert either way.
    if rec.revoked_at.is_none() {
        RefreshTokenRecord::revoke_if_active(&state.db, rec.id).await?;
        info!(user_id = %user_id, session_id = %rec.id, "session revoked");
    }
    Ok(Json(OkResponse::new()))
}

#[instrument(skip(state))]
pub async fn logout_all(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<OkResponse>, ApiError> {
    let revoked = RefreshTokenRecord::revoke_all_for_user(&state.db, user_id).await?;
    info!(user_id = %user_id, revoked, "all sessions revoked");
    Ok(Json(OkResponse::new()))
}
