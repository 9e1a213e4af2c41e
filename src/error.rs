use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Closed error taxonomy for the HTTP boundary. Every variant carries a
/// stable machine-readable code that clients can match on; internals are
/// logged and never leaked.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("validation failed: {0}")]
    Validation(&'static str),
    #[error("unauthorized: {0}")]
    Unauthorized(&'static str),
    #[error("not found: {0}")]
    NotFound(&'static str),
    #[error("conflict: {0}")]
    Conflict(&'static str),
    /// 400 with a token-state code, used by the reset-consumption endpoint.
    #[error("bad token: {0}")]
    BadToken(&'static str),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn internal<E: Into<anyhow::Error>>(err: E) -> Self {
        Self::Internal(err.into())
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::BadToken(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Self::Validation(code)
            | Self::Unauthorized(code)
            | Self::NotFound(code)
            | Self::Conflict(code)
            | Self::BadToken(code) => code,
            Self::Internal(_) => "INTERNAL",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::Internal(e) = &self {
            error!(error = %e, "internal error");
        }
        (self.status(), Json(json!({ "error": self.code() }))).into_response()
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(e: sqlx::Error) -> Self {
        Self::Internal(e.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(
            ApiError::Validation("INVALID_EMAIL").status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Unauthorized("INVALID_CREDENTIALS").status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::NotFound("SURVEY_NOT_FOUND").status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::Conflict("EMAIL_TAKEN").status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::BadToken("TOKEN_USED").status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Internal(anyhow::anyhow!("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn internal_never_leaks_detail() {
        let err = ApiError::Internal(anyhow::anyhow!("secret detail"));
        assert_eq!(err.code(), "INTERNAL");
    }
}
