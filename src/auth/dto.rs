use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo::{RefreshTokenRecord, User};

/// Request body for user registration.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: Option<String>,
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Request body for token refresh and logout; the refresh token travels in
/// the body, never in a header.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
pub struct ForgotRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetRequest {
    pub token: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// Patch body for profile updates; absent fields are left untouched.
#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
}

/// Public part of the user returned to the client.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub created_at: OffsetDateTime,
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            email: u.email,
            name: u.name,
            created_at: u.created_at,
        }
    }
}

/// Response returned after register, login or refresh.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub user: PublicUser,
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub user: PublicUser,
}

#[derive(Debug, Serialize)]
pub struct OkResponse {
    pub ok: bool,
}

impl OkResponse {
    pub fn new() -> Self {
        Self { ok: true }
    }
}

/// One refresh-token record as shown in the session list. The token hash
/// never leaves the server.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionItem {
    pub id: Uuid,
    pub created_at: OffsetDateTime,
    pub expires_at: OffsetDateTime,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub revoked_at: Option<OffsetDateTime>,
}

impl From<RefreshTokenRecord> for SessionItem {
    fn from(r: RefreshTokenRecord) -> Self {
        Self {
            id: r.id,
            created_at: r.created_at,
            expires_at: r.expires_at,
            ip: r.ip,
            user_agent: r.user_agent,
            revoked_at: r.revoked_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SessionsResponse {
    pub items: Vec<SessionItem>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_item_hides_token_hash() {
        let item = SessionItem {
            id: Uuid::new_v4(),
            created_at: OffsetDateTime::now_utc(),
            expires_at: OffsetDateTime::now_utc(),
            ip: Some("127.0.0.1".into()),
            user_agent: Some("ua".into()),
            revoked_at: None,
        };
        let json = serde_json::to_string(&item).unwrap();
        assert!(json.contains("userAgent"));
        assert!(!json.contains("tokenHash"));
        assert!(!json.contains("token_hash"));
    }

    #[test]
    fn auth_response_uses_camel_case() {
        let response = AuthResponse {
            user: PublicUser {
                id: Uuid::new_v4(),
                email: "test@example.com".into(),
                name: None,
                created_at: OffsetDateTime::now_utc(),
            },
            access_token: "a".into(),
            refresh_token: "r".into(),
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("accessToken"));
        assert!(json.contains("refreshToken"));
        assert!(json.contains("createdAt"));
    }

    #[test]
    fn register_email_is_taken_verbatim() {
        // Email is an exact-string key: no case folding, no trimming.
        let req: RegisterRequest =
            serde_json::from_str(r#"{"email":"Mixed.Case@Example.COM","password":"password1"}"#)
                .unwrap();
        assert_eq!(req.email, "Mixed.Case@Example.COM");
        assert_ne!(req.email, req.email.to_lowercase());
    }

    #[test]
    fn refresh_request_accepts_camel_case() {
        let req: RefreshRequest = serde_json::from_str(r#"{"refreshToken":"abc"}"#).unwrap();
        assert_eq!(req.refresh_token, "abc");
    }
}
