use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo_types::User;
use crate::auth::role::Role;

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub username: String,
    pub phone: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
}

/// Response for signup and login: the bearer token plus the fixed role.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub role: Role,
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
    /// Raw reset token, surfaced only by the explicit non-production
    /// fallback when mail is unconfigured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl MessageResponse {
    pub fn new(message: &'static str) -> Self {
        Self {
            message,
            token: None,
        }
    }
}

/// Public projection of a user record.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub phone: String,
    pub role: Role,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            phone: user.phone,
            role: user.role,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub user: PublicUser,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_response_omits_absent_token() {
        let json =
            serde_json::to_string(&MessageResponse::new("Password reset email sent")).unwrap();
        assert!(!json.contains("token"));

        let with_token = MessageResponse {
            message: "Email configuration not set. Contact administrator.",
            token: Some("deadbeef".into()),
        };
        let json = serde_json::to_string(&with_token).unwrap();
        assert!(json.contains("deadbeef"));
    }

    #[test]
    fn public_user_never_contains_password_hash() {
        let user = User {
            id: Uuid::new_v4(),
            username: "abc".into(),
            email: "a@b.com".into(),
            phone: "1234567890".into(),
            password_hash: "$argon2id$v=19$secret".into(),
            role: Role::User,
            reset_token: Some("topsecret".into()),
            reset_token_expires: None,
            created_at: OffsetDateTime::now_utc(),
        };
        let json = serde_json::to_string(&PublicUser::from(user)).unwrap();
        assert!(!json.contains("argon2"));
        assert!(!json.contains("topsecret"));
        assert!(json.contains("a@b.com"));
    }

    #[test]
    fn reset_request_accepts_camel_case() {
        let req: ResetPasswordRequest =
            serde_json::from_str(r#"{"token":"abc","newPassword":"12345678"}"#).unwrap();
        assert_eq!(req.token, "abc");
        assert_eq!(req.new_password, "12345678");
    }
}
