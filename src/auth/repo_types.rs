use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::role::Role;

/// User record in the database. Deliberately not serializable; handlers
/// project into [`crate::auth::dto::PublicUser`] so the password hash and
/// reset-token fields can never leak into a response.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub phone: String,
    pub password_hash: String,
    pub role: Role,
    pub reset_token: Option<String>,
    pub reset_token_expires: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
}
