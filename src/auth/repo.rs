use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo_types::User;
use crate::auth::role::Role;

const USER_COLUMNS: &str = "id, username, email, phone, password_hash, role, \
     reset_token, reset_token_expires, created_at";

impl User {
    /// Find a user by email. Emails are stored lowercase; callers normalize
    /// before lookup.
    pub async fn find_by_email(db: &PgPool, email: &str) -> sqlx::Result<Option<User>> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(db)
        .await
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> sqlx::Result<Option<User>> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(db)
            .await
    }

    /// Create a new user with an already-hashed password.
    pub async fn create(
        db: &PgPool,
        username: &str,
        phone: &str,
        email: &str,
        password_hash: &str,
        role: Role,
    ) -> sqlx::Result<User> {
        sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (username, phone, email, password_hash, role)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(username)
        .bind(phone)
        .bind(email)
        .bind(password_hash)
        .bind(role)
        .fetch_one(db)
        .await
    }

    /// Store a fresh reset token and its expiry in one write. Overwrites any
    /// unredeemed token the user still had.
    pub async fn set_reset_token(
        db: &PgPool,
        user_id: Uuid,
        token: &str,
        expires: OffsetDateTime,
    ) -> sqlx::Result<()> {
        sqlx::query(
            "UPDATE users SET reset_token = $2, reset_token_expires = $3 WHERE id = $1",
        )
        .bind(user_id)
        .bind(token)
        .bind(expires)
        .execute(db)
        .await?;
        Ok(())
    }

    /// Redeem a live reset token: write the new hash and clear the token in a
    /// single conditional update. Of two racing redeems at most one gets a
    /// row back; the loser sees the token as already gone.
    pub async fn consume_reset_token(
        db: &PgPool,
        token: &str,
        new_password_hash: &str,
    ) -> sqlx::Result<Option<Uuid>> {
        let row: Option<(Uuid,)> = sqlx::query_as(
            "UPDATE users
             SET password_hash = $2, reset_token = NULL, reset_token_expires = NULL
             WHERE reset_token = $1 AND reset_token_expires > now()
             RETURNING id",
        )
        .bind(token)
        .bind(new_password_hash)
        .fetch_optional(db)
        .await?;
        Ok(row.map(|(id,)| id))
    }

    /// Clear a token that exists but has passed its expiry, so it cannot be
    /// retried. Returns the owning user when a stale token was found.
    pub async fn clear_expired_reset_token(
        db: &PgPool,
        token: &str,
    ) -> sqlx::Result<Option<Uuid>> {
        let row: Option<(Uuid,)> = sqlx::query_as(
            "UPDATE users
             SET reset_token = NULL, reset_token_expires = NULL
             WHERE reset_token = $1 AND reset_token_expires <= now()
             RETURNING id",
        )
        .bind(token)
        .fetch_optional(db)
        .await?;
        Ok(row.map(|(id,)| id))
    }
}

/// True when the error is a unique-constraint violation (duplicate email
/// from a signup race the pre-check missed).
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|db| db.code())
        .map(|code| code == "23505")
        .unwrap_or(false)
}
