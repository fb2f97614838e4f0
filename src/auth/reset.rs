//! Reset-token lifecycle: issuance on forgot-password, redemption on
//! reset-password. Tokens are 32 random bytes, hex-encoded, valid for one
//! hour, and consumed by a single conditional update so a token can never
//! be redeemed twice.

use anyhow::Context;
use rand::RngCore;
use sqlx::PgPool;
use time::{Duration, OffsetDateTime};
use tracing::{info, warn};

use crate::auth::password::hash_password_blocking;
use crate::auth::repo_types::User;
use crate::mail::render_reset_email;
use crate::state::AppState;

pub const RESET_TOKEN_TTL: Duration = Duration::hours(1);

/// Internal outcome of a forgot-password request. The HTTP response is the
/// same for `NoMatch` and `EmailSent`; the distinction exists for logging
/// and tests.
#[derive(Debug)]
pub enum ResetRequested {
    /// No account under that email. Nothing was stored or sent.
    NoMatch,
    EmailSent,
    /// Mail is unconfigured and the development fallback is enabled; the
    /// raw token is handed back for the handler to surface.
    DevToken(String),
}

/// Internal outcome of a redemption attempt.
#[derive(Debug, PartialEq, Eq)]
pub enum Redeemed {
    Success,
    /// Unknown or already-consumed token.
    Invalid,
    /// The token existed but had expired; it has been cleared.
    Expired,
}

pub fn generate_reset_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Issue a reset token for `email` if an account exists. A new request
/// silently replaces any earlier unredeemed token.
pub async fn request_reset(state: &AppState, email: &str) -> anyhow::Result<ResetRequested> {
    let email = email.trim().to_lowercase();

    let user = match User::find_by_email(&state.db, &email)
        .await
        .context("look up user for password reset")?
    {
        Some(user) => user,
        None => {
            info!("password reset requested for unknown email");
            return Ok(ResetRequested::NoMatch);
        }
    };

    let token = generate_reset_token();
    let expires = OffsetDateTime::now_utc() + RESET_TOKEN_TTL;
    User::set_reset_token(&state.db, user.id, &token, expires)
        .await
        .context("store reset token")?;

    if state.mailer.is_configured() {
        let link = format!(
            "{}/reset-password?token={}",
            state.config.mail.frontend_url, token
        );
        let (html, text) = render_reset_email(&link);
        state
            .mailer
            .send(&user.email, "StayEasy - Password Reset", &html, &text)
            .await
            .context("send password reset email")?;
        info!(user_id = %user.id, "password reset email sent");
        return Ok(ResetRequested::EmailSent);
    }

    if state.config.expose_reset_token {
        warn!(user_id = %user.id, "mail unconfigured; returning reset token in response (development fallback)");
        return Ok(ResetRequested::DevToken(token));
    }

    anyhow::bail!("mail transport not configured and token exposure is disabled")
}

/// Redeem `token`, replacing the password on success. Exactly one of two
/// concurrent calls with the same token can succeed.
pub async fn redeem(db: &PgPool, token: &str, new_password: &str) -> anyhow::Result<Redeemed> {
    let new_hash = hash_password_blocking(new_password.to_string())
        .await
        .context("hash new password")?;

    if let Some(user_id) = User::consume_reset_token(db, token, &new_hash)
        .await
        .context("consume reset token")?
    {
        info!(user_id = %user_id, "password reset redeemed");
        return Ok(Redeemed::Success);
    }

    if let Some(user_id) = User::clear_expired_reset_token(db, token)
        .await
        .context("clear expired reset token")?
    {
        warn!(user_id = %user_id, "expired reset token presented and cleared");
        return Ok(Redeemed::Expired);
    }

    warn!("unknown reset token presented");
    Ok(Redeemed::Invalid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::{hash_password, verify_password};
    use crate::auth::role::Role;

    async fn user_with_token(
        pool: &PgPool,
        email: &str,
        password: &str,
        expires: OffsetDateTime,
    ) -> (uuid::Uuid, String) {
        let hash = hash_password(password).expect("hash");
        let user = User::create(pool, "abc", "1234567890", email, &hash, Role::User)
            .await
            .expect("create user");
        let token = generate_reset_token();
        User::set_reset_token(pool, user.id, &token, expires)
            .await
            .expect("store token");
        (user.id, token)
    }

    #[sqlx::test]
    async fn redeem_replaces_password_and_consumes_token(pool: PgPool) {
        let expires = OffsetDateTime::now_utc() + RESET_TOKEN_TTL;
        let (user_id, token) = user_with_token(&pool, "a@b.com", "oldpass123", expires).await;

        assert_eq!(
            redeem(&pool, &token, "newpass123").await.expect("redeem"),
            Redeemed::Success
        );

        let user = User::find_by_id(&pool, user_id).await.unwrap().unwrap();
        assert!(verify_password("newpass123", &user.password_hash).unwrap());
        assert!(!verify_password("oldpass123", &user.password_hash).unwrap());
        assert!(user.reset_token.is_none());
        assert!(user.reset_token_expires.is_none());

        // The consumed token is gone; a second attempt cannot reuse it.
        assert_eq!(
            redeem(&pool, &token, "anotherpass1").await.expect("redeem"),
            Redeemed::Invalid
        );
    }

    #[sqlx::test]
    async fn redeem_expired_token_clears_it_without_touching_password(pool: PgPool) {
        let expires = OffsetDateTime::now_utc() - Duration::seconds(1);
        let (user_id, token) = user_with_token(&pool, "a@b.com", "oldpass123", expires).await;

        assert_eq!(
            redeem(&pool, &token, "newpass123").await.expect("redeem"),
            Redeemed::Expired
        );

        let user = User::find_by_id(&pool, user_id).await.unwrap().unwrap();
        assert!(verify_password("oldpass123", &user.password_hash).unwrap());
        assert!(user.reset_token.is_none());
        assert!(user.reset_token_expires.is_none());

        // The stale token was cleared, so retrying it is indistinguishable
        // from a token that never existed.
        assert_eq!(
            redeem(&pool, &token, "newpass123").await.expect("redeem"),
            Redeemed::Invalid
        );
    }

    #[sqlx::test]
    async fn redeem_unknown_token_is_invalid(pool: PgPool) {
        assert_eq!(
            redeem(&pool, &generate_reset_token(), "newpass123")
                .await
                .expect("redeem"),
            Redeemed::Invalid
        );
    }

    #[sqlx::test]
    async fn new_token_invalidates_previous_one(pool: PgPool) {
        let expires = OffsetDateTime::now_utc() + RESET_TOKEN_TTL;
        let (user_id, old_token) = user_with_token(&pool, "a@b.com", "oldpass123", expires).await;

        let new_token = generate_reset_token();
        User::set_reset_token(&pool, user_id, &new_token, expires)
            .await
            .expect("overwrite token");

        assert_eq!(
            redeem(&pool, &old_token, "newpass123").await.expect("redeem"),
            Redeemed::Invalid
        );
        assert_eq!(
            redeem(&pool, &new_token, "newpass123").await.expect("redeem"),
            Redeemed::Success
        );
    }

    #[test]
    fn tokens_are_64_hex_chars() {
        let token = generate_reset_token();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn tokens_do_not_repeat() {
        let a = generate_reset_token();
        let b = generate_reset_token();
        assert_ne!(a, b);
    }

    #[test]
    fn ttl_is_one_hour() {
        assert_eq!(RESET_TOKEN_TTL.whole_seconds(), 3600);
    }
}
