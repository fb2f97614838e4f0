//! Request pipeline: authenticate (bearer token -> user record), then
//! authorize (role membership). Authorization failures are 403 and never
//! masquerade as 401.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;

use crate::auth::jwt::JwtKeys;
use crate::auth::repo_types::User;
use crate::auth::role::{Role, ADMIN_ROLES, OWNER_ROLES};
use crate::error::ApiError;
use crate::state::AppState;

/// Authenticated caller: verified bearer token plus the freshly loaded user
/// record. One store read per authenticated request, no caching.
pub struct AuthUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(ApiError::Unauthenticated("No authentication token provided"))?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or(ApiError::Unauthenticated("No authentication token provided"))?;

        let keys = JwtKeys::from_ref(state);
        let claims = keys.verify(token).map_err(|_| {
            warn!("invalid or expired token");
            ApiError::Unauthenticated("Please authenticate")
        })?;

        let user = User::find_by_id(&state.db, claims.sub)
            .await
            .map_err(|e| ApiError::Internal(e.into()))?
            .ok_or_else(|| {
                warn!(user_id = %claims.sub, "token references missing user");
                ApiError::Unauthenticated("Please authenticate")
            })?;

        Ok(AuthUser(user))
    }
}

async fn require_role(
    parts: &mut Parts,
    state: &AppState,
    required: &[Role],
    denied: &'static str,
) -> Result<User, ApiError> {
    let AuthUser(user) = AuthUser::from_request_parts(parts, state).await?;
    if !user.role.satisfies(required) {
        warn!(user_id = %user.id, role = user.role.as_str(), "insufficient role");
        return Err(ApiError::Forbidden(denied));
    }
    Ok(user)
}

/// Caller must be an owner (admins pass too).
pub struct RequireOwner(pub User);

#[async_trait]
impl FromRequestParts<AppState> for RequireOwner {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = require_role(
            parts,
            state,
            OWNER_ROLES,
            "Only owners can access this resource",
        )
        .await?;
        Ok(RequireOwner(user))
    }
}

/// Caller must be an admin.
pub struct RequireAdmin(pub User);

#[async_trait]
impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = require_role(
            parts,
            state,
            ADMIN_ROLES,
            "Only admins can access this resource",
        )
        .await?;
        Ok(RequireAdmin(user))
    }
}
