use axum::{extract::State, http::StatusCode, Json};
use tracing::{info, instrument, warn};

use crate::auth::dto::{
    AuthResponse, DashboardResponse, ForgotPasswordRequest, LoginRequest, MessageResponse,
    PublicUser, ResetPasswordRequest, SignupRequest,
};
use crate::auth::extractors::{AuthUser, RequireAdmin, RequireOwner};
use crate::auth::jwt::JwtKeys;
use crate::auth::password::{hash_password_blocking, verify_password_blocking};
use crate::auth::repo::is_unique_violation;
use crate::auth::repo_types::User;
use crate::auth::reset::{self, Redeemed, ResetRequested};
use crate::auth::role::Role;
use crate::auth::validate;
use crate::error::ApiError;
use crate::state::AppState;

const INVALID_CREDENTIALS: &str = "Invalid email or password";
const RESET_REQUESTED: &str = "If the email exists, a password reset link has been sent";

/// Shared body of /signup and /owner-signup; only the fixed role differs.
async fn create_account(
    state: AppState,
    mut payload: SignupRequest,
    role: Role,
    created_message: &'static str,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    payload.username = payload.username.trim().to_string();
    payload.email = payload.email.trim().to_lowercase();

    validate::validate_signup(
        &payload.username,
        &payload.phone,
        &payload.email,
        &payload.password,
    )?;

    if User::find_by_email(&state.db, &payload.email)
        .await
        .map_err(|e| ApiError::Internal(e.into()))?
        .is_some()
    {
        warn!(email = %payload.email, "signup with existing email");
        return Err(ApiError::Conflict("User already exists"));
    }

    let hash = hash_password_blocking(payload.password).await?;

    let user = match User::create(
        &state.db,
        &payload.username,
        &payload.phone,
        &payload.email,
        &hash,
        role,
    )
    .await
    {
        Ok(user) => user,
        // The pre-check races with concurrent signups; the unique index is
        // the real arbiter.
        Err(e) if is_unique_violation(&e) => {
            warn!(email = %payload.email, "signup lost duplicate-email race");
            return Err(ApiError::Conflict("User already exists"));
        }
        Err(e) => return Err(ApiError::Internal(e.into())),
    };

    let token = JwtKeys::new(&state.config.jwt).sign(user.id)?;

    info!(user_id = %user.id, role = user.role.as_str(), "account created");
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            role: user.role,
            message: created_message,
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<SignupRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    create_account(state, payload, Role::User, "User created successfully").await
}

#[instrument(skip(state, payload))]
pub async fn owner_signup(
    State(state): State<AppState>,
    Json(payload): Json<SignupRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    create_account(state, payload, Role::Owner, "Owner created successfully").await
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    payload.email = payload.email.trim().to_lowercase();
    validate::validate_login(&payload.email, &payload.password)?;

    // Unknown email and wrong password collapse into one message so the
    // endpoint is useless for probing which accounts exist.
    let user = match User::find_by_email(&state.db, &payload.email)
        .await
        .map_err(|e| ApiError::Internal(e.into()))?
    {
        Some(user) => user,
        None => {
            warn!("login with unknown email");
            return Err(ApiError::Unauthenticated(INVALID_CREDENTIALS));
        }
    };

    let ok = verify_password_blocking(payload.password, user.password_hash.clone()).await?;
    if !ok {
        warn!(user_id = %user.id, "login with wrong password");
        return Err(ApiError::Unauthenticated(INVALID_CREDENTIALS));
    }

    let token = JwtKeys::new(&state.config.jwt).sign(user.id)?;

    info!(user_id = %user.id, "user logged in");
    Ok(Json(AuthResponse {
        token,
        role: user.role,
        message: "Logged in successfully",
    }))
}

#[instrument(skip(state, payload))]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let email = payload.email.trim().to_lowercase();
    validate::validate_forgot_password(&email)?;

    match reset::request_reset(&state, &email).await? {
        // Same body whether or not the email matched.
        ResetRequested::NoMatch | ResetRequested::EmailSent => {
            Ok(Json(MessageResponse::new(RESET_REQUESTED)))
        }
        ResetRequested::DevToken(token) => Ok(Json(MessageResponse {
            message: "Email configuration not set. Contact administrator.",
            token: Some(token),
        })),
    }
}

#[instrument(skip(state, payload))]
pub async fn reset_password(
    State(state): State<AppState>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    validate::validate_reset_password(&payload.token, &payload.new_password)?;

    match reset::redeem(&state.db, &payload.token, &payload.new_password).await? {
        Redeemed::Success => Ok(Json(MessageResponse::new(
            "Password has been reset successfully",
        ))),
        // One generic rejection; a valid-looking error split would give
        // token guessers an oracle.
        Redeemed::Invalid | Redeemed::Expired => {
            Err(ApiError::BadRequest("Invalid or expired reset token"))
        }
    }
}

#[instrument(skip_all)]
pub async fn dashboard(AuthUser(user): AuthUser) -> Json<DashboardResponse> {
    Json(DashboardResponse {
        user: PublicUser::from(user),
    })
}

/// Owner-gated probe for the listing-management surface.
#[instrument(skip_all)]
pub async fn owner_home(RequireOwner(user): RequireOwner) -> Json<DashboardResponse> {
    Json(DashboardResponse {
        user: PublicUser::from(user),
    })
}

/// Admin-gated probe for the administration surface.
#[instrument(skip_all)]
pub async fn admin_home(RequireAdmin(user): RequireAdmin) -> Json<DashboardResponse> {
    Json(DashboardResponse {
        user: PublicUser::from(user),
    })
}
