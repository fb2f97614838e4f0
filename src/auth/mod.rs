use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::rate_limit;
use crate::state::AppState;

pub mod dto;
pub mod extractors;
pub mod handlers;
pub mod jwt;
pub mod password;
pub mod repo;
pub mod repo_types;
pub mod reset;
pub mod role;
pub mod validate;

pub fn router(state: AppState) -> Router<AppState> {
    let signup_limited = Router::new()
        .route("/signup", post(handlers::signup))
        .route("/owner-signup", post(handlers::owner_signup))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit::limit_signup,
        ));

    let login_limited = Router::new()
        .route("/login", post(handlers::login))
        .route_layer(middleware::from_fn_with_state(
            state,
            rate_limit::limit_login,
        ));

    Router::new()
        .merge(signup_limited)
        .merge(login_limited)
        .route("/forgot-password", post(handlers::forgot_password))
        .route("/reset-password", post(handlers::reset_password))
        .route("/dashboard", get(handlers::dashboard))
        .route("/owner/listings", get(handlers::owner_home))
        .route("/admin/users", get(handlers::admin_home))
}
