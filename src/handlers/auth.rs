// src/handlers/auth.rs

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use axum_extra::extract::cookie::CookieJar;
use serde_json::json;

use crate::{
    config::Config,
    error::AppError,
    models::user::{CreateUserRequest, LoginRequest, UserResponse},
    services::users::UserService,
    utils::{
        jwt::sign_jwt,
        session::{CurrentUser, removal_cookie, session_cookie},
    },
};

/// Registers a new user.
///
/// Hashes the password using Argon2 before storing it.
/// Returns 201 Created and the user (excluding password). Does not log in.
pub async fn signup(
    State(users): State<UserService>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = users.register(payload).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "user": UserResponse::from(&user) })),
    ))
}

/// Authenticates a user and sets the session cookie.
pub async fn login(
    State(users): State<UserService>,
    State(config): State<Config>,
    jar: CookieJar,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = users.authenticate(payload).await?;
    let token = sign_jwt(user.id, &config.jwt_secret, config.jwt_expiration)?;

    tracing::info!("User {} logged in", user.username);
    Ok((
        jar.add(session_cookie(token, &config)),
        Json(json!({ "user": UserResponse::from(&user) })),
    ))
}

pub async fn logout(jar: CookieJar) -> impl IntoResponse {
    (
        jar.remove(removal_cookie()),
        Json(json!({ "message": "Logged out successfully" })),
    )
}

/// Returns the user behind the session cookie.
pub async fn validate(CurrentUser(user): CurrentUser) -> Json<serde_json::Value> {
    Json(json!({ "user": UserResponse::from(&user) }))
}
