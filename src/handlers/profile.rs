// src/handlers/profile.rs

use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde_json::json;

use crate::{
    error::AppError, models::user::ProfileParams, services::users::UserService,
    utils::session::MaybeUser,
};

/// Public profile of `username`.
///
/// `?posts=true` and `?comments=true` include the user's content,
/// with `myVote` filled in for a logged-in viewer.
pub async fn get_profile(
    State(users): State<UserService>,
    viewer: MaybeUser,
    Path(username): Path<String>,
    Query(params): Query<ProfileParams>,
) -> Result<impl IntoResponse, AppError> {
    let profile = users.profile(&username, &params, viewer.id()).await?;
    Ok(Json(json!({ "user": profile })))
}
