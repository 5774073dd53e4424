use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::post::{PinRequest, PostRequest},
    services::posts::PostService,
    utils::session::{AdminUser, CurrentUser, MaybeUser},
};

/// All posts, pinned first, newest first.
pub async fn list_posts(
    State(posts): State<PostService>,
    viewer: MaybeUser,
) -> Result<impl IntoResponse, AppError> {
    let posts = posts.list_all(viewer.id()).await?;
    Ok(Json(json!({ "posts": posts })))
}

pub async fn list_topic_posts(
    State(posts): State<PostService>,
    viewer: MaybeUser,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let posts = posts.list_by_topic(&slug, viewer.id()).await?;
    Ok(Json(json!({ "posts": posts })))
}

pub async fn get_post(
    State(posts): State<PostService>,
    viewer: MaybeUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let post = posts.get(id, viewer.id()).await?;
    Ok(Json(json!({ "post": post })))
}

/// Creates a post in the topic identified by `slug`.
pub async fn create_post(
    State(posts): State<PostService>,
    CurrentUser(user): CurrentUser,
    Path(slug): Path<String>,
    Json(payload): Json<PostRequest>,
) -> Result<impl IntoResponse, AppError> {
    let post = posts.create(&slug, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(json!({ "post": post }))))
}

pub async fn update_post(
    State(posts): State<PostService>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<PostRequest>,
) -> Result<impl IntoResponse, AppError> {
    let post = posts.update(id, &user, payload).await?;
    Ok(Json(json!({ "post": post })))
}

/// Deletes the post with its comments and all their votes.
pub async fn delete_post(
    State(posts): State<PostService>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    posts.delete(id, &user).await?;
    Ok(Json(json!({ "message": "Post deleted successfully" })))
}

/// Pins or unpins a post. An empty body flips the current state.
pub async fn pin_post(
    State(posts): State<PostService>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
    payload: Option<Json<PinRequest>>,
) -> Result<impl IntoResponse, AppError> {
    let is_pinned = payload.and_then(|Json(req)| req.is_pinned);
    let post = posts.set_pinned(id, is_pinned, &admin).await?;
    Ok(Json(json!({ "post": post })))
}
