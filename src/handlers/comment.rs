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
    models::{comment::CommentRequest, post::PinRequest},
    services::comments::CommentService,
    utils::session::{CurrentUser, MaybeUser},
};

/// Comments under a post, pinned first, oldest first.
pub async fn list_post_comments(
    State(comments): State<CommentService>,
    viewer: MaybeUser,
    Path(post_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let comments = comments.list_by_post(post_id, viewer.id()).await?;
    Ok(Json(json!({ "comments": comments })))
}

pub async fn create_comment(
    State(comments): State<CommentService>,
    CurrentUser(user): CurrentUser,
    Path(post_id): Path<Uuid>,
    Json(payload): Json<CommentRequest>,
) -> Result<impl IntoResponse, AppError> {
    let comment = comments.create(post_id, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(json!({ "comment": comment }))))
}

pub async fn update_comment(
    State(comments): State<CommentService>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<CommentRequest>,
) -> Result<impl IntoResponse, AppError> {
    let comment = comments.update(id, &user, payload).await?;
    Ok(Json(json!({ "comment": comment })))
}

pub async fn delete_comment(
    State(comments): State<CommentService>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    comments.delete(id, &user).await?;
    Ok(Json(json!({ "message": "Comment deleted successfully" })))
}

pub async fn pin_comment(
    State(comments): State<CommentService>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    payload: Option<Json<PinRequest>>,
) -> Result<impl IntoResponse, AppError> {
    let is_pinned = payload.and_then(|Json(req)| req.is_pinned);
    let comment = comments.set_pinned(id, is_pinned, &user).await?;
    Ok(Json(json!({ "comment": comment })))
}
