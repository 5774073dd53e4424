use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use validator::Validate;

use crate::{
    error::AppError, models::topic::TopicRequest, services::topics::TopicService,
    utils::session::AdminUser,
};

/// Lists all topics, newest first.
pub async fn list_topics(
    State(topics): State<TopicService>,
) -> Result<impl IntoResponse, AppError> {
    let topics = topics.list().await?;
    Ok(Json(json!({ "topics": topics })))
}

/// Creates a topic. Admin only.
pub async fn create_topic(
    State(topics): State<TopicService>,
    AdminUser(_admin): AdminUser,
    Json(payload): Json<TopicRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let topic = topics.create(&payload.name).await?;

    Ok((StatusCode::CREATED, Json(json!({ "topic": topic }))))
}

pub async fn update_topic(
    State(topics): State<TopicService>,
    AdminUser(_admin): AdminUser,
    Path(slug): Path<String>,
    Json(payload): Json<TopicRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let topic = topics.update(&slug, &payload.name).await?;

    Ok(Json(json!({ "topic": topic })))
}

pub async fn delete_topic(
    State(topics): State<TopicService>,
    AdminUser(_admin): AdminUser,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    topics.delete(&slug).await?;
    Ok(Json(json!({ "message": "Topic deleted successfully" })))
}
