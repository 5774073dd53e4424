use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use serde_json::json;

use crate::{
    error::AppError, services::images::ImageService, utils::session::CurrentUser,
};

fn configured(images: Option<ImageService>) -> Result<ImageService, AppError> {
    images.ok_or_else(|| AppError::ServiceUnavailable("Image storage is not configured".to_string()))
}

/// Presigned URL the browser uploads the image to.
pub async fn upload_url(
    State(images): State<Option<ImageService>>,
    CurrentUser(_user): CurrentUser,
) -> Result<impl IntoResponse, AppError> {
    let upload = configured(images)?.upload_url().await?;
    Ok(Json(upload))
}

pub async fn delete_image(
    State(images): State<Option<ImageService>>,
    CurrentUser(user): CurrentUser,
    Path(image_name): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    configured(images)?.delete(&image_name).await?;

    tracing::debug!("User {} deleted image {}", user.username, image_name);
    Ok(Json(json!({ "message": "Image deleted successfully" })))
}
