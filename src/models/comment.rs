use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Row, postgres::PgRow};
use uuid::Uuid;
use validator::Validate;

use crate::models::{post::validate_image_url, user::UserResponse, vote::VoteTally};

/// Represents the 'comments' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub author_id: Uuid,
    pub content: String,
    pub image_url: Option<String>,
    pub is_pinned: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// DTO for displaying a comment with author info and votes.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    #[serde(flatten)]
    pub comment: Comment,
    pub author: UserResponse,
    #[serde(flatten)]
    pub votes: VoteTally,
}

impl<'r> FromRow<'r, PgRow> for CommentView {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let comment = Comment::from_row(row)?;

        let author = UserResponse {
            id: comment.author_id,
            username: row.try_get("author_username")?,
            avatar_url: row.try_get("author_avatar_url")?,
            is_admin: row.try_get("author_is_admin")?,
        };

        Ok(Self {
            comment,
            author,
            votes: VoteTally::from_aggregate_row(row)?,
        })
    }
}

/// DTO for creating or updating a comment.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CommentRequest {
    #[validate(length(
        min = 1,
        max = 5000,
        message = "Comment must be between 1 and 5000 characters"
    ))]
    pub content: String,

    #[validate(length(max = 500), custom(function = validate_image_url))]
    pub image_url: Option<String>,
}
