use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Row, postgres::PgRow};
use url::Url;
use uuid::Uuid;
use validator::Validate;

use crate::models::{topic::TopicSummary, user::UserResponse, vote::VoteTally};

/// Represents the 'posts' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: Uuid,
    pub topic_id: Uuid,
    pub author_id: Uuid,
    pub title: String,
    /// Sanitized HTML from the rich text editor.
    pub content: String,
    pub image_url: Option<String>,
    pub is_pinned: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// A post with its author, topic and vote aggregate, as returned by listings.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostView {
    #[serde(flatten)]
    pub post: Post,
    pub author: UserResponse,
    pub topic: TopicSummary,
    #[serde(flatten)]
    pub votes: VoteTally,
}

/// Expects the columns selected by the post listing query:
/// the post's own columns, `author_*`, `topic_*`, and the vote aggregate.
impl<'r> FromRow<'r, PgRow> for PostView {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let post = Post::from_row(row)?;

        let author = UserResponse {
            id: post.author_id,
            username: row.try_get("author_username")?,
            avatar_url: row.try_get("author_avatar_url")?,
            is_admin: row.try_get("author_is_admin")?,
        };

        let topic = TopicSummary {
            id: post.topic_id,
            name: row.try_get("topic_name")?,
            slug: row.try_get("topic_slug")?,
        };

        Ok(Self {
            post,
            author,
            topic,
            votes: VoteTally::from_aggregate_row(row)?,
        })
    }
}

/// DTO for creating or updating a post.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PostRequest {
    #[validate(length(
        min = 1,
        max = 255,
        message = "Title length must be between 1 and 255 chars"
    ))]
    pub title: String,

    #[validate(length(
        min = 1,
        max = 20000,
        message = "Content length must be between 1 and 20000 chars"
    ))]
    pub content: String,

    #[validate(length(max = 500), custom(function = validate_image_url))]
    pub image_url: Option<String>,
}

/// Body of the pin endpoints. A missing flag flips the current state.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PinRequest {
    pub is_pinned: Option<bool>,
}

/// Validates that an image reference is a correctly formatted URL.
pub(crate) fn validate_image_url(url: &str) -> Result<(), validator::ValidationError> {
    if Url::parse(url).is_err() {
        return Err(validator::ValidationError::new("invalid_url"));
    }
    Ok(())
}
