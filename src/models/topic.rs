use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// Represents the 'topics' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Topic {
    pub id: Uuid,
    pub name: String,
    /// Derived from `name`, see `utils::slug`.
    pub slug: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// The topic fields embedded in a post listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TopicSummary {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
}

/// DTO for creating or renaming a topic.
#[derive(Debug, Deserialize, Validate)]
pub struct TopicRequest {
    #[validate(length(
        min = 1,
        max = 100,
        message = "Topic name must be between 1 and 100 characters"
    ))]
    pub name: String,
}
