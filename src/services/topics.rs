use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    error::{AppError, is_foreign_key_violation, is_unique_violation},
    models::topic::Topic,
    utils::slug::generate_slug,
};

#[derive(Clone)]
pub struct TopicService {
    pool: PgPool,
}

impl TopicService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self) -> Result<Vec<Topic>, AppError> {
        sqlx::query_as::<_, Topic>(
            "SELECT id, name, slug, created_at, updated_at FROM topics ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::internal("Failed to retrieve topics", e))
    }

    /// Slug lookups are case-insensitive.
    pub async fn find_by_slug(&self, slug: &str) -> Result<Topic, AppError> {
        sqlx::query_as::<_, Topic>(
            "SELECT id, name, slug, created_at, updated_at FROM topics WHERE slug = $1",
        )
        .bind(slug.to_lowercase())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::internal("Failed to retrieve topic", e))?
        .ok_or_else(|| AppError::NotFound("Topic not found".to_string()))
    }

    pub async fn create(&self, name: &str) -> Result<Topic, AppError> {
        let (name, slug) = name_and_slug(name)?;

        let topic = sqlx::query_as::<_, Topic>(
            r#"
            INSERT INTO topics (id, name, slug)
            VALUES ($1, $2, $3)
            RETURNING id, name, slug, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(&slug)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict("Topic already exists".to_string())
            } else {
                AppError::internal("Failed to create topic", e)
            }
        })?;

        tracing::info!("Created topic {} ({})", topic.name, topic.slug);
        Ok(topic)
    }

    /// Renames a topic; its slug follows the new name.
    pub async fn update(&self, slug: &str, name: &str) -> Result<Topic, AppError> {
        let (name, new_slug) = name_and_slug(name)?;

        sqlx::query_as::<_, Topic>(
            r#"
            UPDATE topics
            SET name = $2, slug = $3, updated_at = NOW()
            WHERE slug = $1
            RETURNING id, name, slug, created_at, updated_at
            "#,
        )
        .bind(slug.to_lowercase())
        .bind(name)
        .bind(&new_slug)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict("Topic already exists".to_string())
            } else {
                AppError::internal("Failed to update topic", e)
            }
        })?
        .ok_or_else(|| AppError::NotFound("Topic not found".to_string()))
    }

    /// Topics that still hold posts cannot be deleted.
    pub async fn delete(&self, slug: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM topics WHERE slug = $1")
            .bind(slug.to_lowercase())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if is_foreign_key_violation(&e) {
                    AppError::Conflict("Topic still has posts".to_string())
                } else {
                    AppError::internal("Failed to delete topic", e)
                }
            })?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Topic not found".to_string()));
        }

        tracing::info!("Deleted topic {}", slug);
        Ok(())
    }
}

fn name_and_slug(name: &str) -> Result<(&str, String), AppError> {
    let name = name.trim();
    let slug = generate_slug(name);
    if slug.is_empty() {
        return Err(AppError::BadRequest(
            "Topic name must contain letters or digits".to_string(),
        ));
    }
    Ok((name, slug))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_is_trimmed_and_slugged() {
        let (name, slug) = name_and_slug("  Rust Async  ").unwrap();
        assert_eq!(name, "Rust Async");
        assert_eq!(slug, "rust-async");
    }

    #[test]
    fn punctuation_only_names_are_rejected() {
        assert!(matches!(name_and_slug("?!"), Err(AppError::BadRequest(_))));
    }
}
