use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::{AppError, is_foreign_key_violation},
    models::{
        post::{Post, PostRequest, PostView},
        user::User,
    },
    services::{
        aggregate::{Scope, VoteAggregator},
        cascade::CascadeDeleter,
        topics::TopicService,
    },
    utils::html::clean_html,
};

#[derive(Clone)]
pub struct PostService {
    pool: PgPool,
    aggregator: VoteAggregator,
    cascade: CascadeDeleter,
    topics: TopicService,
}

impl PostService {
    pub fn new(pool: PgPool) -> Self {
        Self {
            aggregator: VoteAggregator::new(pool.clone()),
            cascade: CascadeDeleter::new(pool.clone()),
            topics: TopicService::new(pool.clone()),
            pool,
        }
    }

    pub async fn list_all(&self, viewer: Option<Uuid>) -> Result<Vec<PostView>, AppError> {
        self.aggregator.list(Scope::All, viewer).await
    }

    pub async fn list_by_topic(
        &self,
        slug: &str,
        viewer: Option<Uuid>,
    ) -> Result<Vec<PostView>, AppError> {
        let topic = self.topics.find_by_slug(slug).await?;
        self.aggregator.list(Scope::Parent(topic.id), viewer).await
    }

    pub async fn list_by_author(
        &self,
        author_id: Uuid,
        viewer: Option<Uuid>,
    ) -> Result<Vec<PostView>, AppError> {
        self.aggregator.list(Scope::Author(author_id), viewer).await
    }

    pub async fn get(&self, id: Uuid, viewer: Option<Uuid>) -> Result<PostView, AppError> {
        self.aggregator
            .find(id, viewer)
            .await?
            .ok_or_else(|| AppError::NotFound("Post not found".to_string()))
    }

    /// The bare row, without author, topic or votes.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Post, AppError> {
        sqlx::query_as::<_, Post>(
            r#"
            SELECT id, topic_id, author_id, title, content, image_url, is_pinned,
                   created_at, updated_at
            FROM posts
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::internal("Failed to retrieve post", e))?
        .ok_or_else(|| AppError::NotFound("Post not found".to_string()))
    }

    pub async fn create(
        &self,
        topic_slug: &str,
        author: &User,
        req: PostRequest,
    ) -> Result<PostView, AppError> {
        let (title, content) = sanitize(&req)?;
        let topic = self.topics.find_by_slug(topic_slug).await?;

        let id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO posts (id, topic_id, author_id, title, content, image_url)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(id)
        .bind(topic.id)
        .bind(author.id)
        .bind(title)
        .bind(content)
        .bind(req.image_url.as_deref())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            // The topic was deleted after the lookup above.
            if is_foreign_key_violation(&e) {
                AppError::NotFound("Topic not found".to_string())
            } else {
                AppError::internal("Failed to create post", e)
            }
        })?;

        tracing::info!("User {} created post {} in {}", author.username, id, topic.slug);
        self.get(id, Some(author.id)).await
    }

    /// Replaces title, content and image. A missing `imageUrl` clears the image.
    pub async fn update(&self, id: Uuid, user: &User, req: PostRequest) -> Result<PostView, AppError> {
        let post = self.find_by_id(id).await?;
        if !can_modify(user, &post) {
            return Err(AppError::Forbidden(
                "You are not allowed to edit this post".to_string(),
            ));
        }

        let (title, content) = sanitize(&req)?;
        sqlx::query(
            r#"
            UPDATE posts
            SET title = $2, content = $3, image_url = $4, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(title)
        .bind(content)
        .bind(req.image_url.as_deref())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::internal("Failed to update post", e))?;

        self.get(id, Some(user.id)).await
    }

    /// Sets the pin flag, or flips it when `is_pinned` is `None`. Admin only.
    pub async fn set_pinned(
        &self,
        id: Uuid,
        is_pinned: Option<bool>,
        admin: &User,
    ) -> Result<PostView, AppError> {
        let updated = sqlx::query(
            "UPDATE posts SET is_pinned = COALESCE($2, NOT is_pinned) WHERE id = $1 RETURNING id",
        )
        .bind(id)
        .bind(is_pinned)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::internal("Failed to pin post", e))?;

        if updated.is_none() {
            return Err(AppError::NotFound("Post not found".to_string()));
        }

        tracing::info!("Admin {} changed pin state of post {}", admin.username, id);
        self.get(id, Some(admin.id)).await
    }

    pub async fn delete(&self, id: Uuid, user: &User) -> Result<(), AppError> {
        let post = self.find_by_id(id).await?;
        if !can_modify(user, &post) {
            return Err(AppError::Forbidden(
                "You are not allowed to delete this post".to_string(),
            ));
        }

        self.cascade.delete_post(id).await?;
        Ok(())
    }
}

pub fn can_modify(user: &User, post: &Post) -> bool {
    user.is_admin || post.author_id == user.id
}

/// Validates the request and returns the trimmed title and sanitized content.
fn sanitize(req: &PostRequest) -> Result<(&str, String), AppError> {
    req.validate()?;

    let title = req.title.trim();
    let content = clean_html(req.content.trim());
    if title.is_empty() || content.trim().is_empty() {
        return Err(AppError::BadRequest(
            "Title and content cannot be empty".to_string(),
        ));
    }

    Ok((title, content))
}
