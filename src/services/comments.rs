use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::{AppError, is_foreign_key_violation},
    models::{
        comment::{Comment, CommentRequest, CommentView},
        user::User,
    },
    services::{
        aggregate::{Scope, VoteAggregator},
        cascade::CascadeDeleter,
        posts::PostService,
    },
    utils::html::clean_html,
};

#[derive(Clone)]
pub struct CommentService {
    pool: PgPool,
    aggregator: VoteAggregator,
    cascade: CascadeDeleter,
    posts: PostService,
}

impl CommentService {
    pub fn new(pool: PgPool) -> Self {
        Self {
            aggregator: VoteAggregator::new(pool.clone()),
            cascade: CascadeDeleter::new(pool.clone()),
            posts: PostService::new(pool.clone()),
            pool,
        }
    }

    pub async fn list_by_post(
        &self,
        post_id: Uuid,
        viewer: Option<Uuid>,
    ) -> Result<Vec<CommentView>, AppError> {
        self.posts.find_by_id(post_id).await?;
        self.aggregator.list(Scope::Parent(post_id), viewer).await
    }

    pub async fn list_by_author(
        &self,
        author_id: Uuid,
        viewer: Option<Uuid>,
    ) -> Result<Vec<CommentView>, AppError> {
        self.aggregator.list(Scope::Author(author_id), viewer).await
    }

    pub async fn get(&self, id: Uuid, viewer: Option<Uuid>) -> Result<CommentView, AppError> {
        self.aggregator
            .find(id, viewer)
            .await?
            .ok_or_else(|| AppError::NotFound("Comment not found".to_string()))
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Comment, AppError> {
        sqlx::query_as::<_, Comment>(
            r#"
            SELECT id, post_id, author_id, content, image_url, is_pinned, created_at, updated_at
            FROM comments
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::internal("Failed to retrieve comment", e))?
        .ok_or_else(|| AppError::NotFound("Comment not found".to_string()))
    }

    pub async fn create(
        &self,
        post_id: Uuid,
        author: &User,
        req: CommentRequest,
    ) -> Result<CommentView, AppError> {
        let content = sanitize(&req)?;
        self.posts.find_by_id(post_id).await?;

        let id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO comments (id, post_id, author_id, content, image_url)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(id)
        .bind(post_id)
        .bind(author.id)
        .bind(content)
        .bind(req.image_url.as_deref())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                AppError::NotFound("Post not found".to_string())
            } else {
                AppError::internal("Failed to create comment", e)
            }
        })?;

        tracing::info!("User {} commented {} on post {}", author.username, id, post_id);
        self.get(id, Some(author.id)).await
    }

    pub async fn update(
        &self,
        id: Uuid,
        user: &User,
        req: CommentRequest,
    ) -> Result<CommentView, AppError> {
        let comment = self.find_by_id(id).await?;
        if !can_modify(user, &comment) {
            return Err(AppError::Forbidden(
                "You are not allowed to edit this comment".to_string(),
            ));
        }

        let content = sanitize(&req)?;
        sqlx::query(
            r#"
            UPDATE comments
            SET content = $2, image_url = $3, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(content)
        .bind(req.image_url.as_deref())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::internal("Failed to update comment", e))?;

        self.get(id, Some(user.id)).await
    }

    /// Pins are managed by the author of the parent post, or an admin.
    pub async fn set_pinned(
        &self,
        id: Uuid,
        is_pinned: Option<bool>,
        user: &User,
    ) -> Result<CommentView, AppError> {
        let comment = self.find_by_id(id).await?;
        let post = self.posts.find_by_id(comment.post_id).await?;
        if !user.is_admin && post.author_id != user.id {
            return Err(AppError::Forbidden(
                "Only the post author can pin comments".to_string(),
            ));
        }

        sqlx::query("UPDATE comments SET is_pinned = COALESCE($2, NOT is_pinned) WHERE id = $1")
            .bind(id)
            .bind(is_pinned)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::internal("Failed to pin comment", e))?;

        self.get(id, Some(user.id)).await
    }

    pub async fn delete(&self, id: Uuid, user: &User) -> Result<(), AppError> {
        let comment = self.find_by_id(id).await?;
        if !can_modify(user, &comment) {
            return Err(AppError::Forbidden(
                "You are not allowed to delete this comment".to_string(),
            ));
        }

        self.cascade.delete_comment(id).await?;
        Ok(())
    }
}

pub fn can_modify(user: &User, comment: &Comment) -> bool {
    user.is_admin || comment.author_id == user.id
}

fn sanitize(req: &CommentRequest) -> Result<String, AppError> {
    req.validate()?;

    let content = clean_html(req.content.trim());
    if content.trim().is_empty() {
        return Err(AppError::BadRequest("Comment cannot be empty".to_string()));
    }
    Ok(content)
}
