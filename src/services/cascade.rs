//! Atomic removal of posts and comments together with everything hanging off them.
//!
//! Votes reference their target polymorphically, so the database cannot cascade
//! them; every delete here runs in one transaction and leaves no orphan behind.

use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::{error::AppError, models::vote::VotableKind};

/// Rows removed by a post cascade.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PostCascade {
    pub comments: u64,
    pub votes: u64,
}

#[derive(Clone)]
pub struct CascadeDeleter {
    pool: PgPool,
}

impl CascadeDeleter {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Deletes a post, its comments, and every vote on either.
    pub async fn delete_post(&self, post_id: Uuid) -> Result<PostCascade, AppError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::internal("Failed to delete post", e))?;

        let removed = delete_post_tree(&mut *tx, post_id)
            .await
            .map_err(|e| AppError::internal("Failed to delete post", e))?
            .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;

        tx.commit()
            .await
            .map_err(|e| AppError::internal("Failed to delete post", e))?;

        tracing::info!(
            "Deleted post {} with {} comments and {} votes",
            post_id,
            removed.comments,
            removed.votes
        );
        Ok(removed)
    }

    /// Deletes a comment and every vote on it.
    pub async fn delete_comment(&self, comment_id: Uuid) -> Result<u64, AppError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::internal("Failed to delete comment", e))?;

        let votes = delete_comment_tree(&mut *tx, comment_id)
            .await
            .map_err(|e| AppError::internal("Failed to delete comment", e))?
            .ok_or_else(|| AppError::NotFound("Comment not found".to_string()))?;

        tx.commit()
            .await
            .map_err(|e| AppError::internal("Failed to delete comment", e))?;

        tracing::info!("Deleted comment {} with {} votes", comment_id, votes);
        Ok(votes)
    }
}

/// `None` when the post is already gone. Any error leaves the caller's
/// transaction to roll back on drop.
async fn delete_post_tree(
    conn: &mut PgConnection,
    post_id: Uuid,
) -> Result<Option<PostCascade>, sqlx::Error> {
    // Row locks block votes and comments being added while we delete.
    let locked = sqlx::query("SELECT id FROM posts WHERE id = $1 FOR UPDATE")
        .bind(post_id)
        .fetch_optional(&mut *conn)
        .await?;
    if locked.is_none() {
        return Ok(None);
    }

    let comment_ids: Vec<Uuid> =
        sqlx::query_scalar("SELECT id FROM comments WHERE post_id = $1 FOR UPDATE")
            .bind(post_id)
            .fetch_all(&mut *conn)
            .await?;

    let mut votes = 0;
    if !comment_ids.is_empty() {
        votes += sqlx::query("DELETE FROM votes WHERE votable_type = $1 AND votable_id = ANY($2)")
            .bind(VotableKind::Comment.as_str())
            .bind(&comment_ids)
            .execute(&mut *conn)
            .await?
            .rows_affected();
    }

    votes += sqlx::query("DELETE FROM votes WHERE votable_type = $1 AND votable_id = $2")
        .bind(VotableKind::Post.as_str())
        .bind(post_id)
        .execute(&mut *conn)
        .await?
        .rows_affected();

    let comments = sqlx::query("DELETE FROM comments WHERE post_id = $1")
        .bind(post_id)
        .execute(&mut *conn)
        .await?
        .rows_affected();

    sqlx::query("DELETE FROM posts WHERE id = $1")
        .bind(post_id)
        .execute(&mut *conn)
        .await?;

    Ok(Some(PostCascade { comments, votes }))
}

async fn delete_comment_tree(
    conn: &mut PgConnection,
    comment_id: Uuid,
) -> Result<Option<u64>, sqlx::Error> {
    let locked = sqlx::query("SELECT id FROM comments WHERE id = $1 FOR UPDATE")
        .bind(comment_id)
        .fetch_optional(&mut *conn)
        .await?;
    if locked.is_none() {
        return Ok(None);
    }

    let votes = sqlx::query("DELETE FROM votes WHERE votable_type = $1 AND votable_id = $2")
        .bind(VotableKind::Comment.as_str())
        .bind(comment_id)
        .execute(&mut *conn)
        .await?
        .rows_affected();

    sqlx::query("DELETE FROM comments WHERE id = $1")
        .bind(comment_id)
        .execute(&mut *conn)
        .await?;

    Ok(Some(votes))
}
