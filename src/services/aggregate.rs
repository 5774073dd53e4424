//! Vote aggregation for posts and comments.
//!
//! Every listing goes through [`listing_query`]: the target table is joined with
//! all of its votes (and, for a known viewer, a second time with only that
//! viewer's vote) and grouped by target, so a whole page costs one query.

use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, postgres::PgRow};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{
        comment::CommentView,
        post::PostView,
        vote::{Votable, VotableKind, VoteTally},
    },
};

/// Which targets a listing covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    All,
    /// A single target.
    Id(Uuid),
    /// Targets under a parent: posts of a topic, comments of a post.
    Parent(Uuid),
    Author(Uuid),
}

/// A listing row that carries a vote aggregate.
pub trait VotableListing: for<'r> FromRow<'r, PgRow> + Send + Unpin {
    const KIND: VotableKind;
    /// Alias of the target table inside `FROM`.
    const ALIAS: &'static str;
    const PARENT_COLUMN: &'static str;
    const AUTHOR_COLUMN: &'static str;
    /// Row columns, excluding the vote aggregate.
    const COLUMNS: &'static str;
    const FROM: &'static str;
    const GROUP_BY: &'static str;
    const ORDER_BY: &'static str;
    /// User-facing message when the listing cannot be read.
    const RETRIEVE_ERROR: &'static str;
}

impl VotableListing for PostView {
    const KIND: VotableKind = VotableKind::Post;
    const ALIAS: &'static str = "p";
    const PARENT_COLUMN: &'static str = "p.topic_id";
    const AUTHOR_COLUMN: &'static str = "p.author_id";
    const COLUMNS: &'static str = "p.id, p.topic_id, p.author_id, p.title, p.content, \
        p.image_url, p.is_pinned, p.created_at, p.updated_at, \
        u.username AS author_username, u.avatar_url AS author_avatar_url, \
        u.is_admin AS author_is_admin, \
        t.name AS topic_name, t.slug AS topic_slug";
    const FROM: &'static str =
        "posts p JOIN users u ON u.id = p.author_id JOIN topics t ON t.id = p.topic_id";
    const GROUP_BY: &'static str = "p.id, u.id, t.id";
    const ORDER_BY: &'static str = "p.is_pinned DESC, p.created_at DESC";
    const RETRIEVE_ERROR: &'static str = "Failed to retrieve posts";
}

impl VotableListing for CommentView {
    const KIND: VotableKind = VotableKind::Comment;
    const ALIAS: &'static str = "c";
    const PARENT_COLUMN: &'static str = "c.post_id";
    const AUTHOR_COLUMN: &'static str = "c.author_id";
    const COLUMNS: &'static str = "c.id, c.post_id, c.author_id, c.content, c.image_url, \
        c.is_pinned, c.created_at, c.updated_at, \
        u.username AS author_username, u.avatar_url AS author_avatar_url, \
        u.is_admin AS author_is_admin";
    const FROM: &'static str = "comments c JOIN users u ON u.id = c.author_id";
    const GROUP_BY: &'static str = "c.id, u.id";
    const ORDER_BY: &'static str = "c.is_pinned DESC, c.created_at ASC";
    const RETRIEVE_ERROR: &'static str = "Failed to retrieve comments";
}

/// Builds the aggregated listing query for `T`.
///
/// `my_vote` is `MAX` over the viewer-only join; the unique constraint on
/// votes guarantees that join contributes at most one distinct value.
pub fn listing_query<'a, T: VotableListing>(
    scope: Scope,
    viewer: Option<Uuid>,
) -> QueryBuilder<'a, Postgres> {
    let alias = T::ALIAS;
    let kind = T::KIND.as_str();

    let mut qb = QueryBuilder::new("SELECT ");
    qb.push(T::COLUMNS);
    qb.push(", COALESCE(SUM(CASE WHEN v.vote_type = 'like' THEN 1 ELSE 0 END), 0) AS likes");
    qb.push(", COALESCE(SUM(CASE WHEN v.vote_type = 'dislike' THEN 1 ELSE 0 END), 0) AS dislikes");
    if viewer.is_some() {
        qb.push(", MAX(uv.vote_type) AS my_vote");
    } else {
        qb.push(", NULL::TEXT AS my_vote");
    }

    qb.push(" FROM ").push(T::FROM);
    qb.push(" LEFT JOIN votes v ON v.votable_id = ")
        .push(alias)
        .push(".id AND v.votable_type = ")
        .push_bind(kind);

    if let Some(user_id) = viewer {
        qb.push(" LEFT JOIN votes uv ON uv.votable_id = ")
            .push(alias)
            .push(".id AND uv.votable_type = ")
            .push_bind(kind)
            .push(" AND uv.user_id = ")
            .push_bind(user_id);
    }

    match scope {
        Scope::All => {}
        Scope::Id(id) => {
            qb.push(" WHERE ").push(alias).push(".id = ").push_bind(id);
        }
        Scope::Parent(id) => {
            qb.push(" WHERE ").push(T::PARENT_COLUMN).push(" = ").push_bind(id);
        }
        Scope::Author(id) => {
            qb.push(" WHERE ").push(T::AUTHOR_COLUMN).push(" = ").push_bind(id);
        }
    }

    qb.push(" GROUP BY ").push(T::GROUP_BY);
    qb.push(" ORDER BY ").push(T::ORDER_BY);
    qb
}

/// Vote Aggregation Engine.
#[derive(Clone)]
pub struct VoteAggregator {
    pool: PgPool,
}

impl VoteAggregator {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// All targets in `scope`, each with its counts and the viewer's vote.
    pub async fn list<T: VotableListing>(
        &self,
        scope: Scope,
        viewer: Option<Uuid>,
    ) -> Result<Vec<T>, AppError> {
        let mut qb = listing_query::<T>(scope, viewer);
        qb.build_query_as::<T>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::internal(T::RETRIEVE_ERROR, e))
    }

    /// One target with its aggregate, or `None` if it does not exist.
    pub async fn find<T: VotableListing>(
        &self,
        id: Uuid,
        viewer: Option<Uuid>,
    ) -> Result<Option<T>, AppError> {
        let mut qb = listing_query::<T>(Scope::Id(id), viewer);
        qb.build_query_as::<T>()
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::internal(T::RETRIEVE_ERROR, e))
    }

    /// Counts for a single target. Targets without votes (or that do not exist)
    /// tally to zero.
    pub async fn tally(&self, target: Votable, viewer: Option<Uuid>) -> Result<VoteTally, AppError> {
        let row = sqlx::query(
            r#"
            SELECT
                COALESCE(SUM(CASE WHEN vote_type = 'like' THEN 1 ELSE 0 END), 0) AS likes,
                COALESCE(SUM(CASE WHEN vote_type = 'dislike' THEN 1 ELSE 0 END), 0) AS dislikes,
                MAX(CASE WHEN user_id = $3 THEN vote_type ELSE NULL END) AS my_vote
            FROM votes
            WHERE votable_id = $1 AND votable_type = $2
            "#,
        )
        .bind(target.id())
        .bind(target.kind().as_str())
        .bind(viewer)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::internal("Failed to get vote counts", e))?;

        VoteTally::from_aggregate_row(&row)
            .map_err(|e| AppError::internal("Failed to get vote counts", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anonymous_listing_has_no_viewer_join() {
        let qb = listing_query::<PostView>(Scope::All, None);
        let sql = qb.sql();
        assert!(sql.contains("LEFT JOIN votes v ON v.votable_id = p.id"));
        assert!(!sql.contains("uv."));
        assert!(sql.contains("NULL::TEXT AS my_vote"));
        assert!(sql.ends_with("ORDER BY p.is_pinned DESC, p.created_at DESC"));
    }

    #[test]
    fn viewer_listing_joins_only_the_viewers_votes() {
        let qb = listing_query::<PostView>(Scope::Parent(Uuid::new_v4()), Some(Uuid::new_v4()));
        let sql = qb.sql();
        assert!(sql.contains("LEFT JOIN votes uv ON uv.votable_id = p.id"));
        assert!(sql.contains("AND uv.user_id = $3"));
        assert!(sql.contains("MAX(uv.vote_type) AS my_vote"));
        assert!(sql.contains("WHERE p.topic_id = $4"));
        assert!(sql.contains("GROUP BY p.id, u.id, t.id"));
    }

    #[test]
    fn comment_listing_is_oldest_first_within_pins() {
        let qb = listing_query::<CommentView>(Scope::Parent(Uuid::new_v4()), None);
        let sql = qb.sql();
        assert!(sql.contains("WHERE c.post_id = $2"));
        assert!(sql.ends_with("ORDER BY c.is_pinned DESC, c.created_at ASC"));
    }

    #[test]
    fn single_target_scope_filters_on_the_alias() {
        let qb = listing_query::<CommentView>(Scope::Id(Uuid::new_v4()), None);
        assert!(qb.sql().contains("WHERE c.id = $2"));

        let qb = listing_query::<PostView>(Scope::Author(Uuid::new_v4()), None);
        assert!(qb.sql().contains("WHERE p.author_id = $2"));
    }
}
