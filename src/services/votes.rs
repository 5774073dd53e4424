use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::vote::{
        CastVoteRequest, Votable, VotableKind, Vote, VoteCountResponse, VoteKind, VoteTally,
        VoteTransition,
    },
    services::aggregate::VoteAggregator,
};

#[derive(Clone)]
pub struct VoteService {
    pool: PgPool,
    aggregator: VoteAggregator,
}

impl VoteService {
    pub fn new(pool: PgPool) -> Self {
        Self {
            aggregator: VoteAggregator::new(pool.clone()),
            pool,
        }
    }

    /// Applies a like/dislike from `user_id` and returns the target's fresh tally.
    ///
    /// Casting the same reaction twice removes it; casting the opposite one
    /// switches the existing row.
    pub async fn cast(&self, user_id: Uuid, req: CastVoteRequest) -> Result<VoteTally, AppError> {
        let kind: VotableKind = req.votable_type.parse()?;
        let desired: VoteKind = req.vote_type.parse()?;
        let target = Votable::new(kind, req.votable_id);

        let transition = self.apply(user_id, target, desired).await?;
        tracing::info!(
            "User {} voted on {} {}: {:?} (now {:?})",
            user_id,
            kind,
            target.id(),
            transition,
            transition.resulting_vote()
        );

        self.aggregator.tally(target, Some(user_id)).await
    }

    /// Raw like/dislike counts for a target, without a viewer.
    pub async fn counts(&self, votable_type: &str, votable_id: Uuid) -> Result<VoteCountResponse, AppError> {
        let kind: VotableKind = votable_type.parse()?;
        let tally = self
            .aggregator
            .tally(Votable::new(kind, votable_id), None)
            .await?;

        Ok(VoteCountResponse {
            votable_id,
            votable_type: kind,
            likes: tally.likes,
            dislikes: tally.dislikes,
        })
    }

    async fn apply(
        &self,
        user_id: Uuid,
        target: Votable,
        desired: VoteKind,
    ) -> Result<VoteTransition, AppError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::internal("Failed to process vote", e))?;

        // Held until commit so a concurrent cascade delete cannot orphan this vote.
        lock_target(&mut *tx, target).await?;
        lock_voter(&mut *tx, user_id, target)
            .await
            .map_err(|e| AppError::internal("Failed to process vote", e))?;

        let transition = write_vote(&mut *tx, user_id, target, desired)
            .await
            .map_err(|e| AppError::internal("Failed to process vote", e))?;

        tx.commit()
            .await
            .map_err(|e| AppError::internal("Failed to process vote", e))?;

        Ok(transition)
    }
}

async fn lock_target(conn: &mut PgConnection, target: Votable) -> Result<(), AppError> {
    let (sql, missing) = match target.kind() {
        VotableKind::Post => ("SELECT id FROM posts WHERE id = $1 FOR SHARE", "Post not found"),
        VotableKind::Comment => (
            "SELECT id FROM comments WHERE id = $1 FOR SHARE",
            "Comment not found",
        ),
    };

    sqlx::query(sql)
        .bind(target.id())
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| AppError::internal("Failed to process vote", e))?
        .ok_or_else(|| AppError::NotFound(missing.to_string()))?;

    Ok(())
}

/// Serializes casts by the same user on the same target until commit.
/// A later cast then reads the row an earlier one wrote and toggles or switches it.
async fn lock_voter(
    conn: &mut PgConnection,
    user_id: Uuid,
    target: Votable,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "SELECT pg_advisory_xact_lock(hashtextextended($1::text || ':' || $2::text || ':' || $3, 0))",
    )
    .bind(user_id)
    .bind(target.id())
    .bind(target.kind().as_str())
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Applies the cast inside `conn`'s transaction. Callers hold `lock_voter`.
async fn write_vote(
    conn: &mut PgConnection,
    user_id: Uuid,
    target: Votable,
    desired: VoteKind,
) -> Result<VoteTransition, sqlx::Error> {
    let existing = sqlx::query_as::<_, Vote>(
        "SELECT id, user_id, votable_id, votable_type, vote_type, created_at FROM votes \
         WHERE user_id = $1 AND votable_id = $2 AND votable_type = $3 FOR UPDATE",
    )
    .bind(user_id)
    .bind(target.id())
    .bind(target.kind().as_str())
    .fetch_optional(&mut *conn)
    .await?;

    let transition = VoteTransition::plan(existing.as_ref().map(|v| v.vote_type), desired);
    match (transition, existing) {
        (VoteTransition::Create(kind), _) => {
            sqlx::query(
                "INSERT INTO votes (id, user_id, votable_id, votable_type, vote_type) \
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(Uuid::new_v4())
            .bind(user_id)
            .bind(target.id())
            .bind(target.kind().as_str())
            .bind(kind.as_str())
            .execute(&mut *conn)
            .await?;
        }
        (VoteTransition::Remove, Some(vote)) => {
            sqlx::query("DELETE FROM votes WHERE id = $1")
                .bind(vote.id)
                .execute(&mut *conn)
                .await?;
        }
        (VoteTransition::Switch(kind), Some(vote)) => {
            sqlx::query("UPDATE votes SET vote_type = $2 WHERE id = $1")
                .bind(vote.id)
                .bind(kind.as_str())
                .execute(&mut *conn)
                .await?;
        }
        // plan() only removes or switches an existing vote.
        (_, None) => {}
    }

    Ok(transition)
}
