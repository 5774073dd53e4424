use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Row, postgres::PgRow};
use uuid::Uuid;

use crate::error::AppError;

/// The two kinds of content that can receive a vote.
/// Stored in `votes.votable_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VotableKind {
    Post,
    Comment,
}

impl VotableKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            VotableKind::Post => "post",
            VotableKind::Comment => "comment",
        }
    }
}

impl FromStr for VotableKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "post" => Ok(VotableKind::Post),
            "comment" => Ok(VotableKind::Comment),
            _ => Err(AppError::BadRequest("Invalid content type".to_string())),
        }
    }
}

impl fmt::Display for VotableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A like or a dislike. Stored in `votes.vote_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteKind {
    Like,
    Dislike,
}

impl VoteKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoteKind::Like => "like",
            VoteKind::Dislike => "dislike",
        }
    }
}

impl FromStr for VoteKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "like" => Ok(VoteKind::Like),
            "dislike" => Ok(VoteKind::Dislike),
            _ => Err(AppError::BadRequest("Invalid vote type".to_string())),
        }
    }
}

impl fmt::Display for VoteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The target of a vote.
/// The database keeps `(votable_type, votable_id)`; everything above it uses this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Votable {
    Post(Uuid),
    Comment(Uuid),
}

impl Votable {
    pub fn new(kind: VotableKind, id: Uuid) -> Self {
        match kind {
            VotableKind::Post => Votable::Post(id),
            VotableKind::Comment => Votable::Comment(id),
        }
    }

    pub fn kind(&self) -> VotableKind {
        match self {
            Votable::Post(_) => VotableKind::Post,
            Votable::Comment(_) => VotableKind::Comment,
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            Votable::Post(id) | Votable::Comment(id) => *id,
        }
    }
}

/// Represents the 'votes' table in the database.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Vote {
    pub id: Uuid,
    pub user_id: Uuid,
    pub votable_id: Uuid,
    pub votable_type: VotableKind,
    pub vote_type: VoteKind,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl<'r> FromRow<'r, PgRow> for Vote {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            votable_id: row.try_get("votable_id")?,
            votable_type: parse_column(row, "votable_type")?,
            vote_type: parse_column(row, "vote_type")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

fn parse_column<T>(row: &PgRow, column: &str) -> Result<T, sqlx::Error>
where
    T: FromStr<Err = AppError>,
{
    let raw: String = row.try_get(column)?;
    raw.parse().map_err(|e: AppError| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(e),
    })
}

/// The change a cast applies to a user's existing vote on one target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteTransition {
    /// No vote yet: insert one.
    Create(VoteKind),
    /// Same reaction repeated: delete the row (toggle-off).
    Remove,
    /// Opposite reaction: update `vote_type` in place.
    Switch(VoteKind),
}

impl VoteTransition {
    pub fn plan(existing: Option<VoteKind>, desired: VoteKind) -> Self {
        match existing {
            None => VoteTransition::Create(desired),
            Some(current) if current == desired => VoteTransition::Remove,
            Some(_) => VoteTransition::Switch(desired),
        }
    }

    /// The user's vote once the transition is applied.
    pub fn resulting_vote(&self) -> Option<VoteKind> {
        match self {
            VoteTransition::Create(kind) | VoteTransition::Switch(kind) => Some(*kind),
            VoteTransition::Remove => None,
        }
    }
}

/// Aggregated votes on one target, as seen by one (optional) viewer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteTally {
    pub likes: i64,
    pub dislikes: i64,
    /// The viewer's own vote. Always null for anonymous viewers.
    pub my_vote: Option<VoteKind>,
}

impl VoteTally {
    /// Reads the `likes`, `dislikes` and `my_vote` columns of an aggregate row.
    pub fn from_aggregate_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        let my_vote: Option<String> = row.try_get("my_vote")?;
        let my_vote = my_vote
            .map(|raw| raw.parse::<VoteKind>())
            .transpose()
            .map_err(|e| sqlx::Error::ColumnDecode {
                index: "my_vote".to_string(),
                source: Box::new(e),
            })?;

        Ok(Self {
            likes: row.try_get("likes")?,
            dislikes: row.try_get("dislikes")?,
            my_vote,
        })
    }
}

/// DTO for casting a vote.
/// Enum fields stay strings here so unknown values surface as 400s from the service.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CastVoteRequest {
    pub votable_id: Uuid,
    pub votable_type: String,
    pub vote_type: String,
}

/// Raw counts for one target, without a viewer.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteCountResponse {
    pub votable_id: Uuid,
    pub votable_type: VotableKind,
    pub likes: i64,
    pub dislikes: i64,
}
