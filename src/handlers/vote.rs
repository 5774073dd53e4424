use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use uuid::Uuid;

use crate::{
    error::AppError, models::vote::CastVoteRequest, services::votes::VoteService,
    utils::session::CurrentUser,
};

/// Casts, switches or toggles off the current user's vote.
///
/// Responds with the target's counts after the change and the user's resulting vote.
pub async fn cast_vote(
    State(votes): State<VoteService>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<CastVoteRequest>,
) -> Result<impl IntoResponse, AppError> {
    let tally = votes.cast(user.id, payload).await?;
    Ok(Json(tally))
}

pub async fn vote_counts(
    State(votes): State<VoteService>,
    Path((id, votable_type)): Path<(Uuid, String)>,
) -> Result<impl IntoResponse, AppError> {
    let counts = votes.counts(&votable_type, id).await?;
    Ok(Json(counts))
}
