use crate::{
    config::Config,
    services::{
        comments::CommentService, images::ImageService, posts::PostService, topics::TopicService,
        users::UserService, votes::VoteService,
    },
};
use axum::extract::FromRef;
use sqlx::PgPool;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    /// `None` when object storage is not configured.
    pub images: Option<ImageService>,
}

impl FromRef<AppState> for PgPool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for Option<ImageService> {
    fn from_ref(state: &AppState) -> Self {
        state.images.clone()
    }
}

impl FromRef<AppState> for UserService {
    fn from_ref(state: &AppState) -> Self {
        UserService::new(state.pool.clone())
    }
}

impl FromRef<AppState> for TopicService {
    fn from_ref(state: &AppState) -> Self {
        TopicService::new(state.pool.clone())
    }
}

impl FromRef<AppState> for PostService {
    fn from_ref(state: &AppState) -> Self {
        PostService::new(state.pool.clone())
    }
}

impl FromRef<AppState> for CommentService {
    fn from_ref(state: &AppState) -> Self {
        CommentService::new(state.pool.clone())
    }
}

impl FromRef<AppState> for VoteService {
    fn from_ref(state: &AppState) -> Self {
        VoteService::new(state.pool.clone())
    }
}
