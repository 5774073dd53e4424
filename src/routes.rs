// src/routes.rs

use std::time::Duration;

use axum::{
    Router,
    http::{HeaderValue, Method, StatusCode, header},
    routing::{delete, get, patch, post, put},
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::{
    handlers::{auth, comment, image, post, profile, topic, vote},
    state::AppState,
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Assembles the main application router.
///
/// * Merges all sub-routers (auth, topics, posts, comments, votes, users, images).
/// * Applies global middleware (Trace, CORS, Timeout).
/// * Injects global state.
///
/// Access control lives in the handlers' extractors (`CurrentUser`, `AdminUser`).
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(allowed_origin(&state.config.frontend_url))
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT]);

    let auth_routes: Router<AppState> = Router::new()
        .route("/auth/signup", post(auth::signup))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/validate", get(auth::validate));

    let topic_routes: Router<AppState> = Router::new()
        .route("/topics", get(topic::list_topics))
        .route("/topics/", get(topic::list_topics))
        .route("/topics/create", post(topic::create_topic))
        .route("/topics/update/{slug}", put(topic::update_topic))
        .route("/topics/delete/{slug}", delete(topic::delete_topic));

    let post_routes: Router<AppState> = Router::new()
        .route("/posts/all", get(post::list_posts))
        .route("/posts/topic/{slug}", get(post::list_topic_posts))
        .route("/posts/id/{id}", get(post::get_post))
        .route("/posts/create/{slug}", post(post::create_post))
        .route("/posts/update/{id}", put(post::update_post))
        .route("/posts/delete/{id}", delete(post::delete_post))
        .route("/posts/pin/{id}", patch(post::pin_post));

    let comment_routes: Router<AppState> = Router::new()
        .route("/comments/post/{post_id}", get(comment::list_post_comments))
        .route("/comments/create/{post_id}", post(comment::create_comment))
        .route("/comments/update/{id}", put(comment::update_comment))
        .route("/comments/delete/{id}", delete(comment::delete_comment))
        .route("/comments/pin/{id}", patch(comment::pin_comment));

    let vote_routes: Router<AppState> = Router::new()
        .route("/vote", post(vote::cast_vote))
        .route("/vote/", post(vote::cast_vote))
        .route("/vote/count/{id}/{votable_type}", get(vote::vote_counts));

    let user_routes: Router<AppState> =
        Router::new().route("/user/profile/{username}", get(profile::get_profile));

    let image_routes: Router<AppState> = Router::new()
        .route("/images/s3Url", get(image::upload_url))
        .route("/images/delete/{image_name}", delete(image::delete_image));

    Router::new()
        .merge(auth_routes)
        .merge(topic_routes)
        .merge(post_routes)
        .merge(comment_routes)
        .merge(vote_routes)
        .merge(user_routes)
        .merge(image_routes)
        // Global Middleware (applied from outside in)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(TimeoutLayer::with_status_code(
                    StatusCode::REQUEST_TIMEOUT,
                    REQUEST_TIMEOUT,
                )),
        )
        .with_state(state)
}

/// A comma-separated FRONTEND_URL allows several origins.
fn allowed_origin(frontend_url: &str) -> AllowOrigin {
    let origins: Vec<HeaderValue> = frontend_url
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    AllowOrigin::list(origins)
}

