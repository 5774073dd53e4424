// src/utils/session.rs

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use sqlx::PgPool;

use crate::{
    config::Config, error::AppError, models::user::User, services::users::UserService,
    utils::jwt::verify_jwt,
};

/// Name of the cookie holding the session JWT.
pub const SESSION_COOKIE: &str = "Authorization";

/// Builds the session cookie issued on login.
pub fn session_cookie(token: String, config: &Config) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/")
        .secure(config.cookie_secure)
        .max_age(time::Duration::seconds(
            i64::try_from(config.jwt_expiration).unwrap_or(i64::MAX),
        ))
        .build()
}

/// Cookie used to clear the session; must match the path it was set on.
pub fn removal_cookie() -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE).path("/").build()
}

/// Resolves the session cookie to a user.
///
/// A missing, malformed or expired token, or one naming a deleted user,
/// is an anonymous request rather than an error.
async fn resolve_session(
    parts: &Parts,
    pool: PgPool,
    config: &Config,
) -> Result<Option<User>, AppError> {
    let jar = CookieJar::from_headers(&parts.headers);
    let Some(cookie) = jar.get(SESSION_COOKIE) else {
        return Ok(None);
    };

    let Ok(claims) = verify_jwt(cookie.value(), &config.jwt_secret) else {
        tracing::debug!("Ignoring invalid session token");
        return Ok(None);
    };
    let Ok(user_id) = claims.user_id() else {
        return Ok(None);
    };

    UserService::new(pool).find_by_id(user_id).await
}

/// The authenticated user. Rejects with 401 when there is no valid session.
pub struct CurrentUser(pub User);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
    PgPool: FromRef<S>,
    Config: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let pool = PgPool::from_ref(state);
        let config = Config::from_ref(state);

        resolve_session(parts, pool, &config)
            .await?
            .map(CurrentUser)
            .ok_or_else(|| AppError::AuthError("Unauthorized".to_string()))
    }
}

/// The viewer of a public endpoint, if logged in.
pub struct MaybeUser(pub Option<User>);

impl MaybeUser {
    pub fn id(&self) -> Option<uuid::Uuid> {
        self.0.as_ref().map(|user| user.id)
    }
}

impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync,
    PgPool: FromRef<S>,
    Config: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let pool = PgPool::from_ref(state);
        let config = Config::from_ref(state);

        Ok(MaybeUser(resolve_session(parts, pool, &config).await?))
    }
}

/// An authenticated administrator. 401 without a session, 403 for non-admins.
pub struct AdminUser(pub User);

impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
    PgPool: FromRef<S>,
    Config: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;

        if !user.is_admin {
            tracing::warn!("Non-admin user {} attempted an admin action", user.username);
            return Err(AppError::Forbidden("Admin access required".to_string()));
        }

        Ok(AdminUser(user))
    }
}
