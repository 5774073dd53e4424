use sqlx::{PgPool, Row};
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::{AppError, is_unique_violation},
    models::user::{CreateUserRequest, LoginRequest, ProfileParams, User, UserProfile, UserResponse},
    services::{comments::CommentService, posts::PostService},
    utils::hash::{hash_password, verify_password},
};

const USER_COLUMNS: &str = "id, username, password, avatar_url, is_admin, created_at, updated_at";

#[derive(Clone)]
pub struct UserService {
    pool: PgPool,
}

impl UserService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::internal("Failed to retrieve user", e))
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::internal("Failed to retrieve user", e))
    }

    /// Registers a regular user.
    pub async fn register(&self, req: CreateUserRequest) -> Result<User, AppError> {
        req.validate()?;
        let username = req.username.trim();
        if username.is_empty() {
            return Err(AppError::BadRequest("Username cannot be empty".to_string()));
        }

        let hashed = hash_password(&req.password)?;
        let user = self.insert(username, &hashed, false).await?;
        tracing::info!("New user registered: {}", user.username);
        Ok(user)
    }

    /// Checks credentials. Unknown users and wrong passwords get the same error.
    pub async fn authenticate(&self, req: LoginRequest) -> Result<User, AppError> {
        req.validate()?;

        let invalid = || AppError::AuthError("Invalid username or password".to_string());
        let user = self
            .find_by_username(req.username.trim())
            .await?
            .ok_or_else(invalid)?;

        if !verify_password(&req.password, &user.password)? {
            tracing::warn!("Failed login attempt for {}", user.username);
            return Err(invalid());
        }

        Ok(user)
    }

    /// Creates the configured admin account if it does not exist yet.
    pub async fn ensure_admin(&self, username: &str, password: &str) -> Result<(), AppError> {
        if self.find_by_username(username).await?.is_some() {
            return Ok(());
        }

        tracing::info!("Seeding admin user: {}", username);
        let hashed = hash_password(password)?;
        self.insert(username, &hashed, true).await?;
        tracing::info!("Admin user created successfully.");
        Ok(())
    }

    async fn insert(&self, username: &str, password_hash: &str, is_admin: bool) -> Result<User, AppError> {
        sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (id, username, password, is_admin) VALUES ($1, $2, $3, $4) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(username)
        .bind(password_hash)
        .bind(is_admin)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict("Username already exists".to_string())
            } else {
                AppError::internal("Failed to create user", e)
            }
        })
    }

    /// Public profile with activity counts, optionally with the user's posts
    /// and comments as seen by `viewer`.
    pub async fn profile(
        &self,
        username: &str,
        params: &ProfileParams,
        viewer: Option<Uuid>,
    ) -> Result<UserProfile, AppError> {
        let user = self
            .find_by_username(username)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        let counts = sqlx::query(
            r#"
            SELECT
                (SELECT COUNT(*) FROM posts WHERE author_id = $1) AS post_count,
                (SELECT COUNT(*) FROM comments WHERE author_id = $1) AS comment_count
            "#,
        )
        .bind(user.id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::internal("Failed to retrieve user profile", e))?;

        let posts = if params.posts {
            let posts = PostService::new(self.pool.clone());
            Some(posts.list_by_author(user.id, viewer).await?)
        } else {
            None
        };
        let comments = if params.comments {
            let comments = CommentService::new(self.pool.clone());
            Some(comments.list_by_author(user.id, viewer).await?)
        } else {
            None
        };

        Ok(UserProfile {
            user: UserResponse::from(&user),
            created_at: user.created_at,
            post_count: counts.try_get("post_count")?,
            comment_count: counts.try_get("comment_count")?,
            posts,
            comments,
        })
    }
}
