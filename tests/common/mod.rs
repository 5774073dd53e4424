// tests/common/mod.rs
//
// Shared harness for the integration suites. Every suite needs a Postgres
// reachable through DATABASE_URL.

#![allow(dead_code)]

use forum_backend::{config::Config, routes, state::AppState};
use serde_json::{Value, json};
use sqlx::{PgPool, postgres::PgPoolOptions};
use uuid::Uuid;

pub const PASSWORD: &str = "password123";

pub struct TestApp {
    pub address: String,
    pub pool: PgPool,
}

/// Spawns the app on a random port against the database in DATABASE_URL.
pub async fn spawn_app() -> TestApp {
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .expect("Failed to connect to Postgres for testing.");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    let config = Config {
        database_url: database_url.clone(),
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600,
        rust_log: "error".to_string(),
        port: 0,
        frontend_url: "http://localhost:3000".to_string(),
        cookie_secure: false,
        admin_username: None,
        admin_password: None,
        storage: None,
    };

    let state = AppState {
        pool: pool.clone(),
        config,
        images: None,
    };
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp { address, pool }
}

/// Short random suffix for unique usernames and topic names.
pub fn unique(prefix: &str) -> String {
    format!("{}{}", prefix, &Uuid::new_v4().simple().to_string()[..8])
}

/// A client with its own cookie jar, i.e. its own session.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .cookie_store(true)
        .build()
        .unwrap()
}

/// A logged-in user.
pub struct Session {
    pub id: Uuid,
    pub username: String,
    pub client: reqwest::Client,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    pub async fn signup(&self, client: &reqwest::Client, username: &str) -> reqwest::Response {
        client
            .post(self.url("/auth/signup"))
            .json(&json!({ "username": username, "password": PASSWORD }))
            .send()
            .await
            .unwrap()
    }

    pub async fn login(&self, client: &reqwest::Client, username: &str) -> reqwest::Response {
        client
            .post(self.url("/auth/login"))
            .json(&json!({ "username": username, "password": PASSWORD }))
            .send()
            .await
            .unwrap()
    }

    /// Registers and logs in a fresh user.
    pub async fn user(&self) -> Session {
        let client = client();
        let username = unique("u_");

        let res = self.signup(&client, &username).await;
        assert_eq!(res.status().as_u16(), 201);
        let body: Value = res.json().await.unwrap();
        let id = body["user"]["id"].as_str().unwrap().parse().unwrap();

        let res = self.login(&client, &username).await;
        assert_eq!(res.status().as_u16(), 200);

        Session {
            id,
            username,
            client,
        }
    }

    /// A fresh user promoted to admin before logging in.
    pub async fn admin(&self) -> Session {
        let client = client();
        let username = unique("a_");

        let res = self.signup(&client, &username).await;
        assert_eq!(res.status().as_u16(), 201);
        let body: Value = res.json().await.unwrap();
        let id = body["user"]["id"].as_str().unwrap().parse().unwrap();

        sqlx::query("UPDATE users SET is_admin = TRUE WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .unwrap();

        let res = self.login(&client, &username).await;
        assert_eq!(res.status().as_u16(), 200);

        Session {
            id,
            username,
            client,
        }
    }

    /// Creates a topic and returns its slug.
    pub async fn topic(&self, admin: &Session) -> String {
        let res = admin
            .client
            .post(self.url("/topics/create"))
            .json(&json!({ "name": unique("Topic ") }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status().as_u16(), 201);

        let body: Value = res.json().await.unwrap();
        body["topic"]["slug"].as_str().unwrap().to_string()
    }

    pub async fn post(&self, author: &Session, slug: &str) -> Uuid {
        let res = author
            .client
            .post(self.url(&format!("/posts/create/{}", slug)))
            .json(&json!({ "title": "A question", "content": "<p>Some content</p>" }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status().as_u16(), 201);

        let body: Value = res.json().await.unwrap();
        body["post"]["id"].as_str().unwrap().parse().unwrap()
    }

    pub async fn comment(&self, author: &Session, post_id: Uuid) -> Uuid {
        let res = author
            .client
            .post(self.url(&format!("/comments/create/{}", post_id)))
            .json(&json!({ "content": "<p>An answer</p>" }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status().as_u16(), 201);

        let body: Value = res.json().await.unwrap();
        body["comment"]["id"].as_str().unwrap().parse().unwrap()
    }

    /// Casts a vote and returns the response body.
    pub async fn vote(&self, voter: &Session, id: Uuid, votable_type: &str, vote_type: &str) -> Value {
        let res = voter
            .client
            .post(self.url("/vote/"))
            .json(&json!({
                "votableId": id,
                "votableType": votable_type,
                "voteType": vote_type,
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status().as_u16(), 200);
        res.json().await.unwrap()
    }

    /// Vote rows currently stored for a target.
    pub async fn vote_rows(&self, id: Uuid, votable_type: &str) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM votes WHERE votable_id = $1 AND votable_type = $2")
            .bind(id)
            .bind(votable_type)
            .fetch_one(&self.pool)
            .await
            .unwrap()
    }

    pub async fn count(&self, sql: &str, id: Uuid) -> i64 {
        sqlx::query_scalar(sql)
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .unwrap()
    }
}
