// tests/api_tests.rs

mod common;

use common::{PASSWORD, client, spawn_app, unique};
use serde_json::{Value, json};

#[tokio::test]
async fn health_check_404() {
    let app = spawn_app().await;

    let response = reqwest::get(app.url("/random_path_that_does_not_exist"))
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn signup_validates_and_rejects_duplicates() {
    let app = spawn_app().await;
    let client = client();
    let username = unique("u_");

    let res = app.signup(&client, &username).await;
    assert_eq!(res.status().as_u16(), 201);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["user"]["username"], json!(username));
    assert_eq!(body["user"]["isAdmin"], false);
    assert!(body["user"].get("password").is_none());

    let res = app.signup(&client, &username).await;
    assert_eq!(res.status().as_u16(), 409);

    // Username too short
    let res = app.signup(&client, "yo").await;
    assert_eq!(res.status().as_u16(), 400);
}

#[tokio::test]
async fn session_cookie_lifecycle() {
    let app = spawn_app().await;
    let client = client();
    let username = unique("u_");
    app.signup(&client, &username).await;

    // Signup alone does not log in.
    let res = client.get(app.url("/auth/validate")).send().await.unwrap();
    assert_eq!(res.status().as_u16(), 401);

    let res = client
        .post(app.url("/auth/login"))
        .json(&json!({ "username": username, "password": "wrong-password" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 401);

    let res = app.login(&client, &username).await;
    assert_eq!(res.status().as_u16(), 200);
    let set_cookie = res
        .headers()
        .get(reqwest::header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(set_cookie.starts_with("Authorization="));
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("SameSite=Lax"));

    let res = client.get(app.url("/auth/validate")).send().await.unwrap();
    assert_eq!(res.status().as_u16(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["user"]["username"], json!(username));

    let res = client.post(app.url("/auth/logout")).send().await.unwrap();
    assert_eq!(res.status().as_u16(), 200);

    let res = client.get(app.url("/auth/validate")).send().await.unwrap();
    assert_eq!(res.status().as_u16(), 401);
}

#[tokio::test]
async fn forged_cookie_is_treated_as_anonymous() {
    let app = spawn_app().await;

    let res = reqwest::Client::new()
        .get(app.url("/posts/all"))
        .header(reqwest::header::COOKIE, "Authorization=not-a-jwt")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 200);

    let res = reqwest::Client::new()
        .get(app.url("/auth/validate"))
        .header(reqwest::header::COOKIE, "Authorization=not-a-jwt")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 401);
}

#[tokio::test]
async fn topic_management_is_admin_only() {
    let app = spawn_app().await;
    let user = app.user().await;
    let admin = app.admin().await;
    let suffix = unique("");

    let res = user
        .client
        .post(app.url("/topics/create"))
        .json(&json!({ "name": format!("Programming {}", suffix) }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 403);

    let res = admin
        .client
        .post(app.url("/topics/create"))
        .json(&json!({ "name": format!("C++ & Go! {}", suffix) }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 201);
    let body: Value = res.json().await.unwrap();
    let slug = format!("c-go-{}", suffix);
    assert_eq!(body["topic"]["slug"], json!(slug));

    // Duplicate names conflict.
    let res = admin
        .client
        .post(app.url("/topics/create"))
        .json(&json!({ "name": format!("C++ & Go! {}", suffix) }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 409);

    // Renaming regenerates the slug.
    let res = admin
        .client
        .put(app.url(&format!("/topics/update/{}", slug)))
        .json(&json!({ "name": format!("Programming {}", suffix) }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 200);
    let body: Value = res.json().await.unwrap();
    let slug = format!("programming-{}", suffix);
    assert_eq!(body["topic"]["slug"], json!(slug));

    let topics: Value = reqwest::get(app.url("/topics/"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(
        topics["topics"]
            .as_array()
            .unwrap()
            .iter()
            .any(|t| t["slug"] == json!(slug))
    );

    // A topic with posts cannot be deleted.
    app.post(&user, &slug).await;
    let res = admin
        .client
        .delete(app.url(&format!("/topics/delete/{}", slug)))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 409);

    let empty = app.topic(&admin).await;
    let res = admin
        .client
        .delete(app.url(&format!("/topics/delete/{}", empty)))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 200);
}

#[tokio::test]
async fn posts_are_sanitized_and_editable_by_author_only() {
    let app = spawn_app().await;
    let admin = app.admin().await;
    let author = app.user().await;
    let stranger = app.user().await;
    let slug = app.topic(&admin).await;

    let res = author
        .client
        .post(app.url(&format!("/posts/create/{}", slug)))
        .json(&json!({
            "title": "  Best way to learn Go?  ",
            "content": "<p>Tour first?</p><script>alert('x')</script>",
            "imageUrl": "https://cdn.example.com/abc123",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 201);
    let body: Value = res.json().await.unwrap();
    let post = &body["post"];
    assert_eq!(post["title"], "Best way to learn Go?");
    assert!(!post["content"].as_str().unwrap().contains("script"));
    assert_eq!(post["imageUrl"], "https://cdn.example.com/abc123");
    assert_eq!(post["author"]["username"], json!(author.username));
    assert_eq!(post["likes"], 0);
    assert_eq!(post["myVote"], Value::Null);
    let post_id = post["id"].as_str().unwrap().to_string();

    // Blank title
    let res = author
        .client
        .post(app.url(&format!("/posts/create/{}", slug)))
        .json(&json!({ "title": "   ", "content": "<p>x</p>" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 400);

    // Unknown topic
    let res = author
        .client
        .post(app.url("/posts/create/no-such-topic-here"))
        .json(&json!({ "title": "t", "content": "c" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 404);

    let update = json!({ "title": "Edited", "content": "<p>Edited</p>" });
    let res = stranger
        .client
        .put(app.url(&format!("/posts/update/{}", post_id)))
        .json(&update)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 403);

    let res = author
        .client
        .put(app.url(&format!("/posts/update/{}", post_id)))
        .json(&update)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["post"]["title"], "Edited");
    assert_eq!(body["post"]["imageUrl"], Value::Null);

    // Anonymous clients cannot post.
    let res = reqwest::Client::new()
        .post(app.url(&format!("/posts/create/{}", slug)))
        .json(&json!({ "title": "t", "content": "c" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 401);
}

#[tokio::test]
async fn pinned_posts_and_comments_come_first() {
    let app = spawn_app().await;
    let admin = app.admin().await;
    let author = app.user().await;
    let commenter = app.user().await;
    let slug = app.topic(&admin).await;

    let older = app.post(&author, &slug).await;
    let newer = app.post(&author, &slug).await;

    let ids = |body: &Value, key: &str| -> Vec<String> {
        body[key]
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["id"].as_str().unwrap().to_string())
            .collect()
    };

    let posts: Value = reqwest::get(app.url(&format!("/posts/topic/{}", slug)))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(ids(&posts, "posts"), vec![newer.to_string(), older.to_string()]);

    // Only admins pin posts.
    let res = author
        .client
        .patch(app.url(&format!("/posts/pin/{}", older)))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 403);

    let res = admin
        .client
        .patch(app.url(&format!("/posts/pin/{}", older)))
        .json(&json!({ "isPinned": true }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["post"]["isPinned"], true);

    let posts: Value = reqwest::get(app.url(&format!("/posts/topic/{}", slug)))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(ids(&posts, "posts"), vec![older.to_string(), newer.to_string()]);

    // Comments: oldest first, the post author may pin.
    let first = app.comment(&commenter, newer).await;
    let second = app.comment(&commenter, newer).await;

    let res = commenter
        .client
        .patch(app.url(&format!("/comments/pin/{}", second)))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 403);

    let res = author
        .client
        .patch(app.url(&format!("/comments/pin/{}", second)))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 200);

    let comments: Value = reqwest::get(app.url(&format!("/comments/post/{}", newer)))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(
        ids(&comments, "comments"),
        vec![second.to_string(), first.to_string()]
    );
}

#[tokio::test]
async fn comments_on_missing_posts_are_not_found() {
    let app = spawn_app().await;
    let user = app.user().await;
    let missing = uuid::Uuid::new_v4();

    let res = reqwest::get(app.url(&format!("/comments/post/{}", missing)))
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 404);

    let res = user
        .client
        .post(app.url(&format!("/comments/create/{}", missing)))
        .json(&json!({ "content": "hello" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 404);
}

#[tokio::test]
async fn image_endpoints_need_storage() {
    let app = spawn_app().await;
    let user = app.user().await;

    let res = user.client.get(app.url("/images/s3Url")).send().await.unwrap();
    assert_eq!(res.status().as_u16(), 503);

    let res = reqwest::get(app.url("/images/s3Url")).await.unwrap();
    assert_eq!(res.status().as_u16(), 401);
}

#[tokio::test]
async fn login_requires_the_right_password() {
    let app = spawn_app().await;
    let client = client();
    let username = unique("u_");
    app.signup(&client, &username).await;

    let res = client
        .post(app.url("/auth/login"))
        .json(&json!({ "username": unique("nobody_"), "password": PASSWORD }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 401);

    let res = app.login(&client, &username).await;
    assert_eq!(res.status().as_u16(), 200);
}

#[tokio::test]
async fn parent_deleted_during_create_is_not_found() {
    let app = spawn_app().await;
    let admin = app.admin().await;
    let user = app.user().await;
    let slug = app.topic(&admin).await;
    let post_id = app.post(&admin, &slug).await;

    // Each trigger removes the parent row inside the INSERT, after the service looked it up.
    sqlx::query(
        r#"
        CREATE OR REPLACE FUNCTION forum_test_drop_post() RETURNS trigger AS $$
        BEGIN
            DELETE FROM posts WHERE id = NEW.post_id;
            RETURN NEW;
        END
        $$ LANGUAGE plpgsql
        "#,
    )
    .execute(&app.pool)
    .await
    .unwrap();
    let trigger = format!("drop_post_{}", post_id.simple());
    sqlx::query(&format!(
        "CREATE TRIGGER {} BEFORE INSERT ON comments FOR EACH ROW \
         WHEN (NEW.post_id = '{}'::uuid) EXECUTE FUNCTION forum_test_drop_post()",
        trigger, post_id
    ))
    .execute(&app.pool)
    .await
    .unwrap();

    let res = user
        .client
        .post(app.url(&format!("/comments/create/{}", post_id)))
        .json(&json!({ "content": "too late" }))
        .send()
        .await
        .unwrap();
    let status = res.status().as_u16();
    let body: Value = res.json().await.unwrap();
    sqlx::query(&format!("DROP TRIGGER {} ON comments", trigger))
        .execute(&app.pool)
        .await
        .unwrap();
    assert_eq!(status, 404);
    assert_eq!(body["error"], "Post not found");

    let other_slug = app.topic(&admin).await;
    let topic_id: uuid::Uuid = sqlx::query_scalar("SELECT id FROM topics WHERE slug = $1")
        .bind(&other_slug)
        .fetch_one(&app.pool)
        .await
        .unwrap();
    sqlx::query(
        r#"
        CREATE OR REPLACE FUNCTION forum_test_drop_topic() RETURNS trigger AS $$
        BEGIN
            DELETE FROM topics WHERE id = NEW.topic_id;
            RETURN NEW;
        END
        $$ LANGUAGE plpgsql
        "#,
    )
    .execute(&app.pool)
    .await
    .unwrap();
    let trigger = format!("drop_topic_{}", topic_id.simple());
    sqlx::query(&format!(
        "CREATE TRIGGER {} BEFORE INSERT ON posts FOR EACH ROW \
         WHEN (NEW.topic_id = '{}'::uuid) EXECUTE FUNCTION forum_test_drop_topic()",
        trigger, topic_id
    ))
    .execute(&app.pool)
    .await
    .unwrap();

    let res = user
        .client
        .post(app.url(&format!("/posts/create/{}", other_slug)))
        .json(&json!({ "title": "Too late", "content": "<p>gone</p>" }))
        .send()
        .await
        .unwrap();
    let status = res.status().as_u16();
    let body: Value = res.json().await.unwrap();
    sqlx::query(&format!("DROP TRIGGER {} ON posts", trigger))
        .execute(&app.pool)
        .await
        .unwrap();
    assert_eq!(status, 404);
    assert_eq!(body["error"], "Topic not found");
}

#[tokio::test]
async fn cors_preflight_allows_the_frontend() {
    let app = spawn_app().await;

    let res = reqwest::Client::new()
        .request(reqwest::Method::OPTIONS, app.url("/posts/all"))
        .header("Origin", "http://localhost:3000")
        .header("Access-Control-Request-Method", "POST")
        .send()
        .await
        .unwrap();
    assert!(res.status().is_success());
    assert_eq!(
        res.headers()["access-control-allow-origin"],
        "http://localhost:3000"
    );
    assert_eq!(res.headers()["access-control-allow-credentials"], "true");

    // Plain responses pass back through every layer with CORS headers.
    let res = reqwest::Client::new()
        .get(app.url("/posts/all"))
        .header("Origin", "http://localhost:3000")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 200);
    assert_eq!(
        res.headers()["access-control-allow-origin"],
        "http://localhost:3000"
    );
}
