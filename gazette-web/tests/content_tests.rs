// Gazette - A content backend for online publications
// Copyright (C) 2025 Gazette Project Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as
// published by the Free Software Foundation, either version 3 of the
// License, or (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.


//! Posts, comments, public profiles and presigned uploads

mod common;

use axum::http::StatusCode;
use axum_test::multipart::MultipartForm;
use common::{bearer, create_article, image_part, png_bytes, spawn_app, TestApp};
use gazette_db::UserRepository;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

fn post_form(title: &str) -> MultipartForm {
    MultipartForm::new()
        .add_text("title", title.to_string())
        .add_text("summary", "Weekly roundup")
        .add_text("postBody", r#"{"blocks":[{"type":"paragraph","text":"Hi"}]}"#)
}

async fn user_id(app: &TestApp, token: &str) -> i64 {
    let (name, value) = bearer(token);
    let body: Value = app
        .server
        .get("/auth/check-session")
        .add_header(name, value)
        .await
        .json();
    body["user"]["id"].as_i64().unwrap()
}

#[tokio::test]
async fn test_post_crud() {
    let app = spawn_app().await;
    let writer = app.writer("wendy").await;
    let reader = app.reader("rita").await;

    let (name, value) = bearer(&reader);
    let response = app
        .server
        .post("/api/posts")
        .add_header(name, value)
        .multipart(post_form("Notes"))
        .await;
    response.assert_status(StatusCode::FORBIDDEN);

    let (name, value) = bearer(&writer);
    let response = app
        .server
        .post("/api/posts")
        .add_header(name, value)
        .multipart(post_form("Notes").add_part("image", image_part("p.png", "image/png")))
        .await;
    response.assert_status(StatusCode::CREATED);
    let post = response.json::<Value>()["post"].clone();
    let id = post["id"].as_i64().unwrap();
    assert_eq!(post["postBody"]["blocks"][0]["text"], "Hi");
    assert!(post["imageUrl"].as_str().unwrap().contains("/media/posts-"));

    let (name, value) = bearer(&writer);
    let response = app
        .server
        .post("/api/posts")
        .add_header(name, value)
        .multipart(MultipartForm::new().add_text("title", "No body"))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(
        response.json::<Value>()["error"]["message"],
        "Validation errors: Body is required"
    );

    let body: Value = app.server.get("/api/posts").await.json();
    assert_eq!(body["posts"].as_array().unwrap().len(), 1);
    assert!(body["posts"][0].get("postBody").is_none());

    let body: Value = app.server.get("/api/posts?includeBody=true").await.json();
    assert!(body["posts"][0].get("postBody").is_some());

    let (name, value) = bearer(&writer);
    let response = app
        .server
        .patch(&format!("/api/posts/{}", id))
        .add_header(name, value)
        .multipart(post_form("Notes, edited"))
        .await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["post"]["title"], "Notes, edited");

    let response = app.server.get(&format!("/api/posts/{}", id)).await;
    response.assert_status_ok();
    let fetched = response.json::<Value>()["post"].clone();
    assert_eq!(fetched["title"], "Notes, edited");
    assert_eq!(fetched["imageUrl"], post["imageUrl"]);

    let (name, value) = bearer(&writer);
    let response = app
        .server
        .delete(&format!("/api/posts/{}", id))
        .add_header(name, value)
        .await;
    response.assert_status_ok();

    let response = app.server.get(&format!("/api/posts/{}", id)).await;
    response.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(response.json::<Value>()["error"]["message"], "Post not found");
}

#[tokio::test]
async fn test_comments_threads_and_deletion() {
    let app = spawn_app().await;
    let writer = app.writer("wendy").await;
    let alice = app.reader("alice").await;
    let bob = app.reader("bob").await;
    let admin = app.admin("ada").await;

    create_article(&app, &writer, "Rates", "rates").await;
    create_article(&app, &writer, "Other", "other").await;

    let response = app
        .server
        .post("/api/articles/rates/comments")
        .json(&json!({ "content": "anonymous" }))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);

    let (name, value) = bearer(&alice);
    let response = app
        .server
        .post("/api/articles/rates/comments")
        .add_header(name, value)
        .json(&json!({ "content": "<script>x</script>Great read" }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let parent = response.json::<Value>()["comment"].clone();
    let parent_id = parent["id"].as_i64().unwrap();
    assert_eq!(parent["content"], "Great read");

    let (name, value) = bearer(&bob);
    let response = app
        .server
        .post("/api/articles/rates/comments")
        .add_header(name, value)
        .json(&json!({ "content": "Agreed", "targetId": parent_id }))
        .await;
    response.assert_status(StatusCode::CREATED);
    assert_eq!(
        response.json::<Value>()["comment"]["parentCommentId"],
        parent_id
    );

    // A parent must belong to the same article
    let (name, value) = bearer(&bob);
    let response = app
        .server
        .post("/api/articles/other/comments")
        .add_header(name, value)
        .json(&json!({ "content": "Wrong thread", "targetId": parent_id }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let body: Value = app.server.get("/api/articles/rates/comments").await.json();
    assert_eq!(body["comments"].as_array().unwrap().len(), 2);

    let (name, value) = bearer(&bob);
    let response = app
        .server
        .delete(&format!("/api/articles/rates/comments/{}", parent_id))
        .add_header(name, value)
        .await;
    response.assert_status(StatusCode::FORBIDDEN);

    let (name, value) = bearer(&admin);
    let response = app
        .server
        .delete(&format!("/api/articles/rates/comments/{}", parent_id))
        .add_header(name, value)
        .await;
    response.assert_status_ok();

    // Replies go with their parent
    let body: Value = app.server.get("/api/articles/rates/comments").await.json();
    assert!(body["comments"].as_array().unwrap().is_empty());

    let (name, value) = bearer(&alice);
    let response = app
        .server
        .delete(&format!("/api/articles/rates/comments/{}", parent_id))
        .add_header(name, value)
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_public_profile() {
    let app = spawn_app().await;
    let token = app.reader("jane").await;
    let id = user_id(&app, &token).await;

    let response = app.server.get(&format!("/api/users/{}", id)).await;
    response.assert_status(StatusCode::FORBIDDEN);

    UserRepository::new(app.state.db.clone())
        .set_display_name(id, Some("Jane Doe"))
        .await
        .unwrap();

    let response = app.server.get(&format!("/api/users/{}", id)).await;
    response.assert_status_ok();
    assert_eq!(
        response.json::<Value>()["user"],
        json!({ "uid": id, "displayName": "Jane Doe" })
    );

    let response = app.server.get("/api/users/9999").await;
    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_presigned_upload_roundtrip() {
    let app = spawn_app().await;
    let writer = app.writer("wendy").await;

    let (name, value) = bearer(&writer);
    let response = app
        .server
        .post("/api/upload")
        .add_header(name, value)
        .json(&json!({ "mimeType": "application/pdf", "prefix": "covers" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error"]["message"], "Invalid mimetype");

    let (name, value) = bearer(&writer);
    let response = app
        .server
        .post("/api/upload")
        .add_header(name, value)
        .json(&json!({ "mimeType": "image/png", "prefix": "covers" }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    let key = body["key"].as_str().unwrap().to_string();
    let url = body["url"].as_str().unwrap();
    assert!(key.starts_with("covers-") && key.ends_with(".png"));

    let path = url.strip_prefix("http://localhost:3000").unwrap();
    let response = app
        .server
        .put(path)
        .content_type("image/png")
        .bytes(png_bytes().into())
        .await;
    response.assert_status(StatusCode::CREATED);
    assert_eq!(response.json::<Value>()["url"], body["publicUrl"]);

    let response = app.server.get(&format!("/media/{}", key)).await;
    response.assert_status_ok();
    assert_eq!(response.as_bytes().to_vec(), png_bytes());

    let (name, value) = bearer(&writer);
    let response = app
        .server
        .delete(&format!("/api/upload/{}", key))
        .add_header(name, value)
        .await;
    response.assert_status_ok();
    assert!(!app.storage.path().join(&key).exists());
}

#[tokio::test]
async fn test_presign_requires_writer() {
    let app = spawn_app().await;
    let reader = app.reader("rita").await;

    let (name, value) = bearer(&reader);
    let response = app
        .server
        .post("/api/upload")
        .add_header(name, value)
        .json(&json!({ "mimeType": "image/png", "prefix": "covers" }))
        .await;
    response.assert_status(StatusCode::FORBIDDEN);
}
