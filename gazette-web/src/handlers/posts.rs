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


use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use gazette_core::{Pagination, Post, PostInput, PostListing};
use gazette_db::PostRepository;
use serde_json::{json, Value};
use std::collections::HashMap;

use super::uploads::{
    discard_object, discard_on_error, prepare_image, read_content_form, ContentForm,
};
use crate::auth::RequireWriter;
use crate::error::{AppError, AppResult};
use crate::AppState;

fn post_input(form: &ContentForm) -> PostInput {
    PostInput {
        title: form.text("title"),
        summary: form.text("summary"),
        image_url: form.text("imageUrl").filter(|u| !u.trim().is_empty()),
        // An unparsable body is reported by validation as missing
        post_body: form
            .text("postBody")
            .and_then(|raw| serde_json::from_str(&raw).ok()),
    }
}

/// Store the form's image under a fresh key, returning the key and URL
async fn store_post_image(
    state: &AppState,
    form: &mut ContentForm,
) -> AppResult<Option<(String, String)>> {
    let Some(image) = form.image.take() else {
        return Ok(None);
    };
    let pending = prepare_image(state, image, "posts", None)?;
    let key = pending.key.clone();
    let url = pending.store(state).await?;
    Ok(Some((key, url)))
}

async fn find_post(state: &AppState, id: i64) -> AppResult<Post> {
    PostRepository::new(state.db.clone())
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found("Post not found"))
}

/// GET /api/posts
pub async fn list_posts(
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
) -> AppResult<Json<Value>> {
    let pagination = Pagination::from_raw(
        query.get("page").map(String::as_str),
        query.get("count").map(String::as_str),
    );
    let include_body = query.get("includeBody").map(|v| v == "true").unwrap_or(false);

    let posts: Vec<PostListing> = PostRepository::new(state.db.clone())
        .list(pagination.offset(), pagination.limit())
        .await?
        .into_iter()
        .map(|post| PostListing::from_post(post, include_body))
        .collect();

    Ok(Json(json!({
        "success": true,
        "message": "Posts fetched successfully",
        "posts": posts,
    })))
}

/// POST /api/posts
pub async fn create_post(
    State(state): State<AppState>,
    RequireWriter(current): RequireWriter,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<Value>)> {
    let mut form = read_content_form(multipart, state.config.upload.max_size).await?;
    let mut draft = post_input(&form)
        .into_draft()
        .map_err(AppError::bad_request)?;
    let mut stored_key = None;
    if let Some((key, url)) = store_post_image(&state, &mut form).await? {
        stored_key = Some(key);
        draft.image_url = Some(url);
    }

    let mut post = Post::new(current.user_id(), draft);
    let created = PostRepository::new(state.db.clone())
        .create(&post)
        .await
        .map_err(AppError::from);
    post.id = Some(discard_on_error(&state, stored_key.as_deref(), created).await?);

    tracing::info!(post_id = ?post.id, author = %current.user.username, "Post created");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Post created successfully",
            "post": post,
        })),
    ))
}

/// GET /api/posts/{id}
pub async fn get_post(State(state): State<AppState>, Path(id): Path<i64>) -> AppResult<Json<Value>> {
    let post = find_post(&state, id).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Post fetched successfully",
        "post": post,
    })))
}

/// PATCH /api/posts/{id}
pub async fn edit_post(
    State(state): State<AppState>,
    RequireWriter(current): RequireWriter,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> AppResult<Json<Value>> {
    let mut post = find_post(&state, id).await?;

    let mut form = read_content_form(multipart, state.config.upload.max_size).await?;
    let mut draft = post_input(&form)
        .into_draft()
        .map_err(AppError::bad_request)?;
    let previous_url = post.image_url.clone();
    let mut stored_key = None;
    if let Some((key, url)) = store_post_image(&state, &mut form).await? {
        stored_key = Some(key);
        draft.image_url = Some(url);
    }

    post.apply(draft);
    let updated = PostRepository::new(state.db.clone())
        .update(&post)
        .await
        .map_err(AppError::from);
    discard_on_error(&state, stored_key.as_deref(), updated).await?;

    // The replaced image goes only after the new one is referenced
    if stored_key.is_some() {
        let old_key = previous_url
            .as_deref()
            .and_then(|url| state.store.key_from_url(url));
        if let Some(old_key) = old_key {
            discard_object(&state, &old_key).await;
        }
    }

    tracing::info!(post_id = id, editor = %current.user.username, "Post updated");

    Ok(Json(json!({
        "success": true,
        "message": "Post updated successfully",
        "post": post,
    })))
}

/// DELETE /api/posts/{id}
pub async fn delete_post(
    State(state): State<AppState>,
    RequireWriter(current): RequireWriter,
    Path(id): Path<i64>,
) -> AppResult<Json<Value>> {
    if !PostRepository::new(state.db.clone()).delete(id).await? {
        return Err(AppError::not_found("Post not found"));
    }

    tracing::info!(post_id = id, user = %current.user.username, "Post deleted");

    Ok(Json(json!({
        "success": true,
        "message": format!("Post with id: {} deleted.", id),
    })))
}
