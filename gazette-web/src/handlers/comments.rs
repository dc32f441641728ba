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
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use gazette_core::{Comment, CommentInput, Role};
use gazette_db::{ArticleRepository, CommentDeletion, CommentRepository};
use serde_json::{json, Value};

use crate::auth::CurrentUser;
use crate::error::{AppError, AppResult};
use crate::AppState;

async fn article_id(state: &AppState, meta_title: &str) -> AppResult<i64> {
    ArticleRepository::new(state.db.clone())
        .find_by_meta_title(meta_title)
        .await?
        .and_then(|article| article.id)
        .ok_or_else(|| AppError::not_found("Article not found"))
}

/// GET /api/articles/{metaTitle}/comments
pub async fn list_comments(
    State(state): State<AppState>,
    Path(meta_title): Path<String>,
) -> AppResult<Json<Value>> {
    let article_id = article_id(&state, &meta_title).await?;
    let comments = CommentRepository::new(state.db.clone())
        .list_for_article(article_id)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Comments fetched successfully",
        "comments": comments,
    })))
}

/// POST /api/articles/{metaTitle}/comments
pub async fn add_comment(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(meta_title): Path<String>,
    Json(input): Json<CommentInput>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let article_id = article_id(&state, &meta_title).await?;
    let repo = CommentRepository::new(state.db.clone());

    if let Some(parent_id) = input.target_id {
        let parent = repo.find_by_id(parent_id).await?;
        if parent.map(|p| p.article_id) != Some(article_id) {
            return Err(AppError::bad_request("Parent comment not found"));
        }
    }

    let mut comment = Comment::new(article_id, current.user_id(), input.target_id, &input.content)
        .map_err(AppError::bad_request)?;
    comment.id = Some(repo.create(&comment).await?);

    tracing::debug!(article_id, comment_id = ?comment.id, "Comment added");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Comment added successfully",
            "comment": comment,
        })),
    ))
}

/// DELETE /api/articles/{metaTitle}/comments/{id}
pub async fn delete_comment(
    State(state): State<AppState>,
    current: CurrentUser,
    Path((meta_title, id)): Path<(String, i64)>,
) -> AppResult<Json<Value>> {
    let article_id = article_id(&state, &meta_title).await?;
    let force = current.role() == Role::Admin;

    let outcome = CommentRepository::new(state.db.clone())
        .delete(article_id, id, current.user_id(), force)
        .await?;

    match outcome {
        CommentDeletion::Deleted => Ok(Json(json!({
            "success": true,
            "message": "Comment deleted successfully",
        }))),
        CommentDeletion::NotFound => Err(AppError::not_found("Comment not found")),
        CommentDeletion::NotOwner => Err(AppError::forbidden(
            "Unauthorized: Only the author can delete this comment",
        )),
    }
}
