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


use anyhow::{Context, Result};
use gazette_core::models::comment::Comment;
use sqlx::SqlitePool;

use crate::datetime::{format_datetime, parse_datetime};

type CommentRow = (i64, i64, i64, Option<i64>, String, String);

fn comment_from_row(row: CommentRow) -> Result<Comment> {
    let (id, article_id, user_id, parent_comment_id, content, created_at) = row;

    Ok(Comment {
        id: Some(id),
        article_id,
        user_id,
        parent_comment_id,
        content,
        created_at: parse_datetime(&created_at, "created_at")?,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentDeletion {
    Deleted,
    NotFound,
    NotOwner,
}

pub struct CommentRepository {
    pool: SqlitePool,
}

impl CommentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, comment: &Comment) -> Result<i64> {
        if let Some(parent_id) = comment.parent_comment_id {
            let parent = self.find_by_id(parent_id).await?;
            if parent.map(|p| p.article_id) != Some(comment.article_id) {
                return Err(anyhow::anyhow!(
                    "Parent comment {} does not belong to this article",
                    parent_id
                ));
            }
        }

        let result = sqlx::query(
            r#"
            INSERT INTO comments (article_id, user_id, parent_comment_id, content, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(comment.article_id)
        .bind(comment.user_id)
        .bind(comment.parent_comment_id)
        .bind(&comment.content)
        .bind(format_datetime(comment.created_at))
        .execute(&self.pool)
        .await
        .context("Failed to create comment")?;

        Ok(result.last_insert_rowid())
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<Comment>> {
        let row = sqlx::query_as::<_, CommentRow>(
            r#"
            SELECT id, article_id, user_id, parent_comment_id, content, created_at
            FROM comments
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to find comment by id")?;

        row.map(comment_from_row).transpose()
    }

    /// Oldest first, so threads read top to bottom
    pub async fn list_for_article(&self, article_id: i64) -> Result<Vec<Comment>> {
        let rows = sqlx::query_as::<_, CommentRow>(
            r#"
            SELECT id, article_id, user_id, parent_comment_id, content, created_at
            FROM comments
            WHERE article_id = ?
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(article_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list comments")?;

        rows.into_iter().map(comment_from_row).collect()
    }

    /// Delete a comment of an article together with its replies.
    /// Only the author may delete unless `force` is set.
    pub async fn delete(
        &self,
        article_id: i64,
        id: i64,
        user_id: i64,
        force: bool,
    ) -> Result<CommentDeletion> {
        let comment = match self.find_by_id(id).await? {
            Some(comment) if comment.article_id == article_id => comment,
            _ => return Ok(CommentDeletion::NotFound),
        };

        if comment.user_id != user_id && !force {
            return Ok(CommentDeletion::NotOwner);
        }

        sqlx::query("DELETE FROM comments WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete comment")?;

        Ok(CommentDeletion::Deleted)
    }
}
