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
use gazette_core::models::post::Post;
use sqlx::SqlitePool;

use crate::datetime::{format_datetime, parse_datetime};
use crate::errors::map_write_error;

type PostRow = (i64, i64, String, String, Option<String>, Option<String>, String);

fn post_from_row(row: PostRow) -> Result<Post> {
    let (id, author_id, title, date_published, image_url, summary, post_body) = row;

    Ok(Post {
        id: Some(id),
        author_id,
        title,
        date_published: parse_datetime(&date_published, "date_published")?,
        image_url,
        summary,
        post_body: serde_json::from_str(&post_body).context("Failed to parse post body")?,
    })
}

pub struct PostRepository {
    pool: SqlitePool,
}

impl PostRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, post: &Post) -> Result<i64> {
        let body = serde_json::to_string(&post.post_body).context("Failed to encode post body")?;

        let result = sqlx::query(
            r#"
            INSERT INTO posts (author_id, title, date_published, image_url, summary, post_body)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(post.author_id)
        .bind(&post.title)
        .bind(format_datetime(post.date_published))
        .bind(&post.image_url)
        .bind(&post.summary)
        .bind(body)
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "A post with this title already exists", "Failed to create post"))?;

        Ok(result.last_insert_rowid())
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<Post>> {
        let row = sqlx::query_as::<_, PostRow>(
            r#"
            SELECT id, author_id, title, date_published, image_url, summary, post_body
            FROM posts
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to find post by id")?;

        row.map(post_from_row).transpose()
    }

    /// Newest first
    pub async fn list(&self, offset: usize, limit: usize) -> Result<Vec<Post>> {
        let rows = sqlx::query_as::<_, PostRow>(
            r#"
            SELECT id, author_id, title, date_published, image_url, summary, post_body
            FROM posts
            ORDER BY date_published DESC, id DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(limit as i64)
        .bind(offset as i64)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list posts")?;

        rows.into_iter().map(post_from_row).collect()
    }

    pub async fn update(&self, post: &Post) -> Result<()> {
        let id = post
            .id
            .ok_or_else(|| anyhow::anyhow!("Cannot update post without id"))?;
        let body = serde_json::to_string(&post.post_body).context("Failed to encode post body")?;

        let rows_affected = sqlx::query(
            r#"
            UPDATE posts
            SET title = ?, image_url = ?, summary = ?, post_body = ?
            WHERE id = ?
            "#,
        )
        .bind(&post.title)
        .bind(&post.image_url)
        .bind(&post.summary)
        .bind(body)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "A post with this title already exists", "Failed to update post"))?
        .rows_affected();

        if rows_affected == 0 {
            return Err(anyhow::anyhow!("Post not found"));
        }

        Ok(())
    }

    /// Returns whether a post was removed
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let rows_affected = sqlx::query("DELETE FROM posts WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete post")?
            .rows_affected();

        Ok(rows_affected > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::is_conflict;
    use crate::init::memory_pool;
    use crate::repositories::UserRepository;
    use chrono::{Duration, Utc};
    use gazette_core::models::post::PostInput;
    use gazette_core::models::{role::Role, user::User};
    use serde_json::json;

    async fn setup() -> Result<(PostRepository, i64)> {
        let pool = memory_pool().await?;
        let author = UserRepository::new(pool.clone())
            .create(&User::new(
                "writer@example.com".to_string(),
                "writer".to_string(),
                "password123",
                Role::Writer,
            )?)
            .await?;
        Ok((PostRepository::new(pool), author))
    }

    fn post(author: i64, title: &str) -> Post {
        let input = PostInput {
            title: Some(title.to_string()),
            summary: Some("summary".to_string()),
            image_url: None,
            post_body: Some(json!({"blocks": [title]})),
        };
        Post::new(author, input.into_draft().unwrap())
    }

    #[tokio::test]
    async fn test_create_and_find() -> Result<()> {
        let (repo, author) = setup().await?;
        let id = repo.create(&post(author, "Hello")).await?;

        let found = repo.find_by_id(id).await?.unwrap();
        assert_eq!(found.title, "Hello");
        assert_eq!(found.author_id, author);
        assert_eq!(found.post_body, json!({"blocks": ["Hello"]}));
        assert!(repo.find_by_id(id + 1).await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_title() -> Result<()> {
        let (repo, author) = setup().await?;
        repo.create(&post(author, "Hello")).await?;
        assert!(is_conflict(&repo.create(&post(author, "Hello")).await.unwrap_err()));
        Ok(())
    }

    #[tokio::test]
    async fn test_list_newest_first() -> Result<()> {
        let (repo, author) = setup().await?;
        for (i, title) in ["a", "b", "c"].iter().enumerate() {
            let mut p = post(author, title);
            p.date_published = Utc::now() - Duration::hours(10 - i as i64);
            repo.create(&p).await?;
        }

        let titles: Vec<String> = repo.list(0, 2).await?.into_iter().map(|p| p.title).collect();
        assert_eq!(titles, vec!["c", "b"]);
        let titles: Vec<String> = repo.list(2, 2).await?.into_iter().map(|p| p.title).collect();
        assert_eq!(titles, vec!["a"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_and_delete() -> Result<()> {
        let (repo, author) = setup().await?;
        let id = repo.create(&post(author, "Hello")).await?;

        let mut p = repo.find_by_id(id).await?.unwrap();
        p.title = "Goodbye".to_string();
        p.post_body = json!({"blocks": []});
        repo.update(&p).await?;
        assert_eq!(repo.find_by_id(id).await?.unwrap().title, "Goodbye");

        assert!(repo.delete(id).await?);
        assert!(!repo.delete(id).await?);
        assert!(repo.update(&p).await.is_err());
        Ok(())
    }
}
