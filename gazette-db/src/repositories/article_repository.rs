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
use chrono::{DateTime, Utc};
use gazette_core::models::article::{Article, Category};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::datetime::{format_datetime, parse_datetime};
use crate::errors::map_write_error;

const ARTICLE_COLUMNS: &str = "id, author_uid, title, meta_title, category, date_published, last_updated, position, image_url, summary, article_body, article_text, likes_count";

const DUPLICATE_ARTICLE: &str = "An article with this title or meta title already exists";

type ArticleRow = (
    i64,
    i64,
    String,
    String,
    String,
    String,
    String,
    i64,
    Option<String>,
    Option<String>,
    String,
    String,
    i64,
);

fn article_from_row(row: ArticleRow) -> Result<Article> {
    let (
        id,
        author_uid,
        title,
        meta_title,
        category,
        date_published,
        last_updated,
        position,
        image_url,
        summary,
        article_body,
        article_text,
        likes_count,
    ) = row;

    Ok(Article {
        id: Some(id),
        author_uid,
        title,
        meta_title,
        category: category.parse::<Category>().map_err(anyhow::Error::msg)?,
        date_published: parse_datetime(&date_published, "date_published")?,
        last_updated: parse_datetime(&last_updated, "last_updated")?,
        position,
        image_url,
        summary,
        article_body,
        article_text,
        likes_count,
    })
}

fn articles_from_rows(rows: Vec<ArticleRow>) -> Result<Vec<Article>> {
    rows.into_iter().map(article_from_row).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArticleSort {
    #[default]
    Newest,
    MostLiked,
}

impl ArticleSort {
    fn order_by(&self) -> &'static str {
        match self {
            ArticleSort::Newest => "date_published DESC, id DESC",
            ArticleSort::MostLiked => "likes_count DESC, date_published DESC, id DESC",
        }
    }
}

/// Search filters. Every term is matched case-insensitively and any term may match.
#[derive(Debug, Clone, Default)]
pub struct ArticleSearch {
    pub terms: Vec<String>,
    pub categories: Vec<Category>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub offset: usize,
    pub limit: usize,
}

/// Result of a like or unlike: whether anything changed and the resulting count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LikeOutcome {
    pub changed: bool,
    pub likes: i64,
}

pub struct ArticleRepository {
    pool: SqlitePool,
}

impl ArticleRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, article: &Article) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO articles (author_uid, title, meta_title, category, date_published, last_updated,
                                  position, image_url, summary, article_body, article_text, likes_count)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0)
            "#,
        )
        .bind(article.author_uid)
        .bind(&article.title)
        .bind(&article.meta_title)
        .bind(article.category.as_str())
        .bind(format_datetime(article.date_published))
        .bind(format_datetime(article.last_updated))
        .bind(article.position)
        .bind(&article.image_url)
        .bind(&article.summary)
        .bind(&article.article_body)
        .bind(&article.article_text)
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(e, DUPLICATE_ARTICLE, "Failed to create article"))?;

        Ok(result.last_insert_rowid())
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<Article>> {
        let sql = format!("SELECT {} FROM articles WHERE id = ?", ARTICLE_COLUMNS);
        let row = sqlx::query_as::<_, ArticleRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to find article by id")?;

        row.map(article_from_row).transpose()
    }

    pub async fn find_by_meta_title(&self, meta_title: &str) -> Result<Option<Article>> {
        let sql = format!("SELECT {} FROM articles WHERE meta_title = ?", ARTICLE_COLUMNS);
        let row = sqlx::query_as::<_, ArticleRow>(&sql)
            .bind(meta_title)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to find article by meta title")?;

        row.map(article_from_row).transpose()
    }

    pub async fn exists(&self, id: i64) -> Result<bool> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM articles WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to check article existence")?;

        Ok(row.is_some())
    }

    /// Persist edited fields. The likes count is owned by `like`/`unlike` and left alone.
    pub async fn update(&self, article: &Article) -> Result<()> {
        let id = article
            .id
            .ok_or_else(|| anyhow::anyhow!("Cannot update article without id"))?;

        let rows_affected = sqlx::query(
            r#"
            UPDATE articles
            SET title = ?, meta_title = ?, category = ?, last_updated = ?, position = ?,
                image_url = ?, summary = ?, article_body = ?, article_text = ?
            WHERE id = ?
            "#,
        )
        .bind(&article.title)
        .bind(&article.meta_title)
        .bind(article.category.as_str())
        .bind(format_datetime(article.last_updated))
        .bind(article.position)
        .bind(&article.image_url)
        .bind(&article.summary)
        .bind(&article.article_body)
        .bind(&article.article_text)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(e, DUPLICATE_ARTICLE, "Failed to update article"))?
        .rows_affected();

        if rows_affected == 0 {
            return Err(anyhow::anyhow!("Article not found"));
        }

        Ok(())
    }

    /// Delete and return the article, so callers can clean up its image
    pub async fn delete_by_meta_title(&self, meta_title: &str) -> Result<Option<Article>> {
        let sql = format!(
            "DELETE FROM articles WHERE meta_title = ? RETURNING {}",
            ARTICLE_COLUMNS
        );
        let row = sqlx::query_as::<_, ArticleRow>(&sql)
            .bind(meta_title)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to delete article")?;

        row.map(article_from_row).transpose()
    }

    pub async fn list(
        &self,
        category: Option<Category>,
        sort: ArticleSort,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Article>> {
        let mut query = QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM articles", ARTICLE_COLUMNS));
        if let Some(category) = category {
            query.push(" WHERE category = ").push_bind(category.as_str());
        }
        query
            .push(" ORDER BY ")
            .push(sort.order_by())
            .push(" LIMIT ")
            .push_bind(limit as i64)
            .push(" OFFSET ")
            .push_bind(offset as i64);

        let rows = query
            .build_query_as::<ArticleRow>()
            .fetch_all(&self.pool)
            .await
            .context("Failed to list articles")?;

        articles_from_rows(rows)
    }

    /// Every article in a category (or all), newest first
    pub async fn list_all(&self, category: Option<Category>) -> Result<Vec<Article>> {
        let mut query = QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM articles", ARTICLE_COLUMNS));
        if let Some(category) = category {
            query.push(" WHERE category = ").push_bind(category.as_str());
        }
        query.push(" ORDER BY ").push(ArticleSort::Newest.order_by());

        let rows = query
            .build_query_as::<ArticleRow>()
            .fetch_all(&self.pool)
            .await
            .context("Failed to load articles")?;

        articles_from_rows(rows)
    }

    pub async fn search(&self, search: &ArticleSearch) -> Result<Vec<Article>> {
        let mut query = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {} FROM articles WHERE 1 = 1",
            ARTICLE_COLUMNS
        ));

        if !search.categories.is_empty() {
            query.push(" AND category IN (");
            let mut separated = query.separated(", ");
            for category in &search.categories {
                separated.push_bind(category.as_str());
            }
            separated.push_unseparated(")");
        }

        if let Some(start) = search.start {
            let end = search.end.unwrap_or_else(Utc::now);
            query
                .push(" AND date_published >= ")
                .push_bind(format_datetime(start))
                .push(" AND date_published <= ")
                .push_bind(format_datetime(end));
        } else if let Some(end) = search.end {
            query
                .push(" AND date_published <= ")
                .push_bind(format_datetime(end));
        }

        query.push(" ORDER BY ").push(ArticleSort::Newest.order_by());

        // SQLite's lower() folds ASCII only, so terms are matched after loading
        let terms: Vec<String> = search
            .terms
            .iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        if terms.is_empty() {
            query
                .push(" LIMIT ")
                .push_bind(search.limit as i64)
                .push(" OFFSET ")
                .push_bind(search.offset as i64);
        }

        let rows = query
            .build_query_as::<ArticleRow>()
            .fetch_all(&self.pool)
            .await
            .context("Failed to search articles")?;

        let articles = articles_from_rows(rows)?;
        if terms.is_empty() {
            return Ok(articles);
        }

        Ok(articles
            .into_iter()
            .filter(|article| article.matches_terms(&terms))
            .skip(search.offset)
            .take(search.limit)
            .collect())
    }

    pub async fn has_liked(&self, article_id: i64, user_id: i64) -> Result<bool> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT 1 FROM article_likes WHERE article_id = ? AND user_id = ?")
                .bind(article_id)
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await
                .context("Failed to check article like")?;

        Ok(row.is_some())
    }

    /// Record a like. A repeated like changes nothing.
    pub async fn like(&self, article_id: i64, user_id: i64) -> Result<LikeOutcome> {
        let mut tx = self.pool.begin().await.context("Failed to begin like")?;

        let inserted = sqlx::query(
            "INSERT OR IGNORE INTO article_likes (article_id, user_id, created_at) VALUES (?, ?, ?)",
        )
        .bind(article_id)
        .bind(user_id)
        .bind(format_datetime(Utc::now()))
        .execute(&mut *tx)
        .await
        .context("Failed to like article")?
        .rows_affected();

        let likes = recount_likes(&mut tx, article_id).await?;
        tx.commit().await.context("Failed to commit like")?;

        Ok(LikeOutcome {
            changed: inserted > 0,
            likes,
        })
    }

    /// Remove a like. Unliking an article that was not liked changes nothing.
    pub async fn unlike(&self, article_id: i64, user_id: i64) -> Result<LikeOutcome> {
        let mut tx = self.pool.begin().await.context("Failed to begin unlike")?;

        let removed = sqlx::query("DELETE FROM article_likes WHERE article_id = ? AND user_id = ?")
            .bind(article_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .context("Failed to unlike article")?
            .rows_affected();

        let likes = recount_likes(&mut tx, article_id).await?;
        tx.commit().await.context("Failed to commit unlike")?;

        Ok(LikeOutcome {
            changed: removed > 0,
            likes,
        })
    }
}

async fn recount_likes(tx: &mut sqlx::Transaction<'_, Sqlite>, article_id: i64) -> Result<i64> {
    let row: (i64,) = sqlx::query_as(
        r#"
        UPDATE articles
        SET likes_count = (SELECT COUNT(*) FROM article_likes WHERE article_id = ?)
        WHERE id = ?
        RETURNING likes_count
        "#,
    )
    .bind(article_id)
    .bind(article_id)
    .fetch_optional(&mut **tx)
    .await
    .context("Failed to recount likes")?
    .ok_or_else(|| anyhow::anyhow!("Article not found"))?;

    Ok(row.0)
}
