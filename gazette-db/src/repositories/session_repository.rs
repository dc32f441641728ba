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
use chrono::Utc;
use gazette_core::models::session::Session;
use sqlx::SqlitePool;

use crate::datetime::{format_datetime, parse_datetime};

type SessionRow = (String, i64, i64, String, String);

fn session_from_row(row: SessionRow) -> Result<Session> {
    let (id, user_id, views, expires_at, created_at) = row;

    Ok(Session {
        id,
        user_id,
        views,
        expires_at: parse_datetime(&expires_at, "expires_at")?,
        created_at: parse_datetime(&created_at, "created_at")?,
    })
}

pub struct SessionRepository {
    pool: SqlitePool,
}

impl SessionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, session: &Session) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO sessions (id, user_id, views, expires_at, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&session.id)
        .bind(session.user_id)
        .bind(session.views)
        .bind(format_datetime(session.expires_at))
        .bind(format_datetime(session.created_at))
        .execute(&self.pool)
        .await
        .context("Failed to create session")?;

        Ok(())
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<Session>> {
        let row = sqlx::query_as::<_, SessionRow>(
            r#"
            SELECT id, user_id, views, expires_at, created_at
            FROM sessions
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to find session by id")?;

        row.map(session_from_row).transpose()
    }

    /// Bump the view counter and return the new value
    pub async fn increment_views(&self, id: &str) -> Result<i64> {
        let row: Option<(i64,)> =
            sqlx::query_as("UPDATE sessions SET views = views + 1 WHERE id = ? RETURNING views")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .context("Failed to increment session views")?;

        row.map(|(views,)| views)
            .ok_or_else(|| anyhow::anyhow!("Session not found"))
    }

    pub async fn delete_expired(&self) -> Result<u64> {
        let now = format_datetime(Utc::now());

        let result = sqlx::query("DELETE FROM sessions WHERE expires_at < ?")
            .bind(now)
            .execute(&self.pool)
            .await
            .context("Failed to delete expired sessions")?;

        Ok(result.rows_affected())
    }

    pub async fn delete_for_user(&self, user_id: i64) -> Result<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .context("Failed to delete user sessions")?;

        Ok(result.rows_affected())
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        let rows_affected = sqlx::query("DELETE FROM sessions WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete session")?
            .rows_affected();

        if rows_affected == 0 {
            return Err(anyhow::anyhow!("Session not found"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::init::memory_pool;
    use crate::repositories::UserRepository;
    use chrono::Duration;
    use gazette_core::models::{role::Role, user::User};

    async fn setup() -> Result<(SessionRepository, i64)> {
        let pool = memory_pool().await?;
        let user = User::new(
            "test@example.com".to_string(),
            "testuser".to_string(),
            "password123",
            Role::Reader,
        )?;
        let user_id = UserRepository::new(pool.clone()).create(&user).await?;
        Ok((SessionRepository::new(pool), user_id))
    }

    #[tokio::test]
    async fn test_create_and_find() -> Result<()> {
        let (repo, user_id) = setup().await?;
        let session = Session::new(user_id);
        repo.create(&session).await?;

        let found = repo.find_by_id(&session.id).await?.unwrap();
        assert_eq!(found.id, session.id);
        assert_eq!(found.user_id, user_id);
        assert_eq!(found.views, 0);
        assert_eq!(
            found.expires_at.timestamp_micros(),
            session.expires_at.timestamp_micros()
        );

        assert!(repo.find_by_id("missing").await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_create_for_missing_user_fails() -> Result<()> {
        let (repo, _) = setup().await?;
        assert!(repo.create(&Session::new(999)).await.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn test_increment_views() -> Result<()> {
        let (repo, user_id) = setup().await?;
        let session = Session::new(user_id);
        repo.create(&session).await?;

        assert_eq!(repo.increment_views(&session.id).await?, 1);
        assert_eq!(repo.increment_views(&session.id).await?, 2);
        assert_eq!(repo.find_by_id(&session.id).await?.unwrap().views, 2);

        assert!(repo.increment_views("missing").await.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_expired() -> Result<()> {
        let (repo, user_id) = setup().await?;
        let live = Session::new(user_id);
        let mut expired = Session::new(user_id);
        expired.expires_at = Utc::now() - Duration::hours(1);

        repo.create(&live).await?;
        repo.create(&expired).await?;

        assert_eq!(repo.delete_expired().await?, 1);
        assert!(repo.find_by_id(&live.id).await?.is_some());
        assert!(repo.find_by_id(&expired.id).await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_delete() -> Result<()> {
        let (repo, user_id) = setup().await?;
        let session = Session::new(user_id);
        repo.create(&session).await?;

        repo.delete(&session.id).await?;
        assert!(repo.find_by_id(&session.id).await?.is_none());
        assert!(repo
            .delete(&session.id)
            .await
            .unwrap_err()
            .to_string()
            .contains("Session not found"));
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_for_user() -> Result<()> {
        let (repo, user_id) = setup().await?;
        repo.create(&Session::new(user_id)).await?;
        repo.create(&Session::new(user_id)).await?;

        assert_eq!(repo.delete_for_user(user_id).await?, 2);
        assert_eq!(repo.delete_for_user(user_id).await?, 0);
        Ok(())
    }
}
