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
use gazette_core::models::role::Role;
use gazette_core::models::user::User;
use sqlx::{SqliteExecutor, SqlitePool};

use crate::datetime::{format_datetime, parse_datetime};
use crate::errors::map_write_error;

const USER_COLUMNS: &str = "id, email, username, display_name, password_hash, role, is_active, email_verified, created_at, updated_at";

type UserRow = (
    i64,
    String,
    String,
    Option<String>,
    String,
    String,
    bool,
    bool,
    String,
    String,
);

fn user_from_row(row: UserRow) -> Result<User> {
    let (
        id,
        email,
        username,
        display_name,
        password_hash,
        role,
        is_active,
        email_verified,
        created_at,
        updated_at,
    ) = row;

    Ok(User {
        id: Some(id),
        email,
        username,
        display_name,
        password_hash,
        role: role.parse::<Role>().map_err(anyhow::Error::msg)?,
        is_active,
        email_verified,
        created_at: parse_datetime(&created_at, "created_at")?,
        updated_at: parse_datetime(&updated_at, "updated_at")?,
    })
}

/// Insert on any executor so registration can share a transaction
pub(crate) async fn insert_user<'e, E>(executor: E, user: &User) -> Result<i64>
where
    E: SqliteExecutor<'e>,
{
    if let Err(e) = user.is_valid() {
        return Err(anyhow::anyhow!("Invalid user: {}", e));
    }

    let result = sqlx::query(
        r#"
        INSERT INTO users (email, username, display_name, password_hash, role, is_active, email_verified, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&user.email)
    .bind(&user.username)
    .bind(&user.display_name)
    .bind(&user.password_hash)
    .bind(user.role.as_str())
    .bind(user.is_active)
    .bind(user.email_verified)
    .bind(format_datetime(user.created_at))
    .bind(format_datetime(user.updated_at))
    .execute(executor)
    .await
    .map_err(|e| map_write_error(e, "Email or username already exists", "Failed to create user"))?;

    Ok(result.last_insert_rowid())
}

pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, user: &User) -> Result<i64> {
        insert_user(&self.pool, user).await
    }

    async fn find_one(&self, condition: &str, value: &str, what: &'static str) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE {}", USER_COLUMNS, condition);
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .context(what)?;

        row.map(user_from_row).transpose()
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS);
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to find user by id")?;

        row.map(user_from_row).transpose()
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        self.find_one("email = ?", email, "Failed to find user by email")
            .await
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        self.find_one("username = ?", username, "Failed to find user by username")
            .await
    }

    /// Look a user up by username, falling back to email
    pub async fn find_by_login(&self, login: &str) -> Result<Option<User>> {
        if let Some(user) = self.find_by_username(login).await? {
            return Ok(Some(user));
        }
        self.find_by_email(login).await
    }

    pub async fn exists_by_email_or_username(&self, email: &str, username: &str) -> Result<bool> {
        let count: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM users WHERE email = ? OR username = ?")
                .bind(email)
                .bind(username)
                .fetch_one(&self.pool)
                .await
                .context("Failed to check for existing user")?;

        Ok(count.0 > 0)
    }

    pub async fn update(&self, user: &User) -> Result<()> {
        let id = user
            .id
            .ok_or_else(|| anyhow::anyhow!("Cannot update user without id"))?;

        if let Err(e) = user.is_valid() {
            return Err(anyhow::anyhow!("Invalid user: {}", e));
        }

        let rows_affected = sqlx::query(
            r#"
            UPDATE users
            SET email = ?, username = ?, display_name = ?, password_hash = ?, role = ?,
                is_active = ?, email_verified = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&user.email)
        .bind(&user.username)
        .bind(&user.display_name)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(user.is_active)
        .bind(user.email_verified)
        .bind(format_datetime(Utc::now()))
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "Email or username already exists", "Failed to update user"))?
        .rows_affected();

        if rows_affected == 0 {
            return Err(anyhow::anyhow!("User not found"));
        }

        Ok(())
    }

    async fn set_column<T>(&self, id: i64, column: &str, value: T, what: &'static str) -> Result<()>
    where
        T: for<'q> sqlx::Encode<'q, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite> + Send + 'static,
    {
        let sql = format!("UPDATE users SET {} = ?, updated_at = ? WHERE id = ?", column);
        let rows_affected = sqlx::query(&sql)
            .bind(value)
            .bind(format_datetime(Utc::now()))
            .bind(id)
            .execute(&self.pool)
            .await
            .context(what)?
            .rows_affected();

        if rows_affected == 0 {
            return Err(anyhow::anyhow!("User not found"));
        }

        Ok(())
    }

    pub async fn set_role(&self, id: i64, role: Role) -> Result<()> {
        self.set_column(id, "role", role.as_str().to_string(), "Failed to set user role")
            .await
    }

    pub async fn set_password(&self, id: i64, password: &str) -> Result<()> {
        let hash = User::hash_password(password)?;
        self.set_column(id, "password_hash", hash, "Failed to set user password")
            .await
    }

    pub async fn set_display_name(&self, id: i64, display_name: Option<&str>) -> Result<()> {
        let value = display_name
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string);
        self.set_column(id, "display_name", value, "Failed to set display name")
            .await
    }

    pub async fn mark_email_verified(&self, id: i64) -> Result<()> {
        self.set_column(id, "email_verified", true, "Failed to mark email verified")
            .await
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        let rows_affected = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete user")?
            .rows_affected();

        if rows_affected == 0 {
            return Err(anyhow::anyhow!("User not found"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::is_conflict;
    use crate::init::memory_pool;

    fn new_user(email: &str, username: &str) -> User {
        User::new(
            email.to_string(),
            username.to_string(),
            "password123",
            Role::Reader,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_create_and_find_by_id() -> Result<()> {
        let repo = UserRepository::new(memory_pool().await?);

        let id = repo.create(&new_user("test@example.com", "testuser")).await?;
        assert!(id > 0);

        let found = repo.find_by_id(id).await?.unwrap();
        assert_eq!(found.id, Some(id));
        assert_eq!(found.email, "test@example.com");
        assert_eq!(found.role, Role::Reader);
        assert!(found.is_active);
        assert!(!found.email_verified);
        assert!(found.verify_password("password123")?);

        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_email_is_conflict() -> Result<()> {
        let repo = UserRepository::new(memory_pool().await?);

        repo.create(&new_user("test@example.com", "user1")).await?;
        let err = repo
            .create(&new_user("test@example.com", "user2"))
            .await
            .unwrap_err();

        assert!(is_conflict(&err));
        assert_eq!(err.to_string(), "Email or username already exists");
        Ok(())
    }

    #[tokio::test]
    async fn test_find_by_email_and_username() -> Result<()> {
        let repo = UserRepository::new(memory_pool().await?);
        repo.create(&new_user("test@example.com", "testuser")).await?;

        assert!(repo.find_by_email("test@example.com").await?.is_some());
        assert!(repo.find_by_email("TEST@example.com").await?.is_none());
        assert!(repo.find_by_username("testuser").await?.is_some());
        assert!(repo.find_by_username("other").await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_find_by_login() -> Result<()> {
        let repo = UserRepository::new(memory_pool().await?);
        let id = repo.create(&new_user("test@example.com", "testuser")).await?;

        assert_eq!(repo.find_by_login("testuser").await?.unwrap().id, Some(id));
        assert_eq!(
            repo.find_by_login("test@example.com").await?.unwrap().id,
            Some(id)
        );
        assert!(repo.find_by_login("nobody").await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_exists_by_email_or_username() -> Result<()> {
        let repo = UserRepository::new(memory_pool().await?);
        repo.create(&new_user("test@example.com", "testuser")).await?;

        assert!(repo.exists_by_email_or_username("test@example.com", "x").await?);
        assert!(repo.exists_by_email_or_username("x@example.com", "testuser").await?);
        assert!(!repo.exists_by_email_or_username("x@example.com", "x").await?);
        Ok(())
    }

    #[tokio::test]
    async fn test_setters() -> Result<()> {
        let repo = UserRepository::new(memory_pool().await?);
        let id = repo.create(&new_user("test@example.com", "testuser")).await?;

        repo.set_role(id, Role::Writer).await?;
        repo.set_password(id, "changed").await?;
        repo.set_display_name(id, Some("  Test Writer ")).await?;
        repo.mark_email_verified(id).await?;

        let user = repo.find_by_id(id).await?.unwrap();
        assert_eq!(user.role, Role::Writer);
        assert!(user.verify_password("changed")?);
        assert_eq!(user.display_name.as_deref(), Some("Test Writer"));
        assert!(user.email_verified);

        repo.set_display_name(id, Some("   ")).await?;
        assert!(repo.find_by_id(id).await?.unwrap().display_name.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_setters_on_missing_user() -> Result<()> {
        let repo = UserRepository::new(memory_pool().await?);

        let err = repo.set_role(999, Role::Admin).await.unwrap_err();
        assert!(err.to_string().contains("User not found"));
        Ok(())
    }

    #[tokio::test]
    async fn test_update() -> Result<()> {
        let repo = UserRepository::new(memory_pool().await?);
        let id = repo.create(&new_user("test@example.com", "testuser")).await?;

        let mut user = repo.find_by_id(id).await?.unwrap();
        user.username = "renamed".to_string();
        user.is_active = false;
        repo.update(&user).await?;

        let user = repo.find_by_id(id).await?.unwrap();
        assert_eq!(user.username, "renamed");
        assert!(!user.is_active);

        let mut orphan = new_user("x@example.com", "orphan");
        assert!(repo.update(&orphan).await.is_err());
        orphan.id = Some(999);
        assert!(repo.update(&orphan).await.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_cascades_sessions() -> Result<()> {
        let pool = memory_pool().await?;
        let repo = UserRepository::new(pool.clone());
        let id = repo.create(&new_user("test@example.com", "testuser")).await?;

        sqlx::query("INSERT INTO sessions (id, user_id, expires_at, created_at) VALUES (?, ?, ?, ?)")
            .bind("test-session-id")
            .bind(id)
            .bind("2030-01-01 00:00:00")
            .bind("2025-01-01 00:00:00")
            .execute(&pool)
            .await?;

        repo.delete(id).await?;

        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM sessions WHERE user_id = ?")
            .bind(id)
            .fetch_one(&pool)
            .await?;
        assert_eq!(count.0, 0);

        assert!(repo
            .delete(id)
            .await
            .unwrap_err()
            .to_string()
            .contains("User not found"));
        Ok(())
    }
}
