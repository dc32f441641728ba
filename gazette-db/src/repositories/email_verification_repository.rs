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
use chrono::{Duration, Utc};
use gazette_core::models::user::User;
use gazette_core::models::verification::{EmailVerificationToken, VERIFICATION_TTL_HOURS};
use sqlx::{SqliteExecutor, SqlitePool};

use super::user_repository::insert_user;
use crate::datetime::{format_datetime, parse_datetime};

async fn insert_token<'e, E>(executor: E, token: &EmailVerificationToken) -> Result<()>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query(
        r#"
        INSERT INTO email_verification_tokens (token, user_id, code, created_at)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(&token.token)
    .bind(token.user_id)
    .bind(&token.code)
    .bind(format_datetime(token.created_at))
    .execute(executor)
    .await
    .context("Failed to create email verification token")?;

    Ok(())
}

pub struct EmailVerificationRepository {
    pool: SqlitePool,
}

impl EmailVerificationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a new user and its verification token atomically
    pub async fn create_with_user(&self, user: &User) -> Result<(i64, EmailVerificationToken)> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin registration transaction")?;

        let user_id = insert_user(&mut *tx, user).await?;
        let token = EmailVerificationToken::new(user_id);
        insert_token(&mut *tx, &token).await?;

        tx.commit()
            .await
            .context("Failed to commit registration transaction")?;

        Ok((user_id, token))
    }

    pub async fn create(&self, token: &EmailVerificationToken) -> Result<()> {
        insert_token(&self.pool, token).await
    }

    pub async fn find_by_token(&self, token: &str) -> Result<Option<EmailVerificationToken>> {
        let row = sqlx::query_as::<_, (String, i64, String, String)>(
            r#"
            SELECT token, user_id, code, created_at
            FROM email_verification_tokens
            WHERE token = ?
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to find email verification token")?;

        match row {
            Some((token, user_id, code, created_at)) => Ok(Some(EmailVerificationToken {
                user_id,
                token,
                code,
                created_at: parse_datetime(&created_at, "created_at")?,
            })),
            None => Ok(None),
        }
    }

    pub async fn delete(&self, token: &str) -> Result<()> {
        sqlx::query("DELETE FROM email_verification_tokens WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await
            .context("Failed to delete email verification token")?;

        Ok(())
    }

    pub async fn delete_expired(&self) -> Result<u64> {
        let cutoff = format_datetime(Utc::now() - Duration::hours(VERIFICATION_TTL_HOURS));

        let result = sqlx::query("DELETE FROM email_verification_tokens WHERE created_at < ?")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .context("Failed to delete expired verification tokens")?;

        Ok(result.rows_affected())
    }
}
