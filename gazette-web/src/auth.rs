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
    extract::{FromRef, FromRequestParts},
    http::{request::Parts, HeaderMap},
};
use axum_extra::{
    extract::CookieJar,
    headers::{authorization::Bearer, Authorization, HeaderMapExt},
};
use gazette_core::{Role, Session, User};
use gazette_db::{SessionRepository, UserRepository};
use sqlx::SqlitePool;

use crate::error::AppError;

pub const SESSION_COOKIE: &str = "session_id";
pub const AUTH_REQUIRED: &str = "Unauthorized: Authentication required to access this route";
pub const ROLE_DENIED: &str = "Unauthorized: User does not have the required role";

/// Current authenticated user, extracted from request
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: User,
    pub session: Session,
}

impl CurrentUser {
    pub fn user_id(&self) -> i64 {
        self.user.id.unwrap_or_default()
    }

    pub fn role(&self) -> Role {
        self.user.role
    }
}

impl<S> FromRequestParts<S> for CurrentUser
where
    SqlitePool: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session_id = session_id_from_headers(&parts.headers)
            .ok_or_else(|| AppError::unauthorized(AUTH_REQUIRED))?;

        let pool = SqlitePool::from_ref(state);
        authenticate_session(&pool, &session_id).await
    }
}

/// Resolve a session id to its user, checking expiry and account state
pub async fn authenticate_session(
    pool: &SqlitePool,
    session_id: &str,
) -> Result<CurrentUser, AppError> {
    let session = SessionRepository::new(pool.clone())
        .find_by_id(session_id)
        .await?
        .ok_or_else(|| AppError::unauthorized("Invalid session"))?;

    if session.is_expired() {
        return Err(AppError::unauthorized("Session expired"));
    }

    let user = UserRepository::new(pool.clone())
        .find_by_id(session.user_id)
        .await?
        .ok_or_else(|| AppError::unauthorized("User not found"))?;

    if !user.is_active {
        return Err(AppError::forbidden("Account disabled"));
    }

    Ok(CurrentUser { user, session })
}

/// Optional authenticated user
#[derive(Debug, Clone)]
pub struct OptionalUser(pub Option<CurrentUser>);

impl<S> FromRequestParts<S> for OptionalUser
where
    SqlitePool: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match CurrentUser::from_request_parts(parts, state).await {
            Ok(user) => Ok(OptionalUser(Some(user))),
            Err(e) if e.status.is_client_error() => Ok(OptionalUser(None)),
            Err(e) => Err(e),
        }
    }
}

/// Session id from the `session_id` cookie, or else a bearer token
pub fn session_id_from_headers(headers: &HeaderMap) -> Option<String> {
    let cookies = CookieJar::from_headers(headers);
    if let Some(session_cookie) = cookies.get(SESSION_COOKIE) {
        if !session_cookie.value().is_empty() {
            return Some(session_cookie.value().to_string());
        }
    }

    headers
        .typed_get::<Authorization<Bearer>>()
        .map(|auth| auth.token().to_string())
}

/// Reject users whose role is not in `allowed`
pub fn require_role(current: &CurrentUser, allowed: &[Role]) -> Result<(), AppError> {
    if allowed.contains(&current.user.role) {
        Ok(())
    } else {
        tracing::debug!(
            user = %current.user.username,
            role = %current.user.role,
            "Role guard rejected request"
        );
        Err(AppError::forbidden(ROLE_DENIED))
    }
}

/// Require a writer or admin
#[derive(Debug, Clone)]
pub struct RequireWriter(pub CurrentUser);

impl<S> FromRequestParts<S> for RequireWriter
where
    SqlitePool: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let current = CurrentUser::from_request_parts(parts, state).await?;
        require_role(&current, &[Role::Writer, Role::Admin])?;
        Ok(RequireWriter(current))
    }
}

/// Require admin user
#[derive(Debug, Clone)]
pub struct RequireAdmin(pub CurrentUser);

impl<S> FromRequestParts<S> for RequireAdmin
where
    SqlitePool: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let current = CurrentUser::from_request_parts(parts, state).await?;
        require_role(&current, &[Role::Admin])?;
        Ok(RequireAdmin(current))
    }
}
