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
    extract::{Path, Query, State},
    http::HeaderMap,
    response::IntoResponse,
    Json,
};
use axum_extra::extract::{
    cookie::{Cookie, SameSite},
    CookieJar,
};
use chrono::Duration;
use gazette_core::{Session, User};
use gazette_db::{EmailVerificationRepository, SessionRepository, UserRepository};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::{session_id_from_headers, CurrentUser, OptionalUser, SESSION_COOKIE};
use crate::configuration::SessionConfig;
use crate::error::{AppError, AppResult};
use crate::mailer::verification_link;
use crate::AppState;

/// Build the HTTP-only session cookie
pub fn session_cookie(session_id: String, config: &SessionConfig) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, session_id))
        .path("/")
        .http_only(true)
        .secure(config.secure_cookies)
        .same_site(SameSite::Lax)
        .max_age(cookie::time::Duration::minutes(config.timeout_minutes))
        .build()
}

fn removal_cookie() -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, "")).path("/").build()
}

async fn start_session(state: &AppState, user: &User) -> AppResult<Session> {
    let user_id = user
        .id
        .ok_or_else(|| AppError::internal_server_error("User has no id"))?;

    let session = Session::new_with_expiry(
        user_id,
        Duration::minutes(state.config.session.timeout_minutes),
    );
    SessionRepository::new(state.db.clone())
        .create(&session)
        .await?;

    Ok(session)
}

/// POST /auth/register/{method}
pub async fn register(
    State(state): State<AppState>,
    Path(method): Path<String>,
    jar: CookieJar,
    Json(body): Json<Value>,
) -> AppResult<impl IntoResponse> {
    let register_method = state.auth_methods.register_method(&method)?;
    let registered = register_method.register(&state, body).await?;

    if let Some(token) = &registered.verification {
        let link = verification_link(&state.config.mail.base_url, &token.token);
        // The account is committed, a delivery failure must not undo the sign-up
        if let Err(e) = state
            .mailer
            .send_verification(&registered.user.email, &link, &token.code)
            .await
        {
            tracing::error!(error = ?e, email = %registered.user.email, "Failed to send verification email");
        }
    }

    let session = start_session(&state, &registered.user).await?;
    let jar = jar.add(session_cookie(session.id.clone(), &state.config.session));

    Ok((
        jar,
        Json(json!({
            "success": true,
            "message": "Register successful",
            "user": registered.user,
            "token": session.id,
        })),
    ))
}

/// POST /auth/login/{method}
pub async fn login(
    State(state): State<AppState>,
    Path(method): Path<String>,
    headers: HeaderMap,
    jar: CookieJar,
    Json(body): Json<Value>,
) -> AppResult<impl IntoResponse> {
    let login_method = state.auth_methods.login_method(&method)?;
    let user = login_method.authenticate(&state, body).await?;

    let sessions = SessionRepository::new(state.db.clone());

    // Regenerate: the session presented with the login request is dropped
    if let Some(previous) = session_id_from_headers(&headers) {
        if let Err(e) = sessions.delete(&previous).await {
            tracing::debug!(error = %e, "No previous session to drop");
        }
    }

    let session = start_session(&state, &user).await?;
    tracing::info!(user_id = ?user.id, username = %user.username, "User logged in");

    let jar = jar.add(session_cookie(session.id.clone(), &state.config.session));
    Ok((
        jar,
        Json(json!({
            "success": true,
            "message": "Login successful",
            "user": user,
            "token": session.id,
        })),
    ))
}

/// DELETE /auth/logout
pub async fn logout(
    State(state): State<AppState>,
    current: CurrentUser,
    jar: CookieJar,
) -> AppResult<impl IntoResponse> {
    SessionRepository::new(state.db.clone())
        .delete(&current.session.id)
        .await?;

    Ok((
        jar.remove(removal_cookie()),
        Json(json!({ "success": true, "message": "Logout successful" })),
    ))
}

#[derive(Debug, Deserialize)]
pub struct VerifyQuery {
    pub token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct VerifyBody {
    #[serde(default)]
    pub code: Value,
}

impl VerifyBody {
    fn code(&self) -> String {
        match &self.code {
            Value::String(code) => code.clone(),
            Value::Number(code) => code.to_string(),
            _ => String::new(),
        }
    }
}

/// POST /auth/verify?token=
pub async fn verify_email(
    State(state): State<AppState>,
    Query(query): Query<VerifyQuery>,
    Json(body): Json<VerifyBody>,
) -> AppResult<Json<Value>> {
    let not_found = || AppError::not_found("Invalid token or token doesn't exist");

    let token_value = query.token.ok_or_else(not_found)?;
    let tokens = EmailVerificationRepository::new(state.db.clone());
    let token = tokens.find_by_token(&token_value).await?.ok_or_else(not_found)?;

    if token.is_expired() {
        tokens.delete(&token.token).await?;
        return Err(not_found());
    }

    if !token.code_matches(&body.code()) {
        return Err(AppError::bad_request("Invalid code"));
    }

    UserRepository::new(state.db.clone())
        .mark_email_verified(token.user_id)
        .await?;
    tokens.delete(&token.token).await?;

    tracing::info!(user_id = token.user_id, "Email verified");
    Ok(Json(json!({
        "success": true,
        "message": "Email validation successful",
    })))
}

/// GET /auth/check-session
pub async fn check_session(OptionalUser(current): OptionalUser) -> AppResult<Json<Value>> {
    let current = current.ok_or_else(|| AppError::unauthorized("No active session"))?;

    Ok(Json(json!({
        "success": true,
        "message": "Session is active",
        "user": current.user,
    })))
}
