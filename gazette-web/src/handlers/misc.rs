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


use axum::{extract::State, response::Html, Json};
use gazette_db::SessionRepository;
use serde_json::{json, Value};

use crate::auth::CurrentUser;
use crate::error::AppResult;
use crate::AppState;

pub async fn index() -> Html<&'static str> {
    Html("<!doctype html><html><head><title>Gazette</title></head><body><h1>Hello, World!</h1></body></html>")
}

pub async fn health() -> &'static str {
    "OK"
}

/// GET /protected
pub async fn protected(current: CurrentUser) -> Json<Value> {
    Json(json!({
        "success": true,
        "message": "User authenticated with a session",
        "user": current.user,
    }))
}

/// GET /views
pub async fn views(State(state): State<AppState>, current: CurrentUser) -> AppResult<Json<Value>> {
    let views = SessionRepository::new(state.db.clone())
        .increment_views(&current.session.id)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": format!("You have visited this page {} times", views),
        "views": views,
    })))
}
