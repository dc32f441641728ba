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
    Json,
};
use gazette_db::UserRepository;
use serde_json::{json, Value};

use crate::error::{AppError, AppResult};
use crate::AppState;

/// GET /api/users/{id}
pub async fn public_profile(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Value>> {
    let user = UserRepository::new(state.db.clone())
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    let profile = user
        .public_profile()
        .ok_or_else(|| AppError::forbidden("User has no public profile"))?;

    Ok(Json(json!({
        "success": true,
        "message": "User fetched successfully",
        "user": profile,
    })))
}
