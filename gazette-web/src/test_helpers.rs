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


//! Shared fixtures for unit tests

use crate::{AppState, Configuration};
use gazette_core::{Role, Session, User};
use gazette_db::{memory_pool, SessionRepository, UserRepository};
use std::path::Path;
use tempfile::TempDir;

/// Default configuration pointed at `storage_root`, with a login limit tests never reach
pub fn test_config(storage_root: &Path) -> Configuration {
    let mut config = Configuration::defaults().expect("default configuration");
    config.storage.root = storage_root.to_string_lossy().into_owned();
    config.storage.secret = "test-secret".to_string();
    config.session.secure_cookies = false;
    config.rate_limit.login_attempts_per_minute = 1000;
    config
}

/// State over an in-memory database. Keep the directory alive as long as the state.
pub async fn create_test_app_state() -> anyhow::Result<(AppState, TempDir)> {
    let dir = TempDir::new()?;
    let pool = memory_pool().await?;
    let state = AppState::from_config(pool, test_config(dir.path()))?;
    Ok((state, dir))
}

pub async fn create_test_user(state: &AppState, username: &str, role: Role) -> anyhow::Result<User> {
    let mut user = User::new(
        format!("{}@example.com", username),
        username.to_string(),
        "password123",
        role,
    )?;
    user.id = Some(UserRepository::new(state.db.clone()).create(&user).await?);
    Ok(user)
}

pub async fn create_test_session(state: &AppState, user: &User) -> anyhow::Result<Session> {
    let user_id = user.id.ok_or_else(|| anyhow::anyhow!("user has no id"))?;
    let session = Session::new(user_id);
    SessionRepository::new(state.db.clone()).create(&session).await?;
    Ok(session)
}
