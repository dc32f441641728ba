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
use axum::extract::FromRef;
use gazette_db::ArticleRepository;
use sqlx::SqlitePool;
use std::sync::Arc;

use crate::article_cache::{ArticleCache, CacheSettings};
use crate::auth_methods::AuthMethodRegistry;
use crate::configuration::Configuration;
use crate::mailer::{LogMailer, Mailer};
use crate::rate_limit::{create_login_rate_limiter, SharedRateLimiter};
use crate::storage::{LocalObjectStore, ObjectStore};

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Arc<Configuration>,
    pub articles: ArticleCache,
    pub store: Arc<dyn ObjectStore>,
    pub mailer: Arc<dyn Mailer>,
    pub login_rate_limiter: SharedRateLimiter,
    pub auth_methods: Arc<AuthMethodRegistry>,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        config: Configuration,
        store: Arc<dyn ObjectStore>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        let articles = ArticleCache::new(
            Arc::new(ArticleRepository::new(db.clone())),
            CacheSettings::from(&config.cache),
        );
        let login_rate_limiter =
            create_login_rate_limiter(config.rate_limit.login_attempts_per_minute);

        Self {
            db,
            config: Arc::new(config),
            articles,
            store,
            mailer,
            login_rate_limiter,
            auth_methods: Arc::new(AuthMethodRegistry::build_default()),
        }
    }

    /// State with the filesystem object store and the logging mailer
    pub fn from_config(db: SqlitePool, config: Configuration) -> Result<Self> {
        std::fs::create_dir_all(&config.storage.root).with_context(|| {
            format!("Failed to create storage root {}", config.storage.root)
        })?;

        let store = LocalObjectStore::new(
            &config.storage.root,
            &config.storage.public_url,
            &config.mail.base_url,
            &config.storage.secret,
            config.storage.presign_expiry_seconds,
        );
        let mailer = LogMailer::new(config.mail.sender.clone());

        Ok(Self::new(db, config, Arc::new(store), Arc::new(mailer)))
    }
}

impl FromRef<AppState> for SqlitePool {
    fn from_ref(state: &AppState) -> Self {
        state.db.clone()
    }
}

impl FromRef<AppState> for SharedRateLimiter {
    fn from_ref(state: &AppState) -> Self {
        state.login_rate_limiter.clone()
    }
}
