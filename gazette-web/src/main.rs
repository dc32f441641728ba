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


use anyhow::Result;
use gazette_db::{init_database, EmailVerificationRepository, SessionRepository};
use gazette_web::{routes, AppState, Configuration};
use sqlx::SqlitePool;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const EXPIRY_SWEEP_INTERVAL: Duration = Duration::from_secs(3600);

/// Periodically purge expired sessions and verification tokens
fn spawn_expiry_sweeper(db: SqlitePool) {
    tokio::spawn(async move {
        let sessions = SessionRepository::new(db.clone());
        let tokens = EmailVerificationRepository::new(db);
        let mut interval = tokio::time::interval(EXPIRY_SWEEP_INTERVAL);

        loop {
            interval.tick().await;
            match sessions.delete_expired().await {
                Ok(0) => {}
                Ok(n) => info!(count = n, "Purged expired sessions"),
                Err(e) => tracing::warn!(error = %e, "Failed to purge expired sessions"),
            }
            match tokens.delete_expired().await {
                Ok(0) => {}
                Ok(n) => info!(count = n, "Purged expired verification tokens"),
                Err(e) => tracing::warn!(error = %e, "Failed to purge verification tokens"),
            }
        }
    });
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gazette_web=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Configuration::load()?;
    info!("Starting Gazette web server");

    info!("Initializing database: {}", config.database_url);
    let db = init_database(&config.database_url).await?;

    info!("Object storage root: {}", config.storage.root);
    let bind_addr = config.bind_addr();
    let state = AppState::from_config(db.clone(), config)?;

    // Detached: the task lives as long as the server
    let _refresh = state.articles.spawn_scheduled_refresh();
    spawn_expiry_sweeper(db);

    let app = routes::create_router(state);

    let listener = TcpListener::bind(&bind_addr).await?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
