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


#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use axum::http::{header, HeaderName, HeaderValue};
use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use gazette_db::memory_pool;
use gazette_web::mailer::Mailer;
use gazette_web::storage::LocalObjectStore;
use gazette_web::{routes, AppState, Configuration};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

pub const WRITER_DOMAIN: &str = "newsroom.example";
pub const ADMIN_DOMAIN: &str = "admin.example";
pub const PASSWORD: &str = "secret1";

/// Captures verification mails instead of sending them
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<SentMail>>,
}

#[derive(Debug, Clone)]
pub struct SentMail {
    pub email: String,
    pub link: String,
    pub code: String,
}

impl SentMail {
    pub fn token(&self) -> String {
        self.link
            .split("token=")
            .nth(1)
            .unwrap_or_default()
            .to_string()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send_verification(&self, email: &str, link: &str, code: &str) -> Result<()> {
        self.sent.lock().unwrap().push(SentMail {
            email: email.to_string(),
            link: link.to_string(),
            code: code.to_string(),
        });
        Ok(())
    }
}

pub struct TestApp {
    pub server: TestServer,
    pub state: AppState,
    pub mailer: Arc<RecordingMailer>,
    pub storage: TempDir,
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(|_| {}).await
}

pub async fn spawn_app_with(customize: impl FnOnce(&mut Configuration)) -> TestApp {
    let storage = TempDir::new().unwrap();

    let mut config = Configuration::defaults().unwrap();
    config.storage.root = storage.path().to_string_lossy().into_owned();
    config.storage.secret = "integration-secret".to_string();
    config.session.secure_cookies = false;
    config.rate_limit.login_attempts_per_minute = 1000;
    config.roles.writer_email_domain = Some(WRITER_DOMAIN.to_string());
    config.roles.admin_email_domain = Some(ADMIN_DOMAIN.to_string());
    customize(&mut config);

    let store = LocalObjectStore::new(
        storage.path(),
        &config.storage.public_url,
        &config.mail.base_url,
        &config.storage.secret,
        config.storage.presign_expiry_seconds,
    );
    let mailer = Arc::new(RecordingMailer::default());
    let pool = memory_pool().await.unwrap();
    let state = AppState::new(pool, config, Arc::new(store), mailer.clone());

    let server = TestServer::new(routes::create_router(state.clone())).unwrap();
    TestApp {
        server,
        state,
        mailer,
        storage,
    }
}

pub fn bearer(token: &str) -> (HeaderName, HeaderValue) {
    (
        header::AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
    )
}

impl TestApp {
    /// Register through the API and return the session token
    pub async fn register(&self, username: &str, domain: &str) -> String {
        let response = self
            .server
            .post("/auth/register/local")
            .json(&json!({
                "email": format!("{}@{}", username, domain),
                "username": username,
                "password": PASSWORD,
                "confirmPassword": PASSWORD,
            }))
            .await;
        response.assert_status_ok();
        response.json::<Value>()["token"]
            .as_str()
            .unwrap()
            .to_string()
    }

    pub async fn reader(&self, username: &str) -> String {
        self.register(username, "example.org").await
    }

    pub async fn writer(&self, username: &str) -> String {
        self.register(username, WRITER_DOMAIN).await
    }

    pub async fn admin(&self, username: &str) -> String {
        self.register(username, ADMIN_DOMAIN).await
    }

    pub fn last_mail(&self) -> SentMail {
        self.mailer.sent.lock().unwrap().last().cloned().unwrap()
    }
}

pub fn png_bytes() -> Vec<u8> {
    let mut data = vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
    data.extend_from_slice(&[0; 24]);
    data
}

pub fn article_form(title: &str, meta_title: &str, category: &str) -> MultipartForm {
    MultipartForm::new()
        .add_text("title", title.to_string())
        .add_text("metaTitle", meta_title.to_string())
        .add_text("category", category.to_string())
        .add_text("summary", "A short summary")
        .add_text("articleBody", format!("<p>Body of {}</p>", title))
        .add_text("position", "3")
}

pub fn image_part(file_name: &str, mime: &str) -> Part {
    Part::bytes(png_bytes())
        .file_name(file_name.to_string())
        .mime_type(mime.to_string())
}

/// Create an article as `token` and return the response body
pub async fn create_article(app: &TestApp, token: &str, title: &str, meta_title: &str) -> Value {
    let (name, value) = bearer(token);
    let response = app
        .server
        .post("/api/articles")
        .add_header(name, value)
        .multipart(article_form(title, meta_title, "Finance"))
        .await;
    response.assert_status(axum::http::StatusCode::CREATED);
    response.json::<Value>()
}
