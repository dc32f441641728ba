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


//! Named register and login methods
//!
//! `POST /auth/register/{method}` and `POST /auth/login/{method}` look the
//! method up here. Only `local` (email/username plus password) ships.

use async_trait::async_trait;
use gazette_core::{check_email_structure, EmailVerificationToken, Registration, User};
use gazette_db::{EmailVerificationRepository, UserRepository};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{AppError, AppResult};
use crate::AppState;

/// A newly created account and the token its owner must confirm
#[derive(Debug, Clone)]
pub struct Registered {
    pub user: User,
    pub verification: Option<EmailVerificationToken>,
}

#[async_trait]
pub trait RegisterMethod: Send + Sync {
    async fn register(&self, state: &AppState, body: Value) -> AppResult<Registered>;
}

#[async_trait]
pub trait LoginMethod: Send + Sync {
    /// Check the credentials in `body` and return the matching user
    async fn authenticate(&self, state: &AppState, body: Value) -> AppResult<User>;
}

/// Registry for authentication methods
pub struct AuthMethodRegistry {
    register: HashMap<String, Arc<dyn RegisterMethod>>,
    login: HashMap<String, Arc<dyn LoginMethod>>,
}

impl AuthMethodRegistry {
    pub fn new() -> Self {
        Self {
            register: HashMap::new(),
            login: HashMap::new(),
        }
    }

    pub fn add_register_method(&mut self, name: &str, method: Arc<dyn RegisterMethod>) {
        self.register.insert(name.to_string(), method);
    }

    pub fn add_login_method(&mut self, name: &str, method: Arc<dyn LoginMethod>) {
        self.login.insert(name.to_string(), method);
    }

    pub fn register_method(&self, name: &str) -> AppResult<Arc<dyn RegisterMethod>> {
        self.register.get(name).cloned().ok_or_else(|| {
            AppError::method_not_allowed(format!("Register method {} is not supported", name))
        })
    }

    pub fn login_method(&self, name: &str) -> AppResult<Arc<dyn LoginMethod>> {
        self.login.get(name).cloned().ok_or_else(|| {
            AppError::method_not_allowed(format!(
                "Authentication method {} is not supported",
                name
            ))
        })
    }

    /// Build the default registry
    pub fn build_default() -> Self {
        let mut registry = Self::new();
        registry.add_register_method("local", Arc::new(LocalRegister));
        registry.add_login_method("local", Arc::new(LocalLogin));
        registry
    }
}

impl Default for AuthMethodRegistry {
    fn default() -> Self {
        Self::build_default()
    }
}

fn parse_body<T: for<'de> Deserialize<'de>>(body: Value) -> AppResult<T> {
    serde_json::from_value(body)
        .map_err(|e| AppError::bad_request("Invalid request body").with_details(e.to_string()))
}

/// Email, username and password sign-up
pub struct LocalRegister;

#[async_trait]
impl RegisterMethod for LocalRegister {
    async fn register(&self, state: &AppState, body: Value) -> AppResult<Registered> {
        let registration: Registration = parse_body(body)?;
        registration.validate().map_err(AppError::bad_request)?;

        let email = registration.email.trim().to_string();
        let username = registration.username.trim().to_string();

        let users = UserRepository::new(state.db.clone());
        if users.exists_by_email_or_username(&email, &username).await? {
            return Err(AppError::bad_request("Email or username already exists"));
        }

        check_email_structure(&email).map_err(AppError::bad_request)?;

        let role = state.config.roles.role_for_email(&email);
        let mut user = User::new(email, username, &registration.password, role)
            .map_err(|e| AppError::bad_request(e.to_string()))?;

        let (user_id, token) = EmailVerificationRepository::new(state.db.clone())
            .create_with_user(&user)
            .await?;
        user.id = Some(user_id);

        tracing::info!(user_id, username = %user.username, role = %user.role, "User registered");
        Ok(Registered {
            user,
            verification: Some(token),
        })
    }
}

#[derive(Debug, Deserialize)]
struct LocalCredentials {
    #[serde(default, alias = "email", alias = "identifier")]
    username: String,
    #[serde(default)]
    password: String,
}

/// Password check against the username or the email
pub struct LocalLogin;

#[async_trait]
impl LoginMethod for LocalLogin {
    async fn authenticate(&self, state: &AppState, body: Value) -> AppResult<User> {
        let credentials: LocalCredentials = parse_body(body)?;
        let login = credentials.username.trim();

        if login.is_empty() || credentials.password.is_empty() {
            return Err(AppError::bad_request("Identifier and password are required."));
        }

        let invalid = || AppError::unauthorized("Invalid email or username and password.");

        let user = UserRepository::new(state.db.clone())
            .find_by_login(login)
            .await?
            .ok_or_else(invalid)?;

        if !user.verify_password(&credentials.password)? {
            tracing::debug!(login = %login, "Password mismatch");
            return Err(invalid());
        }

        if !user.is_active {
            return Err(AppError::forbidden("Account disabled"));
        }

        Ok(user)
    }
}
