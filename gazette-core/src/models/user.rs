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
use argon2::{
    password_hash::{PasswordHasher, SaltString},
    Argon2,
};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::role::Role;

static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9]([a-zA-Z0-9._%+-]*[a-zA-Z0-9])?@[a-zA-Z0-9]([a-zA-Z0-9.-]*[a-zA-Z0-9])?\.[a-zA-Z]{2,}$")
        .expect("Failed to compile email regex")
});

pub const USERNAME_MIN_LEN: usize = 3;
pub const USERNAME_MAX_LEN: usize = 30;
pub const PASSWORD_MIN_LEN: usize = 3;
pub const PASSWORD_MAX_LEN: usize = 30;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Option<i64>,
    pub email: String,
    pub username: String,
    pub display_name: Option<String>,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub role: Role,
    pub is_active: bool,
    pub email_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new user with a hashed password
    pub fn new(email: String, username: String, password: &str, role: Role) -> Result<Self> {
        Self::validate_email(&email).map_err(|e| anyhow::anyhow!("Invalid email: {}", e))?;
        Self::validate_username(&username)
            .map_err(|e| anyhow::anyhow!("Invalid username: {}", e))?;

        let password_hash = Self::hash_password(password)?;
        let now = Utc::now();

        Ok(Self {
            id: None,
            email,
            username,
            display_name: None,
            password_hash,
            role,
            is_active: true,
            email_verified: false,
            created_at: now,
            updated_at: now,
        })
    }

    /// Hash a password using Argon2
    pub fn hash_password(password: &str) -> Result<String> {
        use argon2::password_hash::rand_core::OsRng;

        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();
        let password_hash = argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?
            .to_string();
        Ok(password_hash)
    }

    /// Set a new password for the user
    pub fn set_password(&mut self, password: &str) -> Result<()> {
        self.password_hash = Self::hash_password(password)?;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Verify a password against the stored hash
    pub fn verify_password(&self, password: &str) -> Result<bool> {
        use argon2::password_hash::{PasswordHash, PasswordVerifier};

        let parsed_hash = PasswordHash::new(&self.password_hash)
            .map_err(|e| anyhow::anyhow!("Invalid password hash format: {}", e))?;

        match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
            Ok(()) => Ok(true),
            Err(_) => Ok(false),
        }
    }

    /// Validate email format
    pub fn validate_email(email: &str) -> Result<(), String> {
        if email.is_empty() {
            return Err("Email is required".to_string());
        }

        if email.len() > 255 {
            return Err("Email cannot exceed 255 characters".to_string());
        }

        if !EMAIL_REGEX.is_match(email) {
            return Err("Invalid email format".to_string());
        }

        Ok(())
    }

    /// Validate username format
    pub fn validate_username(username: &str) -> Result<(), String> {
        let len = username.chars().count();

        if len == 0 {
            return Err("Username is required".to_string());
        }

        if len < USERNAME_MIN_LEN {
            return Err(format!(
                "Username must be at least {} characters long",
                USERNAME_MIN_LEN
            ));
        }

        if len > USERNAME_MAX_LEN {
            return Err(format!(
                "Username must be at most {} characters long",
                USERNAME_MAX_LEN
            ));
        }

        // An '@' would make usernames ambiguous with emails at login
        if username.contains('@') {
            return Err("Username must not contain @ characters".to_string());
        }

        Ok(())
    }

    pub fn validate_password(password: &str) -> Result<(), String> {
        let len = password.chars().count();

        if len == 0 {
            return Err("Password is required".to_string());
        }

        if len < PASSWORD_MIN_LEN {
            return Err(format!(
                "Password must be at least {} characters long",
                PASSWORD_MIN_LEN
            ));
        }

        if len > PASSWORD_MAX_LEN {
            return Err(format!(
                "Password must be at most {} characters long",
                PASSWORD_MAX_LEN
            ));
        }

        Ok(())
    }

    /// Validate all user fields
    pub fn is_valid(&self) -> Result<(), String> {
        Self::validate_email(&self.email)?;
        Self::validate_username(&self.username)?;

        if self.password_hash.is_empty() {
            return Err("Password hash cannot be empty".to_string());
        }

        Ok(())
    }

    pub fn public_profile(&self) -> Option<PublicProfile> {
        let display_name = self.display_name.as_ref()?.trim();
        if display_name.is_empty() {
            return None;
        }

        Some(PublicProfile {
            uid: self.id.unwrap_or_default(),
            display_name: display_name.to_string(),
        })
    }
}

/// What anyone may learn about a user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PublicProfile {
    pub uid: i64,
    pub display_name: String,
}

/// Sign-up form for the local register method
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub confirm_password: String,
}

impl Registration {
    /// Validate every field, reporting all problems at once
    pub fn validate(&self) -> Result<(), String> {
        let mut errors = Vec::new();

        if let Err(e) = User::validate_email(&self.email) {
            errors.push(e);
        }
        if let Err(e) = User::validate_username(&self.username) {
            errors.push(e);
        }
        if let Err(e) = User::validate_password(&self.password) {
            errors.push(e);
        }
        if self.confirm_password.is_empty() {
            errors.push("Confirm password is required".to_string());
        } else if self.confirm_password != self.password {
            errors.push("Passwords must match".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(format!("Validation errors: {}", errors.join(", ")))
        }
    }
}

/// Structural checks made before a verification mail is sent
pub fn check_email_structure(email: &str) -> Result<(), String> {
    let parts: Vec<&str> = email.split('@').collect();

    if parts.len() != 2 {
        return Err("Email must contain exactly one '@' symbol".to_string());
    }

    if !parts[1].contains('.') {
        return Err("Email domain must contain at least one '.'".to_string());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_user() -> User {
        User::new(
            "test@example.com".to_string(),
            "testuser".to_string(),
            "password123",
            Role::Reader,
        )
        .unwrap()
    }

    #[test]
    fn test_new_user() {
        let user = test_user();

        assert!(user.id.is_none());
        assert_eq!(user.email, "test@example.com");
        assert_eq!(user.username, "testuser");
        assert_ne!(user.password_hash, "password123");
        assert!(user.is_active);
        assert!(!user.email_verified);
        assert_eq!(user.role, Role::Reader);
        assert_eq!(user.created_at, user.updated_at);
    }

    #[test]
    fn test_hash_password_is_salted() {
        let hash1 = User::hash_password("password123").unwrap();
        let hash2 = User::hash_password("password123").unwrap();

        assert_ne!(hash1, hash2);
        assert!(hash1.starts_with("$argon2"));
    }

    #[test]
    fn test_verify_password() {
        let user = test_user();

        assert!(user.verify_password("password123").unwrap());
        assert!(!user.verify_password("wrong_password").unwrap());
    }

    #[test]
    fn test_set_password() {
        let mut user = test_user();
        let old_updated_at = user.updated_at;

        user.set_password("new_password").unwrap();

        assert!(user.verify_password("new_password").unwrap());
        assert!(!user.verify_password("password123").unwrap());
        assert!(user.updated_at >= old_updated_at);
    }

    #[test]
    fn test_verify_password_invalid_hash() {
        let mut user = test_user();
        user.password_hash = "invalid_hash".to_string();

        assert!(user.verify_password("password123").is_err());
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let user = test_user();
        let json = serde_json::to_value(&user).unwrap();

        assert!(json.get("passwordHash").is_none());
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["username"], "testuser");
        assert_eq!(json["role"], "reader");
        assert_eq!(json["emailVerified"], false);
    }

    #[test]
    fn test_validate_email() {
        assert!(User::validate_email("user@example.com").is_ok());
        assert!(User::validate_email("user+tag@example.co.uk").is_ok());

        assert_eq!(User::validate_email("").unwrap_err(), "Email is required");
        assert!(User::validate_email("not-an-email").is_err());
        assert!(User::validate_email("user@example").is_err());
        assert!(User::validate_email("double@@example.com").is_err());
    }

    #[test]
    fn test_validate_username() {
        assert!(User::validate_username("abc").is_ok());
        assert!(User::validate_username("John Doe").is_ok());
        assert!(User::validate_username(&"a".repeat(30)).is_ok());

        assert!(User::validate_username("ab").unwrap_err().contains("at least 3"));
        assert!(User::validate_username(&"a".repeat(31))
            .unwrap_err()
            .contains("at most 30"));
        assert!(User::validate_username("user@name").is_err());
    }

    #[test]
    fn test_validate_password() {
        assert!(User::validate_password("abc").is_ok());
        assert!(User::validate_password("ab").is_err());
        assert!(User::validate_password(&"p".repeat(31)).is_err());
        assert_eq!(
            User::validate_password("").unwrap_err(),
            "Password is required"
        );
    }

    #[test]
    fn test_new_with_invalid_username() {
        let result = User::new(
            "valid@example.com".to_string(),
            "ab".to_string(),
            "password",
            Role::Reader,
        );

        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Invalid username"));
    }

    #[test]
    fn test_registration_valid() {
        let registration = Registration {
            email: "new@example.com".to_string(),
            username: "newbie".to_string(),
            password: "secret".to_string(),
            confirm_password: "secret".to_string(),
        };

        assert!(registration.validate().is_ok());
    }

    #[test]
    fn test_registration_collects_all_errors() {
        let registration = Registration {
            email: "nope".to_string(),
            username: "ab".to_string(),
            password: "secret".to_string(),
            confirm_password: "other".to_string(),
        };

        let err = registration.validate().unwrap_err();
        assert!(err.starts_with("Validation errors: "));
        assert!(err.contains("Invalid email format"));
        assert!(err.contains("Username must be at least 3 characters long"));
        assert!(err.contains("Passwords must match"));
    }

    #[test]
    fn test_check_email_structure() {
        assert!(check_email_structure("a@b.co").is_ok());
        assert!(check_email_structure("a@b@c.co")
            .unwrap_err()
            .contains("exactly one"));
        assert!(check_email_structure("a@localhost")
            .unwrap_err()
            .contains("at least one '.'"));
    }

    #[test]
    fn test_public_profile() {
        let mut user = test_user();
        user.id = Some(7);
        assert!(user.public_profile().is_none());

        user.display_name = Some("   ".to_string());
        assert!(user.public_profile().is_none());

        user.display_name = Some("Test User".to_string());
        let profile = user.public_profile().unwrap();
        assert_eq!(profile.uid, 7);
        assert_eq!(profile.display_name, "Test User");
    }
}
