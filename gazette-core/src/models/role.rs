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


use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Publication roles, ordered from least to most privileged
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Reader, // Can read, like and comment
    Writer, // Can publish articles and posts
    Admin,  // Full control
}

impl Role {
    /// Check if this role has at least the permissions of the given role
    pub fn has_permission(&self, required: Role) -> bool {
        *self >= required
    }

    /// Check if this role can publish content
    pub fn can_write(&self) -> bool {
        self.has_permission(Role::Writer)
    }

    pub fn is_admin(&self) -> bool {
        *self == Role::Admin
    }

    /// Get all available roles
    pub fn all() -> Vec<Role> {
        vec![Role::Reader, Role::Writer, Role::Admin]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Reader => "reader",
            Role::Writer => "writer",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reader" => Ok(Role::Reader),
            "writer" => Ok(Role::Writer),
            "admin" => Ok(Role::Admin),
            other => Err(format!("Unknown role: {}", other)),
        }
    }
}

/// Assigns the initial role of a newly registered account from its email domain.
///
/// Addresses under the admin domain become admins, addresses under the writer
/// domain become writers, everyone else starts as a reader.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RolePolicy {
    pub admin_email_domain: Option<String>,
    pub writer_email_domain: Option<String>,
}

impl RolePolicy {
    pub fn new(admin_email_domain: Option<String>, writer_email_domain: Option<String>) -> Self {
        Self {
            admin_email_domain,
            writer_email_domain,
        }
    }

    pub fn role_for_email(&self, email: &str) -> Role {
        let email = email.trim().to_ascii_lowercase();

        if matches_domain(&email, self.admin_email_domain.as_deref()) {
            Role::Admin
        } else if matches_domain(&email, self.writer_email_domain.as_deref()) {
            Role::Writer
        } else {
            Role::Reader
        }
    }
}

fn matches_domain(email: &str, domain: Option<&str>) -> bool {
    match domain {
        Some(domain) if !domain.trim().is_empty() => {
            let suffix = format!("@{}", domain.trim().trim_start_matches('@').to_ascii_lowercase());
            email.ends_with(&suffix)
        }
        _ => false,
    }
}
