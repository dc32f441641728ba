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


use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::token::{generate_random_token, generate_verification_code};

pub const VERIFICATION_TOKEN_LEN: usize = 128;
pub const VERIFICATION_TTL_HOURS: i64 = 6;

/// Pending email verification for a freshly registered user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmailVerificationToken {
    pub user_id: i64,
    pub token: String,
    pub code: String,
    pub created_at: DateTime<Utc>,
}

impl EmailVerificationToken {
    pub fn new(user_id: i64) -> Self {
        Self {
            user_id,
            token: generate_random_token(VERIFICATION_TOKEN_LEN),
            code: generate_verification_code(),
            created_at: Utc::now(),
        }
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.created_at + Duration::hours(VERIFICATION_TTL_HOURS)
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at()
    }

    pub fn code_matches(&self, code: &str) -> bool {
        self.code == code.trim()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_token() {
        let token = EmailVerificationToken::new(9);

        assert_eq!(token.user_id, 9);
        assert_eq!(token.token.len(), 128);
        assert_eq!(token.code.len(), 6);
        assert!(!token.is_expired());
    }

    #[test]
    fn test_expiry_is_six_hours() {
        let mut token = EmailVerificationToken::new(1);
        assert_eq!(token.expires_at() - token.created_at, Duration::hours(6));

        token.created_at = Utc::now() - Duration::hours(7);
        assert!(token.is_expired());
    }

    #[test]
    fn test_code_matches() {
        let mut token = EmailVerificationToken::new(1);
        token.code = "123456".to_string();

        assert!(token.code_matches("123456"));
        assert!(token.code_matches(" 123456 "));
        assert!(!token.code_matches("654321"));
        assert!(!token.code_matches(""));
    }
}
