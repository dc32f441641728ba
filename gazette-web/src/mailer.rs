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
use async_trait::async_trait;

/// Delivers account verification messages
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_verification(&self, email: &str, link: &str, code: &str) -> Result<()>;
}

/// Mailer that writes messages to the log instead of sending them
pub struct LogMailer {
    sender: String,
}

impl LogMailer {
    pub fn new(sender: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
        }
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send_verification(&self, email: &str, link: &str, code: &str) -> Result<()> {
        tracing::info!(
            from = %self.sender,
            to = %email,
            link = %link,
            code = %code,
            "Verification email"
        );
        Ok(())
    }
}

/// Link a user follows to verify their address
pub fn verification_link(base_url: &str, token: &str) -> String {
    format!(
        "{}/verify?token={}",
        base_url.trim_end_matches('/'),
        urlencoding::encode(token)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verification_link() {
        assert_eq!(
            verification_link("https://gazette.example/", "abc-_123"),
            "https://gazette.example/verify?token=abc-_123"
        );
        assert_eq!(
            verification_link("http://localhost:3000", "a b+c"),
            "http://localhost:3000/verify?token=a%20b%2Bc"
        );
    }

    #[tokio::test]
    async fn test_log_mailer_accepts_messages() -> Result<()> {
        let mailer = LogMailer::new("no-reply@gazette.example");
        mailer
            .send_verification("jane@example.org", "http://x/verify?token=t", "123456")
            .await
    }
}
