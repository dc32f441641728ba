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


use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::sanitize::strip_tags;

pub const COMMENT_MAX_LEN: usize = 500;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: Option<i64>,
    pub article_id: i64,
    pub user_id: i64,
    pub parent_comment_id: Option<i64>,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Comment {
    /// Content is stored as plain text
    pub fn new(
        article_id: i64,
        user_id: i64,
        parent_comment_id: Option<i64>,
        content: &str,
    ) -> Result<Self, String> {
        let content = Self::validate_content(content)?;

        Ok(Self {
            id: None,
            article_id,
            user_id,
            parent_comment_id,
            content,
            created_at: Utc::now(),
        })
    }

    pub fn validate_content(content: &str) -> Result<String, String> {
        let text = strip_tags(content).trim().to_string();

        if text.is_empty() {
            return Err("Comment content is required".to_string());
        }

        if text.chars().count() > COMMENT_MAX_LEN {
            return Err(format!(
                "Comment must be at most {} characters long",
                COMMENT_MAX_LEN
            ));
        }

        Ok(text)
    }
}

/// Body of a new comment. `targetId` names the parent comment.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentInput {
    #[serde(default)]
    pub content: String,
    pub target_id: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_comment() {
        let comment = Comment::new(1, 2, None, "  <b>Nice</b> piece ").unwrap();

        assert_eq!(comment.article_id, 1);
        assert_eq!(comment.user_id, 2);
        assert_eq!(comment.content, "Nice piece");
        assert!(comment.id.is_none());
    }

    #[test]
    fn test_content_required() {
        assert_eq!(
            Comment::new(1, 2, None, "").unwrap_err(),
            "Comment content is required"
        );
        assert!(Comment::new(1, 2, None, "<p> </p>").is_err());
    }

    #[test]
    fn test_content_length() {
        assert!(Comment::validate_content(&"c".repeat(500)).is_ok());
        assert!(Comment::validate_content(&"c".repeat(501)).is_err());
        // Markup does not count towards the limit
        let wrapped = format!("<em>{}</em>", "c".repeat(500));
        assert!(Comment::validate_content(&wrapped).is_ok());
    }

    #[test]
    fn test_input_deserialize() {
        let input: CommentInput =
            serde_json::from_str(r#"{"content":"hello","targetId":5}"#).unwrap();
        assert_eq!(input.content, "hello");
        assert_eq!(input.target_id, Some(5));
    }
}
