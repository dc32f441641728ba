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
use serde_json::Value;

use super::article::TITLE_MAX_LEN;
use crate::utils::sanitize::{clean_html, strip_tags};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: Option<i64>,
    pub author_id: i64,
    pub title: String,
    pub date_published: DateTime<Utc>,
    pub image_url: Option<String>,
    pub summary: Option<String>,
    /// Structured editor document, always a JSON object
    pub post_body: Value,
}

impl Post {
    pub fn new(author_id: i64, draft: PostDraft) -> Self {
        Self {
            id: None,
            author_id,
            title: draft.title,
            date_published: Utc::now(),
            image_url: draft.image_url,
            summary: draft.summary,
            post_body: draft.post_body,
        }
    }

    pub fn apply(&mut self, draft: PostDraft) {
        self.title = draft.title;
        self.summary = draft.summary;
        self.post_body = draft.post_body;
        if draft.image_url.is_some() {
            self.image_url = draft.image_url;
        }
    }
}

/// Post listing entry; the body is only present when asked for
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PostListing {
    pub id: Option<i64>,
    pub author_id: i64,
    pub title: String,
    pub date_published: DateTime<Utc>,
    pub image_url: Option<String>,
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_body: Option<Value>,
}

impl PostListing {
    pub fn from_post(post: Post, include_body: bool) -> Self {
        Self {
            id: post.id,
            author_id: post.author_id,
            title: post.title,
            date_published: post.date_published,
            image_url: post.image_url,
            summary: post.summary,
            post_body: include_body.then_some(post.post_body),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostInput {
    pub title: Option<String>,
    pub summary: Option<String>,
    pub image_url: Option<String>,
    pub post_body: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PostDraft {
    pub title: String,
    pub summary: Option<String>,
    pub image_url: Option<String>,
    pub post_body: Value,
}

impl PostInput {
    pub fn validate(&self) -> Result<(), String> {
        let mut errors = Vec::new();

        match self.title.as_deref().map(str::trim) {
            None | Some("") => errors.push("Title is required".to_string()),
            Some(title) if title.chars().count() > TITLE_MAX_LEN => errors.push(format!(
                "Title must be at most {} characters long",
                TITLE_MAX_LEN
            )),
            Some(_) => {}
        }

        if !matches!(self.post_body, Some(Value::Object(_))) {
            errors.push("Body is required".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(format!("Validation errors: {}", errors.join(", ")))
        }
    }

    pub fn into_draft(self) -> Result<PostDraft, String> {
        self.validate()?;

        let title = strip_tags(self.title.as_deref().unwrap_or_default())
            .trim()
            .to_string();
        if title.is_empty() {
            return Err("Validation errors: Title is required".to_string());
        }

        Ok(PostDraft {
            title,
            summary: self.summary.as_deref().map(clean_html),
            image_url: self.image_url.filter(|url| !url.is_empty()),
            post_body: self.post_body.unwrap_or_default(),
        })
    }
}
