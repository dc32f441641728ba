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


use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::utils::sanitize::{clean_html, strip_tags};
use crate::utils::slug::normalize_meta_title;

pub const TITLE_MAX_LEN: usize = 128;
pub const META_TITLE_MAX_LEN: usize = 64;
pub const BODY_MAX_LEN: usize = 2000;
pub const POSITION_MIN: i64 = 1;
pub const POSITION_MAX: i64 = 10;
pub const DEFAULT_POSITION: i64 = 5;

static IMAGE_URL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\.(gif|jpg|jpeg|png|bmp|webp|tiff|svg)$").expect("Failed to compile image url regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Finance,
    Economic,
    Business,
    Entrepreneurship,
}

impl Category {
    pub fn all() -> &'static [Category] {
        &[
            Category::Finance,
            Category::Economic,
            Category::Business,
            Category::Entrepreneurship,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Finance => "Finance",
            Category::Economic => "Economic",
            Category::Business => "Business",
            Category::Entrepreneurship => "Entrepreneurship",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    /// Spelling is exact, matching what is stored
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::all()
            .iter()
            .copied()
            .find(|category| category.as_str() == s.trim())
            .ok_or_else(|| {
                format!(
                    "Category must be one of {}",
                    Category::all()
                        .iter()
                        .map(|c| c.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                )
            })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: Option<i64>,
    pub author_uid: i64,
    pub title: String,
    pub meta_title: String,
    pub category: Category,
    pub date_published: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    pub position: i64,
    pub image_url: Option<String>,
    pub summary: Option<String>,
    pub article_body: String,
    /// Plain text of the body, used by search
    #[serde(skip)]
    pub article_text: String,
    pub likes_count: i64,
}

impl Article {
    /// Build a new article from a sanitized draft. A category is mandatory here.
    pub fn new(author_uid: i64, draft: ArticleDraft) -> Result<Self, String> {
        let category = draft
            .category
            .ok_or_else(|| "Validation errors: Category is required".to_string())?;
        let now = Utc::now();

        Ok(Self {
            id: None,
            author_uid,
            title: draft.title,
            meta_title: draft.meta_title,
            category,
            date_published: now,
            last_updated: now,
            position: draft.position.unwrap_or(DEFAULT_POSITION),
            image_url: draft.image_url,
            summary: draft.summary,
            article_body: draft.article_body,
            article_text: draft.article_text,
            likes_count: 0,
        })
    }

    /// Apply an edit. Category, position and image are kept when the draft has none.
    pub fn apply(&mut self, draft: ArticleDraft) {
        self.title = draft.title;
        self.meta_title = draft.meta_title;
        self.summary = draft.summary;
        self.article_body = draft.article_body;
        self.article_text = draft.article_text;

        if let Some(category) = draft.category {
            self.category = category;
        }
        if let Some(position) = draft.position {
            self.position = position;
        }
        if let Some(image_url) = draft.image_url {
            self.image_url = Some(image_url);
        }

        self.touch();
    }

    pub fn touch(&mut self) {
        self.last_updated = Utc::now();
    }

    /// Whether any search term appears in the title, text or summary
    pub fn matches_terms(&self, terms: &[String]) -> bool {
        if terms.is_empty() {
            return true;
        }

        let title = self.title.to_lowercase();
        let text = self.article_text.to_lowercase();
        let summary = self.summary.as_deref().unwrap_or_default().to_lowercase();

        terms.iter().any(|term| {
            let term = term.to_lowercase();
            title.contains(&term) || text.contains(&term) || summary.contains(&term)
        })
    }

    pub fn listing(&self, include_body: bool) -> ArticleListing {
        ArticleListing {
            id: self.id,
            author_uid: self.author_uid,
            title: self.title.clone(),
            meta_title: self.meta_title.clone(),
            category: self.category,
            date_published: self.date_published,
            last_updated: self.last_updated,
            position: self.position,
            image_url: self.image_url.clone(),
            summary: self.summary.clone(),
            likes_count: self.likes_count,
            article_body: include_body.then(|| self.article_body.clone()),
        }
    }
}

/// Listing projection of an article
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ArticleListing {
    pub id: Option<i64>,
    pub author_uid: i64,
    pub title: String,
    pub meta_title: String,
    pub category: Category,
    pub date_published: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    pub position: i64,
    pub image_url: Option<String>,
    pub summary: Option<String>,
    pub likes_count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub article_body: Option<String>,
}

/// Raw article fields as submitted by a writer
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleInput {
    pub title: Option<String>,
    pub meta_title: Option<String>,
    pub category: Option<String>,
    pub summary: Option<String>,
    pub article_body: Option<String>,
    pub position: Option<String>,
    pub image_url: Option<String>,
}

/// Validated and sanitized article fields
#[derive(Debug, Clone, PartialEq)]
pub struct ArticleDraft {
    pub title: String,
    pub meta_title: String,
    pub category: Option<Category>,
    pub position: Option<i64>,
    pub summary: Option<String>,
    pub article_body: String,
    pub article_text: String,
    pub image_url: Option<String>,
}

fn check_length(errors: &mut Vec<String>, label: &str, value: Option<&str>, max: usize) {
    match value {
        None | Some("") => errors.push(format!("{} is required", label)),
        Some(value) if value.chars().count() > max => errors.push(format!(
            "{} must be at most {} characters long",
            label, max
        )),
        Some(_) => {}
    }
}

impl ArticleInput {
    /// Check the raw fields, reporting every problem at once
    pub fn validate(&self) -> Result<(), String> {
        let mut errors = Vec::new();

        check_length(&mut errors, "Title", self.title.as_deref(), TITLE_MAX_LEN);
        check_length(
            &mut errors,
            "Meta title",
            self.meta_title.as_deref(),
            META_TITLE_MAX_LEN,
        );
        check_length(&mut errors, "Body", self.article_body.as_deref(), BODY_MAX_LEN);

        if let Some(image_url) = self.image_url.as_deref() {
            if !IMAGE_URL_REGEX.is_match(image_url) {
                errors.push("Image URL must point to a gif, jpg, jpeg, png, bmp, webp, tiff or svg file".to_string());
            }
        }

        if let Some(category) = self.category.as_deref() {
            if let Err(e) = strip_tags(category).parse::<Category>() {
                errors.push(e);
            }
        }

        if let Some(position) = self.position.as_deref() {
            if let Err(e) = parse_position(position) {
                errors.push(e);
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(format!("Validation errors: {}", errors.join(", ")))
        }
    }

    /// Validate then sanitize into a draft ready for persistence
    pub fn into_draft(self) -> Result<ArticleDraft, String> {
        self.validate()?;

        let title = strip_tags(self.title.as_deref().unwrap_or_default())
            .trim()
            .to_string();
        if title.is_empty() {
            return Err("Validation errors: Title is required".to_string());
        }

        let meta_title = normalize_meta_title(self.meta_title.as_deref().unwrap_or_default())
            .map_err(|e| format!("Validation errors: {}", e))?;

        let article_body = clean_html(self.article_body.as_deref().unwrap_or_default());
        let article_text = strip_tags(&article_body);

        let category = match self.category.as_deref() {
            Some(raw) => Some(strip_tags(raw).parse::<Category>()?),
            None => None,
        };
        let position = match self.position.as_deref() {
            Some(raw) => Some(parse_position(raw)?),
            None => None,
        };

        Ok(ArticleDraft {
            title,
            meta_title,
            category,
            position,
            summary: self.summary.as_deref().map(clean_html),
            article_body,
            article_text,
            image_url: self.image_url,
        })
    }
}

fn parse_position(raw: &str) -> Result<i64, String> {
    let position: i64 = raw
        .trim()
        .parse()
        .map_err(|_| "Position must be a number".to_string())?;

    if !(POSITION_MIN..=POSITION_MAX).contains(&position) {
        return Err(format!(
            "Position must be between {} and {}",
            POSITION_MIN, POSITION_MAX
        ));
    }

    Ok(position)
}
