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


use once_cell::sync::Lazy;
use regex::Regex;

use super::sanitize::strip_tags;

static SEPARATOR_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\s_]+").expect("Failed to compile separator regex"));

static DISALLOWED_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-zA-Z0-9-]").expect("Failed to compile meta title regex"));

/// Turn a user supplied meta title into the URL key of an article.
///
/// Tags are stripped, runs of whitespace and underscores become a single
/// hyphen (leading and trailing runs included), then anything outside
/// `[A-Za-z0-9-]` is dropped. Case is kept.
pub fn normalize_meta_title(raw: &str) -> Result<String, String> {
    let text = strip_tags(raw);
    let text = SEPARATOR_REGEX.replace_all(&text, "-");
    let normalized = DISALLOWED_REGEX.replace_all(&text, "").to_string();

    if !normalized.chars().any(|c| c.is_ascii_alphanumeric()) {
        return Err("Meta title must contain at least one letter or digit".to_string());
    }

    Ok(normalized)
}
