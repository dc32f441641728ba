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
use serde::Serialize;

static LEADING_INT_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*([+-]?[0-9]+)").expect("Failed to compile integer prefix regex"));

pub const DEFAULT_PAGE: usize = 1;
pub const DEFAULT_COUNT: usize = 20;

/// A page window requested through `page` and `count` query parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page: usize,
    pub count: usize,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            count: DEFAULT_COUNT,
        }
    }
}

impl Pagination {
    pub fn new(page: usize, count: usize) -> Self {
        Self {
            page: page.max(1),
            count: count.max(1),
        }
    }

    /// Build from raw query values. Only the leading integer of a value counts,
    /// so `"1.5"` is 1 and `"10abc"` is 10. Values without one use the defaults.
    pub fn from_raw(page: Option<&str>, count: Option<&str>) -> Self {
        Self::new(
            parse_or(page, DEFAULT_PAGE),
            parse_or(count, DEFAULT_COUNT),
        )
    }

    pub fn offset(&self) -> usize {
        (self.page - 1).saturating_mul(self.count)
    }

    pub fn limit(&self) -> usize {
        self.count
    }

    /// The page window over an in-memory snapshot
    pub fn slice<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        let start = self.offset().min(items.len());
        let end = start.saturating_add(self.count).min(items.len());
        &items[start..end]
    }
}

fn parse_or(raw: Option<&str>, default: usize) -> usize {
    raw.and_then(|value| LEADING_INT_REGEX.captures(value))
        .and_then(|captures| captures[1].parse::<i64>().ok())
        .map(|value| value.max(1) as usize)
        .unwrap_or(default)
}
