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


use std::collections::HashSet;

use ammonia::Builder;
use once_cell::sync::Lazy;

static STRIP_ALL: Lazy<Builder<'static>> = Lazy::new(|| {
    let mut builder = Builder::empty();
    builder.clean_content_tags(HashSet::from(["script", "style"]));
    builder
});

/// Remove every tag, keeping text content. Script and style bodies are dropped.
pub fn strip_tags(input: &str) -> String {
    STRIP_ALL.clean(input).to_string()
}

/// Clean HTML down to the default allow-list
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}
