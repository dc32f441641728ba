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


use anyhow::{anyhow, Result};
use std::path::{Path, PathBuf};

pub const MAX_KEY_LEN: usize = 512;

/// Validates an object key before it touches the filesystem
///
/// Keys are `/`-separated segments of ASCII letters, digits, `.`, `_` and `-`.
pub fn validate_object_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(anyhow!("Empty object key"));
    }

    if key.len() > MAX_KEY_LEN {
        return Err(anyhow!("Object key is too long"));
    }

    if key.starts_with('/') || key.contains('\\') || key.contains('\0') {
        return Err(anyhow!("Object key must be a relative path"));
    }

    for segment in key.split('/') {
        if segment.is_empty() {
            return Err(anyhow!("Object key contains an empty segment"));
        }
        if segment == "." || segment == ".." {
            return Err(anyhow!("Object key contains directory traversal patterns"));
        }
        if !segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-')
        {
            return Err(anyhow!("Object key contains invalid characters"));
        }
    }

    Ok(())
}

/// Resolves a validated key to a path below `root`
pub fn object_path(root: &Path, key: &str) -> Result<PathBuf> {
    validate_object_key(key)?;

    let mut path = root.to_path_buf();
    for segment in key.split('/') {
        path.push(segment);
    }

    // Components were checked above, this only guards against odd roots
    if !path.starts_with(root) {
        return Err(anyhow!(
            "Path traversal attempt detected: path is outside allowed directory"
        ));
    }

    Ok(path)
}

/// Validates a key prefix supplied by a client
pub fn validate_prefix(prefix: &str) -> Result<()> {
    if prefix.is_empty() {
        return Err(anyhow!("Empty prefix"));
    }

    if !prefix
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '/')
    {
        return Err(anyhow!("Prefix contains invalid characters"));
    }

    validate_object_key(prefix)
}
