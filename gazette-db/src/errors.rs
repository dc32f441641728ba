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

/// A write was rejected because it would duplicate a unique value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictError(pub String);

impl fmt::Display for ConflictError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ConflictError {}

/// Turn a unique constraint failure into a [`ConflictError`], other errors get `context`
pub fn map_write_error(err: sqlx::Error, conflict: &str, context: &'static str) -> anyhow::Error {
    let is_unique = err
        .as_database_error()
        .map(|db_err| db_err.is_unique_violation())
        .unwrap_or(false);

    if is_unique {
        anyhow::Error::new(ConflictError(conflict.to_string()))
    } else {
        anyhow::Error::new(err).context(context)
    }
}

pub fn is_conflict(err: &anyhow::Error) -> bool {
    err.downcast_ref::<ConflictError>().is_some()
}
