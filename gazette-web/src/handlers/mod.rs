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


pub mod articles;
pub mod auth;
pub mod comments;
pub mod misc;
pub mod posts;
pub mod uploads;
pub mod users;

pub use articles::{
    create_article, delete_article, edit_article, get_article, like_article, list_articles,
    search_articles, unlike_article,
};
pub use auth::{check_session, login, logout, register, verify_email};
pub use comments::{add_comment, delete_comment, list_comments};
pub use misc::{health, index, protected, views};
pub use posts::{create_post, delete_post, edit_post, get_post, list_posts};
pub use uploads::{delete_upload, presign_upload, receive_signed_upload};
pub use users::public_profile;
