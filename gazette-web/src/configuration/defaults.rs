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


//! Default configuration values for Gazette
//!
//! Each function returns the default value for a specific configuration field.

use std::{env, path::PathBuf};
use uuid::Uuid;

// Server defaults
pub fn default_host() -> String {
    "0.0.0.0".to_string()
}

pub fn default_port() -> u16 {
    3000
}

// Session defaults
pub fn default_session_timeout_minutes() -> i64 {
    1440 // 24 hours
}

pub fn default_secure_cookies() -> bool {
    true
}

// Upload defaults
pub fn default_max_upload_size() -> usize {
    10_485_760 // 10MB
}

// Object storage defaults
pub fn default_storage_root() -> String {
    env::var("HOME")
        .map(|home| PathBuf::from(home).join(".gazette").join("media"))
        .unwrap_or_else(|_| PathBuf::from("/var/gazette/media"))
        .to_string_lossy()
        .to_string()
}

pub fn default_storage_public_url() -> String {
    "http://localhost:3000/media".to_string()
}

pub fn default_storage_secret() -> String {
    // Presigned URLs stop validating across restarts unless a secret is configured
    Uuid::new_v4().to_string()
}

pub fn default_presign_expiry_seconds() -> u64 {
    3600
}

// Article cache defaults
pub fn default_cache_enabled() -> bool {
    true
}

pub fn default_cache_ttl_seconds() -> u64 {
    3600
}

pub fn default_cache_refresh_threshold_seconds() -> u64 {
    3000
}

pub fn default_cache_refresh_interval_seconds() -> Option<u64> {
    None
}

// Rate limit defaults
pub fn default_login_attempts_per_minute() -> u32 {
    5
}

// Security headers defaults
pub fn default_enable_hsts() -> bool {
    true
}

pub fn default_enable_csp() -> bool {
    true
}

pub fn default_enable_frame_options() -> bool {
    true
}

pub fn default_enable_content_type_options() -> bool {
    true
}

pub fn default_csp_content() -> Option<String> {
    Some("default-src 'self'; img-src 'self' data: https:; frame-ancestors 'none'; base-uri 'self'; form-action 'self';".to_string())
}

pub fn default_hsts_content() -> Option<String> {
    Some("max-age=31536000; includeSubDomains".to_string())
}

pub fn default_frame_options_content() -> Option<String> {
    Some("DENY".to_string())
}

pub fn default_referrer_policy() -> Option<String> {
    Some("strict-origin-when-cross-origin".to_string())
}

pub fn default_permissions_policy() -> Option<String> {
    Some("geolocation=(), camera=(), microphone=()".to_string())
}

pub fn default_cors_allowed_origins() -> Option<Vec<String>> {
    None
}

// Mail defaults
pub fn default_mail_base_url() -> String {
    "http://localhost:3000".to_string()
}

pub fn default_mail_sender() -> String {
    "no-reply@localhost".to_string()
}

// Database defaults
pub fn default_database_url() -> String {
    "sqlite:gazette.db".to_string()
}

// Development mode default
pub fn default_development_mode() -> bool {
    false
}
