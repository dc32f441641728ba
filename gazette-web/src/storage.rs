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


//! Object storage for uploaded images
//!
//! [`LocalObjectStore`] keeps objects below a root directory. Clients can
//! upload directly through presigned URLs of the form
//! `PUT /.upload/{key}?expires=<unix>&contentType=<mime>&signature=<hex>`,
//! where the signature is an HMAC-SHA256 of the key, expiry and content type.

use crate::path_security::{object_path, validate_object_key};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::Sha256;
use std::path::{Path, PathBuf};

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresignedUpload {
    pub url: String,
    pub key: String,
    pub expires_at: DateTime<Utc>,
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `bytes` under `key` and return the public URL
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<String>;

    /// Remove an object, missing objects are not an error
    async fn delete(&self, key: &str) -> Result<()>;

    /// Create a time-limited upload URL for `key`
    fn presign_upload(&self, key: &str, content_type: &str) -> Result<PresignedUpload>;

    /// Check a presigned upload's expiry and signature
    fn verify_presigned(&self, key: &str, expires: i64, content_type: &str, signature: &str)
        -> bool;

    fn public_url(&self, key: &str) -> String;

    /// Recover the key of an object from its public URL
    fn key_from_url(&self, url: &str) -> Option<String>;
}

/// Filesystem-backed object store
pub struct LocalObjectStore {
    root: PathBuf,
    public_base_url: String,
    upload_base_url: String,
    secret: Vec<u8>,
    presign_expiry: Duration,
}

impl LocalObjectStore {
    pub fn new(
        root: impl Into<PathBuf>,
        public_base_url: &str,
        upload_base_url: &str,
        secret: &str,
        presign_expiry_seconds: u64,
    ) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
            upload_base_url: upload_base_url.trim_end_matches('/').to_string(),
            secret: secret.as_bytes().to_vec(),
            presign_expiry: Duration::seconds(presign_expiry_seconds as i64),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn mac(&self, key: &str, expires: i64, content_type: &str) -> Result<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| anyhow!("Invalid storage signing secret: {}", e))?;
        mac.update(format!("{}\n{}\n{}", key, expires, content_type).as_bytes());
        Ok(mac)
    }

    /// Hex signature authorizing an upload of `key` with `content_type` until `expires`
    pub fn sign(&self, key: &str, expires: i64, content_type: &str) -> Result<String> {
        let mac = self.mac(key, expires, content_type)?;
        Ok(hex::encode(mac.finalize().into_bytes()))
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<String> {
        let path = object_path(&self.root, key)?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let size = bytes.len();
        tokio::fs::write(&path, bytes)
            .await
            .with_context(|| format!("Failed to write object {}", key))?;

        tracing::debug!(key = %key, content_type = %content_type, size, "Stored object");
        Ok(self.public_url(key))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let path = object_path(&self.root, key)?;

        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                tracing::debug!(key = %key, "Deleted object");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(key = %key, "Object already absent");
                Ok(())
            }
            Err(e) => Err(e).with_context(|| format!("Failed to delete object {}", key)),
        }
    }

    fn presign_upload(&self, key: &str, content_type: &str) -> Result<PresignedUpload> {
        validate_object_key(key)?;

        let expires_at = Utc::now() + self.presign_expiry;
        let expires = expires_at.timestamp();
        let url = format!(
            "{}/.upload/{}?expires={}&contentType={}&signature={}",
            self.upload_base_url,
            key,
            expires,
            urlencoding::encode(content_type),
            self.sign(key, expires, content_type)?
        );

        tracing::debug!(key = %key, content_type = %content_type, "Presigned upload");
        Ok(PresignedUpload {
            url,
            key: key.to_string(),
            expires_at: Utc
                .timestamp_opt(expires, 0)
                .single()
                .unwrap_or(expires_at),
        })
    }

    fn verify_presigned(
        &self,
        key: &str,
        expires: i64,
        content_type: &str,
        signature: &str,
    ) -> bool {
        if validate_object_key(key).is_err() || expires < Utc::now().timestamp() {
            return false;
        }
        let Ok(expected) = hex::decode(signature) else {
            return false;
        };
        self.mac(key, expires, content_type)
            .map(|mac| mac.verify_slice(&expected).is_ok())
            .unwrap_or(false)
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_base_url, key)
    }

    fn key_from_url(&self, url: &str) -> Option<String> {
        let rest = url.strip_prefix(&self.public_base_url)?.strip_prefix('/')?;
        let key = rest.split(['?', '#']).next().unwrap_or_default();
        validate_object_key(key).ok()?;
        Some(key.to_string())
    }
}
