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


use axum::{
    body::Bytes,
    extract::{Multipart, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    Json,
};
use gazette_core::utils::media::{
    inspect_image, is_article_image_mime, is_presignable_mime, object_key_for,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;

use crate::auth::RequireWriter;
use crate::error::{AppError, AppResult};
use crate::path_security::validate_prefix;
use crate::AppState;

/// A file part of a multipart form
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: Option<String>,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// Text fields plus the optional `image` part of a content form
#[derive(Debug, Default)]
pub struct ContentForm {
    pub fields: HashMap<String, String>,
    pub image: Option<UploadedFile>,
}

impl ContentForm {
    pub fn text(&self, name: &str) -> Option<String> {
        self.fields.get(name).cloned()
    }
}

/// Read a multipart content form, bounding the image by `max_size`
pub async fn read_content_form(mut multipart: Multipart, max_size: usize) -> AppResult<ContentForm> {
    let mut form = ContentForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::bad_request("Invalid multipart body").with_details(e.to_string()))?
    {
        let name = field.name().unwrap_or("").to_string();

        if name == "image" {
            let file_name = field.file_name().map(|f| f.to_string());
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let data = field.bytes().await.map_err(|e| {
                AppError::bad_request("Failed to read uploaded file").with_details(e.to_string())
            })?;

            if data.len() > max_size {
                return Err(AppError::new(StatusCode::PAYLOAD_TOO_LARGE, "File too large"));
            }
            // Browsers send an empty part when no file was chosen
            if !data.is_empty() {
                form.image = Some(UploadedFile {
                    file_name,
                    content_type,
                    data: data.to_vec(),
                });
            }
        } else if !name.is_empty() {
            let text = field
                .text()
                .await
                .map_err(|e| AppError::bad_request("Invalid form field").with_details(e.to_string()))?;
            form.fields.insert(name, text);
        }
    }

    Ok(form)
}

/// Check that an uploaded file really is an image of an accepted type
pub fn check_image(file: &UploadedFile, accepted: fn(&str) -> bool) -> AppResult<()> {
    let label = file.file_name.as_deref().unwrap_or("image");

    if !accepted(&file.content_type) {
        return Err(AppError::bad_request(format!(
            "Invalid mimetype for file {}.",
            label
        )));
    }

    let metadata = inspect_image(&file.data).map_err(|e| {
        AppError::bad_request(format!("File {} is not a valid image", label))
            .with_details(e.to_string())
    })?;

    tracing::debug!(
        file = %label,
        format = ?metadata.format,
        width = ?metadata.width,
        height = ?metadata.height,
        size = metadata.size,
        "Accepted image upload"
    );
    Ok(())
}

/// An accepted content image and the object key it will be stored under
#[derive(Debug)]
pub struct PendingImage {
    pub key: String,
    /// The key was recovered from the image URL the record already has
    pub reuses_existing: bool,
    file: UploadedFile,
}

impl PendingImage {
    pub fn url(&self, state: &AppState) -> String {
        state.store.public_url(&self.key)
    }

    pub async fn store(self, state: &AppState) -> AppResult<String> {
        Ok(state
            .store
            .put(&self.key, self.file.data, &self.file.content_type)
            .await?)
    }
}

/// Check a content image and pick its key. The key behind `existing_url` is
/// reused when it belongs to the store, otherwise a fresh one is made under `prefix`.
pub fn prepare_image(
    state: &AppState,
    image: UploadedFile,
    prefix: &str,
    existing_url: Option<&str>,
) -> AppResult<PendingImage> {
    check_image(&image, is_article_image_mime)?;

    if let Some(key) = existing_url.and_then(|url| state.store.key_from_url(url)) {
        return Ok(PendingImage {
            key,
            reuses_existing: true,
            file: image,
        });
    }

    let key = object_key_for(prefix, &image.content_type)
        .ok_or_else(|| AppError::bad_request("Invalid mimetype"))?;
    Ok(PendingImage {
        key,
        reuses_existing: false,
        file: image,
    })
}

/// Best effort removal of an object nothing refers to
pub async fn discard_object(state: &AppState, key: &str) {
    match state.store.delete(key).await {
        Ok(()) => tracing::debug!(key = %key, "Discarded object"),
        Err(e) => tracing::warn!(key = %key, error = %e, "Failed to discard object"),
    }
}

/// Remove `key` again when the write that was to reference it failed
pub async fn discard_on_error<T>(
    state: &AppState,
    key: Option<&str>,
    result: AppResult<T>,
) -> AppResult<T> {
    if let (Err(e), Some(key)) = (&result, key) {
        tracing::info!(key = %key, error = %e.message, "Write failed, removing its image");
        discard_object(state, key).await;
    }
    result
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresignRequest {
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub prefix: String,
}

/// POST /api/upload
pub async fn presign_upload(
    State(state): State<AppState>,
    RequireWriter(current): RequireWriter,
    Json(request): Json<PresignRequest>,
) -> AppResult<Json<Value>> {
    if !is_presignable_mime(&request.mime_type) {
        return Err(AppError::bad_request("Invalid mimetype"));
    }

    let prefix = request.prefix.trim();
    validate_prefix(prefix).map_err(|e| AppError::bad_request(e.to_string()))?;

    let key = object_key_for(prefix, &request.mime_type)
        .ok_or_else(|| AppError::bad_request("Invalid mimetype"))?;
    let upload = state.store.presign_upload(&key, &request.mime_type)?;

    tracing::info!(key = %key, user = %current.user.username, "Issued presigned upload");
    Ok(Json(json!({
        "success": true,
        "message": "Presigned URL generated successfully",
        "url": upload.url,
        "key": upload.key,
        "expiresAt": upload.expires_at,
        "publicUrl": state.store.public_url(&upload.key),
    })))
}

/// DELETE /api/upload/{*key}
pub async fn delete_upload(
    State(state): State<AppState>,
    RequireWriter(current): RequireWriter,
    Path(key): Path<String>,
) -> AppResult<Json<Value>> {
    state
        .store
        .delete(&key)
        .await
        .map_err(|e| AppError::bad_request("Invalid object key").with_details(e.to_string()))?;

    tracing::info!(key = %key, user = %current.user.username, "Deleted object");
    Ok(Json(json!({
        "success": true,
        "message": format!("Object {} deleted", key),
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedUploadQuery {
    pub expires: Option<i64>,
    pub content_type: Option<String>,
    pub signature: Option<String>,
}

/// The MIME essence of a Content-Type header, without parameters
fn mime_essence(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::CONTENT_TYPE)?.to_str().ok()?;
    let essence = value.split(';').next().unwrap_or_default().trim();
    (!essence.is_empty()).then(|| essence.to_ascii_lowercase())
}

/// PUT /.upload/{*key}, the target of presigned URLs
pub async fn receive_signed_upload(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(query): Query<SignedUploadQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<(StatusCode, Json<Value>)> {
    let (Some(expires), Some(content_type), Some(signature)) =
        (query.expires, query.content_type, query.signature)
    else {
        return Err(AppError::forbidden("Missing upload signature"));
    };

    if !state
        .store
        .verify_presigned(&key, expires, &content_type, &signature)
    {
        tracing::warn!(key = %key, "Rejected presigned upload");
        return Err(AppError::forbidden("Invalid or expired upload signature"));
    }

    if mime_essence(&headers).as_deref() != Some(content_type.to_ascii_lowercase().as_str()) {
        tracing::warn!(key = %key, signed = %content_type, "Upload content type mismatch");
        return Err(AppError::forbidden(
            "Content type does not match upload signature",
        ));
    }

    if body.is_empty() {
        return Err(AppError::bad_request("Empty upload"));
    }

    let url = state.store.put(&key, body.to_vec(), &content_type).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Upload successful",
            "key": key,
            "url": url,
        })),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_bytes() -> Vec<u8> {
        let mut data = vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
        data.extend_from_slice(&[0; 32]);
        data
    }

    #[tokio::test]
    async fn test_discard_on_error_removes_only_failed_writes() -> anyhow::Result<()> {
        let (state, dir) = crate::test_helpers::create_test_app_state().await?;
        state.store.put("kept.png", png_bytes(), "image/png").await?;
        state.store.put("orphan.png", png_bytes(), "image/png").await?;

        let kept = discard_on_error(&state, Some("kept.png"), Ok(7)).await;
        assert_eq!(kept.unwrap(), 7);
        assert!(dir.path().join("kept.png").exists());

        let failed: AppResult<()> = Err(AppError::conflict("duplicate"));
        assert!(discard_on_error(&state, Some("orphan.png"), failed).await.is_err());
        assert!(!dir.path().join("orphan.png").exists());
        Ok(())
    }

    #[tokio::test]
    async fn test_prepare_image_reuses_stored_key() -> anyhow::Result<()> {
        let (state, _dir) = crate::test_helpers::create_test_app_state().await?;
        let file = UploadedFile {
            file_name: Some("cover.png".to_string()),
            content_type: "image/png".to_string(),
            data: png_bytes(),
        };

        let existing = state.store.public_url("articles-1-2.png");
        let pending = prepare_image(&state, file.clone(), "articles", Some(&existing))?;
        assert!(pending.reuses_existing);
        assert_eq!(pending.key, "articles-1-2.png");

        let pending = prepare_image(&state, file, "posts", Some("https://elsewhere.example/a.png"))?;
        assert!(!pending.reuses_existing);
        assert!(pending.key.starts_with("posts-") && pending.key.ends_with(".png"));
        Ok(())
    }

    #[test]
    fn test_mime_essence() {
        let mut headers = HeaderMap::new();
        assert_eq!(mime_essence(&headers), None);

        headers.insert(header::CONTENT_TYPE, "Image/PNG; charset=binary".parse().unwrap());
        assert_eq!(mime_essence(&headers).as_deref(), Some("image/png"));
    }

    #[test]
    fn test_check_image_accepts_png() {
        let file = UploadedFile {
            file_name: Some("cover.png".to_string()),
            content_type: "image/png".to_string(),
            data: png_bytes(),
        };
        assert!(check_image(&file, is_article_image_mime).is_ok());
    }

    #[test]
    fn test_check_image_rejects_mimetype() {
        let file = UploadedFile {
            file_name: Some("cover.webp".to_string()),
            content_type: "image/webp".to_string(),
            data: png_bytes(),
        };
        let err = check_image(&file, is_article_image_mime).unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.message, "Invalid mimetype for file cover.webp.");
    }

    #[test]
    fn test_check_image_rejects_non_image_bytes() {
        let file = UploadedFile {
            file_name: None,
            content_type: "image/png".to_string(),
            data: b"#!/bin/sh".to_vec(),
        };
        let err = check_image(&file, is_article_image_mime).unwrap_err();
        assert_eq!(err.message, "File image is not a valid image");
    }
}
