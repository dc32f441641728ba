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
use chrono::Utc;
use image::GenericImageView;
use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;

static PRESIGN_MIME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^image/(jpg|jpeg|png|bmp|webp|tiff|svg|svg\+xml)$")
        .expect("Failed to compile presign mime regex")
});

static ARTICLE_IMAGE_MIME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^image/(gif|jpg|jpeg|png)$").expect("Failed to compile image mime regex")
});

/// Magic bytes for the image formats we accept
const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8, 0xFF];
const PNG_MAGIC: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
const GIF_MAGIC: &[u8] = b"GIF8";
const BMP_MAGIC: &[u8] = b"BM";
const WEBP_MAGIC: &[u8] = b"RIFF";
const TIFF_LE_MAGIC: &[u8] = &[0x49, 0x49, 0x2A, 0x00];
const TIFF_BE_MAGIC: &[u8] = &[0x4D, 0x4D, 0x00, 0x2A];
const SVG_MAGIC: &[u8] = b"<svg";
const SVG_MAGIC_ALT: &[u8] = b"<?xml";

/// File extension stored objects get for a given MIME type
pub fn extension_for_mime(mime: &str) -> Option<&'static str> {
    match mime {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        "image/bmp" => Some("bmp"),
        "image/webp" => Some("webp"),
        "image/tiff" => Some("tiff"),
        "image/svg+xml" | "image/svg" => Some("svg"),
        "text/html" => Some("html"),
        _ => None,
    }
}

/// Whether a presigned upload may be issued for this MIME type
pub fn is_presignable_mime(mime: &str) -> bool {
    PRESIGN_MIME_REGEX.is_match(mime)
}

/// Whether an image attached to an article form is accepted
pub fn is_article_image_mime(mime: &str) -> bool {
    ARTICLE_IMAGE_MIME_REGEX.is_match(mime)
}

/// `<prefix>-<unix millis>-<random>`, unique enough for object keys
pub fn unique_object_name(prefix: &str) -> String {
    let suffix: u32 = rand::thread_rng().gen_range(0..=1_000_000_000);
    format!("{}-{}-{}", prefix, Utc::now().timestamp_millis(), suffix)
}

/// Object key with the extension matching `mime`
pub fn object_key_for(prefix: &str, mime: &str) -> Option<String> {
    let extension = extension_for_mime(mime)?;
    Some(format!("{}.{}", unique_object_name(prefix), extension))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
    Gif,
    Bmp,
    Webp,
    Tiff,
    Svg,
}

impl ImageFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Png => "png",
            ImageFormat::Gif => "gif",
            ImageFormat::Bmp => "bmp",
            ImageFormat::Webp => "webp",
            ImageFormat::Tiff => "tiff",
            ImageFormat::Svg => "svg",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
            ImageFormat::Gif => "image/gif",
            ImageFormat::Bmp => "image/bmp",
            ImageFormat::Webp => "image/webp",
            ImageFormat::Tiff => "image/tiff",
            ImageFormat::Svg => "image/svg+xml",
        }
    }

    /// Detect format from file content
    pub fn detect(data: &[u8]) -> Result<Self> {
        if data.len() < 8 {
            return Err(anyhow!("File too small to determine format"));
        }

        if data.starts_with(JPEG_MAGIC) {
            Ok(ImageFormat::Jpeg)
        } else if data.starts_with(PNG_MAGIC) {
            Ok(ImageFormat::Png)
        } else if data.starts_with(GIF_MAGIC) {
            Ok(ImageFormat::Gif)
        } else if data.starts_with(WEBP_MAGIC) && data.len() >= 12 && &data[8..12] == b"WEBP" {
            Ok(ImageFormat::Webp)
        } else if data.starts_with(TIFF_LE_MAGIC) || data.starts_with(TIFF_BE_MAGIC) {
            Ok(ImageFormat::Tiff)
        } else if data.starts_with(BMP_MAGIC) {
            Ok(ImageFormat::Bmp)
        } else if data.starts_with(SVG_MAGIC) || data.starts_with(SVG_MAGIC_ALT) {
            Ok(ImageFormat::Svg)
        } else {
            Err(anyhow!("Unsupported image format"))
        }
    }
}

#[derive(Debug, Clone)]
pub struct ImageMetadata {
    pub format: ImageFormat,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub size: usize,
}

/// Identify uploaded image bytes. Dimensions are best effort.
pub fn inspect_image(data: &[u8]) -> Result<ImageMetadata> {
    let format = ImageFormat::detect(data)?;

    let (width, height) = match format {
        ImageFormat::Svg => (None, None),
        _ => match image::load_from_memory(data) {
            Ok(img) => {
                let (w, h) = img.dimensions();
                (Some(w), Some(h))
            }
            Err(_) => (None, None),
        },
    };

    Ok(ImageMetadata {
        format,
        width,
        height,
        size: data.len(),
    })
}
