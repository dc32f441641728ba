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


use crate::configuration::HeadersConfig;
use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, HeaderName, HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

/// Headers sent on every response whatever the configuration says
const FIXED_HEADERS: &[(&str, &str)] = &[
    ("x-dns-prefetch-control", "off"),
    ("x-download-options", "noopen"),
    ("x-permitted-cross-domain-policies", "none"),
    ("cross-origin-opener-policy", "same-origin"),
    ("cross-origin-resource-policy", "same-site"),
];

fn set(headers: &mut HeaderMap, name: HeaderName, value: &str) {
    match HeaderValue::from_str(value) {
        Ok(value) => {
            headers.insert(name, value);
        }
        Err(_) => tracing::warn!(header = %name, "Skipping invalid security header value"),
    }
}

fn set_enabled(headers: &mut HeaderMap, enabled: bool, name: HeaderName, value: Option<&String>) {
    if let (true, Some(value)) = (enabled, value) {
        set(headers, name, value);
    }
}

/// Policy for stored objects, so uploaded SVG or HTML never runs as our origin
pub const MEDIA_CSP: &str = "default-src 'none'; img-src 'self'; style-src 'unsafe-inline'; sandbox";

/// Apply the configured security headers to a response's header map.
/// A policy already set on the response is kept.
pub fn apply_security_headers(headers: &mut HeaderMap, config: &HeadersConfig) {
    if !headers.contains_key(header::CONTENT_SECURITY_POLICY) {
        set_enabled(
            headers,
            config.enable_csp,
            header::CONTENT_SECURITY_POLICY,
            config.csp_content.as_ref(),
        );
    }
    set_enabled(
        headers,
        config.enable_hsts,
        header::STRICT_TRANSPORT_SECURITY,
        config.hsts_content.as_ref(),
    );
    set_enabled(
        headers,
        config.enable_frame_options,
        header::X_FRAME_OPTIONS,
        config.frame_options_content.as_ref(),
    );

    if config.enable_content_type_options {
        headers.insert(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        );
    }
    if let Some(policy) = &config.referrer_policy {
        set(headers, header::REFERRER_POLICY, policy);
    }
    if let Some(policy) = &config.permissions_policy {
        set(headers, HeaderName::from_static("permissions-policy"), policy);
    }

    for (name, value) in FIXED_HEADERS {
        headers.insert(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        );
    }
    headers.remove("x-powered-by");
}

pub async fn security_headers_middleware(
    State(config): State<Arc<HeadersConfig>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;
    apply_security_headers(response.headers_mut(), &config);
    response
}

/// Sandboxes responses served out of the object store
pub async fn media_headers_middleware(request: Request<Body>, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_SECURITY_POLICY,
        HeaderValue::from_static(MEDIA_CSP),
    );
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    response
}
