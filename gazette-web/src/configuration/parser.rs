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


//! TOML configuration parser for Gazette
//!
//! Configuration files use flat keys (`port = 3000`, `cache_ttl_seconds = 600`).
//! Every field is optional so that partial files can be layered.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Raw TOML configuration with every field optional
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TomlConfig {
    // Server
    pub host: Option<String>,
    pub port: Option<u16>,
    pub database_url: Option<String>,
    pub development_mode: Option<bool>,

    // Session
    pub session_timeout_minutes: Option<i64>,
    pub secure_cookies: Option<bool>,

    // Upload
    pub max_upload_size: Option<usize>,

    // Object storage
    pub storage_root: Option<String>,
    pub storage_public_url: Option<String>,
    pub storage_secret: Option<String>,
    pub presign_expiry_seconds: Option<u64>,

    // Article cache
    pub cache_enabled: Option<bool>,
    pub cache_ttl_seconds: Option<u64>,
    pub cache_refresh_threshold_seconds: Option<u64>,
    pub cache_refresh_interval_seconds: Option<u64>,

    // Rate limiting
    pub rate_limit_login_attempts: Option<u32>,

    // Security headers
    pub security_headers_hsts: Option<bool>,
    pub security_headers_csp: Option<bool>,
    pub security_headers_frame_options: Option<bool>,
    pub security_headers_content_type_options: Option<bool>,
    pub security_headers_csp_content: Option<String>,
    pub security_hsts_content: Option<String>,
    pub security_frame_options_content: Option<String>,
    pub security_referrer_policy: Option<String>,
    pub security_permissions_policy: Option<String>,
    pub cors_allowed_origins: Option<Vec<String>>,

    // Mail
    pub mail_base_url: Option<String>,
    pub mail_sender: Option<String>,

    // Roles
    pub admin_email_domain: Option<String>,
    pub writer_email_domain: Option<String>,
}

/// Parse a TOML configuration file if it exists
pub fn parse_toml_file<P: AsRef<Path>>(path: P) -> Result<TomlConfig> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(TomlConfig::default());
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read configuration file: {}", path.display()))?;

    parse_toml_str(&content).with_context(|| {
        format!(
            "Failed to parse TOML configuration file: {}",
            path.display()
        )
    })
}

pub fn parse_toml_str(content: &str) -> Result<TomlConfig> {
    let config: TomlConfig = toml::from_str(content)?;
    Ok(config)
}

/// Get standard configuration file paths in order of precedence (lowest to highest)
pub fn get_config_file_paths(
    home: Option<String>,
    explicit: Option<String>,
) -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("/etc/gazette.toml")];

    if let Some(home) = home {
        paths.push(PathBuf::from(home).join(".gazette.toml"));
    }

    // $GAZETTE_CONFIG wins over the standard locations
    if let Some(explicit) = explicit.filter(|p| !p.trim().is_empty()) {
        paths.push(PathBuf::from(explicit));
    }

    paths
}

fn take<T>(target: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *target = value;
    }
}

/// Merge multiple TOML configurations, with later configs taking precedence
pub fn merge_toml_configs(configs: Vec<TomlConfig>) -> TomlConfig {
    let mut merged = TomlConfig::default();

    for config in configs {
        take(&mut merged.host, config.host);
        take(&mut merged.port, config.port);
        take(&mut merged.database_url, config.database_url);
        take(&mut merged.development_mode, config.development_mode);

        take(
            &mut merged.session_timeout_minutes,
            config.session_timeout_minutes,
        );
        take(&mut merged.secure_cookies, config.secure_cookies);
        take(&mut merged.max_upload_size, config.max_upload_size);

        take(&mut merged.storage_root, config.storage_root);
        take(&mut merged.storage_public_url, config.storage_public_url);
        take(&mut merged.storage_secret, config.storage_secret);
        take(
            &mut merged.presign_expiry_seconds,
            config.presign_expiry_seconds,
        );

        take(&mut merged.cache_enabled, config.cache_enabled);
        take(&mut merged.cache_ttl_seconds, config.cache_ttl_seconds);
        take(
            &mut merged.cache_refresh_threshold_seconds,
            config.cache_refresh_threshold_seconds,
        );
        take(
            &mut merged.cache_refresh_interval_seconds,
            config.cache_refresh_interval_seconds,
        );

        take(
            &mut merged.rate_limit_login_attempts,
            config.rate_limit_login_attempts,
        );

        take(&mut merged.security_headers_hsts, config.security_headers_hsts);
        take(&mut merged.security_headers_csp, config.security_headers_csp);
        take(
            &mut merged.security_headers_frame_options,
            config.security_headers_frame_options,
        );
        take(
            &mut merged.security_headers_content_type_options,
            config.security_headers_content_type_options,
        );
        take(
            &mut merged.security_headers_csp_content,
            config.security_headers_csp_content,
        );
        take(&mut merged.security_hsts_content, config.security_hsts_content);
        take(
            &mut merged.security_frame_options_content,
            config.security_frame_options_content,
        );
        take(
            &mut merged.security_referrer_policy,
            config.security_referrer_policy,
        );
        take(
            &mut merged.security_permissions_policy,
            config.security_permissions_policy,
        );
        take(&mut merged.cors_allowed_origins, config.cors_allowed_origins);

        take(&mut merged.mail_base_url, config.mail_base_url);
        take(&mut merged.mail_sender, config.mail_sender);
        take(&mut merged.admin_email_domain, config.admin_email_domain);
        take(&mut merged.writer_email_domain, config.writer_email_domain);
    }

    merged
}

/// Load and merge all TOML configuration files
pub fn load_toml_config(paths: &[PathBuf]) -> Result<TomlConfig> {
    let mut configs = Vec::with_capacity(paths.len());
    for path in paths {
        configs.push(parse_toml_file(path)?);
    }
    Ok(merge_toml_configs(configs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_missing_file_is_empty() -> Result<()> {
        let config = parse_toml_file("/nonexistent/gazette.toml")?;
        assert_eq!(config, TomlConfig::default());
        Ok(())
    }

    #[test]
    fn test_parse_flat_keys() -> Result<()> {
        let config = parse_toml_str(
            r#"
            host = "127.0.0.1"
            port = 8080
            cache_ttl_seconds = 600
            cache_refresh_threshold_seconds = 500
            cors_allowed_origins = ["https://gazette.example"]
            writer_email_domain = "gazette.example"
            "#,
        )?;

        assert_eq!(config.host.as_deref(), Some("127.0.0.1"));
        assert_eq!(config.port, Some(8080));
        assert_eq!(config.cache_ttl_seconds, Some(600));
        assert_eq!(config.cache_refresh_threshold_seconds, Some(500));
        assert_eq!(
            config.cors_allowed_origins,
            Some(vec!["https://gazette.example".to_string()])
        );
        assert_eq!(config.writer_email_domain.as_deref(), Some("gazette.example"));
        assert!(config.storage_secret.is_none());
        Ok(())
    }

    #[test]
    fn test_parse_rejects_unknown_keys() {
        assert!(parse_toml_str("sites_dir = \"/tmp\"").is_err());
    }

    #[test]
    fn test_parse_file_reports_path() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, "port = \"not a number\"")?;

        let err = parse_toml_file(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse TOML"));
        Ok(())
    }

    #[test]
    fn test_merge_later_wins() {
        let system = TomlConfig {
            host: Some("0.0.0.0".to_string()),
            port: Some(3000),
            cache_enabled: Some(true),
            ..Default::default()
        };
        let user = TomlConfig {
            port: Some(4000),
            cache_enabled: Some(false),
            ..Default::default()
        };

        let merged = merge_toml_configs(vec![system, user]);
        assert_eq!(merged.host.as_deref(), Some("0.0.0.0"));
        assert_eq!(merged.port, Some(4000));
        assert_eq!(merged.cache_enabled, Some(false));
    }

    #[test]
    fn test_config_file_paths() {
        let paths = get_config_file_paths(
            Some("/home/jane".to_string()),
            Some("/srv/gazette.toml".to_string()),
        );
        assert_eq!(
            paths,
            vec![
                PathBuf::from("/etc/gazette.toml"),
                PathBuf::from("/home/jane/.gazette.toml"),
                PathBuf::from("/srv/gazette.toml"),
            ]
        );

        let paths = get_config_file_paths(None, Some("  ".to_string()));
        assert_eq!(paths, vec![PathBuf::from("/etc/gazette.toml")]);
    }

    #[test]
    fn test_load_merges_files_in_order() -> Result<()> {
        let mut first = NamedTempFile::new()?;
        writeln!(first, "port = 3001\nmail_sender = \"desk@gazette.example\"")?;
        let mut second = NamedTempFile::new()?;
        writeln!(second, "port = 3002")?;

        let merged = load_toml_config(&[
            first.path().to_path_buf(),
            PathBuf::from("/nonexistent/gazette.toml"),
            second.path().to_path_buf(),
        ])?;
        assert_eq!(merged.port, Some(3002));
        assert_eq!(merged.mail_sender.as_deref(), Some("desk@gazette.example"));
        Ok(())
    }
}
