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


//! Loading configuration from files and an environment lookup

use anyhow::Result;
use gazette_web::configuration::{parser, Configuration};
use std::collections::HashMap;
use std::{fs, io::Write};
use tempfile::{NamedTempFile, TempDir};

fn env_of(vars: &[(&str, &str)]) -> HashMap<String, String> {
    vars.iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn build(vars: &[(&str, &str)], toml: &parser::TomlConfig) -> Result<Configuration> {
    let env = env_of(vars);
    Configuration::from_sources(&|key: &str| env.get(key).cloned(), toml)
}

#[test]
fn test_configuration_precedence_complete_flow() -> Result<()> {
    let dir = TempDir::new()?;
    let home = dir.path().join("home");
    fs::create_dir_all(&home)?;

    fs::write(
        home.join(".gazette.toml"),
        r#"
host = "127.0.0.1"
port = 4000
cache_ttl_seconds = 1200
cache_refresh_threshold_seconds = 900
mail_sender = "desk@gazette.example"
"#,
    )?;

    let explicit = dir.path().join("override.toml");
    fs::write(
        &explicit,
        r#"
port = 4500
writer_email_domain = "newsroom.example"
"#,
    )?;

    let paths = parser::get_config_file_paths(
        Some(home.to_string_lossy().into_owned()),
        Some(explicit.to_string_lossy().into_owned()),
    );
    assert_eq!(paths.len(), 3);
    assert_eq!(paths[0].to_string_lossy(), "/etc/gazette.toml");

    // The system file is skipped when absent
    let toml = parser::load_toml_config(&paths[1..])?;
    let config = build(&[("PORT", "5000"), ("CACHE_ENABLED", "false")], &toml)?;

    assert_eq!(config.server.host, "127.0.0.1");
    assert_eq!(config.server.port, 5000);
    assert!(!config.cache.enabled);
    assert_eq!(config.cache.ttl_seconds, 1200);
    assert_eq!(config.cache.refresh_threshold_seconds, 900);
    assert_eq!(config.mail.sender, "desk@gazette.example");
    assert_eq!(
        config.roles.writer_email_domain.as_deref(),
        Some("newsroom.example")
    );
    assert_eq!(config.bind_addr(), "127.0.0.1:5000");
    Ok(())
}

#[test]
fn test_configuration_partial_files_and_defaults() -> Result<()> {
    let mut file = NamedTempFile::new()?;
    writeln!(file, "max_upload_size = 2048")?;

    let toml = parser::load_toml_config(&[file.path().to_path_buf()])?;
    let config = build(&[], &toml)?;

    assert_eq!(config.upload.max_size, 2048);
    assert_eq!(config.server.port, 3000);
    assert_eq!(config.session.timeout_minutes, 1440);
    assert_eq!(config.cache.ttl_seconds, 3600);
    assert_eq!(config.cache.refresh_threshold_seconds, 3000);
    assert_eq!(config.cache.refresh_interval_seconds, None);
    assert_eq!(config.rate_limit.login_attempts_per_minute, 5);
    Ok(())
}

#[test]
fn test_configuration_file_error_handling() -> Result<()> {
    let mut file = NamedTempFile::new()?;
    writeln!(file, "port = \"not a number\"")?;
    assert!(parser::load_toml_config(&[file.path().to_path_buf()]).is_err());

    let mut unknown = NamedTempFile::new()?;
    writeln!(unknown, "templates_dir = \"templates\"")?;
    assert!(parser::load_toml_config(&[unknown.path().to_path_buf()]).is_err());
    Ok(())
}

#[test]
fn test_configuration_rejects_inconsistent_cache_timings() -> Result<()> {
    let toml = parser::parse_toml_str(
        r#"
cache_ttl_seconds = 100
cache_refresh_threshold_seconds = 200
"#,
    )?;

    let err = build(&[], &toml).unwrap_err();
    assert!(err.to_string().contains("must be lower than"));
    Ok(())
}

#[test]
fn test_configuration_complex_security_headers() -> Result<()> {
    let toml = parser::parse_toml_str(
        r#"
security_headers_hsts = false
security_headers_csp_content = "default-src 'none'"
security_frame_options_content = "SAMEORIGIN"
cors_allowed_origins = ["https://app.gazette.example"]
"#,
    )?;
    let config = build(
        &[(
            "CORS_ALLOWED_ORIGINS",
            "https://a.example, https://b.example",
        )],
        &toml,
    )?;

    let headers = &config.security.headers;
    assert!(!headers.enable_hsts);
    assert!(headers.enable_csp);
    assert_eq!(headers.csp_content.as_deref(), Some("default-src 'none'"));
    assert_eq!(headers.frame_options_content.as_deref(), Some("SAMEORIGIN"));
    assert_eq!(
        config.security.cors_allowed_origins,
        Some(vec![
            "https://a.example".to_string(),
            "https://b.example".to_string()
        ])
    );
    Ok(())
}

#[test]
fn test_storage_secret_is_not_serialized() -> Result<()> {
    let config = build(&[("STORAGE_SECRET", "top-secret")], &parser::TomlConfig::default())?;
    assert_eq!(config.storage.secret, "top-secret");

    let rendered = serde_json::to_string(&config)?;
    assert!(!rendered.contains("top-secret"));
    Ok(())
}
