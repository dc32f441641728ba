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


use anyhow::{bail, Context, Result};
use gazette_core::RolePolicy;
use serde::{Deserialize, Serialize};
use std::{env, str::FromStr, time::Duration};

pub mod defaults;
pub mod parser;

/// Main configuration structure containing all sub-configurations
///
/// # Example
///
/// ```rust,no_run
/// use gazette_web::configuration::Configuration;
///
/// let config = Configuration::load().expect("Failed to load configuration");
/// println!("Server running on: {}", config.bind_addr());
/// println!("Article cache TTL: {}s", config.cache.ttl_seconds);
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Configuration {
    pub server: ServerConfig,
    pub session: SessionConfig,
    pub upload: UploadConfig,
    pub storage: StorageConfig,
    pub cache: CacheConfig,
    pub rate_limit: RateLimitConfig,
    pub security: SecurityConfig,
    pub mail: MailConfig,
    pub roles: RolePolicy,
    pub database_url: String,
    pub development_mode: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionConfig {
    pub timeout_minutes: i64,
    pub secure_cookies: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UploadConfig {
    pub max_size: usize,
}

/// Object store settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Directory holding the stored objects
    pub root: String,
    /// Base URL objects are served under, without a trailing slash
    pub public_url: String,
    /// Key for presigned upload signatures
    #[serde(skip_serializing)]
    pub secret: String,
    pub presign_expiry_seconds: u64,
}

/// Article cache settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    pub enabled: bool,
    pub ttl_seconds: u64,
    pub refresh_threshold_seconds: u64,
    /// Period of the scheduled refresh task, none to disable it
    pub refresh_interval_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    pub login_attempts_per_minute: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SecurityConfig {
    pub headers: HeadersConfig,
    pub cors_allowed_origins: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HeadersConfig {
    pub enable_hsts: bool,
    pub enable_csp: bool,
    pub enable_frame_options: bool,
    pub enable_content_type_options: bool,
    pub csp_content: Option<String>,
    pub hsts_content: Option<String>,
    pub frame_options_content: Option<String>,
    pub referrer_policy: Option<String>,
    pub permissions_policy: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MailConfig {
    /// Public base URL used to build verification links
    pub base_url: String,
    pub sender: String,
}

/// Resolves one setting from the environment, then TOML, then the default
struct Sources<'a> {
    env: &'a dyn Fn(&str) -> Option<String>,
    toml: &'a parser::TomlConfig,
}

impl<'a> Sources<'a> {
    fn value<T>(&self, key: &str, toml_value: Option<T>, default: T) -> Result<T>
    where
        T: FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        match (self.env)(key) {
            Some(raw) => raw
                .trim()
                .parse()
                .with_context(|| format!("Invalid {} environment variable", key)),
            None => Ok(toml_value.unwrap_or(default)),
        }
    }

    fn string(&self, key: &str, toml_value: Option<&String>, default: String) -> String {
        (self.env)(key)
            .or_else(|| toml_value.cloned())
            .unwrap_or(default)
    }

    fn optional_string(
        &self,
        key: &str,
        toml_value: Option<&String>,
        default: Option<String>,
    ) -> Option<String> {
        (self.env)(key)
            .or_else(|| toml_value.cloned())
            .or(default)
            .filter(|v| !v.trim().is_empty())
    }
}

impl Configuration {
    /// Load configuration from the process environment and configuration files
    ///
    /// Configuration loading order (later sources override earlier ones):
    /// 1. Default values
    /// 2. /etc/gazette.toml (if exists)
    /// 3. ~/.gazette.toml (if exists)
    /// 4. $GAZETTE_CONFIG (if set)
    /// 5. Environment variables
    pub fn load() -> Result<Self> {
        let paths =
            parser::get_config_file_paths(env::var("HOME").ok(), env::var("GAZETTE_CONFIG").ok());
        let toml_config = parser::load_toml_config(&paths)?;
        Self::from_sources(&|key: &str| env::var(key).ok(), &toml_config)
    }

    /// Build a configuration from an environment lookup and merged TOML values
    pub fn from_sources(
        env: &dyn Fn(&str) -> Option<String>,
        toml: &parser::TomlConfig,
    ) -> Result<Self> {
        let src = Sources { env, toml };

        let server = ServerConfig {
            host: src.string("HOST", toml.host.as_ref(), defaults::default_host()),
            port: src.value("PORT", toml.port, defaults::default_port())?,
        };

        let session = SessionConfig {
            timeout_minutes: src.value(
                "SESSION_TIMEOUT_MINUTES",
                toml.session_timeout_minutes,
                defaults::default_session_timeout_minutes(),
            )?,
            secure_cookies: src.value(
                "SECURE_COOKIES",
                toml.secure_cookies,
                defaults::default_secure_cookies(),
            )?,
        };

        let upload = UploadConfig {
            max_size: src.value(
                "MAX_UPLOAD_SIZE",
                toml.max_upload_size,
                defaults::default_max_upload_size(),
            )?,
        };

        let storage = StorageConfig {
            root: src.string(
                "STORAGE_ROOT",
                toml.storage_root.as_ref(),
                defaults::default_storage_root(),
            ),
            public_url: src
                .string(
                    "STORAGE_PUBLIC_URL",
                    toml.storage_public_url.as_ref(),
                    defaults::default_storage_public_url(),
                )
                .trim_end_matches('/')
                .to_string(),
            secret: src.string(
                "STORAGE_SECRET",
                toml.storage_secret.as_ref(),
                defaults::default_storage_secret(),
            ),
            presign_expiry_seconds: src.value(
                "PRESIGN_EXPIRY_SECONDS",
                toml.presign_expiry_seconds,
                defaults::default_presign_expiry_seconds(),
            )?,
        };

        let refresh_interval_seconds = match env("CACHE_REFRESH_INTERVAL_SECONDS") {
            Some(raw) if raw.trim().is_empty() || raw.trim() == "0" => None,
            Some(raw) => Some(
                raw.trim()
                    .parse()
                    .context("Invalid CACHE_REFRESH_INTERVAL_SECONDS environment variable")?,
            ),
            None => toml
                .cache_refresh_interval_seconds
                .or_else(defaults::default_cache_refresh_interval_seconds)
                .filter(|secs| *secs > 0),
        };

        let cache = CacheConfig {
            enabled: src.value(
                "CACHE_ENABLED",
                toml.cache_enabled,
                defaults::default_cache_enabled(),
            )?,
            ttl_seconds: src.value(
                "CACHE_TTL_SECONDS",
                toml.cache_ttl_seconds,
                defaults::default_cache_ttl_seconds(),
            )?,
            refresh_threshold_seconds: src.value(
                "CACHE_REFRESH_THRESHOLD_SECONDS",
                toml.cache_refresh_threshold_seconds,
                defaults::default_cache_refresh_threshold_seconds(),
            )?,
            refresh_interval_seconds,
        };

        let rate_limit = RateLimitConfig {
            login_attempts_per_minute: src.value(
                "RATE_LIMIT_LOGIN_ATTEMPTS",
                toml.rate_limit_login_attempts,
                defaults::default_login_attempts_per_minute(),
            )?,
        };

        let headers = HeadersConfig {
            enable_hsts: src.value(
                "SECURITY_HEADERS_HSTS",
                toml.security_headers_hsts,
                defaults::default_enable_hsts(),
            )?,
            enable_csp: src.value(
                "SECURITY_HEADERS_CSP",
                toml.security_headers_csp,
                defaults::default_enable_csp(),
            )?,
            enable_frame_options: src.value(
                "SECURITY_HEADERS_FRAME_OPTIONS",
                toml.security_headers_frame_options,
                defaults::default_enable_frame_options(),
            )?,
            enable_content_type_options: src.value(
                "SECURITY_HEADERS_CONTENT_TYPE_OPTIONS",
                toml.security_headers_content_type_options,
                defaults::default_enable_content_type_options(),
            )?,
            csp_content: src.optional_string(
                "SECURITY_HEADERS_CSP_CONTENT",
                toml.security_headers_csp_content.as_ref(),
                defaults::default_csp_content(),
            ),
            hsts_content: src.optional_string(
                "SECURITY_HSTS_CONTENT",
                toml.security_hsts_content.as_ref(),
                defaults::default_hsts_content(),
            ),
            frame_options_content: src.optional_string(
                "SECURITY_FRAME_OPTIONS_CONTENT",
                toml.security_frame_options_content.as_ref(),
                defaults::default_frame_options_content(),
            ),
            referrer_policy: src.optional_string(
                "SECURITY_REFERRER_POLICY",
                toml.security_referrer_policy.as_ref(),
                defaults::default_referrer_policy(),
            ),
            permissions_policy: src.optional_string(
                "SECURITY_PERMISSIONS_POLICY",
                toml.security_permissions_policy.as_ref(),
                defaults::default_permissions_policy(),
            ),
        };

        let cors_allowed_origins = env("CORS_ALLOWED_ORIGINS")
            .map(|origins| {
                origins
                    .split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect::<Vec<_>>()
            })
            .or_else(|| toml.cors_allowed_origins.clone())
            .or_else(defaults::default_cors_allowed_origins)
            .filter(|origins| !origins.is_empty());

        let mail = MailConfig {
            base_url: src
                .string(
                    "MAIL_BASE_URL",
                    toml.mail_base_url.as_ref(),
                    defaults::default_mail_base_url(),
                )
                .trim_end_matches('/')
                .to_string(),
            sender: src.string(
                "MAIL_SENDER",
                toml.mail_sender.as_ref(),
                defaults::default_mail_sender(),
            ),
        };

        let roles = RolePolicy::new(
            src.optional_string("ADMIN_EMAIL_DOMAIN", toml.admin_email_domain.as_ref(), None),
            src.optional_string(
                "WRITER_EMAIL_DOMAIN",
                toml.writer_email_domain.as_ref(),
                None,
            ),
        );

        let config = Self {
            server,
            session,
            upload,
            storage,
            cache,
            rate_limit,
            security: SecurityConfig {
                headers,
                cors_allowed_origins,
            },
            mail,
            roles,
            database_url: src.string(
                "DATABASE_URL",
                toml.database_url.as_ref(),
                defaults::default_database_url(),
            ),
            development_mode: src.value(
                "DEVELOPMENT_MODE",
                toml.development_mode,
                defaults::default_development_mode(),
            )?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject combinations the server cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.session.timeout_minutes <= 0 {
            bail!("SESSION_TIMEOUT_MINUTES must be positive");
        }
        if self.cache.ttl_seconds == 0 {
            bail!("CACHE_TTL_SECONDS must be positive");
        }
        if self.cache.refresh_threshold_seconds >= self.cache.ttl_seconds {
            bail!(
                "CACHE_REFRESH_THRESHOLD_SECONDS ({}) must be lower than CACHE_TTL_SECONDS ({})",
                self.cache.refresh_threshold_seconds,
                self.cache.ttl_seconds
            );
        }
        if self.rate_limit.login_attempts_per_minute == 0 {
            bail!("RATE_LIMIT_LOGIN_ATTEMPTS must be positive");
        }
        if self.storage.secret.is_empty() {
            bail!("STORAGE_SECRET must not be empty");
        }
        for (name, value) in [
            ("STORAGE_PUBLIC_URL", &self.storage.public_url),
            ("MAIL_BASE_URL", &self.mail.base_url),
        ] {
            url::Url::parse(value)
                .with_context(|| format!("{} is not a valid URL: {}", name, value))?;
        }
        Ok(())
    }

    /// Defaults only, ignoring the environment and configuration files
    pub fn defaults() -> Result<Self> {
        Self::from_sources(&|_: &str| None, &parser::TomlConfig::default())
    }

    /// Get the server bind address
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }

    pub fn refresh_threshold(&self) -> Duration {
        Duration::from_secs(self.refresh_threshold_seconds)
    }

    pub fn refresh_interval(&self) -> Option<Duration> {
        self.refresh_interval_seconds.map(Duration::from_secs)
    }
}
