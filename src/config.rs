/*
 * Responsibility
 * - Load gateway settings: YAML file first, then CHAT_GATEWAY_* env overrides
 * - Validate at startup (misconfiguration fails fast, never at request time)
 */
use std::fmt;
use std::net::SocketAddr;
use std::path::Path;

use figment::Figment;
use figment::providers::{Env, Format, Yaml};
use serde::Deserialize;

use crate::services::auth::identity::{RoleKind, is_header_safe};

/// Prefix for environment overrides. Nested keys use `__`,
/// e.g. `CHAT_GATEWAY_AUTHORITY__URL`.
pub const ENV_PREFIX: &str = "CHAT_GATEWAY_";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppEnv {
    #[default]
    Development,
    #[serde(alias = "prod")]
    Production,
}

impl AppEnv {
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Load(Box<figment::Error>),
    Missing(&'static str),
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Load(e) => write!(f, "failed to load configuration: {}", e),
            ConfigError::Missing(key) => write!(f, "missing configuration: {}", key),
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Load(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

impl From<figment::Error> for ConfigError {
    fn from(e: figment::Error) -> Self {
        ConfigError::Load(Box::new(e))
    }
}

/// One public front door (chat or admin API).
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub addr: SocketAddr,
    /// Business service the gated routes are relayed to.
    pub upstream_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthorityMode {
    #[default]
    Grpc,
    Static,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StaticToken {
    pub token: String,
    pub user_id: String,
    pub role: RoleKind,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthorityConfig {
    pub mode: AuthorityMode,
    /// gRPC endpoint of the token authority, e.g. `http://127.0.0.1:30200`.
    pub url: Option<String>,
    /// Deadline for one ParseToken round trip.
    pub timeout_ms: u64,
    pub connect_timeout_ms: u64,
    /// Token table for `mode: static`.
    pub tokens: Vec<StaticToken>,
}

impl Default for AuthorityConfig {
    fn default() -> Self {
        Self {
            mode: AuthorityMode::Grpc,
            url: None,
            timeout_ms: 5_000,
            connect_timeout_ms: 2_000,
            tokens: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub request_timeout_secs: u64,
    pub body_limit_bytes: usize,
    pub cors_allowed_origins: Vec<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
            body_limit_bytes: 1024 * 1024,
            cors_allowed_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub app_env: AppEnv,
    pub chat_api: ApiConfig,
    pub admin_api: ApiConfig,
    pub authority: AuthorityConfig,
    pub http: HttpConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_env: AppEnv::Development,
            chat_api: ApiConfig {
                addr: SocketAddr::from(([0, 0, 0, 0], 10008)),
                upstream_url: "http://127.0.0.1:10108".to_string(),
            },
            admin_api: ApiConfig {
                addr: SocketAddr::from(([0, 0, 0, 0], 10009)),
                upstream_url: "http://127.0.0.1:10109".to_string(),
            },
            authority: AuthorityConfig::default(),
            http: HttpConfig::default(),
        }
    }
}

impl Config {
    /// Read `path` (a missing file is treated as empty) and apply env overrides.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config: Config = Figment::new()
            .merge(Yaml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_http_url(&self.chat_api.upstream_url, "chat_api.upstream_url")?;
        check_http_url(&self.admin_api.upstream_url, "admin_api.upstream_url")?;

        match self.authority.mode {
            AuthorityMode::Grpc => {
                let url = self
                    .authority
                    .url
                    .as_deref()
                    .ok_or(ConfigError::Missing("authority.url"))?;
                check_http_url(url, "authority.url")?;
            }
            AuthorityMode::Static => {
                if self.authority.tokens.is_empty() {
                    return Err(ConfigError::Missing("authority.tokens"));
                }
                if self
                    .authority
                    .tokens
                    .iter()
                    .any(|t| t.token.is_empty() || !is_header_safe(&t.user_id))
                {
                    return Err(ConfigError::Invalid("authority.tokens"));
                }
            }
        }

        if self.authority.timeout_ms == 0 {
            return Err(ConfigError::Invalid("authority.timeout_ms"));
        }
        if self.authority.connect_timeout_ms == 0 {
            return Err(ConfigError::Invalid("authority.connect_timeout_ms"));
        }
        if self.http.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid("http.request_timeout_secs"));
        }

        Ok(())
    }
}

fn check_http_url(raw: &str, key: &'static str) -> Result<(), ConfigError> {
    let url = url::Url::parse(raw).map_err(|_| ConfigError::Invalid(key))?;
    match url.scheme() {
        "http" | "https" if url.host_str().is_some() => Ok(()),
        _ => Err(ConfigError::Invalid(key)),
    }
}
