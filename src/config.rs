use std::{fs, path::{Path, PathBuf}, time::Duration};

use anyhow::{Error, Ok};
use serde::Deserialize;

use crate::{
    constants::{auth, defaults, upload},
    utils::parse_duration,
};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub cors: CorsConfig,
    /// When set, the route table is written here as JSON at startup.
    #[serde(default)]
    pub routes_export: Option<PathBuf>,
}

impl AppConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, anyhow::Error> {
        let content = fs::read_to_string(path)?;
        let config: AppConfig = serde_yaml::from_str(&content)?;
        config.auth.session_ttl()?;
        Ok(config)
    }
}

//      ---- Server

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_addr")]
    pub addr: String,
    /// Upper bound on a buffered request body, in bytes.
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: default_addr(),
            max_body_size: default_max_body_size(),
        }
    }
}

fn default_addr() -> String {
    defaults::ADDR.to_string()
}

fn default_max_body_size() -> usize {
    defaults::MAX_BODY_SIZE
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_log_level() }
    }
}

fn default_log_level() -> String {
    defaults::LOG_LEVEL.to_string()
}

//      ---- Auth

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
    #[serde(default = "default_session_ttl")]
    pub session_ttl: String, // 30m, 24h, 7d
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            cookie_name: default_cookie_name(),
            session_ttl: default_session_ttl(),
        }
    }
}

impl AuthConfig {
    pub fn session_ttl(&self) -> Result<Duration, Error> {
        parse_duration(&self.session_ttl)
            .map_err(|e| anyhow::anyhow!("invalid auth.session_ttl '{}': {}", self.session_ttl, e))
    }
}

fn default_cookie_name() -> String {
    auth::DEFAULT_COOKIE_NAME.to_string()
}

fn default_session_ttl() -> String {
    format!("{}s", auth::DEFAULT_SESSION_TTL_SECONDS)
}

//      ---- Upload

/// Options for `middleware::upload::validator`.
#[derive(Debug, Deserialize, Clone)]
pub struct UploadConfig {
    #[serde(default = "default_upload_field")]
    pub field: String,
    #[serde(default)]
    pub multiple: bool,
    /// Per-file limit in bytes; 0 disables the check.
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    /// Limit on the whole multipart body in bytes.
    #[serde(default = "default_max_memory")]
    pub max_memory: u64,
    /// Sniffed types that are accepted; empty accepts anything.
    #[serde(default)]
    pub allowed_mime_types: Vec<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            field: default_upload_field(),
            multiple: false,
            max_file_size: default_max_file_size(),
            max_memory: default_max_memory(),
            allowed_mime_types: Vec::new(),
        }
    }
}

impl UploadConfig {
    pub fn images() -> Self {
        Self {
            allowed_mime_types: ["image/jpeg", "image/png", "image/gif", "image/webp"]
                .map(String::from)
                .to_vec(),
            ..Self::default()
        }
    }
}

fn default_upload_field() -> String {
    upload::DEFAULT_FIELD.to_string()
}

fn default_max_file_size() -> u64 {
    upload::DEFAULT_MAX_FILE_SIZE
}

fn default_max_memory() -> u64 {
    upload::DEFAULT_MAX_MEMORY
}

//      ---- CORS

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    /// `*` allows any origin.
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
    #[serde(default = "default_allowed_methods")]
    pub allowed_methods: Vec<String>,
    #[serde(default = "default_allowed_headers")]
    pub allowed_headers: Vec<String>,
    #[serde(default)]
    pub allow_credentials: bool,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: default_allowed_origins(),
            allowed_methods: default_allowed_methods(),
            allowed_headers: default_allowed_headers(),
            allow_credentials: false,
        }
    }
}

fn default_allowed_origins() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_allowed_methods() -> Vec<String> {
    ["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"].map(String::from).to_vec()
}

fn default_allowed_headers() -> Vec<String> {
    ["Content-Type", "Authorization", "X-Request-ID"].map(String::from).to_vec()
}

//      Secrets Config
pub struct SecretsConfig  {
    pub jwt_secret: String
}

impl SecretsConfig {
    pub fn from_env() -> Result<Self, Error> {
        Ok(Self {
            jwt_secret: std::env::var("JWT_SECRET")
                .map_err(|_| anyhow::anyhow!("JWT_SECRET must be set in .env file"))?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config: AppConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config.server.addr, defaults::ADDR);
        assert_eq!(config.auth.cookie_name, "auth_token");
        assert_eq!(config.auth.session_ttl().unwrap(), Duration::from_secs(86_400));
        assert_eq!(config.upload.field, "file");
        assert!(config.upload.allowed_mime_types.is_empty());
        assert_eq!(config.cors.allowed_origins, vec!["*"]);
        assert!(config.routes_export.is_none());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
server:
  addr: "127.0.0.1:9000"
auth:
  cookie_name: sid
  session_ttl: 30m
upload:
  field: avatar
  multiple: true
  allowed_mime_types: [image/png]
routes_export: routes.json
"#
        )
        .unwrap();

        let config = AppConfig::load(file.path()).unwrap();
        assert_eq!(config.server.addr, "127.0.0.1:9000");
        assert_eq!(config.server.max_body_size, defaults::MAX_BODY_SIZE);
        assert_eq!(config.auth.session_ttl().unwrap(), Duration::from_secs(1800));
        assert_eq!(config.upload.field, "avatar");
        assert!(config.upload.multiple);
        assert_eq!(config.upload.allowed_mime_types, vec!["image/png"]);
        assert_eq!(config.routes_export, Some(PathBuf::from("routes.json")));
    }

    #[test]
    fn test_bad_session_ttl_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "auth:\n  session_ttl: forever\n").unwrap();
        assert!(AppConfig::load(file.path()).is_err());
    }

    #[test]
    fn test_overflowing_session_ttl_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "auth:\n  session_ttl: 300000000000000d\n").unwrap();
        let err = AppConfig::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("Duration too large"));
    }
}
