//! Configuration management
//!
//! Configuration is read from `folio.yml` and may be overridden by
//! environment variables prefixed with `FOLIO_`. Missing values are filled
//! with defaults, so an absent or empty file is a valid configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Cache configuration
    #[serde(default)]
    pub cache: CacheConfig,
    /// Media storage configuration
    #[serde(default)]
    pub media: MediaConfig,
    /// Defaults applied to new articles
    #[serde(default)]
    pub content: ContentDefaults,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
    /// CORS allowed origin
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origin: default_cors_origin(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_cors_origin() -> String {
    "http://localhost:3000".to_string()
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database driver (sqlite or mysql)
    #[serde(default)]
    pub driver: DatabaseDriver,
    /// Database connection URL or SQLite file path
    #[serde(default = "default_database_url")]
    pub url: String,
    /// Upper bound on pooled connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            driver: DatabaseDriver::default(),
            url: default_database_url(),
            max_connections: default_max_connections(),
        }
    }
}

fn default_database_url() -> String {
    "data/folio.db".to_string()
}

fn default_max_connections() -> u32 {
    20
}

/// Database driver type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseDriver {
    /// SQLite (default)
    #[default]
    Sqlite,
    /// MySQL
    Mysql,
}

impl std::fmt::Display for DatabaseDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite => write!(f, "sqlite"),
            Self::Mysql => write!(f, "mysql"),
        }
    }
}

/// In-process cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Entry TTL in seconds. A read that finishes between an invalidation
    /// check and its cache fill can still store the old value; it is served
    /// until this TTL expires.
    #[serde(default = "default_ttl")]
    pub ttl_seconds: u64,
    /// Maximum number of cached entries
    #[serde(default = "default_max_capacity")]
    pub max_capacity: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: default_ttl(),
            max_capacity: default_max_capacity(),
        }
    }
}

fn default_ttl() -> u64 {
    3600
}

fn default_max_capacity() -> u64 {
    10_000
}

/// Media storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Root directory for stored files; `uploads/` lives beneath it
    #[serde(default = "default_media_path")]
    pub path: PathBuf,
    /// Maximum accepted file size in bytes (default: 50MB)
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    /// Extensions accepted for images (thumbnails, sponsor logos)
    #[serde(default = "default_image_extensions")]
    pub image_extensions: Vec<String>,
    /// Extra extensions accepted for asset content files
    #[serde(default = "default_video_extensions")]
    pub video_extensions: Vec<String>,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            path: default_media_path(),
            max_file_size: default_max_file_size(),
            image_extensions: default_image_extensions(),
            video_extensions: default_video_extensions(),
        }
    }
}

fn default_media_path() -> PathBuf {
    PathBuf::from("media")
}

fn default_max_file_size() -> u64 {
    50 * 1024 * 1024
}

fn default_image_extensions() -> Vec<String> {
    ["jpg", "jpeg", "png", "gif", "webp"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_video_extensions() -> Vec<String> {
    ["mp4", "avi", "webm"].iter().map(|s| s.to_string()).collect()
}

impl MediaConfig {
    /// Check if an extension is accepted for images
    pub fn is_image_extension(&self, ext: &str) -> bool {
        let ext = ext.to_ascii_lowercase();
        self.image_extensions.iter().any(|e| *e == ext)
    }

    /// Check if an extension is accepted for asset content (images or video)
    pub fn is_content_extension(&self, ext: &str) -> bool {
        let ext = ext.to_ascii_lowercase();
        self.is_image_extension(&ext) || self.video_extensions.iter().any(|e| *e == ext)
    }
}

/// Values filled into article fields the caller leaves out
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentDefaults {
    #[serde(default = "default_content_url")]
    pub content_url: String,
    #[serde(default = "default_byline")]
    pub byline: String,
    #[serde(default = "default_byline_link")]
    pub byline_link: String,
    #[serde(default = "default_body")]
    pub body: String,
    #[serde(default = "default_synopsis")]
    pub synopsis: String,
}

impl Default for ContentDefaults {
    fn default() -> Self {
        Self {
            content_url: default_content_url(),
            byline: default_byline(),
            byline_link: default_byline_link(),
            body: default_body(),
            synopsis: default_synopsis(),
        }
    }
}

fn default_content_url() -> String {
    "http://bainslabs.in".to_string()
}

fn default_byline() -> String {
    "Byline Goes here".to_string()
}

fn default_byline_link() -> String {
    "http://bainslabs.in/".to_string()
}

fn default_body() -> String {
    "article body".to_string()
}

fn default_synopsis() -> String {
    "article synopsis".to_string()
}

/// Error type for configuration parsing
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {message}")]
    ParseError { path: String, message: String },
}

impl Config {
    /// Load configuration from file
    ///
    /// A missing or empty file yields the default configuration.
    /// Invalid YAML is reported with its location.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.display().to_string(),
            source: e,
        })?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config =
            serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.display().to_string(),
                message: format_yaml_error(&e),
            })?;

        Ok(config)
    }

    /// Load configuration from file with environment variable overrides
    ///
    /// Recognised variables:
    /// - FOLIO_SERVER_HOST, FOLIO_SERVER_PORT, FOLIO_SERVER_CORS_ORIGIN
    /// - FOLIO_DATABASE_DRIVER, FOLIO_DATABASE_URL, FOLIO_DATABASE_MAX_CONNECTIONS
    /// - FOLIO_CACHE_TTL_SECONDS
    /// - FOLIO_MEDIA_PATH, FOLIO_MEDIA_MAX_FILE_SIZE
    pub fn load_with_env(path: &std::path::Path) -> anyhow::Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides; unparsable values are ignored
    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("FOLIO_SERVER_HOST") {
            self.server.host = host;
        }
        if let Some(port) = env_parse::<u16>("FOLIO_SERVER_PORT") {
            self.server.port = port;
        }
        if let Ok(cors_origin) = std::env::var("FOLIO_SERVER_CORS_ORIGIN") {
            self.server.cors_origin = cors_origin;
        }

        if let Ok(driver) = std::env::var("FOLIO_DATABASE_DRIVER") {
            match driver.to_lowercase().as_str() {
                "sqlite" => self.database.driver = DatabaseDriver::Sqlite,
                "mysql" => self.database.driver = DatabaseDriver::Mysql,
                _ => tracing::warn!("Ignoring unknown FOLIO_DATABASE_DRIVER '{}'", driver),
            }
        }
        if let Ok(url) = std::env::var("FOLIO_DATABASE_URL") {
            self.database.url = url;
        }
        if let Some(max) = env_parse::<u32>("FOLIO_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = max;
        }

        if let Some(ttl) = env_parse::<u64>("FOLIO_CACHE_TTL_SECONDS") {
            self.cache.ttl_seconds = ttl;
        }

        if let Ok(path) = std::env::var("FOLIO_MEDIA_PATH") {
            self.media.path = PathBuf::from(path);
        }
        if let Some(size) = env_parse::<u64>("FOLIO_MEDIA_MAX_FILE_SIZE") {
            self.media.max_file_size = size;
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

/// Format YAML parsing error with location and context
fn format_yaml_error(e: &serde_yaml::Error) -> String {
    if let Some(location) = e.location() {
        format!(
            "at line {}, column {}: {}",
            location.line(),
            location.column(),
            e
        )
    } else {
        e.to_string()
    }
}

// Shared by every test that touches FOLIO_* variables.
#[cfg(test)]
static CONFIG_ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());

#[cfg(test)]
const ENV_KEYS: &[&str] = &[
    "FOLIO_SERVER_HOST",
    "FOLIO_SERVER_PORT",
    "FOLIO_SERVER_CORS_ORIGIN",
    "FOLIO_DATABASE_DRIVER",
    "FOLIO_DATABASE_URL",
    "FOLIO_DATABASE_MAX_CONNECTIONS",
    "FOLIO_CACHE_TTL_SECONDS",
    "FOLIO_MEDIA_PATH",
    "FOLIO_MEDIA_MAX_FILE_SIZE",
];
