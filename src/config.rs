use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationError, ValidationErrors};

const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";
const DEFAULT_POSTGREST_TABLE: &str = "pedidos";
const DEFAULT_POSTGREST_TIMEOUT_SECS: u64 = 10;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_SSE_KEEP_ALIVE_SECS: u64 = 15;
const DEFAULT_SSE_SUBSCRIBER_BUFFER: usize = 64;
const DEFAULT_PING_MESSAGE: &str = "ping";

/// Which external table, if any, mirrors the live order store.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MirrorBackend {
    #[default]
    None,
    Postgrest,
    Database,
}

/// Application configuration
#[derive(Clone, Debug, Deserialize, Validate)]
pub struct AppConfig {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Application environment
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    #[validate(custom = "validate_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// CORS: comma-separated list of allowed origins
    #[serde(default)]
    pub cors_allowed_origins: Option<String>,

    /// Allow permissive CORS outside development
    #[serde(default)]
    pub cors_allow_any_origin: bool,

    #[serde(default)]
    pub mirror_backend: MirrorBackend,

    /// Base URL of the PostgREST service, without the `/rest/v1` suffix
    #[serde(default)]
    pub postgrest_url: Option<String>,

    #[serde(default)]
    pub postgrest_api_key: Option<String>,

    #[serde(default = "default_postgrest_table")]
    #[validate(length(min = 1))]
    pub postgrest_table: String,

    #[serde(default = "default_postgrest_timeout_secs")]
    #[validate(range(min = 1))]
    pub postgrest_timeout_secs: u64,

    /// Send the board column as `board_status`; the table must have that column
    #[serde(default)]
    pub postgrest_board_status: bool,

    /// Connection URL for the `database` mirror backend
    #[serde(default)]
    pub database_url: Option<String>,

    #[serde(default = "default_db_max_connections")]
    #[validate(range(min = 1))]
    pub db_max_connections: u32,

    /// Load mirrored rows into memory at boot
    #[serde(default = "default_true")]
    pub hydrate_on_startup: bool,

    #[serde(default = "default_sse_keep_alive_secs")]
    #[validate(range(min = 1))]
    pub sse_keep_alive_secs: u64,

    /// Per-subscriber queue depth before a slow client is dropped
    #[serde(default = "default_sse_subscriber_buffer")]
    #[validate(range(min = 1, message = "sse_subscriber_buffer must be greater than 0"))]
    pub sse_subscriber_buffer: usize,

    #[serde(default = "default_ping_message")]
    pub ping_message: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: DEFAULT_PORT,
            environment: default_environment(),
            log_level: default_log_level(),
            log_json: false,
            cors_allowed_origins: None,
            cors_allow_any_origin: false,
            mirror_backend: MirrorBackend::None,
            postgrest_url: None,
            postgrest_api_key: None,
            postgrest_table: default_postgrest_table(),
            postgrest_timeout_secs: DEFAULT_POSTGREST_TIMEOUT_SECS,
            postgrest_board_status: false,
            database_url: None,
            db_max_connections: DEFAULT_DB_MAX_CONNECTIONS,
            hydrate_on_startup: true,
            sse_keep_alive_secs: DEFAULT_SSE_KEEP_ALIVE_SECS,
            sse_subscriber_buffer: DEFAULT_SSE_SUBSCRIBER_BUFFER,
            ping_message: default_ping_message(),
        }
    }
}

impl AppConfig {
    /// Checks if running in development environment
    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }

    /// Returns true if explicit CORS origins are configured
    pub fn has_cors_allowed_origins(&self) -> bool {
        self.cors_allowed_origins
            .as_ref()
            .map(|raw| raw.split(',').any(|origin| !origin.trim().is_empty()))
            .unwrap_or(false)
    }

    /// Whether we should fall back to permissive CORS
    pub fn should_allow_permissive_cors(&self) -> bool {
        self.is_development() || self.cors_allow_any_origin
    }

    pub fn postgrest_timeout(&self) -> Duration {
        Duration::from_secs(self.postgrest_timeout_secs)
    }

    pub fn sse_keep_alive(&self) -> Duration {
        Duration::from_secs(self.sse_keep_alive_secs)
    }

    fn validate_additional_constraints(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if !self.should_allow_permissive_cors() && !self.has_cors_allowed_origins() {
            let mut err = ValidationError::new("cors_allowed_origins_required");
            err.message = Some(
                "Set APP__CORS_ALLOWED_ORIGINS for non-development environments or explicitly opt-in via APP__CORS_ALLOW_ANY_ORIGIN=true".into(),
            );
            errors.add("cors_allowed_origins", err);
        }

        match self.mirror_backend {
            MirrorBackend::Postgrest => {
                if is_blank(&self.postgrest_url) {
                    errors.add(
                        "postgrest_url",
                        required_for_backend("postgrest_url", MirrorBackend::Postgrest),
                    );
                }
                if is_blank(&self.postgrest_api_key) {
                    errors.add(
                        "postgrest_api_key",
                        required_for_backend("postgrest_api_key", MirrorBackend::Postgrest),
                    );
                }
            }
            MirrorBackend::Database => {
                if is_blank(&self.database_url) {
                    errors.add(
                        "database_url",
                        required_for_backend("database_url", MirrorBackend::Database),
                    );
                }
            }
            MirrorBackend::None => {}
        }

        if errors.errors().is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Configuration loading failed: {0}")]
    Load(#[from] ConfigError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_environment() -> String {
    DEFAULT_ENV.to_string()
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_postgrest_table() -> String {
    DEFAULT_POSTGREST_TABLE.to_string()
}

fn default_postgrest_timeout_secs() -> u64 {
    DEFAULT_POSTGREST_TIMEOUT_SECS
}

fn default_db_max_connections() -> u32 {
    DEFAULT_DB_MAX_CONNECTIONS
}

fn default_true() -> bool {
    true
}

fn default_sse_keep_alive_secs() -> u64 {
    DEFAULT_SSE_KEEP_ALIVE_SECS
}

fn default_sse_subscriber_buffer() -> usize {
    DEFAULT_SSE_SUBSCRIBER_BUFFER
}

fn default_ping_message() -> String {
    DEFAULT_PING_MESSAGE.to_string()
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

fn required_for_backend(field: &'static str, backend: MirrorBackend) -> ValidationError {
    let mut err = ValidationError::new("required_for_mirror_backend");
    err.message = Some(format!("{} is required when mirror_backend = {}", field, backend).into());
    err
}

/// Validates log level values
fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if valid_levels.contains(&level.to_lowercase().as_str()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("log_level");
        err.message = Some("Must be one of: trace, debug, info, warn, error".into());
        Err(err)
    }
}

/// Initializes tracing using the provided log level as the default filter
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::fmt;

    let default_directive = format!("braip_tracker={},tower_http=debug", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    if json {
        let _ = fmt().with_env_filter(filter_directive).json().try_init();
    } else {
        let _ = fmt().with_env_filter(filter_directive).try_init();
    }
}

/// Loads application configuration
///
/// Layers configuration sources in this order:
/// 1. Built-in defaults
/// 2. Default config (config/default.toml)
/// 3. Environment-specific config (config/{env}.toml)
/// 4. Environment variables (APP__*)
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    // Support both RUN_ENV and APP_ENV for selecting config profile
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!("Loading configuration for environment: {}", run_env);

    if !Path::new(CONFIG_DIR).exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            CONFIG_DIR
        );
    }

    let config = Config::builder()
        .set_default("host", "0.0.0.0")?
        .set_default("port", DEFAULT_PORT as i64)?
        .set_default("environment", run_env.as_str())?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, run_env)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    let app_config: AppConfig = config.try_deserialize()?;

    app_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    app_config.validate_additional_constraints().map_err(|e| {
        error!("Configuration cross-field validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    info!(
        mirror = %app_config.mirror_backend,
        "Configuration loaded successfully"
    );
    Ok(app_config)
}

#[cfg(test)]
mod cors_validation_tests {
    use super::*;

    fn base_config() -> AppConfig {
        AppConfig {
            environment: "production".into(),
            ..AppConfig::default()
        }
    }

    #[test]
    fn non_dev_requires_cors_origins() {
        let cfg = base_config();
        assert!(cfg.validate_additional_constraints().is_err());
    }

    #[test]
    fn non_dev_allows_override_flag() {
        let mut cfg = base_config();
        cfg.cors_allow_any_origin = true;
        assert!(cfg.validate_additional_constraints().is_ok());
    }

    #[test]
    fn non_dev_with_origins_passes() {
        let mut cfg = base_config();
        cfg.cors_allowed_origins = Some("https://painel.example.com".into());
        assert!(cfg.validate_additional_constraints().is_ok());
    }

    #[test]
    fn development_allows_permissive_by_default() {
        assert!(AppConfig::default().validate_additional_constraints().is_ok());
    }
}

#[cfg(test)]
mod mirror_validation_tests {
    use super::*;

    #[test]
    fn postgrest_backend_needs_url_and_key() {
        let cfg = AppConfig {
            mirror_backend: MirrorBackend::Postgrest,
            postgrest_url: Some("https://xyz.supabase.co".into()),
            ..AppConfig::default()
        };
        let errors = cfg.validate_additional_constraints().unwrap_err();
        let fields: Vec<_> = errors.field_errors().into_keys().collect();
        assert_eq!(fields, vec!["postgrest_api_key"]);
    }

    #[test]
    fn database_backend_needs_url() {
        let cfg = AppConfig {
            mirror_backend: MirrorBackend::Database,
            database_url: Some("  ".into()),
            ..AppConfig::default()
        };
        assert!(cfg.validate_additional_constraints().is_err());
    }

    #[test]
    fn zero_subscriber_buffer_is_rejected() {
        let cfg = AppConfig {
            sse_subscriber_buffer: 0,
            ..AppConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn unknown_log_level_is_rejected() {
        let cfg = AppConfig {
            log_level: "verbose".into(),
            ..AppConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn backend_names_deserialize_lowercase() {
        let backend: MirrorBackend = serde_json::from_str("\"postgrest\"").unwrap();
        assert_eq!(backend, MirrorBackend::Postgrest);
    }
}
