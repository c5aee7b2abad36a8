use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use tracing::info;
use validator::Validate;

const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 5000;
const CONFIG_DIR: &str = "config";

/// Session tokens live for two hours.
const DEFAULT_TOKEN_TTL_SECS: i64 = 7_200;
const DEFAULT_GATEWAY_BASE_URL: &str = "https://api.stripe.com";
const DEFAULT_GATEWAY_TIMEOUT_SECS: u64 = 10;

/// Application configuration, loaded once at startup and passed to each
/// component at construction. There are no ambient globals; every secret
/// lives here.
#[derive(Clone, Debug, Deserialize, Validate)]
pub struct AppConfig {
    /// Database connection URL
    pub database_url: String,

    /// JWT signing secret (never rotated during the process lifetime)
    #[validate(length(min = 32, message = "jwt_secret must be at least 32 characters"))]
    pub jwt_secret: String,

    /// Payment processor secret key
    #[validate(length(min = 1, message = "stripe_secret_key must not be empty"))]
    pub stripe_secret_key: String,

    /// Session token lifetime in seconds
    #[serde(default = "default_token_ttl")]
    pub token_ttl_secs: i64,

    /// Base URL of the payment processor API
    #[serde(default = "default_gateway_base_url")]
    pub gateway_base_url: String,

    /// Bound on how long a payment processor call may take
    #[serde(default = "default_gateway_timeout")]
    pub gateway_timeout_secs: u64,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Application environment
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Whether to run database migrations on startup
    #[serde(default)]
    pub auto_migrate: bool,

    /// Comma-separated list of allowed CORS origins
    #[serde(default)]
    pub cors_allowed_origins: Option<String>,

    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,

    #[serde(default = "default_db_min_connections")]
    pub db_min_connections: u32,
}

fn default_token_ttl() -> i64 {
    DEFAULT_TOKEN_TTL_SECS
}

fn default_gateway_base_url() -> String {
    DEFAULT_GATEWAY_BASE_URL.to_string()
}

fn default_gateway_timeout() -> u64 {
    DEFAULT_GATEWAY_TIMEOUT_SECS
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

fn default_db_max_connections() -> u32 {
    10
}

fn default_db_min_connections() -> u32 {
    1
}

impl AppConfig {
    pub fn is_development(&self) -> bool {
        self.environment == "development" || self.environment == "test"
    }
}

/// Loads configuration from `config/{default,<env>}` files (when present)
/// and `APP__`-prefixed environment variables. The required secrets have no
/// defaults: a process without `jwt_secret` or `stripe_secret_key` refuses
/// to start.
pub fn load_config() -> Result<AppConfig, ConfigError> {
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
        .set_default("database_url", "sqlite://carparts.db?mode=rwc")?
        .set_default("environment", run_env.as_str())?
        .add_source(File::with_name(&format!("{CONFIG_DIR}/default")).required(false))
        .add_source(File::with_name(&format!("{CONFIG_DIR}/{run_env}")).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    if config.get_string("jwt_secret").is_err() {
        return Err(ConfigError::Message(
            "jwt_secret is required: set APP__JWT_SECRET or add it to a config file".to_string(),
        ));
    }
    if config.get_string("stripe_secret_key").is_err() {
        return Err(ConfigError::Message(
            "stripe_secret_key is required: set APP__STRIPE_SECRET_KEY or add it to a config file"
                .to_string(),
        ));
    }

    let app_config: AppConfig = config.try_deserialize()?;
    app_config
        .validate()
        .map_err(|e| ConfigError::Message(format!("invalid configuration: {e}")))?;

    Ok(app_config)
}

/// Initializes the global tracing subscriber. `RUST_LOG` overrides the
/// configured level when set.
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::EnvFilter;

    let default_directive = format!("carparts_api={level},tower_http=debug");
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    let builder = tracing_subscriber::fmt().with_env_filter(EnvFilter::new(filter_directive));
    if json {
        let _ = builder.json().try_init();
    } else {
        let _ = builder.try_init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> AppConfig {
        AppConfig {
            database_url: "sqlite::memory:".to_string(),
            jwt_secret: "a".repeat(64),
            stripe_secret_key: "sk_test_123".to_string(),
            token_ttl_secs: DEFAULT_TOKEN_TTL_SECS,
            gateway_base_url: DEFAULT_GATEWAY_BASE_URL.to_string(),
            gateway_timeout_secs: DEFAULT_GATEWAY_TIMEOUT_SECS,
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            environment: "test".to_string(),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            log_json: false,
            auto_migrate: true,
            cors_allowed_origins: None,
            db_max_connections: 1,
            db_min_connections: 1,
        }
    }

    #[test]
    fn accepts_a_complete_configuration() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn rejects_a_short_signing_secret() {
        let mut cfg = base_config();
        cfg.jwt_secret = "short".to_string();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_an_empty_gateway_key() {
        let mut cfg = base_config();
        cfg.stripe_secret_key = String::new();
        assert!(cfg.validate().is_err());
    }
}
