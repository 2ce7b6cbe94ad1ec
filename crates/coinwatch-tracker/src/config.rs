//! Application configuration.
//!
//! Sources, lowest precedence first:
//! 1. Built-in defaults
//! 2. TOML file (`--config` > `COINWATCH_CONFIG` > `config/default.toml`)
//! 3. Environment variables `COINWATCH__<SECTION>__<KEY>`
//!
//! [`AppConfig::validate`] turns the raw values into the immutable [`Settings`].

use crate::error::{AppError, AppResult};
use coinwatch_analysis::{AnalysisConfig, MAX_HISTORY_DAYS};
use coinwatch_core::{parse_coin_list, TrackingConfig};
use coinwatch_feed::{ClientConfig, RetryPolicy, DEFAULT_BASE_URL, DEFAULT_KEY_HEADER};
use coinwatch_persistence::{Backend, DatabaseSettings};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const CONFIG_ENV_VAR: &str = "COINWATCH_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";
pub const ENV_PREFIX: &str = "COINWATCH";

/// Coins tracked when none are configured.
pub const DEFAULT_COINS: &str = "bitcoin,ethereum,cardano,solana,ripple,polkadot,dogecoin";

/// Raw configuration as read from file and environment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub tracking: TrackingSection,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub analysis: AnalysisSection,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// postgresql, mysql or sqlite.
    #[serde(default = "default_backend")]
    pub backend: String,
    #[serde(default = "default_host")]
    pub host: String,
    /// Defaults to 5432 (PostgreSQL) or 3306 (MySQL).
    #[serde(default)]
    pub port: Option<u16>,
    /// Database name, or file path for SQLite.
    #[serde(default = "default_db_name")]
    pub name: String,
    /// Defaults to `postgres` (PostgreSQL) or `root` (MySQL).
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_op_timeout_secs")]
    pub op_timeout_secs: u64,
}

fn default_backend() -> String {
    "postgresql".to_string()
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_db_name() -> String {
    "crypto_tracker".to_string()
}

fn default_op_timeout_secs() -> u64 {
    10
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            host: default_host(),
            port: None,
            name: default_db_name(),
            user: None,
            password: None,
            op_timeout_secs: default_op_timeout_secs(),
        }
    }
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("backend", &self.backend)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("name", &self.name)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("op_timeout_secs", &self.op_timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingSection {
    /// Comma-separated coin ids.
    #[serde(default = "default_coins")]
    pub coins: String,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// 0 keeps every row.
    #[serde(default)]
    pub retention_days: u64,
}

fn default_coins() -> String {
    DEFAULT_COINS.to_string()
}

fn default_poll_interval_secs() -> u64 {
    3600
}

impl Default for TrackingSection {
    fn default() -> Self {
        Self {
            coins: default_coins(),
            poll_interval_secs: default_poll_interval_secs(),
            retention_days: 0,
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default = "default_key_header")]
    pub key_header: String,
    #[serde(default = "default_api_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub retry: RetryPolicy,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_key_header() -> String {
    DEFAULT_KEY_HEADER.to_string()
}

fn default_api_timeout_secs() -> u64 {
    10
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            key: None,
            key_header: default_key_header(),
            timeout_secs: default_api_timeout_secs(),
            retry: RetryPolicy::default(),
        }
    }
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("base_url", &self.base_url)
            .field("key", &self.key.as_ref().map(|_| "<redacted>"))
            .field("key_header", &self.key_header)
            .field("timeout_secs", &self.timeout_secs)
            .field("retry", &self.retry)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisSection {
    #[serde(default = "default_history_days")]
    pub history_days: u32,
}

fn default_history_days() -> u32 {
    coinwatch_analysis::DEFAULT_HISTORY_DAYS
}

impl Default for AnalysisSection {
    fn default() -> Self {
        Self {
            history_days: default_history_days(),
        }
    }
}

/// Telemetry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Prometheus metrics port; 0 disables the endpoint.
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,
    /// Log filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_metrics_port() -> u16 {
    9090
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            metrics_port: default_metrics_port(),
            log_level: default_log_level(),
        }
    }
}

/// Validated, immutable settings shared by the scheduler, store and engine.
#[derive(Debug, Clone)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub tracking: TrackingConfig,
    pub api: ClientConfig,
    pub analysis: AnalysisConfig,
    pub metrics_port: Option<u16>,
    pub log_level: String,
}

impl AppConfig {
    /// Resolve the config file path: explicit flag, then env var, then default.
    ///
    /// Returns the path and whether the file must exist.
    pub fn resolve_path(explicit: Option<&str>) -> (String, bool) {
        if let Some(path) = explicit {
            return (path.to_string(), true);
        }
        match std::env::var(CONFIG_ENV_VAR) {
            Ok(path) if !path.trim().is_empty() => (path, true),
            _ => (DEFAULT_CONFIG_PATH.to_string(), false),
        }
    }

    /// Load from the resolved file (if any) layered under the environment.
    pub fn load(explicit: Option<&str>) -> AppResult<Self> {
        let (path, required) = Self::resolve_path(explicit);
        if required && !Path::new(&path).exists() {
            return Err(AppError::Config(format!("config file not found: {path}")));
        }

        let built = Config::builder()
            .add_source(File::new(&path, FileFormat::Toml).required(required))
            .add_source(env_source())
            .build()?;
        Ok(built.try_deserialize()?)
    }

    /// Parse a TOML document, layered under `env` (in place of the process
    /// environment) when given.
    pub fn from_toml_str(
        content: &str,
        env: Option<std::collections::HashMap<String, String>>,
    ) -> AppResult<Self> {
        let mut builder = Config::builder().add_source(File::from_str(content, FileFormat::Toml));
        if let Some(vars) = env {
            builder = builder.add_source(env_source().source(Some(vars.into_iter().collect())));
        }
        Ok(builder.build()?.try_deserialize()?)
    }

    /// Validate every section and build [`Settings`].
    pub fn validate(&self) -> AppResult<Settings> {
        let database = self.database_settings()?;

        let coins = parse_coin_list(&self.tracking.coins);
        if coins.is_empty() {
            return Err(AppError::Config(
                "tracking.coins must list at least one coin".to_string(),
            ));
        }
        if self.tracking.poll_interval_secs == 0 {
            return Err(AppError::Config(
                "tracking.poll_interval_secs must be positive".to_string(),
            ));
        }
        if self.api.timeout_secs == 0 {
            return Err(AppError::Config(
                "api.timeout_secs must be positive".to_string(),
            ));
        }
        if self.tracking.retention_days > u64::from(MAX_HISTORY_DAYS) {
            return Err(AppError::Config(format!(
                "tracking.retention_days must be at most {MAX_HISTORY_DAYS}"
            )));
        }
        let retention = self.tracking.retention_days * 86_400;

        let tracking = TrackingConfig::new(
            coins,
            Duration::from_secs(self.tracking.poll_interval_secs),
            Duration::from_secs(retention),
            Duration::from_secs(self.api.timeout_secs),
        )
        .map_err(|e| AppError::Config(e.to_string()))?;

        if self.api.base_url.trim().is_empty() {
            return Err(AppError::Config("api.base_url must not be empty".to_string()));
        }
        if self.api.retry.max_attempts == 0 {
            return Err(AppError::Config(
                "api.retry.max_attempts must be at least 1".to_string(),
            ));
        }
        let api = ClientConfig {
            base_url: self.api.base_url.trim().to_string(),
            api_key: non_blank(self.api.key.as_deref()),
            key_header: self.api.key_header.clone(),
            timeout: tracking.api_timeout(),
            retry: self.api.retry.clone(),
        };

        if self.analysis.history_days == 0 || self.analysis.history_days > MAX_HISTORY_DAYS {
            return Err(AppError::Config(format!(
                "analysis.history_days must be between 1 and {MAX_HISTORY_DAYS}"
            )));
        }

        Ok(Settings {
            database,
            tracking,
            api,
            analysis: AnalysisConfig {
                history_days: self.analysis.history_days,
            },
            metrics_port: (self.telemetry.metrics_port != 0).then_some(self.telemetry.metrics_port),
            log_level: self.telemetry.log_level.clone(),
        })
    }

    fn database_settings(&self) -> AppResult<DatabaseSettings> {
        let db = &self.database;
        if db.backend.trim().is_empty() {
            return Err(AppError::Config("database.backend is not set".to_string()));
        }
        let backend: Backend = db
            .backend
            .parse()
            .map_err(|e: coinwatch_persistence::PersistenceError| AppError::Config(e.to_string()))?;

        if db.name.trim().is_empty() {
            return Err(AppError::Config("database.name must not be empty".to_string()));
        }
        if db.op_timeout_secs == 0 {
            return Err(AppError::Config(
                "database.op_timeout_secs must be positive".to_string(),
            ));
        }

        let user = non_blank(db.user.as_deref()).or_else(|| match backend {
            Backend::Postgresql => Some("postgres".to_string()),
            Backend::Mysql => Some("root".to_string()),
            Backend::Sqlite => None,
        });

        let settings = DatabaseSettings {
            backend,
            host: db.host.trim().to_string(),
            port: db.port,
            name: db.name.trim().to_string(),
            user,
            password: non_blank(db.password.as_deref()),
            op_timeout: Duration::from_secs(db.op_timeout_secs),
        };
        // Surface URL problems (bad host, etc.) at startup.
        settings
            .connection_url()
            .map_err(|e| AppError::Config(e.to_string()))?;
        Ok(settings)
    }
}

fn env_source() -> Environment {
    Environment::with_prefix(ENV_PREFIX).separator("__")
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
