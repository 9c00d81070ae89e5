use crate::core::schema::SubColumn;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub dataset: DatasetSettings,
    #[serde(default)]
    pub query: QuerySettings,
    #[serde(default)]
    pub schema: SchemaSettings,
    #[serde(default)]
    pub enrichment: EnrichmentSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub workers: Option<usize>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: None,
        }
    }
}

fn default_host() -> String { "127.0.0.1".to_string() }
fn default_port() -> u16 { 8501 }

/// Dataset loaded at startup, if it exists
#[derive(Debug, Clone, Deserialize)]
pub struct DatasetSettings {
    #[serde(default = "default_dataset_path")]
    pub path: String,
    pub sheet: Option<String>,
}

impl Default for DatasetSettings {
    fn default() -> Self {
        Self {
            path: default_dataset_path(),
            sheet: None,
        }
    }
}

fn default_dataset_path() -> String { "Sub_Plus_OT.xlsx".to_string() }

/// Radius bounds enforced by the HTTP layer
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct QuerySettings {
    #[serde(default = "default_radius")]
    pub default_radius_miles: f64,
    #[serde(default = "default_min_radius")]
    pub min_radius_miles: f64,
    #[serde(default = "default_max_radius")]
    pub max_radius_miles: f64,
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self {
            default_radius_miles: default_radius(),
            min_radius_miles: default_min_radius(),
            max_radius_miles: default_max_radius(),
        }
    }
}

impl QuerySettings {
    pub fn accepts(&self, radius_miles: f64) -> bool {
        radius_miles >= self.min_radius_miles && radius_miles <= self.max_radius_miles
    }
}

fn default_radius() -> f64 { 15.0 }
fn default_min_radius() -> f64 { 1.0 }
fn default_max_radius() -> f64 { 50.0 }

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct SchemaSettings {
    #[serde(default)]
    pub sub_column: SubColumn,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EnrichmentSettings {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_geocoder_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_geocoder_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_cache_size")]
    pub cache_size: u64,
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,
}

impl Default for EnrichmentSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: default_geocoder_endpoint(),
            user_agent: default_user_agent(),
            timeout_secs: default_geocoder_timeout(),
            cache_size: default_cache_size(),
            cache_ttl_secs: default_cache_ttl(),
        }
    }
}

fn default_geocoder_endpoint() -> String { "https://nominatim.openstreetmap.org".to_string() }
fn default_user_agent() -> String { format!("nearby-subs/{}", env!("CARGO_PKG_VERSION")) }
fn default_geocoder_timeout() -> u64 { 5 }
fn default_cache_size() -> u64 { 10_000 }
fn default_cache_ttl() -> u64 { 86_400 }

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "pretty".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Local overrides (config/local.toml)
    /// 4. Environment variables (prefixed with NEARBY__)
    pub fn load() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., NEARBY__SERVER__PORT -> server.port
            .add_source(env_source())
            .build()?
            .try_deserialize()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(env_source())
            .build()?
            .try_deserialize()
    }
}

fn env_source() -> Environment {
    Environment::with_prefix("NEARBY")
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}
