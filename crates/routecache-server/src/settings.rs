//! Server settings.
//!
//! Sources, lowest precedence first:
//!
//! 1. `routecache.toml` (or any format `config` recognizes) in the working
//!    directory, if present
//! 2. an explicit file passed to [`Settings::load`]
//! 3. environment variables prefixed with `ROUTECACHE`, nested keys joined
//!    by `__` (e.g. `ROUTECACHE__SERVER__PORT=9000`)

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use config::{Config, Environment, File, FileFormat};
use routecache_core::{RouteError, RouteSyntax};
use serde::Deserialize;
use thiserror::Error;

use crate::service::RouteCacheBuilder;
use crate::store::StoreConfig;
use crate::RouteCache;

const DEFAULT_CONFIG_NAME: &str = "routecache";
const ENV_PREFIX: &str = "ROUTECACHE";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to load settings: {0}")]
    Load(#[from] config::ConfigError),

    #[error(transparent)]
    Routes(#[from] RouteError),

    #[error("invalid settings: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    /// Address syntax used by every subscription and publish.
    pub routes: RouteSyntax,
    /// In-memory store configuration.
    pub cache: StoreConfig,
    /// Delay before fresh data is produced on a miss, in milliseconds.
    pub fresh_data_delay_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings::default(),
            routes: RouteSyntax::default(),
            cache: StoreConfig::default(),
            fresh_data_delay_ms: 300,
        }
    }
}

impl Settings {
    /// Loads settings from the default file, `path` and the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, SettingsError> {
        let mut builder = Config::builder()
            .add_source(File::with_name(DEFAULT_CONFIG_NAME).required(false));

        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }

        builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

        Self::from_config(builder.build()?)
    }

    /// Parses settings from TOML text only.
    pub fn from_toml(contents: &str) -> Result<Self, SettingsError> {
        let config = Config::builder()
            .add_source(File::from_str(contents, FileFormat::Toml))
            .build()?;
        Self::from_config(config)
    }

    fn from_config(config: Config) -> Result<Self, SettingsError> {
        let settings: Settings = config.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Checks values the deserializer cannot.
    pub fn validate(&self) -> Result<(), SettingsError> {
        self.routes.validate()?;
        if self.cache.max_capacity == 0 {
            return Err(SettingsError::Invalid(
                "cache.max_capacity must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn fresh_data_delay(&self) -> Duration {
        Duration::from_millis(self.fresh_data_delay_ms)
    }

    /// Address the server binds to.
    pub fn socket_addr(&self) -> Result<SocketAddr, SettingsError> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| {
                SettingsError::Invalid(format!(
                    "cannot bind to {}:{}: {}",
                    self.server.host, self.server.port, e
                ))
            })
    }

    /// Builder for a [`RouteCache`] matching these settings.
    pub fn cache_builder(&self) -> RouteCacheBuilder {
        RouteCache::builder()
            .syntax(self.routes)
            .memory_store(self.cache.clone())
            .fresh_data_delay(self.fresh_data_delay())
    }
}
