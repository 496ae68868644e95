//! Settings loading.
//!
//! Sources, later ones overriding earlier ones:
//! 1. built-in defaults
//! 2. a TOML file (`waybill.toml`, or the path in `WAYBILL_CONFIG`)
//! 3. environment variables `WAYBILL__SECTION__KEY`

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::TimeDelta;
use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use thiserror::Error;
use url::Url;
use waybill_application::RefreshPolicy;

use crate::auth::{ClientAuth, OAuth2TokenExchanger, TokenResponseFields};

/// Environment variable naming an explicit settings file.
pub const CONFIG_PATH_ENV: &str = "WAYBILL_CONFIG";

const DEFAULT_CONFIG_FILE: &str = "waybill.toml";
const ENV_PREFIX: &str = "WAYBILL";
const ENV_SEPARATOR: &str = "__";

/// Errors raised while loading settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A source could not be read or deserialized.
    #[error("failed to load settings: {0}")]
    Load(#[from] config::ConfigError),

    /// The settings were read but are not usable.
    #[error("invalid settings: {0}")]
    Invalid(String),
}

/// All gateway settings.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionSettings {
    /// Refresh timing.
    #[serde(default)]
    pub refresh: RefreshSettings,
    /// Identity provider token endpoint.
    pub provider: ProviderSettings,
    /// Where session records are kept.
    #[serde(default)]
    pub storage: StorageSettings,
    /// Listener.
    #[serde(default)]
    pub server: ServerSettings,
}

/// Refresh timing.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RefreshSettings {
    /// Tokens expiring within this many seconds are refreshed.
    pub skew_seconds: i64,
    /// Bound on one exchange call.
    pub timeout_ms: u64,
    /// Longest a lookup waits for an in-flight refresh.
    pub await_deadline_ms: Option<u64>,
    /// Refresh expiring-soon tokens off the request path.
    pub background: bool,
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self {
            skew_seconds: 30,
            timeout_ms: 10_000,
            await_deadline_ms: None,
            background: false,
        }
    }
}

impl RefreshSettings {
    /// The projector policy these settings describe.
    #[must_use]
    pub fn policy(&self) -> RefreshPolicy {
        RefreshPolicy {
            // Out-of-range skews are rejected by `validate`; saturate otherwise.
            skew: TimeDelta::try_seconds(self.skew_seconds).unwrap_or(TimeDelta::MAX),
            await_deadline: self.await_deadline_ms.map(Duration::from_millis),
            background: self.background,
        }
    }

    /// Bound on one exchange call.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Token endpoint settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderSettings {
    /// Absolute URL of the token endpoint.
    pub token_url: String,
    /// `OAuth2` client id.
    pub client_id: String,
    /// `OAuth2` client secret.
    #[serde(default)]
    pub client_secret: Option<String>,
    /// How the client credentials are presented.
    #[serde(default)]
    pub client_auth: ClientAuth,
    /// Extra form parameters sent with every exchange.
    #[serde(default)]
    pub extra_params: BTreeMap<String, String>,
    /// Response field names.
    #[serde(default)]
    pub fields: TokenResponseFields,
}

impl ProviderSettings {
    /// The token endpoint as a URL.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] unless `token_url` is an absolute URL.
    pub fn token_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.token_url).map_err(|e| {
            ConfigError::Invalid(format!(
                "provider.token_url `{}` is not an absolute URL: {e}",
                self.token_url
            ))
        })
    }

    /// Builds the token exchanger.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if the token URL is invalid.
    pub fn exchanger(&self) -> Result<OAuth2TokenExchanger, ConfigError> {
        let mut exchanger = OAuth2TokenExchanger::new(self.token_url()?, &self.client_id)
            .with_client_auth(self.client_auth)
            .with_fields(self.fields.clone());
        if let Some(secret) = &self.client_secret {
            exchanger = exchanger.with_client_secret(secret);
        }
        for (name, value) in &self.extra_params {
            exchanger = exchanger.with_extra_param(name, value);
        }
        Ok(exchanger)
    }
}

/// Storage backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    /// Process memory.
    #[default]
    Memory,
    /// One JSON file per session.
    File,
}

/// Storage settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Backend.
    pub kind: StorageKind,
    /// Directory for `file` storage.
    pub directory: Option<PathBuf>,
}

/// Listener settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Address the gateway binds to.
    pub bind: SocketAddr,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 8080)),
        }
    }
}

impl SessionSettings {
    /// Loads settings from the default file location and the environment.
    ///
    /// The file is optional unless named by `WAYBILL_CONFIG`.
    ///
    /// # Errors
    ///
    /// Returns an error if a source is unreadable or the result is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        match std::env::var_os(CONFIG_PATH_ENV) {
            Some(path) => Self::load_from_file(Path::new(&path)),
            None => Self::from_builder(
                Config::builder()
                    .add_source(File::with_name(DEFAULT_CONFIG_FILE).required(false))
                    .add_source(env_source()),
            ),
        }
    }

    /// Loads settings from `path`, overridden by the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing, unreadable or invalid.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        Self::from_builder(
            Config::builder()
                .add_source(File::from(path).required(true))
                .add_source(env_source()),
        )
    }

    /// Parses settings from TOML text, without consulting the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the text does not describe valid settings.
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        Self::from_builder(Config::builder().add_source(File::from_str(contents, FileFormat::Toml)))
    }

    fn from_builder(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, ConfigError> {
        let settings: Self = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Checks invariants the deserializer cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first violation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.provider.token_url()?;
        if self.provider.client_id.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "provider.client_id must not be empty".to_string(),
            ));
        }
        if self.refresh.skew_seconds < 0 {
            return Err(ConfigError::Invalid(format!(
                "refresh.skew_seconds must be non-negative, got {}",
                self.refresh.skew_seconds
            )));
        }
        if TimeDelta::try_seconds(self.refresh.skew_seconds).is_none() {
            return Err(ConfigError::Invalid(format!(
                "refresh.skew_seconds is out of range, got {}",
                self.refresh.skew_seconds
            )));
        }
        if self.refresh.timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "refresh.timeout_ms must be positive".to_string(),
            ));
        }
        if self.storage.kind == StorageKind::File && self.storage.directory.is_none() {
            return Err(ConfigError::Invalid(
                "storage.directory is required for file storage".to_string(),
            ));
        }
        Ok(())
    }
}

fn env_source() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator(ENV_SEPARATOR)
        .separator(ENV_SEPARATOR)
        .try_parsing(true)
}
