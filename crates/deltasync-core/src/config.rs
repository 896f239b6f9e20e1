//! Configuration module for deltasync.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, validation, defaults, and a builder pattern for programmatic use.
//!
//! The access token is deliberately absent: it is supplied per invocation and
//! never written to disk.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::{DeltaFilter, DomainError};

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for deltasync.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub sync: SyncConfig,
    pub logging: LoggingConfig,
}

/// Change-log API endpoint settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL the `/delta` endpoints are resolved against.
    pub base_url: String,
    /// Request timeout for page and latest-cursor calls, in seconds.
    pub timeout_secs: u64,
}

/// Delta filter and streaming settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Ask the server to leave folder records out of the log.
    pub exclude_folders: bool,
    /// Type tags to drop.
    pub exclude_types: Vec<String>,
    /// If non-empty, the only type tags to keep.
    pub include_types: Vec<String>,
    /// Request the expanded message representation.
    pub expanded_view: bool,
    /// Seconds of silence after which a stream is abandoned; `0` waits forever.
    pub stream_inactivity_timeout_secs: u64,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/deltasync/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("deltasync")
            .join("config.yaml")
    }

    /// Builds the engine filter from the `sync` section.
    ///
    /// # Errors
    /// [`DomainError::ConflictingTypeFilter`] if a tag is both excluded and included.
    pub fn delta_filter(&self) -> Result<DeltaFilter, DomainError> {
        Ok(DeltaFilter::from_types(
            self.sync.exclude_types.iter().cloned(),
            self.sync.include_types.iter().cloned(),
        )?
        .with_exclude_folders(self.sync.exclude_folders)
        .with_expanded_view(self.sync.expanded_view))
    }

    /// Request timeout for the API client.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs)
    }

    /// Stream inactivity timeout, `None` when disabled.
    pub fn stream_inactivity_timeout(&self) -> Option<Duration> {
        match self.sync.stream_inactivity_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

/// Default API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.nylas.com";

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 60,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"api.timeout_secs"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- api ---
        match url::Url::parse(&self.api.base_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(url) => errors.push(ValidationError {
                field: "api.base_url".into(),
                message: format!("unsupported scheme '{}'; use http or https", url.scheme()),
            }),
            Err(e) => errors.push(ValidationError {
                field: "api.base_url".into(),
                message: format!("invalid URL '{}': {e}", self.api.base_url),
            }),
        }
        if self.api.timeout_secs == 0 {
            errors.push(ValidationError {
                field: "api.timeout_secs".into(),
                message: "must be greater than 0".into(),
            });
        }

        // --- sync ---
        for tag in self
            .sync
            .exclude_types
            .iter()
            .chain(self.sync.include_types.iter())
        {
            if tag.trim().is_empty() {
                errors.push(ValidationError {
                    field: "sync.exclude_types".into(),
                    message: "type tags must not be empty".into(),
                });
                break;
            }
        }
        if let Err(e) = self.delta_filter() {
            errors.push(ValidationError {
                field: "sync.include_types".into(),
                message: e.to_string(),
            });
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "invalid level '{}'; valid options: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Builder for constructing a [`Config`] programmatically.
///
/// Starts from [`Config::default`] (or a loaded config) and allows selective
/// overrides, such as those given on the command line.
///
/// # Example
///
/// ```rust,no_run
/// use deltasync_core::config::ConfigBuilder;
///
/// let config = ConfigBuilder::new()
///     .api_base_url("http://localhost:5555")
///     .sync_exclude_types(["contact", "event"])
///     .logging_level("debug")
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder initialised with [`Config::default`] values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    /// Start from an already loaded configuration.
    pub fn from_config(config: Config) -> Self {
        Self { config }
    }

    // --- api ---

    pub fn api_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.api.base_url = base_url.into();
        self
    }

    pub fn api_timeout_secs(mut self, seconds: u64) -> Self {
        self.config.api.timeout_secs = seconds;
        self
    }

    // --- sync ---

    pub fn sync_exclude_folders(mut self, exclude: bool) -> Self {
        self.config.sync.exclude_folders = exclude;
        self
    }

    pub fn sync_exclude_types<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.sync.exclude_types = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn sync_include_types<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.sync.include_types = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn sync_expanded_view(mut self, expanded: bool) -> Self {
        self.config.sync.expanded_view = expanded;
        self
    }

    pub fn sync_stream_inactivity_timeout_secs(mut self, seconds: u64) -> Self {
        self.config.sync.stream_inactivity_timeout_secs = seconds;
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    // --- build ---

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate in one step. Returns `Err` with the list of
    /// validation errors if the configuration is invalid.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
