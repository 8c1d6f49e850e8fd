//! Run settings
//!
//! Values are layered, highest precedence first: command-line flag,
//! environment variable (both handled by clap), config file, default.

use crate::cli::Cli;
use crate::error::{Result, TaggerError};
use crate::manifest::ManifestLocation;
use crate::storage::S3StoreConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

mod validator;

pub use validator::ConfigValidator;

pub const DEFAULT_LOG_LEVEL: &str = "INFO";
pub const DEFAULT_LABEL: &str = "NOT_SET";
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// Optional TOML config file; every key mirrors a CLI option
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub csv_location: Option<String>,
    pub bucket: Option<String>,
    pub s3_prefix: Option<String>,
    pub log_level: Option<String>,
    pub environment: Option<String>,
    pub application: Option<String>,
    pub skip_temp_markers: Option<bool>,
    pub endpoint_url: Option<String>,
    pub max_attempts: Option<u32>,
}

impl FileConfig {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(TaggerError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| TaggerError::Io {
            source: e,
            context: format!("Failed to read config file: {:?}", path),
        })?;
        Ok(toml::from_str(&content)?)
    }
}

/// Fully resolved settings for one run
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub csv_location: String,
    pub bucket: String,
    pub s3_prefix: String,
    pub log_level: String,
    pub environment: String,
    pub application: String,
    pub skip_temp_markers: bool,
    pub endpoint_url: Option<String>,
    pub max_attempts: u32,
}

impl Settings {
    /// Resolve and validate settings from the command line
    ///
    /// An explicit `--config` must exist; the default config path is only
    /// read when present.
    pub fn load(cli: &Cli) -> Result<Self> {
        let file = match &cli.config {
            Some(path) => FileConfig::load(path)?,
            None => match Self::default_path() {
                Ok(path) if path.exists() => FileConfig::load(&path)?,
                _ => FileConfig::default(),
            },
        };

        let settings = Self::merge(cli, file);
        ConfigValidator::validate(&settings)?;
        Ok(settings)
    }

    /// Layer CLI values over file values over defaults, without validating
    pub fn merge(cli: &Cli, file: FileConfig) -> Self {
        fn pick(cli: &Option<String>, file: Option<String>, default: &str) -> String {
            cli.clone().or(file).unwrap_or_else(|| default.to_string())
        }

        Self {
            csv_location: pick(&cli.csv_location, file.csv_location, ""),
            bucket: pick(&cli.bucket, file.bucket, ""),
            s3_prefix: pick(&cli.s3_prefix, file.s3_prefix, ""),
            log_level: pick(&cli.log_level, file.log_level, DEFAULT_LOG_LEVEL),
            environment: pick(&cli.environment, file.environment, DEFAULT_LABEL),
            application: pick(&cli.application, file.application, DEFAULT_LABEL),
            skip_temp_markers: cli.skip_temp_markers || file.skip_temp_markers.unwrap_or(false),
            endpoint_url: cli.endpoint_url.clone().or(file.endpoint_url),
            max_attempts: cli
                .max_attempts
                .or(file.max_attempts)
                .unwrap_or(DEFAULT_MAX_ATTEMPTS),
        }
    }

    pub fn manifest_location(&self) -> Result<ManifestLocation> {
        ManifestLocation::parse(&self.csv_location)
    }

    pub fn store_config(&self) -> S3StoreConfig {
        S3StoreConfig {
            endpoint_url: self.endpoint_url.clone(),
            max_attempts: self.max_attempts,
        }
    }

    /// Get the default configuration file path
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| TaggerError::Config("Cannot determine config directory".to_string()))?;

        Ok(config_dir.join("s3-tagger").join("config.toml"))
    }
}
