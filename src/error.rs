use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the tagger
#[derive(Error, Debug)]
pub enum TaggerError {
    /// Configuration related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration validation errors
    #[error("Configuration validation failed: {}", format_validation_errors(.errors))]
    ConfigValidation { errors: Vec<ValidationError> },

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Manifest location could not be parsed
    #[error("Invalid manifest location: {0}")]
    InvalidManifestLocation(String),

    /// Manifest could not be downloaded or read
    #[error("Failed to load manifest {location}: {message}")]
    Manifest { location: String, message: String },

    /// Manifest header lacks one of the required columns
    #[error("Manifest is missing required columns: {0}")]
    ManifestColumns(String),

    /// CSV decoding errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Object store errors that are not absorbed per object
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// IO errors
    #[error("IO error: {context}: {source}")]
    Io {
        source: std::io::Error,
        context: String,
    },

    /// TOML deserialization errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// A tagging task died outside the worker's own error handling
    #[error("Worker failure: {0}")]
    Worker(String),

    /// Generic errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Errors raised by an [`ObjectStore`](crate::storage::ObjectStore) backend
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("download of s3://{bucket}/{key} failed: {message}")]
    Download {
        bucket: String,
        key: String,
        message: String,
    },

    #[error("listing s3://{bucket}/{prefix} failed: {message}")]
    List {
        bucket: String,
        prefix: String,
        message: String,
    },

    #[error("tagging s3://{bucket}/{key} failed: {message}")]
    PutTagging {
        bucket: String,
        key: String,
        message: String,
    },

    #[error("no such object: s3://{bucket}/{key}")]
    NotFound { bucket: String, key: String },
}

/// Configuration validation error
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Name of the setting that failed validation
    pub path: String,
    /// Error message describing the validation failure
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result type for tagger operations
pub type Result<T> = std::result::Result<T, TaggerError>;
