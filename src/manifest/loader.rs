//! Manifest download and CSV parsing

use super::{ClassificationEntry, ClassificationTable, PiiCell};
use crate::error::{Result, TaggerError};
use crate::storage::ObjectStore;
use regex::Regex;
use serde::Deserialize;
use std::fmt;
use std::io::Read;
use std::path::PathBuf;
use std::sync::OnceLock;
use tracing::{info, warn};

const REQUIRED_COLUMNS: [&str; 3] = ["db", "table", "pii"];

fn s3_location_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^s3://([a-zA-Z0-9.\-_]+)/+(.+)$").expect("static manifest regex is valid")
    })
}

/// Where the manifest lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestLocation {
    /// `s3://bucket/key`
    S3 { bucket: String, key: String },
    /// `file:///path` or a bare filesystem path
    Local(PathBuf),
}

impl ManifestLocation {
    pub fn parse(location: &str) -> Result<Self> {
        let location = location.trim();
        if location.is_empty() {
            return Err(TaggerError::InvalidManifestLocation(
                "location is empty".to_string(),
            ));
        }

        if let Some(path) = location.strip_prefix("file://") {
            return Ok(ManifestLocation::Local(PathBuf::from(path)));
        }

        if location.starts_with("s3://") {
            let caps = s3_location_regex().captures(location).ok_or_else(|| {
                TaggerError::InvalidManifestLocation(format!(
                    "expected s3://<bucket>/<key>, got '{}'",
                    location
                ))
            })?;
            return Ok(ManifestLocation::S3 {
                bucket: caps[1].to_string(),
                key: caps[2].to_string(),
            });
        }

        if location.contains("://") {
            return Err(TaggerError::InvalidManifestLocation(format!(
                "unsupported scheme in '{}'",
                location
            )));
        }

        Ok(ManifestLocation::Local(PathBuf::from(location)))
    }

    /// Last path component, used in log lines
    pub fn file_name(&self) -> String {
        match self {
            ManifestLocation::S3 { key, .. } => {
                key.rsplit('/').next().unwrap_or(key.as_str()).to_string()
            }
            ManifestLocation::Local(path) => path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
        }
    }
}

impl fmt::Display for ManifestLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ManifestLocation::S3 { bucket, key } => write!(f, "s3://{}/{}", bucket, key),
            ManifestLocation::Local(path) => write!(f, "{}", path.display()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ManifestRow {
    db: String,
    table: String,
    pii: String,
}

/// Download (or read) the manifest and build the classification table
pub async fn load_manifest(
    location: &ManifestLocation,
    store: &dyn ObjectStore,
) -> Result<ClassificationTable> {
    let file_name = location.file_name();

    let bytes = match location {
        ManifestLocation::S3 { bucket, key } => {
            info!(bucket = %bucket, key = %key, file_name = %file_name, "Downloading CSV");
            store.get_object(bucket, key).await.map_err(|e| {
                TaggerError::Manifest {
                    location: location.to_string(),
                    message: e.to_string(),
                }
            })?
        }
        ManifestLocation::Local(path) => {
            info!(path = %path.display(), file_name = %file_name, "Reading local CSV");
            tokio::fs::read(path).await.map_err(|e| TaggerError::Io {
                source: e,
                context: format!("Failed to read manifest: {}", path.display()),
            })?
        }
    };
    info!(file_name = %file_name, bytes = bytes.len(), "Successfully downloaded");

    let table = parse_manifest(bytes.as_slice()).map_err(|e| TaggerError::Manifest {
        location: location.to_string(),
        message: e.to_string(),
    })?;

    if table.is_empty() {
        warn!(file_name = %file_name, "Manifest has no rows, no object will be classified");
    }
    info!(
        file_name = %file_name,
        databases = table.database_count(),
        tables = table.entry_count(),
        "Successfully read CSV"
    );

    Ok(table)
}

/// Parse manifest CSV content with `db`, `table` and `pii` columns
pub fn parse_manifest<R: Read>(reader: R) -> Result<ClassificationTable> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|column| !headers.iter().any(|h| h == *column))
        .collect();
    if !missing.is_empty() {
        return Err(TaggerError::ManifestColumns(missing.join(", ")));
    }

    let mut rows = Vec::new();
    for record in csv_reader.deserialize::<ManifestRow>() {
        let row = record?;
        rows.push((
            row.db,
            ClassificationEntry {
                table: row.table,
                pii: PiiCell::Text(row.pii),
            },
        ));
    }

    Ok(ClassificationTable::from_rows(rows))
}
