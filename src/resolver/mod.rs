//! Object key -> (database, table, pii) resolution
//!
//! Warehouse data lands under paths such as
//!
//! ```text
//! data/<db>.db/<table>/<file>
//! data/<db>/<table>/<partition>/<file>
//! data/<db>/<table>_$folder$
//! ```
//!
//! The resolver does not know the partition depth up front. It normalizes the
//! segments and then tries the database at the second-, third- and
//! fourth-from-last position, in that order, keeping the first one listed in
//! the classification table.
//!
//! Resolution never fails: expected misses are reported through
//! [`ResolutionStatus`] and turned into log lines by the caller.

use crate::manifest::ClassificationTable;
use thiserror::Error;
use tracing::Level;

/// Suffix of logical database folders
pub const DB_SUFFIX: &str = ".db";

/// Suffix of temp-folder placeholders on the leaf segment
pub const TEMP_MARKER_SUFFIX: &str = "_$folder$";

/// Placeholder suffix written without the leading underscore
const BARE_TEMP_MARKER_SUFFIX: &str = "$folder$";

/// Keys with fewer segments cannot carry a database and a table
pub const MIN_SEGMENTS: usize = 3;

/// Offsets from the end of the key at which a database may sit
const DATABASE_OFFSETS: [usize; 3] = [2, 3, 4];

/// S3 limit on tag value length
const MAX_TAG_VALUE_LEN: usize = 256;

/// How a key resolved against the classification table
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionStatus {
    /// Database and table listed with a PII value
    Classified,
    /// Database and table listed, PII empty or not a string
    Unclassified,
    /// Database listed, table not under it
    TableMissing,
    /// No candidate segment is a listed database
    DatabaseMissing,
    /// Fewer than [`MIN_SEGMENTS`] segments
    PatternMismatch,
    /// The key produced values that cannot be written as tags
    Malformed(String),
}

impl ResolutionStatus {
    /// Counted towards the run's matched total
    pub fn is_matched(&self) -> bool {
        matches!(
            self,
            ResolutionStatus::Classified | ResolutionStatus::Unclassified
        )
    }

    /// A tag write should be attempted
    pub fn is_writable(&self) -> bool {
        !matches!(
            self,
            ResolutionStatus::PatternMismatch | ResolutionStatus::Malformed(_)
        )
    }

    /// Level and message to log for this outcome, if any
    pub fn diagnostic(&self) -> Option<(Level, &'static str)> {
        match self {
            ResolutionStatus::Classified => None,
            ResolutionStatus::Unclassified => {
                Some((Level::INFO, "table recognized, not yet classified"))
            }
            ResolutionStatus::TableMissing => {
                Some((Level::WARN, "table missing from manifest"))
            }
            ResolutionStatus::DatabaseMissing => {
                Some((Level::WARN, "no valid database/table for key"))
            }
            ResolutionStatus::PatternMismatch => {
                Some((Level::WARN, "skipping: pattern mismatch"))
            }
            ResolutionStatus::Malformed(_) => Some((Level::ERROR, "failed to resolve key")),
        }
    }
}

/// Outcome of resolving one key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub database: String,
    pub table: String,
    pub pii: String,
    pub status: ResolutionStatus,
}

impl Resolution {
    fn unresolved(status: ResolutionStatus) -> Self {
        Self {
            database: String::new(),
            table: String::new(),
            pii: String::new(),
            status,
        }
    }

    pub fn matched(&self) -> bool {
        self.status.is_matched()
    }
}

#[derive(Debug, Error)]
enum ResolveError {
    #[error("{field} resolved to an empty value")]
    Empty { field: &'static str },

    #[error("{field} value '{value}' is not a valid tag value")]
    InvalidTagValue { field: &'static str, value: String },
}

/// Resolve `key` against `table`
pub fn resolve(key: &str, table: &ClassificationTable) -> Resolution {
    let segments: Vec<&str> = key.split('/').collect();
    if segments.len() < MIN_SEGMENTS {
        return Resolution::unresolved(ResolutionStatus::PatternMismatch);
    }

    match resolve_segments(segments, table) {
        Ok(resolution) => resolution,
        Err(e) => Resolution::unresolved(ResolutionStatus::Malformed(e.to_string())),
    }
}

fn resolve_segments(
    segments: Vec<&str>,
    table: &ClassificationTable,
) -> Result<Resolution, ResolveError> {
    let mut segments: Vec<&str> = segments
        .into_iter()
        .map(|segment| segment.strip_suffix(DB_SUFFIX).unwrap_or(segment))
        .collect();

    if let Some(leaf) = segments.last_mut() {
        *leaf = strip_temp_marker(*leaf);
    }

    let Some((database, table_name)) = find_candidate(&segments, table) else {
        return Ok(Resolution::unresolved(ResolutionStatus::DatabaseMissing));
    };

    validate_tag_value("database", database)?;
    validate_tag_value("table", table_name)?;

    let (pii, status) = match table.find(database, table_name) {
        Some(entry) => {
            let pii = entry.pii.tag_value().to_string();
            let status = if pii.is_empty() {
                ResolutionStatus::Unclassified
            } else {
                ResolutionStatus::Classified
            };
            (pii, status)
        }
        None => (String::new(), ResolutionStatus::TableMissing),
    };

    Ok(Resolution {
        database: database.to_string(),
        table: table_name.to_string(),
        pii,
        status,
    })
}

fn strip_temp_marker(leaf: &str) -> &str {
    leaf.strip_suffix(TEMP_MARKER_SUFFIX)
        .or_else(|| leaf.strip_suffix(BARE_TEMP_MARKER_SUFFIX))
        .unwrap_or(leaf)
}

/// First `(database, table)` pair whose database is listed
fn find_candidate<'a>(
    segments: &[&'a str],
    table: &ClassificationTable,
) -> Option<(&'a str, &'a str)> {
    DATABASE_OFFSETS.iter().find_map(|&offset| {
        let db_index = segments.len().checked_sub(offset)?;
        let database = segments[db_index];
        table
            .contains_database(database)
            .then_some((database, segments[db_index + 1]))
    })
}

/// Checks a key-derived value; manifest pii values are left to the store
fn validate_tag_value(field: &'static str, value: &str) -> Result<(), ResolveError> {
    if value.is_empty() {
        return Err(ResolveError::Empty { field });
    }

    let allowed = |c: char| {
        c.is_alphanumeric()
            || c.is_whitespace()
            || matches!(c, '+' | '-' | '=' | '.' | '_' | ':' | '/' | '@')
    };
    if value.chars().count() > MAX_TAG_VALUE_LEN || !value.chars().all(allowed) {
        return Err(ResolveError::InvalidTagValue {
            field,
            value: value.to_string(),
        });
    }

    Ok(())
}
