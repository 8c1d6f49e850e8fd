//! Tag application
//!
//! [`TaggingWorker`] writes the three classification tags for one object;
//! [`BatchDispatcher`] fans it out over a listing.

mod dispatcher;

pub use dispatcher::{BatchDispatcher, BatchSummary};

use crate::resolver::{Resolution, ResolutionStatus};
use crate::storage::ObjectStore;
use std::sync::Arc;
use tracing::{error, event, info, Level};

/// The three tags written to every processed object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagSet {
    pub db: String,
    pub table: String,
    pub pii: String,
}

impl TagSet {
    /// Tag names and values in write order
    pub fn pairs(&self) -> [(&'static str, &str); 3] {
        [
            ("db", self.db.as_str()),
            ("table", self.table.as_str()),
            ("pii", self.pii.as_str()),
        ]
    }
}

impl From<&Resolution> for TagSet {
    fn from(resolution: &Resolution) -> Self {
        Self {
            db: resolution.database.clone(),
            table: resolution.table.clone(),
            pii: resolution.pii.clone(),
        }
    }
}

/// What happened to one object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagOutcome {
    /// Tags written; `matched` when the key resolved to a listed table
    Tagged { matched: bool },
    /// Key could not be resolved, no write attempted
    Skipped,
    /// The tag write was rejected by the store
    Failed,
}

impl TagOutcome {
    /// Contribution to the run's matched total
    pub fn matched_count(&self) -> usize {
        match self {
            TagOutcome::Tagged { matched: true } => 1,
            _ => 0,
        }
    }
}

/// Applies resolutions as object tags
pub struct TaggingWorker {
    store: Arc<dyn ObjectStore>,
    bucket: String,
}

impl TaggingWorker {
    pub fn new(store: Arc<dyn ObjectStore>, bucket: impl Into<String>) -> Self {
        Self {
            store,
            bucket: bucket.into(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Write the tags for `key`
    ///
    /// Storage errors are logged and reported as [`TagOutcome::Failed`]; they
    /// never abort the batch.
    pub async fn apply(&self, key: &str, resolution: &Resolution) -> TagOutcome {
        report_resolution(key, resolution);

        if !resolution.status.is_writable() {
            return TagOutcome::Skipped;
        }

        let tags = TagSet::from(resolution);
        match self.store.put_tagging(&self.bucket, key, &tags).await {
            Ok(()) => {
                info!(
                    object = %key,
                    db = %tags.db,
                    table = %tags.table,
                    pii = %tags.pii,
                    "Successfully tagged"
                );
                TagOutcome::Tagged {
                    matched: resolution.matched(),
                }
            }
            Err(e) => {
                error!(object = %key, error_message = %e, "Failed to tag");
                TagOutcome::Failed
            }
        }
    }
}

fn report_resolution(key: &str, resolution: &Resolution) {
    let Some((level, message)) = resolution.status.diagnostic() else {
        return;
    };
    let detail = match &resolution.status {
        ResolutionStatus::Malformed(detail) => detail.as_str(),
        _ => "",
    };

    // `event!` needs a constant level
    if level == Level::ERROR {
        event!(Level::ERROR, key = %key, error_message = %detail, "{}", message);
    } else if level == Level::WARN {
        event!(
            Level::WARN,
            key = %key,
            db_name = %resolution.database,
            table_name = %resolution.table,
            "{}",
            message
        );
    } else {
        event!(
            Level::INFO,
            key = %key,
            db_name = %resolution.database,
            table_name = %resolution.table,
            "{}",
            message
        );
    }
}
