//! One tagging run: manifest -> listing -> batch

use crate::config::Settings;
use crate::error::{Result, TaggerError};
use crate::logging::LogContext;
use crate::manifest::load_manifest;
use crate::storage::{list_objects_to_tag, ObjectStore};
use crate::tagging::{BatchDispatcher, BatchSummary, TaggingWorker};
use std::sync::Arc;
use tracing::{info, Instrument};

/// Load the manifest, list the prefix and tag everything found
///
/// A manifest or listing failure ends the run with an error before any
/// object is tagged.
pub async fn run(
    settings: &Settings,
    store: Arc<dyn ObjectStore>,
    ctx: &LogContext,
) -> Result<BatchSummary> {
    let location = settings.manifest_location()?;

    let (table, keys) = async {
        info!(csv_location = %location, "Fetching and reading CSV file");
        let table = load_manifest(&location, store.as_ref()).await?;

        info!(
            bucket = %settings.bucket,
            s3_prefix = %settings.s3_prefix,
            skip_temp_markers = settings.skip_temp_markers,
            "Getting list of objects to tag"
        );
        let keys = list_objects_to_tag(
            store.as_ref(),
            &settings.bucket,
            &settings.s3_prefix,
            settings.skip_temp_markers,
        )
        .await?;

        info!(bucket = %settings.bucket, "Beginning to tag objects");
        Ok::<_, TaggerError>((table, keys))
    }
    .instrument(ctx.span().clone())
    .await?;

    let worker = Arc::new(TaggingWorker::new(store, settings.bucket.clone()));
    let dispatcher = BatchDispatcher::new(Arc::new(table), worker);
    dispatcher.run(keys, ctx).await
}
