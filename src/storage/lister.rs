//! Paginated listing of the keys to tag

use super::ObjectStore;
use crate::error::Result;
use tracing::{debug, info};

/// Suffix S3-backed warehouses use for zero-byte "folder" placeholders
pub const TEMP_MARKER: &str = "$folder$";

/// Strip leading and trailing `/` from a listing prefix
pub fn normalize_prefix(prefix: &str) -> &str {
    prefix.trim_start_matches('/').trim_end_matches('/')
}

/// Whether `key` is a pseudo-directory placeholder
pub fn is_temp_marker(key: &str) -> bool {
    key.ends_with(TEMP_MARKER)
}

/// Collect every key under `prefix`, following continuation tokens
///
/// With `skip_temp_markers` set, zero-byte `$folder$` placeholders are
/// dropped from the result; a marker-named object with content is kept. Any listing failure is returned to the caller.
pub async fn list_objects_to_tag(
    store: &dyn ObjectStore,
    bucket: &str,
    prefix: &str,
    skip_temp_markers: bool,
) -> Result<Vec<String>> {
    let prefix = normalize_prefix(prefix);
    info!(bucket = %bucket, s3_prefix = %prefix, "Getting list of objects");

    let mut keys = Vec::new();
    let mut skipped_markers = 0usize;
    let mut pages = 0usize;
    let mut token: Option<String> = None;

    loop {
        let page = store.list_page(bucket, prefix, token.take()).await?;
        pages += 1;

        for object in page.objects {
            if skip_temp_markers && object.size == 0 && is_temp_marker(&object.key) {
                skipped_markers += 1;
                continue;
            }
            keys.push(object.key);
        }

        match page.continuation_token {
            Some(next) => token = Some(next),
            None => break,
        }
    }

    debug!(pages, skipped_markers, "Listing complete");
    info!(
        bucket = %bucket,
        s3_prefix = %prefix,
        number_of_objects = keys.len(),
        skipped_markers,
        "Listed objects"
    );

    Ok(keys)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TaggerError;
    use crate::storage::MemoryStore;

    #[test]
    fn test_normalize_prefix() {
        assert_eq!(normalize_prefix("/data/db1/"), "data/db1");
        assert_eq!(normalize_prefix("data"), "data");
        assert_eq!(normalize_prefix("/"), "");
    }

    #[test]
    fn test_is_temp_marker() {
        assert!(is_temp_marker("data/db1/$folder$"));
        assert!(is_temp_marker("data/db1/tab1_$folder$"));
        assert!(!is_temp_marker("data/db1/tab1/00000_0"));
    }

    #[tokio::test]
    async fn test_lists_across_pages() {
        let store = MemoryStore::with_page_size(2);
        for i in 0..5 {
            store.put_object("bucket", &format!("data/db1/tab1/0000{}_0", i), "x");
        }

        let keys = list_objects_to_tag(&store, "bucket", "/data/db1/", false)
            .await
            .unwrap();
        assert_eq!(keys.len(), 5);
    }

    #[tokio::test]
    async fn test_temp_marker_policy() {
        let store = MemoryStore::new();
        store.put_object("bucket", "data/db1/$folder$", "");
        store.put_object("bucket", "data/db1/tab1/00000_0", "x");

        let kept = list_objects_to_tag(&store, "bucket", "data", false)
            .await
            .unwrap();
        assert_eq!(kept.len(), 2);

        let filtered = list_objects_to_tag(&store, "bucket", "data", true)
            .await
            .unwrap();
        assert_eq!(filtered, vec!["data/db1/tab1/00000_0".to_string()]);
    }

    #[tokio::test]
    async fn test_non_empty_marker_is_kept_when_skipping() {
        let store = MemoryStore::new();
        store.put_object("bucket", "data/db1/$folder$", "");
        store.put_object("bucket", "data/db1/tab1_$folder$", "testcontent");

        let keys = list_objects_to_tag(&store, "bucket", "data", true)
            .await
            .unwrap();
        assert_eq!(keys, vec!["data/db1/tab1_$folder$".to_string()]);
    }

    #[tokio::test]
    async fn test_listing_failure_propagates() {
        let store = MemoryStore::new();
        store.fail_listing_for("bucket");

        let err = list_objects_to_tag(&store, "bucket", "data", false)
            .await
            .unwrap_err();
        assert!(matches!(err, TaggerError::Storage(_)));
    }
}
