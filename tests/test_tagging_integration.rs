// End-to-end tagging runs against the in-memory object store
use s3_tagger::cli::Cli;
use s3_tagger::config::{FileConfig, Settings};
use s3_tagger::logging::LogContext;
use s3_tagger::runner;
use s3_tagger::storage::MemoryStore;
use s3_tagger::TaggerError;
use std::io::Write;
use std::sync::Arc;

const TABLE_INFO_BUCKET: &str = "tab-info-bucket";
const CSV_KEY: &str = "table/info/path/table_info.csv";
const CSV_LOCATION: &str = "s3://tab-info-bucket/table/info/path/table_info.csv";
const DATA_S3_PREFIX: &str = "/data/";
const BUCKET_TO_TAG: &str = "buckettotag";
const MANIFEST: &str = "db,table,pii\ndb1,tab1,false\ndb2,tab2,true\ndb3,tab3,\n";

fn settings(csv_location: &str, skip_temp_markers: bool) -> Settings {
    let mut settings = Settings::merge(&Cli::default(), FileConfig::default());
    settings.csv_location = csv_location.to_string();
    settings.bucket = BUCKET_TO_TAG.to_string();
    settings.s3_prefix = DATA_S3_PREFIX.to_string();
    settings.environment = "test".to_string();
    settings.skip_temp_markers = skip_temp_markers;
    settings
}

fn store_with(keys: &[&str]) -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::with_page_size(2));
    store.put_object(TABLE_INFO_BUCKET, CSV_KEY, MANIFEST);
    for key in keys {
        store.put_object(BUCKET_TO_TAG, key, "testcontent");
    }
    store
}

fn pii(store: &MemoryStore, key: &str) -> Option<String> {
    store.tag_value(BUCKET_TO_TAG, key, "pii")
}

#[tokio::test]
async fn test_full_run_tags_every_parseable_key_once() {
    let keys = [
        "data/db1/tab1/00000_0",
        "data/db2/tab2/00000_0",
        "data/db2/tab2/partition1/00000_0",
        "data/db3/tab3/00000_0",
        "data/db1/tab9/00000_0",
        "data/db9/tab9/00000_0",
        "data/00000_0",
    ];
    let store = store_with(&keys);
    let ctx = LogContext::new("test", "integration");

    let summary = runner::run(&settings(CSV_LOCATION, false), store.clone(), &ctx)
        .await
        .unwrap();

    assert_eq!(summary.objects_found, 7);
    assert_eq!(summary.matched, 4);
    assert_eq!(summary.tagged, 6);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.failed, 0);

    for key in &keys[..6] {
        assert_eq!(store.tag_write_count(BUCKET_TO_TAG, key), 1, "key {}", key);
    }
    assert_eq!(store.tag_write_count(BUCKET_TO_TAG, "data/00000_0"), 0);
    assert_eq!(store.total_tag_writes(), 6);

    assert_eq!(pii(&store, "data/db1/tab1/00000_0").as_deref(), Some("false"));
    assert_eq!(pii(&store, "data/db2/tab2/partition1/00000_0").as_deref(), Some("true"));
    assert_eq!(pii(&store, "data/db3/tab3/00000_0").as_deref(), Some(""));
    assert_eq!(
        store.tag_value(BUCKET_TO_TAG, "data/db9/tab9/00000_0", "db").as_deref(),
        Some("")
    );
}

#[tokio::test]
async fn test_temp_markers_are_tagged_by_default() {
    let keys = [
        "data/db1/tab1$folder$",
        "data/db1/tab1/00000_0",
        "data/db2/tab2_$folder$",
    ];
    let store = store_with(&keys);
    let ctx = LogContext::new("test", "integration");

    let summary = runner::run(&settings(CSV_LOCATION, false), store.clone(), &ctx)
        .await
        .unwrap();

    assert_eq!(summary.matched, 3);
    assert_eq!(pii(&store, keys[0]).as_deref(), Some("false"));
    assert_eq!(pii(&store, keys[1]).as_deref(), Some("false"));
    assert_eq!(pii(&store, keys[2]).as_deref(), Some("true"));
}

#[tokio::test]
async fn test_temp_markers_can_be_skipped() {
    let store = store_with(&["data/db1/tab1/00000_0"]);
    store.put_object(BUCKET_TO_TAG, "data/db1/$folder$", "");
    let ctx = LogContext::new("test", "integration");

    let summary = runner::run(&settings(CSV_LOCATION, true), store.clone(), &ctx)
        .await
        .unwrap();

    assert_eq!(summary.objects_found, 1);
    assert_eq!(store.tag_write_count(BUCKET_TO_TAG, "data/db1/$folder$"), 0);
}

#[tokio::test]
async fn test_write_failures_do_not_stop_the_batch() {
    let keys = ["data/db1/tab1/00000_0", "data/db2/tab2/00000_0"];
    let store = store_with(&keys);
    store.fail_tagging_for("data/db1/tab1/00000_0");
    let ctx = LogContext::new("test", "integration");

    let summary = runner::run(&settings(CSV_LOCATION, false), store.clone(), &ctx)
        .await
        .unwrap();

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.matched, 1);
    assert_eq!(pii(&store, "data/db2/tab2/00000_0").as_deref(), Some("true"));
}

#[tokio::test]
async fn test_no_matches_still_completes() {
    let keys = ["data/db8/tab8/00000_0", "data/db9/tab9/00000_0"];
    let store = store_with(&keys);
    let ctx = LogContext::new("test", "integration");

    let summary = runner::run(&settings(CSV_LOCATION, false), store.clone(), &ctx)
        .await
        .unwrap();

    assert_eq!(summary.matched, 0);
    assert_eq!(summary.tagged, 2);
}

#[tokio::test]
async fn test_missing_manifest_is_fatal() {
    let store = Arc::new(MemoryStore::new());
    store.put_object(BUCKET_TO_TAG, "data/db1/tab1/00000_0", "testcontent");
    let ctx = LogContext::new("test", "integration");

    let err = runner::run(&settings(CSV_LOCATION, false), store.clone(), &ctx)
        .await
        .unwrap_err();

    assert!(matches!(err, TaggerError::Manifest { .. }));
    assert_eq!(store.total_tag_writes(), 0);
}

#[tokio::test]
async fn test_listing_failure_is_fatal() {
    let store = store_with(&["data/db1/tab1/00000_0"]);
    store.fail_listing_for(BUCKET_TO_TAG);
    let ctx = LogContext::new("test", "integration");

    let err = runner::run(&settings(CSV_LOCATION, false), store.clone(), &ctx)
        .await
        .unwrap_err();

    assert!(matches!(err, TaggerError::Storage(_)));
    assert_eq!(store.total_tag_writes(), 0);
}

#[tokio::test]
async fn test_local_manifest() {
    let mut manifest = tempfile::NamedTempFile::new().unwrap();
    write!(manifest, "{}", MANIFEST).unwrap();
    let location = format!("file://{}", manifest.path().display());

    let store = Arc::new(MemoryStore::new());
    store.put_object(BUCKET_TO_TAG, "data/db2/tab2/00000_0", "testcontent");
    let ctx = LogContext::new("test", "integration");

    let summary = runner::run(&settings(&location, false), store.clone(), &ctx)
        .await
        .unwrap();

    assert_eq!(summary.matched, 1);
    assert_eq!(pii(&store, "data/db2/tab2/00000_0").as_deref(), Some("true"));
}
