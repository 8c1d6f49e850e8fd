//! Object store access
//!
//! The tagger talks to storage through the [`ObjectStore`] trait so the
//! manifest loader, the lister and the tagging worker can run against S3 in
//! production and against [`MemoryStore`] in tests.

mod lister;
mod memory;
mod s3;

pub use lister::{is_temp_marker, list_objects_to_tag, normalize_prefix};
pub use memory::MemoryStore;
pub use s3::{S3Store, S3StoreConfig};

use crate::error::StorageError;
use crate::tagging::TagSet;
use async_trait::async_trait;

/// One object returned by a listing call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectSummary {
    pub key: String,
    pub size: i64,
}

/// A single page of a listing
#[derive(Debug, Clone, Default)]
pub struct ListPage {
    pub objects: Vec<ObjectSummary>,
    /// Token for the next page, `None` on the last page
    pub continuation_token: Option<String>,
}

/// Storage operations the tagger depends on
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch an object's full body
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StorageError>;

    /// List one page of objects under `prefix`
    async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        continuation_token: Option<String>,
    ) -> Result<ListPage, StorageError>;

    /// Replace the object's tag set with `tags`
    async fn put_tagging(&self, bucket: &str, key: &str, tags: &TagSet)
        -> Result<(), StorageError>;
}
