//! In-process object store

use super::{ListPage, ObjectStore, ObjectSummary};
use crate::error::StorageError;
use crate::tagging::TagSet;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;

#[derive(Debug, Clone, Default)]
struct StoredObject {
    body: Vec<u8>,
    tags: Vec<(String, String)>,
}

#[derive(Debug, Default)]
struct State {
    /// (bucket, key) -> object, ordered like an S3 listing
    objects: BTreeMap<(String, String), StoredObject>,
    tag_writes: HashMap<(String, String), usize>,
    failing_tag_keys: HashSet<String>,
    panicking_tag_keys: HashSet<String>,
    failing_list_buckets: HashSet<String>,
}

/// Thread-safe in-memory [`ObjectStore`]
///
/// Listings are lexicographically ordered and paginated with `page_size`,
/// mirroring S3. Failures can be injected per key (tag writes, or a panic
/// inside the write) or per bucket (listing).
#[derive(Debug)]
pub struct MemoryStore {
    state: Mutex<State>,
    page_size: usize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_page_size(1000)
    }

    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            state: Mutex::new(State::default()),
            page_size: page_size.max(1),
        }
    }

    /// Store an object, replacing any previous body and tags
    pub fn put_object(&self, bucket: &str, key: &str, body: impl Into<Vec<u8>>) {
        let mut state = self.state.lock().unwrap();
        state.objects.insert(
            (bucket.to_string(), key.to_string()),
            StoredObject {
                body: body.into(),
                tags: Vec::new(),
            },
        );
    }

    /// Current tags of an object, in write order
    pub fn tags(&self, bucket: &str, key: &str) -> Option<Vec<(String, String)>> {
        let state = self.state.lock().unwrap();
        state
            .objects
            .get(&(bucket.to_string(), key.to_string()))
            .map(|object| object.tags.clone())
    }

    /// Value of a single tag
    pub fn tag_value(&self, bucket: &str, key: &str, name: &str) -> Option<String> {
        self.tags(bucket, key)?
            .into_iter()
            .find(|(tag, _)| tag == name)
            .map(|(_, value)| value)
    }

    /// Number of tag writes attempted against `key`, successful or not
    pub fn tag_write_count(&self, bucket: &str, key: &str) -> usize {
        let state = self.state.lock().unwrap();
        state
            .tag_writes
            .get(&(bucket.to_string(), key.to_string()))
            .copied()
            .unwrap_or(0)
    }

    /// Total tag writes attempted across all objects
    pub fn total_tag_writes(&self) -> usize {
        let state = self.state.lock().unwrap();
        state.tag_writes.values().sum()
    }

    /// Make every tag write to `key` fail
    pub fn fail_tagging_for(&self, key: &str) {
        let mut state = self.state.lock().unwrap();
        state.failing_tag_keys.insert(key.to_string());
    }

    /// Make every tag write to `key` panic inside the store
    pub fn panic_on_tagging_for(&self, key: &str) {
        let mut state = self.state.lock().unwrap();
        state.panicking_tag_keys.insert(key.to_string());
    }

    /// Make every listing of `bucket` fail
    pub fn fail_listing_for(&self, bucket: &str) {
        let mut state = self.state.lock().unwrap();
        state.failing_list_buckets.insert(bucket.to_string());
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StorageError> {
        let state = self.state.lock().unwrap();
        state
            .objects
            .get(&(bucket.to_string(), key.to_string()))
            .map(|object| object.body.clone())
            .ok_or_else(|| StorageError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            })
    }

    async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        continuation_token: Option<String>,
    ) -> Result<ListPage, StorageError> {
        let state = self.state.lock().unwrap();
        if state.failing_list_buckets.contains(bucket) {
            return Err(StorageError::List {
                bucket: bucket.to_string(),
                prefix: prefix.to_string(),
                message: "injected listing failure".to_string(),
            });
        }

        // The continuation token is the last key of the previous page
        let mut matching = state
            .objects
            .iter()
            .filter(|((b, key), _)| b == bucket && key.starts_with(prefix))
            .filter(|((_, key), _)| match &continuation_token {
                Some(after) => key.as_str() > after.as_str(),
                None => true,
            })
            .map(|((_, key), object)| ObjectSummary {
                key: key.clone(),
                size: object.body.len() as i64,
            });

        let objects: Vec<ObjectSummary> = matching.by_ref().take(self.page_size).collect();
        let continuation_token = match matching.next() {
            Some(_) => objects.last().map(|object| object.key.clone()),
            None => None,
        };

        Ok(ListPage {
            objects,
            continuation_token,
        })
    }

    async fn put_tagging(
        &self,
        bucket: &str,
        key: &str,
        tags: &TagSet,
    ) -> Result<(), StorageError> {
        let must_panic = self.state.lock().unwrap().panicking_tag_keys.contains(key);
        if must_panic {
            panic!("injected panic while tagging {}", key);
        }

        let mut state = self.state.lock().unwrap();
        let id = (bucket.to_string(), key.to_string());
        *state.tag_writes.entry(id.clone()).or_insert(0) += 1;

        if state.failing_tag_keys.contains(key) {
            return Err(StorageError::PutTagging {
                bucket: bucket.to_string(),
                key: key.to_string(),
                message: "injected tagging failure".to_string(),
            });
        }

        let object = state
            .objects
            .get_mut(&id)
            .ok_or_else(|| StorageError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            })?;
        object.tags = tags
            .pairs()
            .into_iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();

        Ok(())
    }
}
