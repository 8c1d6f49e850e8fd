//! AWS S3 backend

use super::{ListPage, ObjectStore, ObjectSummary};
use crate::error::StorageError;
use crate::tagging::TagSet;
use async_trait::async_trait;
use aws_config::retry::RetryConfig;
use aws_config::BehaviorVersion;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::types::{Tag, Tagging};
use aws_sdk_s3::Client;

/// Client construction settings
#[derive(Debug, Clone)]
pub struct S3StoreConfig {
    /// Custom endpoint (localstack, minio); forces path-style addressing
    pub endpoint_url: Option<String>,
    /// Upper bound on attempts per request, standard backoff between them
    pub max_attempts: u32,
}

impl Default for S3StoreConfig {
    fn default() -> Self {
        Self {
            endpoint_url: None,
            max_attempts: 10,
        }
    }
}

/// [`ObjectStore`] backed by the AWS SDK
#[derive(Debug, Clone)]
pub struct S3Store {
    client: Client,
}

impl S3Store {
    /// Build a client from the default credential chain
    pub async fn connect(config: &S3StoreConfig) -> Self {
        let shared = aws_config::defaults(BehaviorVersion::latest())
            .retry_config(RetryConfig::standard().with_max_attempts(config.max_attempts))
            .load()
            .await;

        let mut builder = aws_sdk_s3::config::Builder::from(&shared);
        if let Some(url) = &config.endpoint_url {
            builder = builder.endpoint_url(url).force_path_style(true);
        }

        tracing::debug!(
            endpoint_url = ?config.endpoint_url,
            max_attempts = config.max_attempts,
            "S3 client instantiated"
        );

        Self {
            client: Client::from_conf(builder.build()),
        }
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StorageError> {
        let download_error = |message: String| StorageError::Download {
            bucket: bucket.to_string(),
            key: key.to_string(),
            message,
        };

        let output = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| download_error(DisplayErrorContext(&e).to_string()))?;

        let collected = output
            .body
            .collect()
            .await
            .map_err(|e| download_error(e.to_string()))?;

        Ok(collected.into_bytes().to_vec())
    }

    async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        continuation_token: Option<String>,
    ) -> Result<ListPage, StorageError> {
        let list_error = |message: String| StorageError::List {
            bucket: bucket.to_string(),
            prefix: prefix.to_string(),
            message,
        };

        let mut request = self.client.list_objects_v2().bucket(bucket);
        if !prefix.is_empty() {
            request = request.prefix(prefix);
        }
        if let Some(token) = continuation_token {
            request = request.continuation_token(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| list_error(DisplayErrorContext(&e).to_string()))?;

        let objects = response
            .contents
            .unwrap_or_default()
            .into_iter()
            .filter_map(|object| {
                let size = object.size.unwrap_or(0);
                object.key.map(|key| ObjectSummary { key, size })
            })
            .collect();

        let continuation_token = if response.is_truncated.unwrap_or(false) {
            match response.next_continuation_token {
                Some(token) => Some(token),
                None => {
                    return Err(list_error(
                        "listing truncated without a continuation token".to_string(),
                    ))
                }
            }
        } else {
            None
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
        let put_error = |message: String| StorageError::PutTagging {
            bucket: bucket.to_string(),
            key: key.to_string(),
            message,
        };

        let tag_set = tags
            .pairs()
            .into_iter()
            .map(|(name, value)| Tag::builder().key(name).value(value).build())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| put_error(e.to_string()))?;

        let tagging = Tagging::builder()
            .set_tag_set(Some(tag_set))
            .build()
            .map_err(|e| put_error(e.to_string()))?;

        self.client
            .put_object_tagging()
            .bucket(bucket)
            .key(key)
            .tagging(tagging)
            .send()
            .await
            .map_err(|e| put_error(DisplayErrorContext(&e).to_string()))?;

        Ok(())
    }
}
