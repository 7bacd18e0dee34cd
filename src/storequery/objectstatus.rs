//! `objectstatus` — reports whether an object is present (and, if so, its
//! size and version), a pending delete marker, or an in-progress multipart
//! upload (spec.md §4.8.1). Valid only in `Object` handler context.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::error::AuthError;
use crate::types::HandlerContext;

use super::{BucketIndex, CommandHandler, MultipartTable};
use crate::types::StoreQueryCommand;

const PAGE_SIZE: u32 = 100;

pub struct ObjectStatusHandler;

#[async_trait]
impl CommandHandler for ObjectStatusHandler {
    fn allowed_contexts(&self) -> &'static [HandlerContext] {
        &[HandlerContext::Object]
    }

    async fn execute(
        &self,
        command: &StoreQueryCommand,
        bucket: &str,
        object_key: &str,
        index: &dyn BucketIndex,
        multipart: &dyn MultipartTable,
    ) -> Result<Value, AuthError> {
        if !command.params.is_empty() {
            return Err(AuthError::StoreQueryGrammar("objectstatus takes no parameters".to_string()));
        }

        object_status(bucket, object_key, index, multipart).await
    }
}

async fn object_status(
    bucket: &str,
    object_key: &str,
    index: &dyn BucketIndex,
    multipart: &dyn MultipartTable,
) -> Result<Value, AuthError> {
    // Pass A: committed objects, by exact-key match in the current listing page.
    let mut marker = None;
    loop {
        let page = index
            .list_versions(bucket, object_key, marker.as_deref(), PAGE_SIZE)
            .await
            .map_err(|e| AuthError::BucketListing(e.to_string()))?;

        if let Some(entry) = page.entries.iter().find(|e| e.key == object_key && e.is_current) {
            let mut object = json!({
                "Bucket": bucket,
                "Key": object_key,
                "Deleted": entry.is_delete_marker,
                "MultipartUploadInProgress": false,
            });
            if !entry.is_delete_marker {
                object["VersionId"] = json!(entry.version_id);
                object["Size"] = json!(entry.size);
            }
            return Ok(json!({ "StoreQueryObjectStatusResult": { "Object": object } }));
        }

        if !page.is_truncated || page.next_marker.is_none() {
            break;
        }
        marker = page.next_marker;
    }

    // Pass B: in-progress multipart uploads, only reached if Pass A found nothing.
    let mut marker = None;
    loop {
        let page = multipart
            .list_uploads(bucket, object_key, marker.as_deref(), PAGE_SIZE)
            .await
            .map_err(|e| AuthError::MultipartListing(e.to_string()))?;

        if let Some(entry) = page.entries.iter().find(|e| e.key == object_key) {
            return Ok(json!({
                "StoreQueryObjectStatusResult": {
                    "Object": {
                        "Bucket": bucket,
                        "Key": object_key,
                        "Deleted": false,
                        "MultipartUploadInProgress": true,
                        "MultipartUploadId": entry.upload_id,
                    }
                }
            }));
        }

        if !page.is_truncated || page.next_marker.is_none() {
            break;
        }
        marker = page.next_marker;
    }

    Err(AuthError::ObjectNotFound { bucket: bucket.to_string(), key: object_key.to_string() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storequery::memory::{InMemoryBucketIndex, InMemoryMultipartTable};

    #[tokio::test]
    async fn scenario_8_object_present_reports_size_and_version() {
        let index = InMemoryBucketIndex::new();
        index.put_current("bucket", "key", "v123", 123, false);
        let multipart = InMemoryMultipartTable::new();

        let result = object_status("bucket", "key", &index, &multipart).await.unwrap();
        let object = &result["StoreQueryObjectStatusResult"]["Object"];
        assert_eq!(object["Deleted"], false);
        assert_eq!(object["MultipartUploadInProgress"], false);
        assert_eq!(object["Size"], 123);
        assert_eq!(object["VersionId"], "v123");
    }

    #[tokio::test]
    async fn delete_marker_reports_deleted_without_size() {
        let index = InMemoryBucketIndex::new();
        index.put_current("bucket", "key", "v2", 0, true);
        let multipart = InMemoryMultipartTable::new();

        let result = object_status("bucket", "key", &index, &multipart).await.unwrap();
        let object = &result["StoreQueryObjectStatusResult"]["Object"];
        assert_eq!(object["Deleted"], true);
        assert!(object.get("Size").is_none());
    }

    #[tokio::test]
    async fn scenario_9_multipart_in_progress_when_not_committed() {
        let index = InMemoryBucketIndex::new();
        let multipart = InMemoryMultipartTable::new();
        multipart.put_upload("bucket", "key", "u-1");

        let result = object_status("bucket", "key", &index, &multipart).await.unwrap();
        let object = &result["StoreQueryObjectStatusResult"]["Object"];
        assert_eq!(object["MultipartUploadInProgress"], true);
        assert_eq!(object["MultipartUploadId"], "u-1");
    }

    #[tokio::test]
    async fn not_found_anywhere_is_an_error() {
        let index = InMemoryBucketIndex::new();
        let multipart = InMemoryMultipartTable::new();
        assert!(object_status("bucket", "missing", &index, &multipart).await.is_err());
    }

    #[tokio::test]
    async fn multipart_listing_advances_marker_across_pages() {
        let index = InMemoryBucketIndex::new();
        let multipart = InMemoryMultipartTable::new();
        multipart.set_page_size_for_test(1);
        // two unrelated uploads ahead of the one we're looking for, forcing
        // pagination across 3 pages.
        multipart.put_upload("bucket", "aaa", "u-a");
        multipart.put_upload("bucket", "bbb", "u-b");
        multipart.put_upload("bucket", "key", "u-1");

        let result = object_status("bucket", "key", &index, &multipart).await.unwrap();
        let object = &result["StoreQueryObjectStatusResult"]["Object"];
        assert_eq!(object["MultipartUploadId"], "u-1");
    }

    #[tokio::test]
    async fn handler_rejects_parameters() {
        let handler = ObjectStatusHandler;
        let index = InMemoryBucketIndex::new();
        let multipart = InMemoryMultipartTable::new();
        let command = StoreQueryCommand {
            name: "objectstatus".to_string(),
            params: vec!["unexpected".to_string()],
        };
        assert!(handler.execute(&command, "bucket", "key", &index, &multipart).await.is_err());
    }
}
