//! In-memory [`BucketIndex`]/[`MultipartTable`] doubles, used by the demo
//! binary and by tests. Grounded in the teacher's `storage::memory` test
//! backend: a `DashMap` keyed by bucket, storing a `Vec` of entries sorted
//! by key so marker-based pagination can binary-search the resume point.

use dashmap::DashMap;

use super::{BucketIndex, MultipartTable, UploadEntry, UploadPage, VersionEntry, VersionPage};
use crate::error::AuthError;

#[derive(Default)]
pub struct InMemoryBucketIndex {
    buckets: DashMap<String, Vec<VersionEntry>>,
}

impl InMemoryBucketIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert (or replace) the current version of `key` in `bucket`, for
    /// test/demo setup.
    pub fn put_current(&self, bucket: &str, key: &str, version_id: &str, size: u64, is_delete_marker: bool) {
        let mut entries = self.buckets.entry(bucket.to_string()).or_default();
        entries.retain(|e| e.key != key);
        entries.push(VersionEntry {
            key: key.to_string(),
            version_id: version_id.to_string(),
            is_current: true,
            is_delete_marker,
            size,
        });
        entries.sort_by(|a, b| a.key.cmp(&b.key));
    }
}

#[async_trait::async_trait]
impl BucketIndex for InMemoryBucketIndex {
    async fn list_versions(
        &self,
        bucket: &str,
        prefix: &str,
        marker: Option<&str>,
        page_size: u32,
    ) -> Result<VersionPage, AuthError> {
        let entries = match self.buckets.get(bucket) {
            Some(entries) => entries.clone(),
            None => return Ok(VersionPage::default()),
        };

        let start = match marker {
            Some(m) => entries.iter().position(|e| e.key.as_str() > m).unwrap_or(entries.len()),
            None => 0,
        };

        let matching: Vec<_> = entries[start..].iter().filter(|e| e.key.starts_with(prefix)).cloned().collect();

        let page_size = page_size as usize;
        let is_truncated = matching.len() > page_size;
        let page: Vec<_> = matching.into_iter().take(page_size).collect();
        let next_marker = if is_truncated { page.last().map(|e| e.key.clone()) } else { None };

        Ok(VersionPage { entries: page, next_marker, is_truncated })
    }
}

#[derive(Default)]
pub struct InMemoryMultipartTable {
    buckets: DashMap<String, Vec<UploadEntry>>,
    page_size_override: DashMap<(), u32>,
}

impl InMemoryMultipartTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_upload(&self, bucket: &str, key: &str, upload_id: &str) {
        let mut entries = self.buckets.entry(bucket.to_string()).or_default();
        entries.push(UploadEntry { key: key.to_string(), upload_id: upload_id.to_string() });
        entries.sort_by(|a, b| a.key.cmp(&b.key));
    }

    /// Force pagination in tests regardless of the caller-supplied page
    /// size, to exercise multi-page marker advancement.
    pub fn set_page_size_for_test(&self, size: u32) {
        self.page_size_override.insert((), size);
    }
}

#[async_trait::async_trait]
impl MultipartTable for InMemoryMultipartTable {
    async fn list_uploads(
        &self,
        bucket: &str,
        prefix: &str,
        marker: Option<&str>,
        page_size: u32,
    ) -> Result<UploadPage, AuthError> {
        let entries = match self.buckets.get(bucket) {
            Some(entries) => entries.clone(),
            None => return Ok(UploadPage::default()),
        };

        let start = match marker {
            Some(m) => entries.iter().position(|e| e.key.as_str() > m).unwrap_or(entries.len()),
            None => 0,
        };

        let matching: Vec<_> = entries[start..].iter().filter(|e| e.key.starts_with(prefix)).cloned().collect();

        let page_size = self.page_size_override.get(&()).map(|v| *v).unwrap_or(page_size) as usize;
        let is_truncated = matching.len() > page_size;
        let page: Vec<_> = matching.into_iter().take(page_size).collect();
        let next_marker = if is_truncated { page.last().map(|e| e.key.clone()) } else { None };

        Ok(UploadPage { entries: page, next_marker, is_truncated })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bucket_index_paginates_by_marker() {
        let index = InMemoryBucketIndex::new();
        index.put_current("b", "a", "v1", 1, false);
        index.put_current("b", "b", "v1", 1, false);
        index.put_current("b", "c", "v1", 1, false);

        let page1 = index.list_versions("b", "", None, 2).await.unwrap();
        assert_eq!(page1.entries.len(), 2);
        assert!(page1.is_truncated);

        let page2 = index.list_versions("b", "", page1.next_marker.as_deref(), 2).await.unwrap();
        assert_eq!(page2.entries.len(), 1);
        assert!(!page2.is_truncated);
    }

    #[tokio::test]
    async fn multipart_table_paginates_by_marker() {
        let table = InMemoryMultipartTable::new();
        table.put_upload("b", "a", "u1");
        table.put_upload("b", "b", "u2");

        let page1 = table.list_uploads("b", "", None, 1).await.unwrap();
        assert_eq!(page1.entries.len(), 1);
        assert!(page1.is_truncated);

        let page2 = table.list_uploads("b", "", page1.next_marker.as_deref(), 1).await.unwrap();
        assert_eq!(page2.entries.len(), 1);
        assert!(!page2.is_truncated);
    }

    #[tokio::test]
    async fn empty_bucket_returns_empty_page() {
        let index = InMemoryBucketIndex::new();
        let page = index.list_versions("missing", "", None, 10).await.unwrap();
        assert!(page.entries.is_empty());
        assert!(!page.is_truncated);
    }
}
