use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use tracing::debug;

use crate::{BlobClient, BlobError, BlobResult, TransferEvent, TransferEvents};

/// In-memory client for testing and development.
///
/// Uploads emit synthetic progress in `chunk_size` steps before the terminal
/// event. Objects can be seeded directly for listing scenarios, and failures
/// can be scripted per key.
#[derive(Clone)]
pub struct MemoryBlobClient {
    objects: Arc<RwLock<BTreeMap<String, Bytes>>>,
    fail_markers: Arc<RwLock<Vec<String>>>,
    resolve_failures: Arc<RwLock<HashMap<String, u32>>>,
    base_url: String,
    chunk_size: usize,
}

impl MemoryBlobClient {
    pub fn new() -> Self {
        Self {
            objects: Arc::new(RwLock::new(BTreeMap::new())),
            fail_markers: Arc::new(RwLock::new(Vec::new())),
            resolve_failures: Arc::new(RwLock::new(HashMap::new())),
            base_url: "memory://blobs".to_string(),
            chunk_size: 64 * 1024,
        }
    }

    /// Emit progress in steps of `chunk_size` bytes
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Base for resolved URLs
    pub fn with_base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Seed an object as if it had been uploaded earlier
    pub fn insert(&self, key: &str, bytes: Bytes) {
        self.objects.write().insert(key.to_string(), bytes);
    }

    /// Whether an object is currently stored under `key`
    pub fn contains(&self, key: &str) -> bool {
        self.objects.read().contains_key(key)
    }

    /// Script every upload whose key contains `marker` to fail
    pub fn fail_uploads_matching<S: Into<String>>(&self, marker: S) {
        self.fail_markers.write().push(marker.into());
    }

    /// Script the next `times` resolutions of `key` to fail transiently
    pub fn fail_resolutions(&self, key: &str, times: u32) {
        self.resolve_failures.write().insert(key.to_string(), times);
    }

    fn upload_should_fail(&self, key: &str) -> bool {
        self.fail_markers
            .read()
            .iter()
            .any(|marker| key.contains(marker.as_str()))
    }
}

impl Default for MemoryBlobClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BlobClient for MemoryBlobClient {
    async fn begin_upload(&self, key: &str, bytes: Bytes) -> BlobResult<TransferEvents> {
        let key = key.to_string();
        let total = bytes.len() as u64;
        let chunk = self.chunk_size as u64;
        let objects = self.objects.clone();
        let should_fail = self.upload_should_fail(&key);

        let stream = async_stream::stream! {
            let mut sent = 0u64;
            loop {
                sent = (sent + chunk).min(total);
                yield TransferEvent::Progress {
                    bytes_transferred: sent,
                    total_bytes: Some(total),
                };
                if sent >= total {
                    break;
                }
            }
            if should_fail {
                yield TransferEvent::Failed {
                    reason: format!("injected failure for {key}"),
                };
            } else {
                objects.write().insert(key.clone(), bytes);
                yield TransferEvent::Completed { key };
            }
        };
        Ok(Box::pin(stream))
    }

    async fn resolve_url(&self, key: &str) -> BlobResult<String> {
        {
            let mut failures = self.resolve_failures.write();
            if let Some(remaining) = failures.get_mut(key) {
                if *remaining > 0 {
                    *remaining -= 1;
                    debug!(key, remaining = *remaining, "injected transient resolve failure");
                    return Err(BlobError::backend(std::io::Error::new(
                        std::io::ErrorKind::ConnectionReset,
                        "injected transient failure",
                    )));
                }
            }
        }

        if self.objects.read().contains_key(key) {
            Ok(format!("{}/{}", self.base_url, key))
        } else {
            Err(BlobError::not_found(key))
        }
    }

    async fn list_objects(&self, prefix: &str) -> BlobResult<Vec<String>> {
        Ok(self
            .objects
            .read()
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    async fn collect(mut events: TransferEvents) -> Vec<TransferEvent> {
        let mut out = Vec::new();
        while let Some(event) = events.next().await {
            out.push(event);
        }
        out
    }

    #[tokio::test]
    async fn upload_emits_chunked_progress_then_completed() {
        let client = MemoryBlobClient::new().with_chunk_size(4);
        let events = client
            .begin_upload("uploads/k", Bytes::from_static(b"0123456789"))
            .await
            .unwrap();
        let events = collect(events).await;

        assert_eq!(events.len(), 4);
        assert_eq!(
            events[0],
            TransferEvent::Progress {
                bytes_transferred: 4,
                total_bytes: Some(10)
            }
        );
        assert_eq!(
            events[2],
            TransferEvent::Progress {
                bytes_transferred: 10,
                total_bytes: Some(10)
            }
        );
        assert!(matches!(&events[3], TransferEvent::Completed { key } if key == "uploads/k"));
        assert!(client.contains("uploads/k"));
    }

    #[tokio::test]
    async fn empty_upload_still_reports_progress_and_completes() {
        let client = MemoryBlobClient::new();
        let events = collect(client.begin_upload("uploads/empty", Bytes::new()).await.unwrap()).await;

        assert_eq!(
            events[0],
            TransferEvent::Progress {
                bytes_transferred: 0,
                total_bytes: Some(0)
            }
        );
        assert!(events[1].is_terminal());
        assert!(client.contains("uploads/empty"));
    }

    #[tokio::test]
    async fn scripted_upload_failure_does_not_store_the_object() {
        let client = MemoryBlobClient::new();
        client.fail_uploads_matching("broken");
        let events = collect(
            client
                .begin_upload("uploads/broken.bin", Bytes::from_static(b"x"))
                .await
                .unwrap(),
        )
        .await;

        assert!(matches!(events.last(), Some(TransferEvent::Failed { .. })));
        assert!(!client.contains("uploads/broken.bin"));
    }

    #[tokio::test]
    async fn transient_resolve_failures_then_success() {
        let client = MemoryBlobClient::new();
        client.insert("uploads/a", Bytes::from_static(b"a"));
        client.fail_resolutions("uploads/a", 2);

        assert!(client.resolve_url("uploads/a").await.is_err());
        assert!(client.resolve_url("uploads/a").await.is_err());
        let url = client.resolve_url("uploads/a").await.unwrap();
        assert_eq!(url, "memory://blobs/uploads/a");
    }

    #[tokio::test]
    async fn resolve_unknown_key_is_not_found() {
        let client = MemoryBlobClient::new();
        assert!(matches!(
            client.resolve_url("nope").await,
            Err(BlobError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn list_filters_by_prefix() {
        let client = MemoryBlobClient::new();
        client.insert("uploads/a.png", Bytes::new());
        client.insert("uploads/b.png", Bytes::new());
        client.insert("covers/c.png", Bytes::new());

        let keys = client.list_objects("uploads/").await.unwrap();
        assert_eq!(keys, vec!["uploads/a.png", "uploads/b.png"]);
    }
}
