use std::sync::Arc;
use std::time::Duration;

use ferry_blob::{BlobClient, BlobError};
use tracing::{info, warn};

use crate::{UploadError, UploadResult, UploadedObject};

/// Reconciles the local view with the authoritative remote object list.
///
/// `sync` returns the full set under a prefix, not a diff; it never mutates
/// caller state, so a failed call leaves whatever the caller published
/// untouched.
#[derive(Clone)]
pub struct ListingSynchronizer {
    client: Arc<dyn BlobClient>,
    resolve_attempts: u32,
    resolve_retry_delay: Duration,
}

impl ListingSynchronizer {
    pub fn new<C: BlobClient + 'static>(client: C) -> Self {
        Self::from_shared(Arc::new(client))
    }

    pub fn from_shared(client: Arc<dyn BlobClient>) -> Self {
        Self {
            client,
            resolve_attempts: 3,
            resolve_retry_delay: Duration::from_millis(250),
        }
    }

    /// Set the bounded retry used when resolving each listed key
    pub fn with_resolution_retry(mut self, attempts: u32, delay: Duration) -> Self {
        self.resolve_attempts = attempts.max(1);
        self.resolve_retry_delay = delay;
        self
    }

    /// Fetch the full set of objects under `prefix`, each resolved to a URL
    pub async fn sync(&self, prefix: &str) -> UploadResult<Vec<UploadedObject>> {
        let keys = self.client.list_objects(prefix).await?;

        let mut objects = Vec::with_capacity(keys.len());
        for key in keys {
            let url = resolve_with_retry(
                self.client.as_ref(),
                &key,
                self.resolve_attempts,
                self.resolve_retry_delay,
            )
            .await
            .map_err(|source| UploadError::Resolution {
                key: key.clone(),
                attempts: self.resolve_attempts,
                source,
            })?;
            objects.push(UploadedObject { key, url });
        }

        info!(prefix, objects = objects.len(), "remote listing synchronized");
        Ok(objects)
    }
}

/// Resolve a download URL with bounded retry. The object is already durably
/// stored at this point, so transient resolution failures are worth
/// absorbing before surfacing one.
pub(crate) async fn resolve_with_retry(
    client: &dyn BlobClient,
    key: &str,
    attempts: u32,
    delay: Duration,
) -> Result<String, BlobError> {
    let attempts = attempts.max(1);
    let mut attempt = 1;
    loop {
        match client.resolve_url(key).await {
            Ok(url) => return Ok(url),
            Err(err) if attempt < attempts => {
                warn!(key, attempt, error = %err, "download URL resolution failed, retrying");
                attempt += 1;
                tokio::time::sleep(delay).await;
            }
            Err(err) => {
                warn!(key, attempt, error = %err, "download URL resolution failed");
                return Err(err);
            }
        }
    }
}
