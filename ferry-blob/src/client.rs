use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures_core::Stream;

use crate::BlobResult;

/// Stream of notifications for one in-flight transfer
pub type TransferEvents = Pin<Box<dyn Stream<Item = TransferEvent> + Send>>;

/// Notification emitted by an in-flight transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferEvent {
    /// Bytes moved so far; `total_bytes` may be unknown early in the transfer
    Progress {
        bytes_transferred: u64,
        total_bytes: Option<u64>,
    },
    /// Terminal: the object is durably stored under `key`
    Completed { key: String },
    /// Terminal: the transfer failed and will make no further progress
    Failed { reason: String },
}

impl TransferEvent {
    /// Whether this event ends the transfer's event stream
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed { .. } | Self::Failed { .. })
    }
}

/// Storage backend contract required by the upload engine.
///
/// A transfer started with [`begin_upload`](Self::begin_upload) emits zero or
/// more `Progress` events followed by exactly one terminal event, all for a
/// single object. Progress counters are non-decreasing within one transfer.
#[async_trait]
pub trait BlobClient: Send + Sync {
    /// Start uploading `bytes` under `key`, returning the transfer's event stream
    async fn begin_upload(&self, key: &str, bytes: Bytes) -> BlobResult<TransferEvents>;

    /// Resolve a retrievable URL for a stored object.
    ///
    /// May fail transiently even after a successful upload; callers retry.
    async fn resolve_url(&self, key: &str) -> BlobResult<String>;

    /// List object keys under `prefix`
    async fn list_objects(&self, prefix: &str) -> BlobResult<Vec<String>>;
}
