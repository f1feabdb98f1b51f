//! # ferry-blob: Blob storage client boundary
//!
//! `ferry-blob` defines the contract the ferry upload engine requires from a
//! storage backend, and ships two implementations of it: a production
//! S3-compatible client and an in-memory client for tests and development.
//!
//! The contract is deliberately small:
//!
//! - **Progress-emitting uploads**: [`BlobClient::begin_upload`] returns a
//!   stream of [`TransferEvent`]s: zero or more `Progress` notifications
//!   followed by exactly one terminal `Completed` or `Failed` event.
//! - **URL resolution**: [`BlobClient::resolve_url`] turns a stored object's
//!   key into a retrievable URL. It may fail transiently; callers are
//!   expected to retry.
//! - **Listing**: [`BlobClient::list_objects`] enumerates keys under a
//!   logical prefix.
//!
//! ## Quick Start
//!
//! ```rust
//! use ferry_blob::{BlobClient, MemoryBlobClient, TransferEvent};
//! use futures::StreamExt;
//!
//! # #[tokio::main]
//! # async fn main() -> ferry_blob::BlobResult<()> {
//! let client = MemoryBlobClient::new();
//! let mut events = client.begin_upload("uploads/hello.txt", "hello".into()).await?;
//!
//! while let Some(event) = events.next().await {
//!     if let TransferEvent::Completed { key } = event {
//!         let url = client.resolve_url(&key).await?;
//!         assert!(url.ends_with("hello.txt"));
//!     }
//! }
//! # Ok(())
//! # }
//! ```

mod client;
mod error;
mod memory;
mod s3;

pub use client::{BlobClient, TransferEvent, TransferEvents};
pub use error::{BlobError, BlobResult};
pub use memory::MemoryBlobClient;
pub use s3::{S3BlobClient, S3Config};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{BlobClient, BlobError, BlobResult, TransferEvent, TransferEvents};
}
