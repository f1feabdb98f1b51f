//! # ferry-upload: Upload orchestration engine
//!
//! `ferry-upload` manages the lifecycle of N concurrent file transfers
//! against a blob storage backend. It tracks and aggregates per-session
//! progress, reconciles local state with the authoritative remote object
//! listing, and exposes a consistent view of "what is uploading / what is
//! done" to any presentation layer.
//!
//! ## Key properties
//!
//! - **One-directional lifecycle**: sessions move `Pending → Transferring →
//!   Succeeded | Failed` and never leave a terminal state.
//! - **Failure isolation**: each transfer runs on its own task; one failing
//!   session never cancels, retries, or otherwise affects another.
//! - **Torn-read freedom**: [`UploadOrchestrator::snapshot`] reflects either
//!   all of a terminal transition's effects or none of them.
//! - **Swappable transport**: progress and terminal notifications enter
//!   through plain ingestion methods, so any transfer subsystem that speaks
//!   [`BlobClient`](ferry_blob::BlobClient) plugs in.
//!
//! ## Quick Start
//!
//! ```rust
//! use ferry_blob::MemoryBlobClient;
//! use ferry_upload::prelude::*;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let orchestrator =
//!     UploadOrchestrator::new(MemoryBlobClient::new(), UploaderConfig::default());
//! let mut events = orchestrator.subscribe();
//!
//! let ids = orchestrator.submit(vec![FileSource::new("notes.txt", &b"hello"[..])]);
//! assert_eq!(ids.len(), 1);
//!
//! // Wait for the terminal notification, then read the published state
//! loop {
//!     match events.recv().await {
//!         Ok(UploaderEvent::Succeeded { session_id, .. }) if session_id == ids[0] => break,
//!         Ok(_) => continue,
//!         Err(_) => panic!("event channel closed"),
//!     }
//! }
//!
//! let snapshot = orchestrator.snapshot();
//! assert_eq!(snapshot.uploaded.len(), 1);
//! assert!(snapshot.session(&ids[0]).unwrap().result_url().is_some());
//! # }
//! ```

mod config;
mod error;
mod events;
mod keys;
mod orchestrator;
mod preview;
mod sync;
mod types;

pub use config::UploaderConfig;
pub use error::{UploadError, UploadResult};
pub use events::UploaderEvent;
pub use keys::{DefaultKeyStrategy, ObjectKeyStrategy};
pub use orchestrator::UploadOrchestrator;
pub use preview::{PreviewCache, PreviewRef};
pub use sync::ListingSynchronizer;
pub use types::{
    FileSource, SessionId, TransferOutcome, UploadSession, UploadStatus, UploadedObject,
    UploaderSnapshot,
};

// Storage boundary re-exports for downstream convenience
pub use ferry_blob::{BlobClient, BlobError, BlobResult, TransferEvent, TransferEvents};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        FileSource, SessionId, TransferOutcome, UploadError, UploadOrchestrator, UploadResult,
        UploadSession, UploadStatus, UploadedObject, UploaderConfig, UploaderEvent,
        UploaderSnapshot,
    };
}
