use thiserror::Error;

use ferry_blob::BlobError;

/// Result type for orchestration operations
pub type UploadResult<T> = Result<T, UploadError>;

/// Errors surfaced by the upload engine.
///
/// Every failure is scoped to the sync call that produced it; none of these
/// is fatal to the orchestration. A failed transfer is not an `UploadError`
/// at all: it is recorded on its session's `Failed` status and surfaced
/// through the read model.
#[derive(Error, Debug)]
pub enum UploadError {
    #[error("Could not resolve download URL for {key} after {attempts} attempts: {source}")]
    Resolution {
        key: String,
        attempts: u32,
        #[source]
        source: BlobError,
    },

    #[error("Listing sync failed: {0}")]
    Listing(#[from] BlobError),
}
