//! Uploading side of the direct-to-storage protocol
//!
//! Files are keyed and checksummed locally, presigned through the asset API and
//! then PUT straight to object storage, with per-file progress and retries.

mod api_client;
mod deriver;
mod error;
mod executor;
mod progress;
mod transport;
mod uploader;

pub use api_client::AssetApiClient;
pub use deriver::{coarse_category, compute_checksum, derive_key, prepare, FileHandle, UploadIntent};
pub use error::{ClientError, Result};
pub use executor::{BatchOutcome, Compensator, ExecutorConfig, UploadExecutor, UploadJob};
pub use progress::{
    in_flight_percent, ProgressReporter, ProgressStore, UploadProgressEntry, UploadStatus,
};
pub use transport::{HttpTransport, ProgressFn, UploadTransport, UPLOAD_CHUNK_SIZE};
pub use uploader::{AssetUploader, Presigner};
