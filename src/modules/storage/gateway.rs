use async_trait::async_trait;

use crate::core::error::AppError;

/// Object-storage operations the asset subsystem depends on.
///
/// Implementations translate backend failures into [`AppError::Gateway`] so callers
/// can tell "try again later" apart from request errors.
#[async_trait]
pub trait ObjectStorageGateway: Send + Sync {
    /// Mint a time-limited URL that authorizes exactly one PUT of `size_bytes` bytes
    /// of `mime_type` content whose SHA-256 (hex) is `checksum`.
    async fn mint_upload_url(
        &self,
        key: &str,
        size_bytes: u64,
        mime_type: &str,
        checksum: &str,
    ) -> Result<String, AppError>;

    /// Remove the object at `key`. Removing a missing object succeeds.
    async fn delete_object(&self, key: &str) -> Result<(), AppError>;

    /// Whether an object is stored at `key`.
    async fn object_exists(&self, key: &str) -> Result<bool, AppError>;
}
