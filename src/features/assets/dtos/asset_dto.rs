use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::features::assets::models::FileMetadata;
use crate::shared::validation::{ASSET_KEY_TAIL_REGEX, MIME_TYPE_REGEX, SHA256_HEX_REGEX};

/// Maximum number of files accepted in one presign batch
pub const MAX_PRESIGN_BATCH: usize = 100;

/// Key namespace every asset of `owner_id` lives under
pub fn owner_asset_prefix(owner_id: &str) -> String {
    format!("{}/assets/", owner_id)
}

/// Whether `key` is exactly `{owner_id}/assets/{category}/{token}`.
///
/// Dot segments, empty segments and backslashes are rejected so the key cannot
/// resolve to another owner's object once it becomes a URL path.
pub fn is_owned_asset_key(key: &str, owner_id: &str) -> bool {
    let owner_is_segment = !owner_id.is_empty()
        && owner_id != "."
        && owner_id != ".."
        && !owner_id.contains(['/', '\\']);
    owner_is_segment
        && key
            .strip_prefix(&owner_asset_prefix(owner_id))
            .is_some_and(|tail| ASSET_KEY_TAIL_REGEX.is_match(tail))
}

/// Declaration of one file the client is about to upload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PresignRequestDto {
    /// Storage key derived by the client, `{ownerId}/assets/{category}/{token}`
    #[validate(length(min = 1, max = 1024, message = "key must be between 1 and 1024 characters"))]
    #[schema(example = "user-123/assets/image/0b5c2d1e-7f0a-4c36-9d8e-2f4b8a1c6e90")]
    pub key: String,
    /// Original filename, becomes the asset's initial name
    #[validate(length(min = 1, max = 255, message = "filename must be between 1 and 255 characters"))]
    #[schema(example = "cover.png")]
    pub filename: String,
    #[validate(regex(path = *MIME_TYPE_REGEX, message = "mimeType must look like type/subtype"))]
    #[schema(example = "image/png")]
    pub mime_type: String,
    /// Zero is allowed for empty files
    pub size_bytes: u64,
    /// Hex-encoded SHA-256 of the full file content
    #[validate(regex(path = *SHA256_HEX_REGEX, message = "checksum must be a 64-character hex SHA-256 digest"))]
    pub checksum: String,
}

/// Metadata row paired with the URL the client must PUT the bytes to
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PresignedAssetDto {
    pub metadata: FileMetadata,
    #[serde(rename = "uploadURL")]
    pub upload_url: String,
}

/// Update request. Any other FileMetadata fields in the body are ignored.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAssetDto {
    pub id: Uuid,
    #[validate(length(min = 1, max = 255, message = "name must be between 1 and 255 characters"))]
    pub name: Option<String>,
    /// Empty string clears the description
    #[validate(length(max = 2000, message = "description must be at most 2000 characters"))]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct DeleteAssetDto {
    #[validate(length(min = 1, max = 1024, message = "key is required"))]
    pub key: String,
}

/// Listing response; `files` is empty when storage is not configured
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssetListDto {
    pub files: Vec<FileMetadata>,
    pub storage_configured: bool,
    pub origin: String,
}
