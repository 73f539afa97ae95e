use bytes::Bytes;
use uuid::Uuid;

use crate::features::assets::dtos::{owner_asset_prefix, PresignRequestDto};
use crate::shared::checksum::sha256_hex;

/// Category used when a MIME type has no usable top-level segment
const FALLBACK_CATEGORY: &str = "application";

/// A file selected for upload, held fully in memory
#[derive(Debug, Clone, PartialEq)]
pub struct FileHandle {
    pub name: String,
    pub mime_type: String,
    pub content: Bytes,
}

impl FileHandle {
    pub fn new(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        content: impl Into<Bytes>,
    ) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            content: content.into(),
        }
    }

    pub fn size(&self) -> u64 {
        self.content.len() as u64
    }
}

/// A file paired with the storage key it will be uploaded under
#[derive(Debug, Clone, PartialEq)]
pub struct UploadIntent {
    pub file: FileHandle,
    pub key: String,
}

/// Lowercased top-level MIME segment, e.g. `image` for `image/png`
pub fn coarse_category(mime_type: &str) -> String {
    let Some((top, sub)) = mime_type.trim().split_once('/') else {
        return FALLBACK_CATEGORY.to_string();
    };
    let well_formed = top.starts_with(|c: char| c.is_ascii_alphanumeric())
        && !sub.is_empty()
        && top
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '+'));
    if well_formed {
        top.to_ascii_lowercase()
    } else {
        FALLBACK_CATEGORY.to_string()
    }
}

/// `{owner}/assets/{category}/{uuid}`; every call yields a fresh key
pub fn derive_key(file: &FileHandle, owner_id: &str) -> String {
    format!(
        "{}{}/{}",
        owner_asset_prefix(owner_id),
        coarse_category(&file.mime_type),
        Uuid::new_v4()
    )
}

/// Lowercase hex SHA-256 of the full content
pub fn compute_checksum(file: &FileHandle) -> String {
    sha256_hex(&file.content)
}

/// Derive the key and checksum for `file` and build its presign declaration
pub fn prepare(file: FileHandle, owner_id: &str) -> (UploadIntent, PresignRequestDto) {
    let key = derive_key(&file, owner_id);
    let request = PresignRequestDto {
        key: key.clone(),
        filename: file.name.clone(),
        mime_type: file.mime_type.clone(),
        size_bytes: file.size(),
        checksum: compute_checksum(&file),
    };
    (UploadIntent { file, key }, request)
}
