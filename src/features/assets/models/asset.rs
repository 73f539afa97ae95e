use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Durable metadata for one uploaded asset (table `assets`)
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FileMetadata {
    pub id: Uuid,
    /// Join key with the object store; unique and immutable
    pub key: String,
    pub mime_type: String,
    pub size_bytes: i64,
    /// Hex SHA-256 the upload URL was minted for
    pub checksum: String,
    pub name: String,
    pub description: Option<String>,
    pub owner_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Set once the orphan sweeper has seen the object in storage
    #[serde(skip)]
    pub confirmed_at: Option<DateTime<Utc>>,
}

/// Row to insert for one presigned upload
#[derive(Debug, Clone)]
pub struct NewFileMetadata {
    pub key: String,
    pub mime_type: String,
    pub size_bytes: i64,
    pub checksum: String,
    pub name: String,
    pub owner_id: String,
}

/// Mutable fields of an asset. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct FileMetadataChanges {
    pub name: Option<String>,
    /// `Some(None)` clears the description
    pub description: Option<Option<String>>,
}
