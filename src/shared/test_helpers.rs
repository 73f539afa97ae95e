use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use axum::{extract::Request, middleware::Next, response::Response, Router};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::assets::models::{FileMetadata, FileMetadataChanges, NewFileMetadata};
use crate::features::assets::repositories::AssetRepository;
use crate::features::auth::model::AuthenticatedUser;
use crate::modules::storage::ObjectStorageGateway;

/// Layer that injects an authenticated caller with the given `sub`
pub fn with_authenticated_user(router: Router, sub: &str) -> Router {
    let user = AuthenticatedUser::new(sub);
    router.layer(axum::middleware::from_fn(
        move |mut request: Request, next: Next| {
            let user = user.clone();
            async move {
                request.extensions_mut().insert(user);
                next.run(request).await
            }
        },
    ))
}

pub fn sample_file(owner_id: &str, key: &str, created_at: DateTime<Utc>) -> FileMetadata {
    FileMetadata {
        id: Uuid::new_v4(),
        key: key.to_string(),
        mime_type: "image/png".to_string(),
        size_bytes: 42,
        checksum: "a".repeat(64),
        name: "cover.png".to_string(),
        description: None,
        owner_id: owner_id.to_string(),
        created_at,
        updated_at: created_at,
        confirmed_at: None,
    }
}

/// `AssetRepository` over a vector, with the same uniqueness and scoping rules
/// as the PostgreSQL schema.
#[derive(Default)]
pub struct InMemoryAssetRepository {
    rows: Mutex<Vec<FileMetadata>>,
}

impl InMemoryAssetRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(rows: Vec<FileMetadata>) -> Self {
        Self {
            rows: Mutex::new(rows),
        }
    }

    pub fn rows(&self) -> Vec<FileMetadata> {
        self.rows.lock().unwrap().clone()
    }

    pub fn find(&self, key: &str) -> Option<FileMetadata> {
        self.rows().into_iter().find(|r| r.key == key)
    }
}

#[async_trait]
impl AssetRepository for InMemoryAssetRepository {
    async fn insert_batch(&self, rows: Vec<NewFileMetadata>) -> Result<Vec<FileMetadata>> {
        let mut stored = self.rows.lock().unwrap();
        let mut keys: HashSet<String> = stored.iter().map(|r| r.key.clone()).collect();
        for row in &rows {
            if !keys.insert(row.key.clone()) {
                return Err(AppError::Conflict(
                    "An asset with this key already exists".to_string(),
                ));
            }
        }

        let now = Utc::now();
        let inserted: Vec<FileMetadata> = rows
            .into_iter()
            .map(|row| FileMetadata {
                id: Uuid::new_v4(),
                key: row.key,
                mime_type: row.mime_type,
                size_bytes: row.size_bytes,
                checksum: row.checksum,
                name: row.name,
                description: None,
                owner_id: row.owner_id,
                created_at: now,
                updated_at: now,
                confirmed_at: None,
            })
            .collect();
        stored.extend(inserted.iter().cloned());
        Ok(inserted)
    }

    async fn find_by_key(&self, key: &str) -> Result<Option<FileMetadata>> {
        Ok(self.find(key))
    }

    async fn update_owned(
        &self,
        id: Uuid,
        owner_id: &str,
        changes: FileMetadataChanges,
    ) -> Result<Option<FileMetadata>> {
        let mut stored = self.rows.lock().unwrap();
        let Some(row) = stored
            .iter_mut()
            .find(|r| r.id == id && r.owner_id == owner_id)
        else {
            return Ok(None);
        };
        if let Some(name) = changes.name {
            row.name = name;
        }
        if let Some(description) = changes.description {
            row.description = description;
        }
        row.updated_at = Utc::now();
        Ok(Some(row.clone()))
    }

    async fn delete_owned(&self, key: &str, owner_id: &str) -> Result<bool> {
        let mut stored = self.rows.lock().unwrap();
        let before = stored.len();
        stored.retain(|r| !(r.key == key && r.owner_id == owner_id));
        Ok(stored.len() < before)
    }

    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<FileMetadata>> {
        let mut files: Vec<FileMetadata> = self
            .rows()
            .into_iter()
            .filter(|r| r.owner_id == owner_id)
            .collect();
        files.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(files)
    }

    async fn list_unconfirmed(
        &self,
        older_than: DateTime<Utc>,
        after: Option<(DateTime<Utc>, Uuid)>,
        limit: i64,
    ) -> Result<Vec<FileMetadata>> {
        let mut files: Vec<FileMetadata> = self
            .rows()
            .into_iter()
            .filter(|r| r.confirmed_at.is_none() && r.created_at < older_than)
            .filter(|r| after.map_or(true, |cursor| (r.created_at, r.id) > cursor))
            .collect();
        files.sort_by_key(|r| (r.created_at, r.id));
        files.truncate(limit.max(0) as usize);
        Ok(files)
    }

    async fn mark_confirmed(&self, id: Uuid) -> Result<()> {
        let mut stored = self.rows.lock().unwrap();
        if let Some(row) = stored.iter_mut().find(|r| r.id == id) {
            row.confirmed_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn delete_unconfirmed(&self, id: Uuid) -> Result<bool> {
        let mut stored = self.rows.lock().unwrap();
        let before = stored.len();
        stored.retain(|r| !(r.id == id && r.confirmed_at.is_none()));
        Ok(stored.len() < before)
    }
}

/// Recording `ObjectStorageGateway` with switchable failures
#[derive(Default)]
pub struct FakeGateway {
    minted: Mutex<Vec<String>>,
    deleted: Mutex<Vec<String>>,
    objects: Mutex<HashSet<String>>,
    unreachable: Mutex<HashSet<String>>,
    fail_mint_for: Mutex<Option<String>>,
    fail_delete: Mutex<bool>,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Minting the URL for `key` fails with a gateway error
    pub fn failing_mint_for(key: &str) -> Self {
        let gateway = Self::default();
        *gateway.fail_mint_for.lock().unwrap() = Some(key.to_string());
        gateway
    }

    pub fn failing_delete() -> Self {
        let gateway = Self::default();
        *gateway.fail_delete.lock().unwrap() = true;
        gateway
    }

    pub fn put_object(&self, key: &str) {
        self.objects.lock().unwrap().insert(key.to_string());
    }

    /// Existence checks for `key` fail with a gateway error
    pub fn unreachable_object(&self, key: &str) {
        self.unreachable.lock().unwrap().insert(key.to_string());
    }

    pub fn minted(&self) -> Vec<String> {
        self.minted.lock().unwrap().clone()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }

    pub fn url_for(key: &str) -> String {
        format!("https://storage.test/bucket/{}?X-Amz-Signature=test", key)
    }
}

#[async_trait]
impl ObjectStorageGateway for FakeGateway {
    async fn mint_upload_url(
        &self,
        key: &str,
        _size_bytes: u64,
        _mime_type: &str,
        _checksum: &str,
    ) -> std::result::Result<String, AppError> {
        if self.fail_mint_for.lock().unwrap().as_deref() == Some(key) {
            return Err(AppError::Gateway("presign rejected".to_string()));
        }
        self.minted.lock().unwrap().push(key.to_string());
        Ok(Self::url_for(key))
    }

    async fn delete_object(&self, key: &str) -> std::result::Result<(), AppError> {
        self.deleted.lock().unwrap().push(key.to_string());
        if *self.fail_delete.lock().unwrap() {
            return Err(AppError::Gateway("storage unreachable".to_string()));
        }
        self.objects.lock().unwrap().remove(key);
        Ok(())
    }

    async fn object_exists(&self, key: &str) -> std::result::Result<bool, AppError> {
        if self.unreachable.lock().unwrap().contains(key) {
            return Err(AppError::Gateway("head request timed out".to_string()));
        }
        Ok(self.objects.lock().unwrap().contains(key))
    }
}
