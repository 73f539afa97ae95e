use std::collections::HashSet;
use std::sync::Arc;

use futures::future::try_join_all;
use tracing::{debug, error, info};
use validator::Validate;

use crate::core::error::{AppError, Result};
use crate::features::assets::dtos::{
    is_owned_asset_key, owner_asset_prefix, AssetListDto, DeleteAssetDto, PresignRequestDto,
    PresignedAssetDto, UpdateAssetDto, MAX_PRESIGN_BATCH,
};
use crate::features::assets::models::{FileMetadata, FileMetadataChanges, NewFileMetadata};
use crate::features::assets::repositories::AssetRepository;
use crate::modules::storage::ObjectStorageGateway;
use crate::shared::validation::field_messages;

/// Presign broker and metadata lifecycle for the `assets` resource
pub struct AssetService {
    repo: Arc<dyn AssetRepository>,
    gateway: Option<Arc<dyn ObjectStorageGateway>>,
    origin: String,
    max_upload_size: u64,
}

impl AssetService {
    pub fn new(
        repo: Arc<dyn AssetRepository>,
        gateway: Option<Arc<dyn ObjectStorageGateway>>,
        origin: String,
        max_upload_size: u64,
    ) -> Self {
        Self {
            repo,
            gateway,
            origin,
            max_upload_size,
        }
    }

    fn gateway(&self) -> Result<&Arc<dyn ObjectStorageGateway>> {
        self.gateway.as_ref().ok_or(AppError::StorageUnavailable)
    }

    /// Mint one upload URL per declaration and persist the matching metadata rows.
    ///
    /// Nothing is written unless every declaration is valid and every URL was minted.
    pub async fn presign_batch(
        &self,
        owner_id: &str,
        requests: Vec<PresignRequestDto>,
    ) -> Result<Vec<PresignedAssetDto>> {
        let gateway = self.gateway()?;
        let rows = self.validate_batch(owner_id, &requests)?;

        let urls = try_join_all(requests.iter().map(|req| {
            gateway.mint_upload_url(&req.key, req.size_bytes, &req.mime_type, &req.checksum)
        }))
        .await?;
        debug!("Minted {} upload URLs for owner={}", urls.len(), owner_id);

        let files = self.repo.insert_batch(rows).await?;

        info!(
            "Presigned {} assets for owner={}",
            files.len(),
            owner_id
        );

        Ok(files
            .into_iter()
            .zip(urls)
            .map(|(metadata, upload_url)| PresignedAssetDto {
                metadata,
                upload_url,
            })
            .collect())
    }

    fn validate_batch(
        &self,
        owner_id: &str,
        requests: &[PresignRequestDto],
    ) -> Result<Vec<NewFileMetadata>> {
        if requests.is_empty() {
            return Err(AppError::validation("batch must contain at least one file"));
        }
        if requests.len() > MAX_PRESIGN_BATCH {
            return Err(AppError::validation(format!(
                "batch must contain at most {} files",
                MAX_PRESIGN_BATCH
            )));
        }

        let prefix = owner_asset_prefix(owner_id);
        let mut seen = HashSet::new();
        let mut errors = Vec::new();
        let mut rows = Vec::with_capacity(requests.len());

        for (index, req) in requests.iter().enumerate() {
            let field = |name: &str| format!("[{}].{}", index, name);

            if let Err(e) = req.validate() {
                errors.extend(field_messages(&format!("[{}].", index), &e));
            }
            if !req.key.starts_with(&prefix) {
                errors.push(format!("{}: key must start with '{}'", field("key"), prefix));
            } else if !is_owned_asset_key(&req.key, owner_id) {
                errors.push(format!(
                    "{}: key must have the form '{}{{category}}/{{token}}'",
                    field("key"),
                    prefix
                ));
            }
            if !seen.insert(req.key.as_str()) {
                errors.push(format!("{}: duplicate key in batch", field("key")));
            }
            if req.size_bytes > self.max_upload_size {
                errors.push(format!(
                    "{}: sizeBytes must not exceed {} bytes",
                    field("sizeBytes"),
                    self.max_upload_size
                ));
            }

            match i64::try_from(req.size_bytes) {
                Ok(size_bytes) => rows.push(NewFileMetadata {
                    key: req.key.clone(),
                    mime_type: req.mime_type.clone(),
                    size_bytes,
                    checksum: req.checksum.to_lowercase(),
                    name: req.filename.clone(),
                    owner_id: owner_id.to_string(),
                }),
                Err(_) => errors.push(format!("{}: sizeBytes is out of range", field("sizeBytes"))),
            }
        }

        if !errors.is_empty() {
            debug!("Rejected presign batch for owner={}: {:?}", owner_id, errors);
            return Err(AppError::Validation(errors));
        }
        Ok(rows)
    }

    /// Rename or re-describe an asset the caller owns
    pub async fn update(&self, owner_id: &str, dto: UpdateAssetDto) -> Result<FileMetadata> {
        dto.validate()
            .map_err(|e| AppError::Validation(field_messages("", &e)))?;

        let changes = FileMetadataChanges {
            name: dto.name,
            description: dto
                .description
                .map(|d| if d.is_empty() { None } else { Some(d) }),
        };

        let file = self
            .repo
            .update_owned(dto.id, owner_id, changes)
            .await?
            .ok_or_else(|| AppError::NotFound("File not found".to_string()))?;

        info!("Updated asset id={} key={}", file.id, file.key);
        Ok(file)
    }

    /// Remove the object, then its metadata row.
    ///
    /// The row survives if the object could not be removed.
    pub async fn delete(&self, owner_id: &str, dto: DeleteAssetDto) -> Result<()> {
        dto.validate()
            .map_err(|e| AppError::Validation(field_messages("", &e)))?;
        let gateway = self.gateway()?;

        let file = self
            .repo
            .find_by_key(&dto.key)
            .await?
            .filter(|f| f.owner_id == owner_id)
            .ok_or_else(|| AppError::NotFound("File not found".to_string()))?;

        if let Err(e) = gateway.delete_object(&file.key).await {
            error!("Failed to delete object key={}: {}", file.key, e);
            return Err(AppError::Cleanup {
                key: file.key,
                reason: e.to_string(),
            });
        }

        if !self.repo.delete_owned(&file.key, owner_id).await? {
            // Removed concurrently between lookup and delete
            return Err(AppError::NotFound("File not found".to_string()));
        }

        info!("Deleted asset key={} owner={}", file.key, owner_id);
        Ok(())
    }

    /// The caller's assets, newest first
    pub async fn list(&self, owner_id: &str) -> Result<AssetListDto> {
        if self.gateway.is_none() {
            return Ok(AssetListDto {
                files: Vec::new(),
                storage_configured: false,
                origin: self.origin.clone(),
            });
        }

        let files = self.repo.list_by_owner(owner_id).await?;
        Ok(AssetListDto {
            files,
            storage_configured: true,
            origin: self.origin.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::test_helpers::{FakeGateway, InMemoryAssetRepository};

    const MAX: u64 = 1024;

    fn request(key: &str) -> PresignRequestDto {
        PresignRequestDto {
            key: key.to_string(),
            filename: "cover.png".to_string(),
            mime_type: "image/png".to_string(),
            size_bytes: 42,
            checksum: "A".repeat(64),
        }
    }

    fn service(
        repo: Arc<InMemoryAssetRepository>,
        gateway: Option<Arc<FakeGateway>>,
    ) -> AssetService {
        AssetService::new(
            repo,
            gateway.map(|g| g as Arc<dyn ObjectStorageGateway>),
            "http://localhost:3000".to_string(),
            MAX,
        )
    }

    #[tokio::test]
    async fn test_presign_pairs_urls_with_rows_and_normalizes_checksum() {
        let repo = Arc::new(InMemoryAssetRepository::new());
        let svc = service(repo.clone(), Some(Arc::new(FakeGateway::new())));

        let out = svc
            .presign_batch(
                "alice",
                vec![request("alice/assets/image/a"), request("alice/assets/image/b")],
            )
            .await
            .unwrap();

        assert_eq!(out.len(), 2);
        for item in &out {
            assert_eq!(item.upload_url, FakeGateway::url_for(&item.metadata.key));
            assert_eq!(item.metadata.owner_id, "alice");
            assert_eq!(item.metadata.checksum, "a".repeat(64));
        }
        assert_eq!(repo.rows().len(), 2);
    }

    #[tokio::test]
    async fn test_presign_collects_every_invalid_field() {
        let repo = Arc::new(InMemoryAssetRepository::new());
        let gateway = Arc::new(FakeGateway::new());
        let svc = service(repo.clone(), Some(gateway.clone()));

        let mut too_big = request("alice/assets/image/b");
        too_big.size_bytes = MAX + 1;
        let err = svc
            .presign_batch(
                "alice",
                vec![
                    request("bob/assets/image/a"),
                    too_big,
                    request("alice/assets/image/b"),
                ],
            )
            .await
            .unwrap_err();

        match err {
            AppError::Validation(errors) => {
                assert!(errors.iter().any(|e| e.starts_with("[0].key: key must start")));
                assert!(errors.iter().any(|e| e.starts_with("[1].sizeBytes")));
                assert!(errors.contains(&"[2].key: duplicate key in batch".to_string()));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
        assert!(gateway.minted().is_empty());
        assert!(repo.rows().is_empty());
    }

    #[tokio::test]
    async fn test_presign_rejects_dot_segment_key_into_another_namespace() {
        let repo = Arc::new(InMemoryAssetRepository::new());
        let gateway = Arc::new(FakeGateway::new());
        let svc = service(repo.clone(), Some(gateway.clone()));

        let err = svc
            .presign_batch(
                "alice",
                vec![
                    request("alice/assets/image/a"),
                    request("alice/assets/../../bob/assets/image/victim"),
                ],
            )
            .await
            .unwrap_err();

        match err {
            AppError::Validation(errors) => {
                assert_eq!(errors.len(), 1);
                assert!(errors[0].starts_with("[1].key: key must have the form"));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
        assert!(gateway.minted().is_empty());
        assert!(repo.rows().is_empty());
    }

    #[tokio::test]
    async fn test_presign_accepts_empty_file() {
        let repo = Arc::new(InMemoryAssetRepository::new());
        let svc = service(repo.clone(), Some(Arc::new(FakeGateway::new())));
        let mut empty = request("alice/assets/text/empty");
        empty.size_bytes = 0;

        let out = svc
            .presign_batch("alice", vec![request("alice/assets/image/a"), empty])
            .await
            .unwrap();

        assert_eq!(out.len(), 2);
        assert_eq!(out[1].metadata.size_bytes, 0);
        assert_eq!(repo.rows().len(), 2);
    }

    #[tokio::test]
    async fn test_delete_rejects_empty_key_before_lookup() {
        let repo = Arc::new(InMemoryAssetRepository::new());
        let gateway = Arc::new(FakeGateway::new());
        let svc = service(repo, Some(gateway.clone()));

        let err = svc
            .delete("alice", DeleteAssetDto { key: String::new() })
            .await
            .unwrap_err();

        match err {
            AppError::Validation(errors) => assert_eq!(errors, vec!["key: key is required"]),
            other => panic!("expected validation error, got {:?}", other),
        }
        assert!(gateway.deleted().is_empty());
    }

    #[tokio::test]
    async fn test_presign_rejects_empty_batch() {
        let svc = service(
            Arc::new(InMemoryAssetRepository::new()),
            Some(Arc::new(FakeGateway::new())),
        );
        let err = svc.presign_batch("alice", vec![]).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_presign_gateway_failure_writes_nothing() {
        let repo = Arc::new(InMemoryAssetRepository::new());
        let svc = service(
            repo.clone(),
            Some(Arc::new(FakeGateway::failing_mint_for("alice/assets/image/b"))),
        );

        let err = svc
            .presign_batch(
                "alice",
                vec![request("alice/assets/image/a"), request("alice/assets/image/b")],
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Gateway(_)));
        assert!(repo.rows().is_empty());
    }

    #[tokio::test]
    async fn test_presign_existing_key_conflicts() {
        let repo = Arc::new(InMemoryAssetRepository::new());
        let svc = service(repo.clone(), Some(Arc::new(FakeGateway::new())));
        svc.presign_batch("alice", vec![request("alice/assets/image/a")])
            .await
            .unwrap();

        let err = svc
            .presign_batch(
                "alice",
                vec![request("alice/assets/image/b"), request("alice/assets/image/a")],
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(repo.rows().len(), 1);
    }

    #[tokio::test]
    async fn test_presign_without_storage_is_unavailable() {
        let repo = Arc::new(InMemoryAssetRepository::new());
        let svc = service(repo.clone(), None);
        let err = svc
            .presign_batch("alice", vec![request("alice/assets/image/a")])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::StorageUnavailable));
        assert!(repo.rows().is_empty());
    }

    #[tokio::test]
    async fn test_update_clears_description_with_empty_string() {
        let repo = Arc::new(InMemoryAssetRepository::new());
        let svc = service(repo.clone(), Some(Arc::new(FakeGateway::new())));
        let created = svc
            .presign_batch("alice", vec![request("alice/assets/image/a")])
            .await
            .unwrap();
        let id = created[0].metadata.id;

        let described = svc
            .update(
                "alice",
                UpdateAssetDto {
                    id,
                    name: None,
                    description: Some("a cover".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(described.description.as_deref(), Some("a cover"));
        assert_eq!(described.name, "cover.png");

        let cleared = svc
            .update(
                "alice",
                UpdateAssetDto {
                    id,
                    name: Some("renamed".to_string()),
                    description: Some(String::new()),
                },
            )
            .await
            .unwrap();
        assert_eq!(cleared.description, None);
        assert_eq!(cleared.name, "renamed");
    }

    #[tokio::test]
    async fn test_delete_keeps_row_when_object_delete_fails() {
        let repo = Arc::new(InMemoryAssetRepository::new());
        let svc = service(repo.clone(), Some(Arc::new(FakeGateway::failing_delete())));
        svc.presign_batch("alice", vec![request("alice/assets/image/a")])
            .await
            .unwrap();

        let err = svc
            .delete(
                "alice",
                DeleteAssetDto {
                    key: "alice/assets/image/a".to_string(),
                },
            )
            .await
            .unwrap_err();

        match err {
            AppError::Cleanup { key, .. } => assert_eq!(key, "alice/assets/image/a"),
            other => panic!("expected cleanup error, got {:?}", other),
        }
        assert!(repo.find("alice/assets/image/a").is_some());
    }

    #[tokio::test]
    async fn test_list_without_storage_is_empty() {
        let repo = Arc::new(InMemoryAssetRepository::new());
        let svc = service(repo, None);
        let list = svc.list("alice").await.unwrap();
        assert!(list.files.is_empty());
        assert!(!list.storage_configured);
        assert_eq!(list.origin, "http://localhost:3000");
    }
}
