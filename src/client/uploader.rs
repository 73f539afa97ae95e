use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use super::api_client::AssetApiClient;
use super::deriver::{prepare, FileHandle};
use super::error::{ClientError, Result};
use super::executor::{BatchOutcome, UploadExecutor, UploadJob};
use super::progress::ProgressStore;
use crate::features::assets::dtos::{PresignRequestDto, PresignedAssetDto};

/// Server side of the presign handshake
#[async_trait]
pub trait Presigner: Send + Sync {
    async fn presign(&self, requests: &[PresignRequestDto]) -> Result<Vec<PresignedAssetDto>>;
}

#[async_trait]
impl Presigner for AssetApiClient {
    async fn presign(&self, requests: &[PresignRequestDto]) -> Result<Vec<PresignedAssetDto>> {
        AssetApiClient::presign(self, requests).await
    }
}

/// Uploads a batch of files for one owner: derive, presign, transfer, settle
pub struct AssetUploader {
    presigner: Arc<dyn Presigner>,
    executor: UploadExecutor,
    owner_id: String,
}

impl AssetUploader {
    pub fn new(
        presigner: Arc<dyn Presigner>,
        executor: UploadExecutor,
        owner_id: impl Into<String>,
    ) -> Self {
        Self {
            presigner,
            executor,
            owner_id: owner_id.into(),
        }
    }

    /// Upload `files` and return once every one of them has settled.
    ///
    /// Fails only when presigning fails, in which case nothing was transferred.
    pub async fn upload(&self, files: Vec<FileHandle>) -> Result<BatchOutcome> {
        let (intents, requests): (Vec<_>, Vec<_>) = files
            .into_iter()
            .map(|file| prepare(file, &self.owner_id))
            .unzip();

        let mut presigned: HashMap<String, PresignedAssetDto> = self
            .presigner
            .presign(&requests)
            .await?
            .into_iter()
            .map(|p| (p.metadata.key.clone(), p))
            .collect();

        let checksums: HashMap<&str, &str> = requests
            .iter()
            .map(|r| (r.key.as_str(), r.checksum.as_str()))
            .collect();

        let mut progress = ProgressStore::new();
        let mut tasks = Vec::with_capacity(intents.len());
        for intent in intents {
            let reporter = progress.register(&intent.key, intent.file.clone());
            match presigned.remove(&intent.key) {
                Some(PresignedAssetDto {
                    metadata,
                    upload_url,
                }) => {
                    let checksum = checksums
                        .get(intent.key.as_str())
                        .map(|c| c.to_string())
                        .unwrap_or_default();
                    tasks.push((
                        UploadJob {
                            file: intent.file,
                            checksum,
                            upload_url,
                            metadata,
                        },
                        reporter,
                    ));
                }
                None => {
                    warn!("No upload URL returned for key={}", intent.key);
                    reporter.fail(ClientError::MissingUploadUrl(intent.key.clone()).to_string());
                }
            }
        }

        let outcome = self.executor.execute_registered(tasks, progress).await;
        info!(
            "Upload batch settled: {}/{} completed",
            outcome.completed.len(),
            outcome.progress.len()
        );
        Ok(outcome)
    }
}
