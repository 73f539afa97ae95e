//! MinIO/S3-compatible storage client
//!
//! Mints presigned PUT URLs for direct uploads and removes objects
//! for MinIO or any S3-compatible storage service.
//!
//! Uses rust-s3 crate for lightweight S3 operations.

use async_trait::async_trait;
use axum::http::{
    header::{CONTENT_LENGTH, CONTENT_TYPE},
    HeaderMap, HeaderName, HeaderValue,
};
use s3::creds::Credentials;
use s3::{Bucket, BucketConfiguration, Region};
use tracing::{debug, info, warn};

use super::gateway::ObjectStorageGateway;
use crate::core::config::MinIOConfig;
use crate::core::error::AppError;
use crate::shared::checksum::{hex_to_header_value, CHECKSUM_HEADER};

/// MinIO/S3-compatible storage client
pub struct MinIOClient {
    bucket: Box<Bucket>,
    region: Region,
    credentials: Credentials,
    presigned_url_expiry_secs: u32,
    endpoint: String,
}

impl MinIOClient {
    /// Create a new MinIO client from configuration
    pub fn new(config: MinIOConfig) -> Result<Self, AppError> {
        let credentials = Credentials::new(
            Some(&config.access_key),
            Some(&config.secret_key),
            None,
            None,
            None,
        )
        .map_err(|e| AppError::Internal(format!("Failed to create MinIO credentials: {}", e)))?;

        let region = Region::Custom {
            region: config.region.clone(),
            endpoint: config.endpoint.clone(),
        };

        let mut bucket = Bucket::new(&config.bucket, region.clone(), credentials.clone())
            .map_err(|e| AppError::Internal(format!("Failed to create MinIO bucket: {}", e)))?;

        // Use path-style URLs for MinIO (http://endpoint/bucket instead of http://bucket.endpoint)
        bucket.set_path_style();

        info!(
            "MinIO client initialized for endpoint: {}, bucket: {}, upload URL expiry: {}s",
            config.endpoint,
            bucket.name(),
            config.presigned_url_expiry_secs
        );

        Ok(Self {
            bucket,
            region,
            credentials,
            presigned_url_expiry_secs: config.presigned_url_expiry_secs,
            endpoint: config.endpoint,
        })
    }

    /// Ensure the bucket exists, create if not
    pub async fn ensure_bucket_exists(&self) -> Result<(), AppError> {
        // Creating an existing bucket fails with a recognisable error we can ignore
        match self.create_bucket().await {
            Ok(_) => {
                info!("Bucket '{}' created successfully", self.bucket.name());
                Ok(())
            }
            Err(e) => {
                let error_str = e.to_string();
                if error_str.contains("BucketAlreadyOwnedByYou")
                    || error_str.contains("BucketAlreadyExists")
                    || error_str.contains("already own it")
                {
                    debug!("Bucket '{}' already exists", self.bucket.name());
                } else {
                    warn!(
                        "Could not create bucket '{}' at {}: {}. Assuming it exists.",
                        self.bucket.name(),
                        self.endpoint,
                        e
                    );
                }
                Ok(())
            }
        }
    }

    async fn create_bucket(&self) -> Result<(), AppError> {
        let response = Bucket::create_with_path_style(
            &self.bucket.name(),
            self.region.clone(),
            self.credentials.clone(),
            BucketConfiguration::default(),
        )
        .await
        .map_err(|e| AppError::Gateway(format!("Failed to create bucket: {}", e)))?;

        if !response.success() {
            return Err(AppError::Gateway(format!(
                "Failed to create bucket '{}': {} {}",
                self.bucket.name(),
                response.response_code,
                response.response_text
            )));
        }
        Ok(())
    }

    /// Headers the client must send verbatim with its PUT
    fn upload_headers(
        size_bytes: u64,
        mime_type: &str,
        checksum: &str,
    ) -> Result<HeaderMap, AppError> {
        let checksum_value = hex_to_header_value(checksum)
            .map_err(|e| AppError::validation(format!("checksum: {}", e)))?;

        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_str(mime_type)
                .map_err(|_| AppError::validation("mimeType: not a valid header value"))?,
        );
        headers.insert(CONTENT_LENGTH, HeaderValue::from(size_bytes));
        headers.insert(
            HeaderName::from_static(CHECKSUM_HEADER),
            HeaderValue::from_str(&checksum_value)
                .map_err(|e| AppError::Internal(format!("Invalid checksum header: {}", e)))?,
        );
        Ok(headers)
    }

    pub fn presigned_url_expiry_secs(&self) -> u32 {
        self.presigned_url_expiry_secs
    }

    pub fn bucket_name(&self) -> String {
        self.bucket.name()
    }
}

#[async_trait]
impl ObjectStorageGateway for MinIOClient {
    async fn mint_upload_url(
        &self,
        key: &str,
        size_bytes: u64,
        mime_type: &str,
        checksum: &str,
    ) -> Result<String, AppError> {
        let headers = Self::upload_headers(size_bytes, mime_type, checksum)?;

        let url = self
            .bucket
            .presign_put(key, self.presigned_url_expiry_secs, Some(headers), None)
            .await
            .map_err(|e| {
                AppError::Gateway(format!(
                    "Failed to generate upload URL for '{}': {}",
                    key, e
                ))
            })?;

        debug!("Minted upload URL for '{}' ({} bytes)", key, size_bytes);
        Ok(url)
    }

    async fn delete_object(&self, key: &str) -> Result<(), AppError> {
        let response = self
            .bucket
            .delete_object(key)
            .await
            .map_err(|e| AppError::Gateway(format!("Failed to delete '{}': {}", key, e)))?;

        let status = response.status_code();
        if !(200..300).contains(&status) && status != 404 {
            return Err(AppError::Gateway(format!(
                "Failed to delete '{}': storage responded {}",
                key, status
            )));
        }

        debug!(
            "Deleted object '{}' from bucket '{}'",
            key,
            self.bucket.name()
        );
        Ok(())
    }

    async fn object_exists(&self, key: &str) -> Result<bool, AppError> {
        match self.bucket.head_object(key).await {
            Ok((_, 404)) => Ok(false),
            Ok((_, status)) if (200..300).contains(&status) => Ok(true),
            Ok((_, status)) => Err(AppError::Gateway(format!(
                "Failed to check '{}': storage responded {}",
                key, status
            ))),
            Err(e) => {
                let error_str = e.to_string();
                if error_str.contains("404") || error_str.contains("NoSuchKey") {
                    Ok(false)
                } else {
                    Err(AppError::Gateway(format!(
                        "Failed to check if '{}' exists: {}",
                        key, e
                    )))
                }
            }
        }
    }
}
