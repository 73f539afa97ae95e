use async_trait::async_trait;
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::error::{ClientError, Result};
use super::executor::Compensator;
use crate::features::assets::dtos::{
    AssetListDto, DeleteAssetDto, PresignRequestDto, PresignedAssetDto, UpdateAssetDto,
};
use crate::features::assets::models::FileMetadata;
use crate::shared::types::ApiResponse;

const ASSETS_PATH: &str = "/api/assets";

/// Typed client for the `/api/assets` resource
#[derive(Clone)]
pub struct AssetApiClient {
    http: reqwest::Client,
    base_url: Url,
    token: String,
}

impl AssetApiClient {
    pub fn new(base_url: &str, token: &str) -> Result<Self> {
        let base_url =
            Url::parse(base_url).map_err(|e| ClientError::InvalidUrl(e.to_string()))?;
        Ok(Self {
            http: reqwest::Client::new(),
            base_url,
            token: token.to_string(),
        })
    }

    fn url(&self) -> Result<Url> {
        self.base_url
            .join(ASSETS_PATH)
            .map_err(|e| ClientError::InvalidUrl(e.to_string()))
    }

    async fn send<T: DeserializeOwned>(&self, req: reqwest::RequestBuilder) -> Result<T> {
        let response = req.bearer_auth(&self.token).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let parsed = serde_json::from_str::<ApiResponse<serde_json::Value>>(&body).ok();
            let (message, errors) = match parsed {
                Some(ApiResponse { error, errors, .. }) => (
                    error.unwrap_or_else(|| status.to_string()),
                    errors.unwrap_or_default(),
                ),
                None => (body, Vec::new()),
            };
            return Err(ClientError::Api {
                status: status.as_u16(),
                message,
                errors,
            });
        }

        serde_json::from_str(&body).map_err(|e| ClientError::Api {
            status: status.as_u16(),
            message: format!("unexpected response body: {}", e),
            errors: Vec::new(),
        })
    }

    async fn send_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: reqwest::Method,
        body: &B,
    ) -> Result<T> {
        let url = self.url()?;
        self.send(self.http.request(method, url).json(body)).await
    }

    /// Mint upload URLs for a batch; all or none are created
    pub async fn presign(&self, requests: &[PresignRequestDto]) -> Result<Vec<PresignedAssetDto>> {
        let response: ApiResponse<Vec<PresignedAssetDto>> =
            self.send_json(reqwest::Method::POST, requests).await?;
        Ok(response.data.unwrap_or_default())
    }

    pub async fn update(&self, dto: &UpdateAssetDto) -> Result<Option<FileMetadata>> {
        let response: ApiResponse<FileMetadata> =
            self.send_json(reqwest::Method::PUT, dto).await?;
        Ok(response.data)
    }

    pub async fn delete(&self, key: &str) -> Result<()> {
        let dto = DeleteAssetDto {
            key: key.to_string(),
        };
        let _: ApiResponse<serde_json::Value> =
            self.send_json(reqwest::Method::DELETE, &dto).await?;
        Ok(())
    }

    pub async fn list(&self) -> Result<AssetListDto> {
        let url = self.url()?;
        self.send(self.http.get(url)).await
    }
}

#[async_trait]
impl Compensator for AssetApiClient {
    async fn compensate(&self, key: &str) -> Result<()> {
        match self.delete(key).await {
            // Already gone, e.g. swept or deleted by the owner
            Err(ClientError::Api { status: 404, .. }) => Ok(()),
            other => other,
        }
    }
}
