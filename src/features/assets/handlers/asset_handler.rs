use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;
use tracing::debug;

use crate::core::error::AppError;
use crate::core::extractor::AppJson;
use crate::features::assets::dtos::{
    AssetListDto, DeleteAssetDto, PresignRequestDto, PresignedAssetDto, UpdateAssetDto,
};
use crate::features::assets::models::FileMetadata;
use crate::features::assets::services::AssetService;
use crate::features::auth::model::AuthenticatedUser;
use crate::shared::types::ApiResponse;

/// Presign a batch of uploads
///
/// Validates every declaration, mints one upload URL per file and records the
/// metadata. Either every file is presigned or none is.
#[utoipa::path(
    post,
    path = "/api/assets",
    tag = "assets",
    request_body = Vec<PresignRequestDto>,
    responses(
        (status = 201, description = "Upload URLs minted", body = ApiResponse<Vec<PresignedAssetDto>>),
        (status = 400, description = "Validation error, one message per offending field"),
        (status = 401, description = "Authentication required"),
        (status = 409, description = "Key already in use"),
        (status = 502, description = "Object storage rejected the presign request"),
        (status = 503, description = "Object storage is not configured")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn presign_assets(
    user: AuthenticatedUser,
    State(service): State<Arc<AssetService>>,
    AppJson(requests): AppJson<Vec<PresignRequestDto>>,
) -> Result<(StatusCode, Json<ApiResponse<Vec<PresignedAssetDto>>>), AppError> {
    debug!("Presign request for {} files by {}", requests.len(), user.sub);

    let presigned = service.presign_batch(&user.sub, requests).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            Some(presigned),
            Some("Upload URLs created".to_string()),
        )),
    ))
}

/// Update an asset's name or description
///
/// Other fields in the body are ignored. An empty description clears it.
#[utoipa::path(
    put,
    path = "/api/assets",
    tag = "assets",
    request_body = UpdateAssetDto,
    responses(
        (status = 200, description = "Asset updated", body = ApiResponse<FileMetadata>),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Authentication required"),
        (status = 404, description = "File not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_asset(
    user: AuthenticatedUser,
    State(service): State<Arc<AssetService>>,
    AppJson(dto): AppJson<UpdateAssetDto>,
) -> Result<Json<ApiResponse<FileMetadata>>, AppError> {
    let file = service.update(&user.sub, dto).await?;

    Ok(Json(ApiResponse::success(
        Some(file),
        Some("File updated successfully".to_string()),
    )))
}

/// Delete an asset and its stored object
#[utoipa::path(
    delete,
    path = "/api/assets",
    tag = "assets",
    request_body = DeleteAssetDto,
    responses(
        (status = 200, description = "File deleted successfully"),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Authentication required"),
        (status = 404, description = "File not found"),
        (status = 500, description = "Object could not be removed; metadata kept"),
        (status = 503, description = "Object storage is not configured")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_asset(
    user: AuthenticatedUser,
    State(service): State<Arc<AssetService>>,
    AppJson(dto): AppJson<DeleteAssetDto>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    service.delete(&user.sub, dto).await?;

    Ok(Json(ApiResponse::success(
        None,
        Some("File deleted successfully".to_string()),
    )))
}

/// List the caller's assets, newest first
#[utoipa::path(
    get,
    path = "/api/assets",
    tag = "assets",
    responses(
        (status = 200, description = "Caller's assets", body = AssetListDto),
        (status = 401, description = "Authentication required")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_assets(
    user: AuthenticatedUser,
    State(service): State<Arc<AssetService>>,
) -> Result<Json<AssetListDto>, AppError> {
    Ok(Json(service.list(&user.sub).await?))
}
