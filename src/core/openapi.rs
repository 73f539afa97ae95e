use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::features::assets::{dtos as assets_dtos, handlers as assets_handlers, models};
use crate::shared::types::ApiResponse;

#[derive(OpenApi)]
#[openapi(
    paths(
        assets_handlers::presign_assets,
        assets_handlers::update_asset,
        assets_handlers::delete_asset,
        assets_handlers::list_assets,
    ),
    components(
        schemas(
            models::FileMetadata,
            assets_dtos::PresignRequestDto,
            assets_dtos::PresignedAssetDto,
            assets_dtos::UpdateAssetDto,
            assets_dtos::DeleteAssetDto,
            assets_dtos::AssetListDto,
            ApiResponse<Vec<assets_dtos::PresignedAssetDto>>,
            ApiResponse<models::FileMetadata>,
        )
    ),
    tags(
        (name = "assets", description = "Direct-to-storage asset uploads and metadata"),
    ),
    modifiers(&SecurityAddon),
    info(
        title = "Assetdrop API",
        version = "0.1.0",
        description = "Presigned uploads to object storage with server-side asset metadata",
    )
)]
pub struct ApiDoc;

/// Adds Bearer JWT security scheme to OpenAPI spec
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Modifier to override OpenAPI info from config
pub struct SwaggerInfoModifier {
    pub title: String,
    pub version: String,
    pub description: String,
}

impl Modify for SwaggerInfoModifier {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        openapi.info.title = self.title.clone();
        openapi.info.version = self.version.clone();
        openapi.info.description = Some(self.description.clone());
    }
}
