use axum::{routing::post, Router};
use std::sync::Arc;

use crate::features::assets::handlers::{delete_asset, list_assets, presign_assets, update_asset};
use crate::features::assets::services::AssetService;

/// Create routes for the assets feature
pub fn routes(asset_service: Arc<AssetService>) -> Router {
    Router::new()
        .route(
            "/api/assets",
            post(presign_assets)
                .put(update_asset)
                .delete(delete_asset)
                .get(list_assets),
        )
        .with_state(asset_service)
}
