//! Asset API endpoints
//!
//! - /api/v1/asset-types - CRUD
//! - /api/v1/asset-contents - CRUD, file upload
//! - /api/v1/assets - CRUD, detail, thumbnail upload, content list
//! - /api/v1/asset-associations - CRUD

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};

use crate::api::common::{read_upload, IdList};
use crate::api::middleware::{ApiError, AppState};
use crate::models::{
    Asset, AssetAssociationInput, AssetAssociationView, AssetContent, AssetContentInput,
    AssetDetail, AssetInput, AssetType, AssetTypeInput,
};

type ApiResult<T> = Result<Json<T>, ApiError>;
type Created<T> = Result<(StatusCode, Json<T>), ApiError>;

/// Build the asset router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/asset-types", get(list_types).post(create_type))
        .route(
            "/asset-types/{id}",
            get(get_type).put(update_type).delete(delete_type),
        )
        .route("/asset-contents", get(list_contents).post(create_content))
        .route(
            "/asset-contents/{id}",
            get(get_content).put(update_content).delete(delete_content),
        )
        .route("/asset-contents/{id}/file", post(upload_content_file))
        .route("/assets", get(list_assets).post(create_asset))
        .route(
            "/assets/{id}",
            get(get_asset).put(update_asset).delete(delete_asset),
        )
        .route("/assets/{id}/detail", get(asset_detail))
        .route("/assets/{id}/thumbnail", post(upload_thumbnail))
        .route(
            "/assets/{id}/contents",
            get(contents_of).put(set_asset_contents),
        )
        .route("/assets/{id}/associations", get(associations_of))
        .route(
            "/asset-associations",
            get(list_associations).post(create_association),
        )
        .route(
            "/asset-associations/{id}",
            get(get_association)
                .put(update_association)
                .delete(delete_association),
        )
}

// ============================================================================
// Asset types
// ============================================================================

async fn list_types(State(state): State<AppState>) -> ApiResult<Vec<AssetType>> {
    Ok(Json(state.asset_service.list_types().await?))
}

async fn create_type(
    State(state): State<AppState>,
    Json(input): Json<AssetTypeInput>,
) -> Created<AssetType> {
    let created = state.asset_service.create_type(input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn get_type(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<AssetType> {
    Ok(Json(state.asset_service.get_type(id).await?))
}

async fn update_type(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<AssetTypeInput>,
) -> ApiResult<AssetType> {
    Ok(Json(state.asset_service.update_type(id, input).await?))
}

async fn delete_type(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.asset_service.delete_type(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Asset contents
// ============================================================================

async fn list_contents(State(state): State<AppState>) -> ApiResult<Vec<AssetContent>> {
    Ok(Json(state.asset_service.list_contents().await?))
}

async fn create_content(
    State(state): State<AppState>,
    Json(input): Json<AssetContentInput>,
) -> Created<AssetContent> {
    let created = state.asset_service.create_content(input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn get_content(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<AssetContent> {
    Ok(Json(state.asset_service.get_content(id).await?))
}

async fn update_content(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<AssetContentInput>,
) -> ApiResult<AssetContent> {
    Ok(Json(state.asset_service.update_content(id, input).await?))
}

async fn delete_content(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.asset_service.delete_content(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/asset-contents/{id}/file - multipart upload, field "file"
async fn upload_content_file(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> ApiResult<AssetContent> {
    let upload = read_upload(multipart).await?;
    let content = state
        .asset_service
        .upload_content_file(id, &upload.filename, &upload.data)
        .await?;
    Ok(Json(content))
}

// ============================================================================
// Assets
// ============================================================================

async fn list_assets(State(state): State<AppState>) -> ApiResult<Vec<Asset>> {
    Ok(Json(state.asset_service.list_assets().await?))
}

async fn create_asset(
    State(state): State<AppState>,
    Json(input): Json<AssetInput>,
) -> Created<Asset> {
    let created = state.asset_service.create_asset(input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn get_asset(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Asset> {
    Ok(Json(state.asset_service.get_asset(id).await?))
}

async fn asset_detail(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<AssetDetail> {
    Ok(Json(state.asset_service.asset_detail(id).await?))
}

async fn update_asset(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<AssetInput>,
) -> ApiResult<Asset> {
    Ok(Json(state.asset_service.update_asset(id, input).await?))
}

async fn delete_asset(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.asset_service.delete_asset(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/assets/{id}/thumbnail - image is resized before it is stored
async fn upload_thumbnail(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> ApiResult<Asset> {
    let upload = read_upload(multipart).await?;
    let asset = state
        .asset_service
        .upload_thumbnail(id, &upload.filename, &upload.data)
        .await?;
    Ok(Json(asset))
}

async fn contents_of(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Vec<AssetContent>> {
    Ok(Json(state.asset_service.contents_of(id).await?))
}

async fn set_asset_contents(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<IdList>,
) -> ApiResult<Vec<AssetContent>> {
    Ok(Json(state.asset_service.set_asset_contents(id, &body.ids).await?))
}

async fn associations_of(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Vec<AssetAssociationView>> {
    Ok(Json(state.asset_service.associations_of(id).await?))
}

// ============================================================================
// Associations
// ============================================================================

async fn list_associations(
    State(state): State<AppState>,
) -> ApiResult<Vec<AssetAssociationView>> {
    Ok(Json(state.asset_service.list_associations().await?))
}

async fn create_association(
    State(state): State<AppState>,
    Json(input): Json<AssetAssociationInput>,
) -> Created<AssetAssociationView> {
    let created = state.asset_service.create_association(input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn get_association(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<AssetAssociationView> {
    Ok(Json(state.asset_service.get_association(id).await?))
}

async fn update_association(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<AssetAssociationInput>,
) -> ApiResult<AssetAssociationView> {
    Ok(Json(state.asset_service.update_association(id, input).await?))
}

async fn delete_association(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.asset_service.delete_association(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
