//! Article (template content) API endpoints
//!
//! Handles HTTP requests for articles:
//! - GET/POST /api/v1/template-contents - filtered list, create
//! - GET /api/v1/template-contents/search?q= - keyword search
//! - GET /api/v1/template-contents/live - currently published articles
//! - GET /api/v1/template-contents/slug/{slug} - lookup by slug
//! - /api/v1/template-contents/{id} - read, replace, delete
//! - /api/v1/template-contents/{id}/relations/{relation} - many-to-many links
//! - /api/v1/template-contents/{id}/publishing - publishing state

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;

use crate::api::common::{CountResponse, IdList, PaginationQuery};
use crate::api::middleware::{ApiError, AppState};
use crate::models::{
    ContentFilter, ContentRelation, PagedResult, PublishingStateInput, TemplateContent,
    TemplateContentDetail, TemplateContentInput,
};
use crate::services::publishing::PublishingStateView;

type ApiResult<T> = Result<Json<T>, ApiError>;

/// Query parameters for keyword search
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

/// Query parameters for the live listing
#[derive(Debug, Deserialize)]
pub struct LiveQuery {
    /// Leave out articles marked not for external use
    #[serde(default)]
    pub external: bool,
}

/// Build the article router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_contents).post(create_content))
        .route("/search", get(search_contents))
        .route("/live", get(list_live))
        .route("/slug/{slug}", get(get_by_slug))
        .route(
            "/{id}",
            get(get_content).put(update_content).delete(delete_content),
        )
        .route("/{id}/detail", get(content_detail))
        .route(
            "/{id}/relations/{relation}",
            get(list_relation).put(set_relation),
        )
        .route("/{id}/referenced-by/{relation}", get(referencing))
        .route("/{id}/view", post(record_view))
        .route("/{id}/like", post(record_like))
        .route(
            "/{id}/publishing",
            get(get_publishing)
                .put(upsert_publishing)
                .delete(delete_publishing),
        )
}

fn parse_relation(relation: &str) -> Result<ContentRelation, ApiError> {
    relation.parse::<ContentRelation>().map_err(ApiError::not_found)
}

async fn list_contents(
    State(state): State<AppState>,
    Query(filter): Query<ContentFilter>,
    Query(page): Query<PaginationQuery>,
) -> ApiResult<PagedResult<TemplateContent>> {
    let result = state
        .content_service
        .list(&filter, &page.params())
        .await?;
    Ok(Json(result))
}

async fn create_content(
    State(state): State<AppState>,
    Json(input): Json<TemplateContentInput>,
) -> Result<(StatusCode, Json<TemplateContent>), ApiError> {
    let content = state.content_service.create(input).await?;
    Ok((StatusCode::CREATED, Json(content)))
}

async fn search_contents(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
    Query(page): Query<PaginationQuery>,
) -> ApiResult<PagedResult<TemplateContent>> {
    let result = state
        .content_service
        .search(&query.q, &page.params())
        .await?;
    Ok(Json(result))
}

/// GET /api/v1/template-contents/live - published and inside the time window
async fn list_live(
    State(state): State<AppState>,
    Query(query): Query<LiveQuery>,
    Query(page): Query<PaginationQuery>,
) -> ApiResult<PagedResult<TemplateContent>> {
    let result = state
        .publishing_service
        .list_live(Utc::now(), query.external, &page.params())
        .await?;
    Ok(Json(result))
}

async fn get_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ApiResult<TemplateContent> {
    Ok(Json(state.content_service.get_by_slug(&slug).await?))
}

async fn get_content(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<TemplateContent> {
    Ok(Json(state.content_service.get(id).await?))
}

async fn content_detail(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<TemplateContentDetail> {
    Ok(Json(state.content_service.detail(id).await?))
}

async fn update_content(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<TemplateContentInput>,
) -> ApiResult<TemplateContent> {
    Ok(Json(state.content_service.update(id, input).await?))
}

async fn delete_content(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.content_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_relation(
    State(state): State<AppState>,
    Path((id, relation)): Path<(i64, String)>,
) -> ApiResult<IdList> {
    let relation = parse_relation(&relation)?;
    let ids = state.content_service.list_relation(id, relation).await?;
    Ok(Json(IdList { ids }))
}

/// PUT /api/v1/template-contents/{id}/relations/{relation} - replace the links
async fn set_relation(
    State(state): State<AppState>,
    Path((id, relation)): Path<(i64, String)>,
    Json(body): Json<IdList>,
) -> ApiResult<IdList> {
    let relation = parse_relation(&relation)?;
    let ids = state
        .content_service
        .set_relation(id, relation, &body.ids)
        .await?;
    Ok(Json(IdList { ids }))
}

/// GET /api/v1/template-contents/{id}/referenced-by/{relation}
///
/// Articles listing `id` under a self-referential relation.
async fn referencing(
    State(state): State<AppState>,
    Path((id, relation)): Path<(i64, String)>,
) -> ApiResult<IdList> {
    let relation = parse_relation(&relation)?;
    let ids = state.content_service.referencing(id, relation).await?;
    Ok(Json(IdList { ids }))
}

async fn record_view(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<CountResponse> {
    let count = state.content_service.record_view(id).await?;
    Ok(Json(CountResponse { count }))
}

async fn record_like(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<CountResponse> {
    let count = state.content_service.record_like(id).await?;
    Ok(Json(CountResponse { count }))
}

async fn get_publishing(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<PublishingStateView> {
    Ok(Json(state.publishing_service.get_for_content(id).await?))
}

async fn upsert_publishing(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<PublishingStateInput>,
) -> ApiResult<PublishingStateView> {
    Ok(Json(state.publishing_service.upsert(id, input).await?))
}

async fn delete_publishing(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.publishing_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
