//! API layer - HTTP handlers and routing
//!
//! This module contains all HTTP API endpoints for the folio content store.
//! It includes:
//! - Geography endpoints (countries, states, cities, postal codes)
//! - Reference data endpoints (providers, partners, ad sections, campaigns, sponsors)
//! - Asset endpoints (types, content files, assets, associations)
//! - Article endpoints (template contents, relations, publishing state)
//! - Site status endpoints
//! - Static serving of uploaded media under `/uploads`

pub mod articles;
pub mod assets;
pub mod common;
pub mod geo;
pub mod middleware;
pub mod reference;
pub mod site;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    Router,
};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

pub use middleware::{ApiError, AppState, RequestStats};

use crate::cache::create_cache;
use crate::config::Config;
use crate::db::repositories::{
    SqlxAssetRepository, SqlxGeoRepository, SqlxPublishingStateRepository,
    SqlxReferenceRepository, SqlxTemplateContentRepository,
};
use crate::db::DynDatabasePool;
use crate::services::{
    AssetService, GeoService, MediaStorage, PublishingService, ReferenceService,
    TemplateContentService,
};

/// Wire repositories, cache and media storage into the handler state
pub fn build_state(pool: DynDatabasePool, config: &Config) -> AppState {
    let cache = create_cache(&config.cache);
    let media = Arc::new(MediaStorage::new(config.media.clone()));

    let contents = SqlxTemplateContentRepository::boxed(pool.clone());

    AppState {
        geo_service: Arc::new(GeoService::new(
            SqlxGeoRepository::boxed(pool.clone()),
            cache.clone(),
        )),
        reference_service: Arc::new(ReferenceService::new(
            SqlxReferenceRepository::boxed(pool.clone()),
            cache,
            media.clone(),
        )),
        asset_service: Arc::new(AssetService::new(
            SqlxAssetRepository::boxed(pool.clone()),
            media.clone(),
        )),
        content_service: Arc::new(TemplateContentService::new(
            contents.clone(),
            SqlxPublishingStateRepository::boxed(pool.clone()),
            config.content.clone(),
        )),
        publishing_service: Arc::new(PublishingService::new(
            SqlxPublishingStateRepository::boxed(pool.clone()),
            contents,
        )),
        media,
        request_stats: Arc::new(RequestStats::new()),
        pool,
    }
}

/// Build the main API router
pub fn build_api_router() -> Router<AppState> {
    Router::new()
        .merge(geo::router())
        .merge(reference::router())
        .merge(assets::router())
        .nest("/template-contents", articles::router())
        .merge(site::router())
}

fn cors_layer(cors_origin: &str) -> CorsLayer {
    let origin = if cors_origin.trim() == "*" {
        AllowOrigin::any()
    } else {
        match cors_origin.parse::<HeaderValue>() {
            Ok(value) => AllowOrigin::exact(value),
            Err(e) => {
                tracing::warn!("Invalid CORS origin {:?} ({}), allowing any origin", cors_origin, e);
                AllowOrigin::any()
            }
        }
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

/// Room for multipart boundaries and part headers on top of the file itself
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Request body cap that lets a file of exactly `max_file_size` through
fn body_limit(max_file_size: u64) -> usize {
    usize::try_from(max_file_size)
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD)
}

/// Build the complete router with middleware
pub fn build_router(state: AppState, cors_origin: &str) -> Router {
    let uploads = ServeDir::new(state.media.root().join("uploads"));
    let limit = body_limit(state.media.max_file_size());

    Router::new()
        .nest("/api/v1", build_api_router())
        .nest_service("/uploads", uploads)
        .layer(DefaultBodyLimit::max(limit))
        .layer(cors_layer(cors_origin))
        .layer(TraceLayer::new_for_http())
        // Request stats middleware (outermost layer, runs for all requests)
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::request_stats_middleware,
        ))
        .with_state(state)
}

#[cfg(test)]
pub(crate) async fn test_server() -> (axum_test::TestServer, tempfile::TempDir) {
    use crate::config::MediaConfig;
    use crate::db::{create_test_pool, migrations::run_migrations};

    let pool = create_test_pool().await.unwrap();
    run_migrations(&pool).await.unwrap();
    let dir = tempfile::tempdir().unwrap();
    let config = Config {
        media: MediaConfig {
            path: dir.path().to_path_buf(),
            ..Default::default()
        },
        ..Default::default()
    };
    let app = build_router(build_state(pool, &config), "*");
    (axum_test::TestServer::new(app).unwrap(), dir)
}
