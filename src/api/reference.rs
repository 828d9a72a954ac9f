//! Reference data API endpoints
//!
//! CRUD for content providers, partners, ad sections, campaigns and
//! sponsors, plus sponsor logo upload.

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};

use crate::api::common::read_upload;
use crate::api::middleware::{ApiError, AppState};
use crate::models::{
    AdSection, AdSectionInput, Campaign, CampaignInput, ContentProvider, ContentProviderInput,
    Partner, PartnerInput, Sponsor, SponsorInput,
};

/// Handlers and routes for one reference entity
macro_rules! reference_routes {
    (
        $router:ident, $ty:ty, $input:ty,
        $create:ident, $get:ident, $list:ident, $update:ident, $delete:ident
    ) => {
        fn $router() -> Router<AppState> {
            async fn list(State(state): State<AppState>) -> Result<Json<Vec<$ty>>, ApiError> {
                Ok(Json(state.reference_service.$list().await?))
            }

            async fn create(
                State(state): State<AppState>,
                Json(input): Json<$input>,
            ) -> Result<(StatusCode, Json<$ty>), ApiError> {
                let created = state.reference_service.$create(input).await?;
                Ok((StatusCode::CREATED, Json(created)))
            }

            async fn show(
                State(state): State<AppState>,
                Path(id): Path<i64>,
            ) -> Result<Json<$ty>, ApiError> {
                Ok(Json(state.reference_service.$get(id).await?))
            }

            async fn update(
                State(state): State<AppState>,
                Path(id): Path<i64>,
                Json(input): Json<$input>,
            ) -> Result<Json<$ty>, ApiError> {
                Ok(Json(state.reference_service.$update(id, input).await?))
            }

            async fn delete(
                State(state): State<AppState>,
                Path(id): Path<i64>,
            ) -> Result<StatusCode, ApiError> {
                state.reference_service.$delete(id).await?;
                Ok(StatusCode::NO_CONTENT)
            }

            Router::new()
                .route("/", get(list).post(create))
                .route("/{id}", get(show).put(update).delete(delete))
        }
    };
}

reference_routes!(
    providers, ContentProvider, ContentProviderInput,
    create_provider, get_provider, list_providers, update_provider, delete_provider
);

reference_routes!(
    partners, Partner, PartnerInput,
    create_partner, get_partner, list_partners, update_partner, delete_partner
);

reference_routes!(
    ad_sections, AdSection, AdSectionInput,
    create_ad_section, get_ad_section, list_ad_sections, update_ad_section, delete_ad_section
);

reference_routes!(
    campaigns, Campaign, CampaignInput,
    create_campaign, get_campaign, list_campaigns, update_campaign, delete_campaign
);

reference_routes!(
    sponsors, Sponsor, SponsorInput,
    create_sponsor, get_sponsor, list_sponsors, update_sponsor, delete_sponsor
);

/// Build the reference data router
pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/content-providers", providers())
        .nest("/partners", partners())
        .nest("/ad-sections", ad_sections())
        .nest("/campaigns", campaigns())
        .nest(
            "/sponsors",
            sponsors().route("/{id}/logo", post(upload_sponsor_logo)),
        )
}

/// POST /api/v1/sponsors/{id}/logo - multipart upload, field "file"
async fn upload_sponsor_logo(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> Result<Json<Sponsor>, ApiError> {
    let upload = read_upload(multipart).await?;
    let sponsor = state
        .reference_service
        .upload_sponsor_logo(id, &upload.filename, &upload.data)
        .await?;
    Ok(Json(sponsor))
}
