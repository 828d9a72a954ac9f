//! Geography API endpoints
//!
//! - /api/v1/countries, /states, /cities - CRUD
//! - /api/v1/countries/{id}/states - states included in a country
//! - /api/v1/states/{id}/cities - cities included in a state
//! - /api/v1/postal-codes - CRUD and lookup by code

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};

use crate::api::common::IdList;
use crate::api::middleware::{ApiError, AppState};
use crate::models::{
    City, CityInput, Country, CountryInput, PostalCodeInput, PostalCodeLookup, PostalCodeMapper,
    State as GeoState, StateInput,
};

type ApiResult<T> = Result<Json<T>, ApiError>;
type Created<T> = Result<(StatusCode, Json<T>), ApiError>;

/// Build the geography router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/countries", get(list_countries).post(create_country))
        .route(
            "/countries/{id}",
            get(get_country).put(update_country).delete(delete_country),
        )
        .route(
            "/countries/{id}/states",
            get(states_of_country).put(set_country_states),
        )
        .route(
            "/countries/{id}/states/{state_id}",
            post(add_country_state).delete(remove_country_state),
        )
        .route("/states", get(list_states).post(create_state))
        .route(
            "/states/{id}",
            get(get_state).put(update_state).delete(delete_state),
        )
        .route("/states/{id}/countries", get(countries_including))
        .route(
            "/states/{id}/cities",
            get(cities_of_state).put(set_state_cities),
        )
        .route(
            "/states/{id}/cities/{city_id}",
            post(add_state_city).delete(remove_state_city),
        )
        .route("/cities", get(list_cities).post(create_city))
        .route(
            "/cities/{id}",
            get(get_city).put(update_city).delete(delete_city),
        )
        .route("/cities/{id}/states", get(states_including))
        .route("/postal-codes", get(list_postal_codes).post(create_postal_code))
        .route(
            "/postal-codes/{id}",
            get(get_postal_code)
                .put(update_postal_code)
                .delete(delete_postal_code),
        )
        .route("/postal-codes/lookup/{code}", get(lookup_postal_code))
}

// ============================================================================
// Countries
// ============================================================================

async fn list_countries(State(state): State<AppState>) -> ApiResult<Vec<Country>> {
    Ok(Json(state.geo_service.list_countries().await?))
}

async fn create_country(
    State(state): State<AppState>,
    Json(input): Json<CountryInput>,
) -> Created<Country> {
    let country = state.geo_service.create_country(input).await?;
    Ok((StatusCode::CREATED, Json(country)))
}

async fn get_country(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Country> {
    Ok(Json(state.geo_service.get_country(id).await?))
}

async fn update_country(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<CountryInput>,
) -> ApiResult<Country> {
    Ok(Json(state.geo_service.update_country(id, input).await?))
}

async fn delete_country(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.geo_service.delete_country(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn states_of_country(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Vec<GeoState>> {
    Ok(Json(state.geo_service.states_of_country(id).await?))
}

/// PUT /api/v1/countries/{id}/states - replace the country's states
async fn set_country_states(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<IdList>,
) -> ApiResult<Vec<GeoState>> {
    Ok(Json(state.geo_service.set_country_states(id, &body.ids).await?))
}

async fn add_country_state(
    State(state): State<AppState>,
    Path((id, state_id)): Path<(i64, i64)>,
) -> ApiResult<Vec<GeoState>> {
    Ok(Json(state.geo_service.add_country_state(id, state_id).await?))
}

async fn remove_country_state(
    State(state): State<AppState>,
    Path((id, state_id)): Path<(i64, i64)>,
) -> Result<StatusCode, ApiError> {
    state.geo_service.remove_country_state(id, state_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// States
// ============================================================================

async fn list_states(State(state): State<AppState>) -> ApiResult<Vec<GeoState>> {
    Ok(Json(state.geo_service.list_states().await?))
}

async fn create_state(
    State(state): State<AppState>,
    Json(input): Json<StateInput>,
) -> Created<GeoState> {
    let created = state.geo_service.create_state(input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn get_state(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<GeoState> {
    Ok(Json(state.geo_service.get_state(id).await?))
}

async fn update_state(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<StateInput>,
) -> ApiResult<GeoState> {
    Ok(Json(state.geo_service.update_state(id, input).await?))
}

async fn delete_state(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.geo_service.delete_state(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/states/{id}/countries - countries that include the state
async fn countries_including(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Vec<Country>> {
    Ok(Json(state.geo_service.countries_including(id).await?))
}

async fn cities_of_state(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Vec<City>> {
    Ok(Json(state.geo_service.cities_of_state(id).await?))
}

async fn set_state_cities(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<IdList>,
) -> ApiResult<Vec<City>> {
    Ok(Json(state.geo_service.set_state_cities(id, &body.ids).await?))
}

async fn add_state_city(
    State(state): State<AppState>,
    Path((id, city_id)): Path<(i64, i64)>,
) -> ApiResult<Vec<City>> {
    Ok(Json(state.geo_service.add_state_city(id, city_id).await?))
}

async fn remove_state_city(
    State(state): State<AppState>,
    Path((id, city_id)): Path<(i64, i64)>,
) -> Result<StatusCode, ApiError> {
    state.geo_service.remove_state_city(id, city_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Cities
// ============================================================================

async fn list_cities(State(state): State<AppState>) -> ApiResult<Vec<City>> {
    Ok(Json(state.geo_service.list_cities().await?))
}

async fn create_city(
    State(state): State<AppState>,
    Json(input): Json<CityInput>,
) -> Created<City> {
    let city = state.geo_service.create_city(input).await?;
    Ok((StatusCode::CREATED, Json(city)))
}

async fn get_city(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<City> {
    Ok(Json(state.geo_service.get_city(id).await?))
}

async fn update_city(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<CityInput>,
) -> ApiResult<City> {
    Ok(Json(state.geo_service.update_city(id, input).await?))
}

async fn delete_city(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.geo_service.delete_city(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn states_including(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Vec<GeoState>> {
    Ok(Json(state.geo_service.states_including(id).await?))
}

// ============================================================================
// Postal codes
// ============================================================================

async fn list_postal_codes(State(state): State<AppState>) -> ApiResult<Vec<PostalCodeMapper>> {
    Ok(Json(state.geo_service.list_postal_codes().await?))
}

async fn create_postal_code(
    State(state): State<AppState>,
    Json(input): Json<PostalCodeInput>,
) -> Created<PostalCodeMapper> {
    let mapper = state.geo_service.create_postal_code(input).await?;
    Ok((StatusCode::CREATED, Json(mapper)))
}

async fn get_postal_code(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<PostalCodeMapper> {
    Ok(Json(state.geo_service.get_postal_code(id).await?))
}

async fn update_postal_code(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<PostalCodeInput>,
) -> ApiResult<PostalCodeMapper> {
    Ok(Json(state.geo_service.update_postal_code(id, input).await?))
}

async fn delete_postal_code(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.geo_service.delete_postal_code(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/postal-codes/lookup/{code} - mapper and parsed coordinates
async fn lookup_postal_code(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> ApiResult<PostalCodeLookup> {
    Ok(Json(state.geo_service.lookup_postal_code(&code).await?))
}
