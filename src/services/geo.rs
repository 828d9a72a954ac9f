//! Geographic taxonomy service
//!
//! CRUD for countries, states, cities and postal codes, the two containment
//! links, and postal code lookup. Reads go through the cache under the
//! `geo:` prefix; every write drops the prefix.

use anyhow::Context;
use std::sync::Arc;

use super::{ensure_exist, ReadCache, ServiceError, ServiceResult};
use crate::cache::Cache;
use crate::db::repositories::GeoRepository;
use crate::models::{
    City, CityInput, Country, CountryInput, PostalCodeInput, PostalCodeLookup, PostalCodeMapper,
    State, StateInput,
};

const CACHE_PREFIX: &str = "geo:";

pub struct GeoService {
    repo: Arc<dyn GeoRepository>,
    reads: ReadCache,
}

impl GeoService {
    pub fn new(repo: Arc<dyn GeoRepository>, cache: Arc<Cache>) -> Self {
        Self {
            repo,
            reads: ReadCache::new(cache, CACHE_PREFIX),
        }
    }

    // ---- countries ----

    pub async fn create_country(&self, input: CountryInput) -> ServiceResult<Country> {
        let input = input.normalized();
        input.validate()?;
        let country = self.repo.create_country(&input).await?;
        self.reads.invalidate().await;
        tracing::info!("Created country {} ({})", country.id, country);
        Ok(country)
    }

    pub async fn get_country(&self, id: i64) -> ServiceResult<Country> {
        let repo = &self.repo;
        self.reads
            .get_or_load(&format!("country:{}", id), || repo.get_country(id))
            .await?
            .ok_or_else(|| ServiceError::not_found("Country", id))
    }

    pub async fn list_countries(&self) -> ServiceResult<Vec<Country>> {
        let repo = &self.repo;
        Ok(self
            .reads
            .get_or_load("country:list", || repo.list_countries())
            .await?)
    }

    pub async fn update_country(&self, id: i64, input: CountryInput) -> ServiceResult<Country> {
        let input = input.normalized();
        input.validate()?;
        let country = self
            .repo
            .update_country(id, &input)
            .await?
            .ok_or_else(|| ServiceError::not_found("Country", id))?;
        self.reads.invalidate().await;
        Ok(country)
    }

    pub async fn delete_country(&self, id: i64) -> ServiceResult<()> {
        let deleted = self
            .repo
            .delete_country(id)
            .await
            .map_err(|e| ServiceError::from_write(e, &format!("Country {}", id)))?;
        if !deleted {
            return Err(ServiceError::not_found("Country", id));
        }
        self.reads.invalidate().await;
        tracing::info!("Deleted country {}", id);
        Ok(())
    }

    // ---- states ----

    pub async fn create_state(&self, input: StateInput) -> ServiceResult<State> {
        let input = input.normalized();
        input.validate()?;
        let state = self.repo.create_state(&input).await?;
        self.reads.invalidate().await;
        tracing::info!("Created state {} ({})", state.id, state);
        Ok(state)
    }

    pub async fn get_state(&self, id: i64) -> ServiceResult<State> {
        let repo = &self.repo;
        self.reads
            .get_or_load(&format!("state:{}", id), || repo.get_state(id))
            .await?
            .ok_or_else(|| ServiceError::not_found("State", id))
    }

    pub async fn list_states(&self) -> ServiceResult<Vec<State>> {
        let repo = &self.repo;
        Ok(self
            .reads
            .get_or_load("state:list", || repo.list_states())
            .await?)
    }

    pub async fn update_state(&self, id: i64, input: StateInput) -> ServiceResult<State> {
        let input = input.normalized();
        input.validate()?;
        let state = self
            .repo
            .update_state(id, &input)
            .await?
            .ok_or_else(|| ServiceError::not_found("State", id))?;
        self.reads.invalidate().await;
        Ok(state)
    }

    pub async fn delete_state(&self, id: i64) -> ServiceResult<()> {
        let deleted = self
            .repo
            .delete_state(id)
            .await
            .map_err(|e| ServiceError::from_write(e, &format!("State {}", id)))?;
        if !deleted {
            return Err(ServiceError::not_found("State", id));
        }
        self.reads.invalidate().await;
        tracing::info!("Deleted state {}", id);
        Ok(())
    }

    // ---- cities ----

    pub async fn create_city(&self, input: CityInput) -> ServiceResult<City> {
        let input = input.normalized();
        input.validate()?;
        let city = self.repo.create_city(&input).await?;
        self.reads.invalidate().await;
        tracing::info!("Created city {} ({})", city.id, city);
        Ok(city)
    }

    pub async fn get_city(&self, id: i64) -> ServiceResult<City> {
        let repo = &self.repo;
        self.reads
            .get_or_load(&format!("city:{}", id), || repo.get_city(id))
            .await?
            .ok_or_else(|| ServiceError::not_found("City", id))
    }

    pub async fn list_cities(&self) -> ServiceResult<Vec<City>> {
        let repo = &self.repo;
        Ok(self
            .reads
            .get_or_load("city:list", || repo.list_cities())
            .await?)
    }

    pub async fn update_city(&self, id: i64, input: CityInput) -> ServiceResult<City> {
        let input = input.normalized();
        input.validate()?;
        let city = self
            .repo
            .update_city(id, &input)
            .await?
            .ok_or_else(|| ServiceError::not_found("City", id))?;
        self.reads.invalidate().await;
        Ok(city)
    }

    pub async fn delete_city(&self, id: i64) -> ServiceResult<()> {
        let deleted = self
            .repo
            .delete_city(id)
            .await
            .map_err(|e| ServiceError::from_write(e, &format!("City {}", id)))?;
        if !deleted {
            return Err(ServiceError::not_found("City", id));
        }
        self.reads.invalidate().await;
        tracing::info!("Deleted city {}", id);
        Ok(())
    }

    // ---- postal codes ----

    pub async fn create_postal_code(&self, input: PostalCodeInput) -> ServiceResult<PostalCodeMapper> {
        let input = input.normalized();
        input.validate()?;
        let mapper = self.repo.create_postal_code(&input).await?;
        self.reads.invalidate().await;
        Ok(mapper)
    }

    pub async fn get_postal_code(&self, id: i64) -> ServiceResult<PostalCodeMapper> {
        self.repo
            .get_postal_code(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("PostalCodeMapper", id))
    }

    pub async fn list_postal_codes(&self) -> ServiceResult<Vec<PostalCodeMapper>> {
        Ok(self.repo.list_postal_codes().await?)
    }

    pub async fn update_postal_code(
        &self,
        id: i64,
        input: PostalCodeInput,
    ) -> ServiceResult<PostalCodeMapper> {
        let input = input.normalized();
        input.validate()?;
        let mapper = self
            .repo
            .update_postal_code(id, &input)
            .await?
            .ok_or_else(|| ServiceError::not_found("PostalCodeMapper", id))?;
        self.reads.invalidate().await;
        Ok(mapper)
    }

    pub async fn delete_postal_code(&self, id: i64) -> ServiceResult<()> {
        if !self.repo.delete_postal_code(id).await? {
            return Err(ServiceError::not_found("PostalCodeMapper", id));
        }
        self.reads.invalidate().await;
        Ok(())
    }

    /// Mapper registered for `code` with its parsed coordinates
    pub async fn lookup_postal_code(&self, code: &str) -> ServiceResult<PostalCodeLookup> {
        let code = code.trim();
        let repo = &self.repo;
        let mapper = self
            .reads
            .get_or_load(&format!("postal:{}", code), || repo.find_postal_code(code))
            .await?
            .ok_or_else(|| ServiceError::not_found("Postal code", code))?;
        Ok(PostalCodeLookup::from(mapper))
    }

    // ---- country <-> state ----

    pub async fn set_country_states(&self, country_id: i64, state_ids: &[i64]) -> ServiceResult<Vec<State>> {
        self.get_country(country_id).await?;
        ensure_exist("states", "State", self.repo.missing("states", state_ids).await?)?;
        self.repo.set_country_states(country_id, state_ids).await?;
        self.reads.invalidate().await;
        self.states_of_country(country_id).await
    }

    pub async fn add_country_state(&self, country_id: i64, state_id: i64) -> ServiceResult<Vec<State>> {
        self.get_country(country_id).await?;
        self.get_state(state_id).await?;
        self.repo.add_country_state(country_id, state_id).await?;
        self.reads.invalidate().await;
        self.states_of_country(country_id).await
    }

    pub async fn remove_country_state(&self, country_id: i64, state_id: i64) -> ServiceResult<()> {
        if !self.repo.remove_country_state(country_id, state_id).await? {
            return Err(ServiceError::not_found(
                "Country state link",
                format!("{}/{}", country_id, state_id),
            ));
        }
        self.reads.invalidate().await;
        Ok(())
    }

    pub async fn states_of_country(&self, country_id: i64) -> ServiceResult<Vec<State>> {
        self.get_country(country_id).await?;
        let repo = &self.repo;
        Ok(self
            .reads
            .get_or_load(&format!("country:{}:states", country_id), || {
                repo.states_of_country(country_id)
            })
            .await?)
    }

    pub async fn countries_including(&self, state_id: i64) -> ServiceResult<Vec<Country>> {
        self.get_state(state_id).await?;
        Ok(self
            .repo
            .countries_including(state_id)
            .await
            .context("Failed to list countries of state")?)
    }

    // ---- state <-> city ----

    pub async fn set_state_cities(&self, state_id: i64, city_ids: &[i64]) -> ServiceResult<Vec<City>> {
        self.get_state(state_id).await?;
        ensure_exist("cities", "City", self.repo.missing("cities", city_ids).await?)?;
        self.repo.set_state_cities(state_id, city_ids).await?;
        self.reads.invalidate().await;
        self.cities_of_state(state_id).await
    }

    pub async fn add_state_city(&self, state_id: i64, city_id: i64) -> ServiceResult<Vec<City>> {
        self.get_state(state_id).await?;
        self.get_city(city_id).await?;
        self.repo.add_state_city(state_id, city_id).await?;
        self.reads.invalidate().await;
        self.cities_of_state(state_id).await
    }

    pub async fn remove_state_city(&self, state_id: i64, city_id: i64) -> ServiceResult<()> {
        if !self.repo.remove_state_city(state_id, city_id).await? {
            return Err(ServiceError::not_found(
                "State city link",
                format!("{}/{}", state_id, city_id),
            ));
        }
        self.reads.invalidate().await;
        Ok(())
    }

    pub async fn cities_of_state(&self, state_id: i64) -> ServiceResult<Vec<City>> {
        self.get_state(state_id).await?;
        let repo = &self.repo;
        Ok(self
            .reads
            .get_or_load(&format!("state:{}:cities", state_id), || {
                repo.cities_of_state(state_id)
            })
            .await?)
    }

    pub async fn states_including(&self, city_id: i64) -> ServiceResult<Vec<State>> {
        self.get_city(city_id).await?;
        Ok(self
            .repo
            .states_including(city_id)
            .await
            .context("Failed to list states of city")?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::create_cache;
    use crate::config::CacheConfig;
    use crate::db::repositories::{SqlxGeoRepository, SqlxTemplateContentRepository, TemplateContentRepository};
    use crate::models::TemplateContentInput;
    use crate::db::{create_test_pool, migrations::run_migrations, DynDatabasePool};

    async fn service() -> (DynDatabasePool, GeoService) {
        let pool = create_test_pool().await.unwrap();
        run_migrations(&pool).await.unwrap();
        let service = GeoService::new(
            SqlxGeoRepository::boxed(pool.clone()),
            create_cache(&CacheConfig::default()),
        );
        (pool, service)
    }

    fn named<T: Default>(build: impl FnOnce(&mut T)) -> T {
        let mut input = T::default();
        build(&mut input);
        input
    }

    #[tokio::test]
    async fn test_country_crud() {
        let (_, geo) = service().await;
        let india = geo
            .create_country(named(|c: &mut CountryInput| {
                c.name = Some("India".into());
                c.short_name = Some("IN".into());
            }))
            .await
            .unwrap();
        assert_eq!(india.to_string(), "India");
        assert_eq!(geo.list_countries().await.unwrap().len(), 1);

        let renamed = geo
            .update_country(india.id, named(|c: &mut CountryInput| c.name = Some("Bharat".into())))
            .await
            .unwrap();
        assert_eq!(renamed.name.as_deref(), Some("Bharat"));
        assert_eq!(renamed.short_name, None);
        // list cache dropped by the update
        assert_eq!(geo.list_countries().await.unwrap()[0].name.as_deref(), Some("Bharat"));

        geo.delete_country(india.id).await.unwrap();
        assert!(matches!(
            geo.get_country(india.id).await,
            Err(ServiceError::NotFound { .. })
        ));
        assert!(matches!(
            geo.delete_country(india.id).await,
            Err(ServiceError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_validation_rejects_long_short_name() {
        let (_, geo) = service().await;
        let result = geo
            .create_state(named(|s: &mut StateInput| s.short_name = Some("TOOLONG".into())))
            .await;
        assert!(matches!(result, Err(ServiceError::Validation(ref e)) if e.field == "short_name"));
    }

    #[tokio::test]
    async fn test_links_and_reverse_lookup() {
        let (_, geo) = service().await;
        let country = geo.create_country(CountryInput::default()).await.unwrap();
        let punjab = geo
            .create_state(named(|s: &mut StateInput| s.name = Some("Punjab".into())))
            .await
            .unwrap();
        let goa = geo
            .create_state(named(|s: &mut StateInput| s.name = Some("Goa".into())))
            .await
            .unwrap();

        let states = geo
            .set_country_states(country.id, &[punjab.id, goa.id])
            .await
            .unwrap();
        let names: Vec<_> = states.iter().map(|s| s.to_string()).collect();
        assert_eq!(names, vec!["Goa", "Punjab"]);

        let err = geo.set_country_states(country.id, &[punjab.id, 999]).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidReference { ref ids, .. } if ids == &vec![999]));
        // the failed call left the links alone
        assert_eq!(geo.states_of_country(country.id).await.unwrap().len(), 2);

        geo.remove_country_state(country.id, goa.id).await.unwrap();
        assert_eq!(geo.states_of_country(country.id).await.unwrap().len(), 1);
        assert!(geo.countries_including(goa.id).await.unwrap().is_empty());
        assert_eq!(geo.countries_including(punjab.id).await.unwrap()[0].id, country.id);

        let city = geo
            .create_city(named(|c: &mut CityInput| c.name = Some("Mohali".into())))
            .await
            .unwrap();
        geo.add_state_city(punjab.id, city.id).await.unwrap();
        geo.add_state_city(punjab.id, city.id).await.unwrap();
        assert_eq!(geo.cities_of_state(punjab.id).await.unwrap().len(), 1);
        assert_eq!(geo.states_including(city.id).await.unwrap()[0].id, punjab.id);
        assert!(matches!(
            geo.remove_state_city(goa.id, city.id).await,
            Err(ServiceError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_delete_referenced_city_is_conflict() {
        let (pool, geo) = service().await;
        let city = geo.create_city(CityInput::default()).await.unwrap();
        let contents = SqlxTemplateContentRepository::new(pool);
        contents
            .create(&TemplateContentInput {
                city_id: Some(city.id),
                ..TemplateContentInput::new("Tagged")
            })
            .await
            .unwrap();

        let err = geo.delete_city(city.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
        assert!(geo.get_city(city.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_postal_code_lookup() {
        let (_, geo) = service().await;
        geo.create_postal_code(PostalCodeInput {
            postal_code: " 160017 ".into(),
            latitude: Some("30.7410".into()),
            longitude: Some("76.7790".into()),
        })
        .await
        .unwrap();
        geo.create_postal_code(PostalCodeInput {
            postal_code: "403001".into(),
            latitude: Some("north".into()),
            longitude: Some("73.8".into()),
        })
        .await
        .unwrap();

        let found = geo.lookup_postal_code("160017").await.unwrap();
        let coords = found.coordinates.unwrap();
        assert!((coords.latitude - 30.741).abs() < 1e-9);
        assert!((coords.longitude - 76.779).abs() < 1e-9);

        let unparsed = geo.lookup_postal_code("403001").await.unwrap();
        assert!(unparsed.coordinates.is_none());

        assert!(matches!(
            geo.lookup_postal_code("000000").await,
            Err(ServiceError::NotFound { .. })
        ));

        let err = geo
            .create_postal_code(PostalCodeInput::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(ref e) if e.field == "postal_code"));
    }
}
