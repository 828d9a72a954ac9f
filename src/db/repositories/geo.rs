//! Geographic taxonomy repository
//!
//! Countries, states, cities, postal code mappers and the
//! country→state / state→city join tables.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

use super::{
    add_link, delete_by_id, find_by_id, list_all, list_by_ids, list_links, list_owners,
    missing_ids, remove_link, set_links, LinkTable,
};
use crate::db::{DynDatabasePool, InsertedId};
use crate::models::{
    City, CityInput, Country, CountryInput, PostalCodeInput, PostalCodeMapper, State, StateInput,
};

pub const COUNTRY_STATES: LinkTable = LinkTable {
    table: "country_states",
    owner: "country_id",
    target: "state_id",
};

pub const STATE_CITIES: LinkTable = LinkTable {
    table: "state_cities",
    owner: "state_id",
    target: "city_id",
};

/// Geographic taxonomy repository trait
#[async_trait]
pub trait GeoRepository: Send + Sync {
    async fn create_country(&self, input: &CountryInput) -> Result<Country>;
    async fn get_country(&self, id: i64) -> Result<Option<Country>>;
    async fn list_countries(&self) -> Result<Vec<Country>>;
    /// Returns `None` when the country does not exist
    async fn update_country(&self, id: i64, input: &CountryInput) -> Result<Option<Country>>;
    async fn delete_country(&self, id: i64) -> Result<bool>;

    async fn create_state(&self, input: &StateInput) -> Result<State>;
    async fn get_state(&self, id: i64) -> Result<Option<State>>;
    async fn list_states(&self) -> Result<Vec<State>>;
    async fn update_state(&self, id: i64, input: &StateInput) -> Result<Option<State>>;
    async fn delete_state(&self, id: i64) -> Result<bool>;

    async fn create_city(&self, input: &CityInput) -> Result<City>;
    async fn get_city(&self, id: i64) -> Result<Option<City>>;
    async fn list_cities(&self) -> Result<Vec<City>>;
    async fn update_city(&self, id: i64, input: &CityInput) -> Result<Option<City>>;
    async fn delete_city(&self, id: i64) -> Result<bool>;

    async fn create_postal_code(&self, input: &PostalCodeInput) -> Result<PostalCodeMapper>;
    async fn get_postal_code(&self, id: i64) -> Result<Option<PostalCodeMapper>>;
    /// First mapper registered for `code`
    async fn find_postal_code(&self, code: &str) -> Result<Option<PostalCodeMapper>>;
    async fn list_postal_codes(&self) -> Result<Vec<PostalCodeMapper>>;
    async fn update_postal_code(
        &self,
        id: i64,
        input: &PostalCodeInput,
    ) -> Result<Option<PostalCodeMapper>>;
    async fn delete_postal_code(&self, id: i64) -> Result<bool>;

    async fn set_country_states(&self, country_id: i64, state_ids: &[i64]) -> Result<()>;
    async fn add_country_state(&self, country_id: i64, state_id: i64) -> Result<()>;
    async fn remove_country_state(&self, country_id: i64, state_id: i64) -> Result<bool>;
    async fn states_of_country(&self, country_id: i64) -> Result<Vec<State>>;
    async fn countries_including(&self, state_id: i64) -> Result<Vec<Country>>;

    async fn set_state_cities(&self, state_id: i64, city_ids: &[i64]) -> Result<()>;
    async fn add_state_city(&self, state_id: i64, city_id: i64) -> Result<()>;
    async fn remove_state_city(&self, state_id: i64, city_id: i64) -> Result<bool>;
    async fn cities_of_state(&self, state_id: i64) -> Result<Vec<City>>;
    async fn states_including(&self, city_id: i64) -> Result<Vec<State>>;

    /// Ids among `ids` that have no row in `table`
    async fn missing(&self, table: &'static str, ids: &[i64]) -> Result<Vec<i64>>;
}

/// SQLx-based geo repository implementation
pub struct SqlxGeoRepository {
    pool: DynDatabasePool,
}

impl SqlxGeoRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn GeoRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl GeoRepository for SqlxGeoRepository {
    async fn create_country(&self, input: &CountryInput) -> Result<Country> {
        let now = Utc::now();
        let id = with_pool!(self.pool, |conn| {
            sqlx::query(
                "INSERT INTO countries (name, short_name, source_id, created_on, updated_on) VALUES (?, ?, ?, ?, ?)",
            )
            .bind(&input.name)
            .bind(&input.short_name)
            .bind(&input.source_id)
            .bind(now)
            .bind(now)
            .execute(conn)
            .await
            .context("Failed to insert country")?
            .inserted_id()
        });
        fetch_created(self.get_country(id).await?, "country", id)
    }

    async fn get_country(&self, id: i64) -> Result<Option<Country>> {
        find_by_id(&self.pool, "countries", id).await
    }

    async fn list_countries(&self) -> Result<Vec<Country>> {
        list_all(&self.pool, "countries", "name, id").await
    }

    async fn update_country(&self, id: i64, input: &CountryInput) -> Result<Option<Country>> {
        let affected = with_pool!(self.pool, |conn| {
            sqlx::query(
                "UPDATE countries SET name = ?, short_name = ?, source_id = ?, updated_on = ? WHERE id = ?",
            )
            .bind(&input.name)
            .bind(&input.short_name)
            .bind(&input.source_id)
            .bind(Utc::now())
            .bind(id)
            .execute(conn)
            .await
            .context("Failed to update country")?
            .rows_affected()
        });
        if affected == 0 {
            return Ok(None);
        }
        self.get_country(id).await
    }

    async fn delete_country(&self, id: i64) -> Result<bool> {
        delete_by_id(&self.pool, "countries", id).await
    }

    async fn create_state(&self, input: &StateInput) -> Result<State> {
        let now = Utc::now();
        let id = with_pool!(self.pool, |conn| {
            sqlx::query(
                "INSERT INTO states (name, short_name, timezone, source_id, created_on, updated_on) VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(&input.name)
            .bind(&input.short_name)
            .bind(&input.timezone)
            .bind(&input.source_id)
            .bind(now)
            .bind(now)
            .execute(conn)
            .await
            .context("Failed to insert state")?
            .inserted_id()
        });
        fetch_created(self.get_state(id).await?, "state", id)
    }

    async fn get_state(&self, id: i64) -> Result<Option<State>> {
        find_by_id(&self.pool, "states", id).await
    }

    async fn list_states(&self) -> Result<Vec<State>> {
        list_all(&self.pool, "states", "name, id").await
    }

    async fn update_state(&self, id: i64, input: &StateInput) -> Result<Option<State>> {
        let affected = with_pool!(self.pool, |conn| {
            sqlx::query(
                "UPDATE states SET name = ?, short_name = ?, timezone = ?, source_id = ?, updated_on = ? WHERE id = ?",
            )
            .bind(&input.name)
            .bind(&input.short_name)
            .bind(&input.timezone)
            .bind(&input.source_id)
            .bind(Utc::now())
            .bind(id)
            .execute(conn)
            .await
            .context("Failed to update state")?
            .rows_affected()
        });
        if affected == 0 {
            return Ok(None);
        }
        self.get_state(id).await
    }

    async fn delete_state(&self, id: i64) -> Result<bool> {
        delete_by_id(&self.pool, "states", id).await
    }

    async fn create_city(&self, input: &CityInput) -> Result<City> {
        let now = Utc::now();
        let id = with_pool!(self.pool, |conn| {
            sqlx::query(
                "INSERT INTO cities (name, source_id, created_on, updated_on) VALUES (?, ?, ?, ?)",
            )
            .bind(&input.name)
            .bind(&input.source_id)
            .bind(now)
            .bind(now)
            .execute(conn)
            .await
            .context("Failed to insert city")?
            .inserted_id()
        });
        fetch_created(self.get_city(id).await?, "city", id)
    }

    async fn get_city(&self, id: i64) -> Result<Option<City>> {
        find_by_id(&self.pool, "cities", id).await
    }

    async fn list_cities(&self) -> Result<Vec<City>> {
        list_all(&self.pool, "cities", "name, id").await
    }

    async fn update_city(&self, id: i64, input: &CityInput) -> Result<Option<City>> {
        let affected = with_pool!(self.pool, |conn| {
            sqlx::query("UPDATE cities SET name = ?, source_id = ?, updated_on = ? WHERE id = ?")
                .bind(&input.name)
                .bind(&input.source_id)
                .bind(Utc::now())
                .bind(id)
                .execute(conn)
                .await
                .context("Failed to update city")?
                .rows_affected()
        });
        if affected == 0 {
            return Ok(None);
        }
        self.get_city(id).await
    }

    async fn delete_city(&self, id: i64) -> Result<bool> {
        delete_by_id(&self.pool, "cities", id).await
    }

    async fn create_postal_code(&self, input: &PostalCodeInput) -> Result<PostalCodeMapper> {
        let now = Utc::now();
        let id = with_pool!(self.pool, |conn| {
            sqlx::query(
                "INSERT INTO postal_code_mappers (postal_code, latitude, longitude, created_on, updated_on) VALUES (?, ?, ?, ?, ?)",
            )
            .bind(&input.postal_code)
            .bind(&input.latitude)
            .bind(&input.longitude)
            .bind(now)
            .bind(now)
            .execute(conn)
            .await
            .context("Failed to insert postal code")?
            .inserted_id()
        });
        fetch_created(self.get_postal_code(id).await?, "postal code", id)
    }

    async fn get_postal_code(&self, id: i64) -> Result<Option<PostalCodeMapper>> {
        find_by_id(&self.pool, "postal_code_mappers", id).await
    }

    async fn find_postal_code(&self, code: &str) -> Result<Option<PostalCodeMapper>> {
        with_pool!(self.pool, |conn| {
            sqlx::query_as::<_, PostalCodeMapper>(
                "SELECT * FROM postal_code_mappers WHERE postal_code = ? ORDER BY id LIMIT 1",
            )
            .bind(code)
            .fetch_optional(conn)
            .await
            .context("Failed to look up postal code")
        })
    }

    async fn list_postal_codes(&self) -> Result<Vec<PostalCodeMapper>> {
        list_all(&self.pool, "postal_code_mappers", "postal_code, id").await
    }

    async fn update_postal_code(
        &self,
        id: i64,
        input: &PostalCodeInput,
    ) -> Result<Option<PostalCodeMapper>> {
        let affected = with_pool!(self.pool, |conn| {
            sqlx::query(
                "UPDATE postal_code_mappers SET postal_code = ?, latitude = ?, longitude = ?, updated_on = ? WHERE id = ?",
            )
            .bind(&input.postal_code)
            .bind(&input.latitude)
            .bind(&input.longitude)
            .bind(Utc::now())
            .bind(id)
            .execute(conn)
            .await
            .context("Failed to update postal code")?
            .rows_affected()
        });
        if affected == 0 {
            return Ok(None);
        }
        self.get_postal_code(id).await
    }

    async fn delete_postal_code(&self, id: i64) -> Result<bool> {
        delete_by_id(&self.pool, "postal_code_mappers", id).await
    }

    async fn set_country_states(&self, country_id: i64, state_ids: &[i64]) -> Result<()> {
        set_links(&self.pool, COUNTRY_STATES, country_id, state_ids).await
    }

    async fn add_country_state(&self, country_id: i64, state_id: i64) -> Result<()> {
        add_link(&self.pool, COUNTRY_STATES, country_id, state_id).await
    }

    async fn remove_country_state(&self, country_id: i64, state_id: i64) -> Result<bool> {
        remove_link(&self.pool, COUNTRY_STATES, country_id, state_id).await
    }

    async fn states_of_country(&self, country_id: i64) -> Result<Vec<State>> {
        let ids = list_links(&self.pool, COUNTRY_STATES, country_id).await?;
        list_by_ids(&self.pool, "states", &ids).await
    }

    async fn countries_including(&self, state_id: i64) -> Result<Vec<Country>> {
        let ids = list_owners(&self.pool, COUNTRY_STATES, state_id).await?;
        list_by_ids(&self.pool, "countries", &ids).await
    }

    async fn set_state_cities(&self, state_id: i64, city_ids: &[i64]) -> Result<()> {
        set_links(&self.pool, STATE_CITIES, state_id, city_ids).await
    }

    async fn add_state_city(&self, state_id: i64, city_id: i64) -> Result<()> {
        add_link(&self.pool, STATE_CITIES, state_id, city_id).await
    }

    async fn remove_state_city(&self, state_id: i64, city_id: i64) -> Result<bool> {
        remove_link(&self.pool, STATE_CITIES, state_id, city_id).await
    }

    async fn cities_of_state(&self, state_id: i64) -> Result<Vec<City>> {
        let ids = list_links(&self.pool, STATE_CITIES, state_id).await?;
        list_by_ids(&self.pool, "cities", &ids).await
    }

    async fn states_including(&self, city_id: i64) -> Result<Vec<State>> {
        let ids = list_owners(&self.pool, STATE_CITIES, city_id).await?;
        list_by_ids(&self.pool, "states", &ids).await
    }

    async fn missing(&self, table: &'static str, ids: &[i64]) -> Result<Vec<i64>> {
        missing_ids(&self.pool, table, ids).await
    }
}

/// Unwrap the row read back right after an insert
pub(crate) fn fetch_created<T>(row: Option<T>, entity: &str, id: i64) -> Result<T> {
    row.ok_or_else(|| anyhow::anyhow!("Failed to read back created {} {}", entity, id))
}
