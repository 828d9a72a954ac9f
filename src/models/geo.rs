//! Geographic taxonomy: countries contain states, states contain cities.
//!
//! Both containment links are many-to-many, so a state may be listed under
//! more than one country and a city under more than one state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::validation::{blank_to_none, max_len, max_len_opt, required, FieldResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct City {
    pub id: i64,
    pub name: Option<String>,
    pub source_id: Option<String>,
    pub created_on: DateTime<Utc>,
    pub updated_on: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct State {
    pub id: i64,
    pub name: Option<String>,
    pub short_name: Option<String>,
    pub timezone: Option<String>,
    pub source_id: Option<String>,
    pub created_on: DateTime<Utc>,
    pub updated_on: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Country {
    pub id: i64,
    pub name: Option<String>,
    pub short_name: Option<String>,
    pub source_id: Option<String>,
    pub created_on: DateTime<Utc>,
    pub updated_on: DateTime<Utc>,
}

/// Postal code with its coordinates as entered, unparsed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PostalCodeMapper {
    pub id: i64,
    pub postal_code: String,
    pub latitude: Option<String>,
    pub longitude: Option<String>,
    pub created_on: DateTime<Utc>,
    pub updated_on: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl PostalCodeMapper {
    /// Parsed coordinates; `None` unless both values are present and numeric.
    pub fn coordinates(&self) -> Option<Coordinates> {
        let parse = |v: &Option<String>| {
            v.as_deref()
                .and_then(|s| s.trim().parse::<f64>().ok())
                .filter(|n| n.is_finite())
        };
        Some(Coordinates {
            latitude: parse(&self.latitude)?,
            longitude: parse(&self.longitude)?,
        })
    }
}

/// Result of a postal code lookup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostalCodeLookup {
    #[serde(flatten)]
    pub mapper: PostalCodeMapper,
    pub coordinates: Option<Coordinates>,
}

impl From<PostalCodeMapper> for PostalCodeLookup {
    fn from(mapper: PostalCodeMapper) -> Self {
        let coordinates = mapper.coordinates();
        Self {
            mapper,
            coordinates,
        }
    }
}

fn display_name(f: &mut fmt::Formatter<'_>, kind: &str, id: i64, name: &Option<String>) -> fmt::Result {
    match name.as_deref() {
        Some(name) if !name.is_empty() => f.write_str(name),
        _ => write!(f, "{} {}", kind, id),
    }
}

impl fmt::Display for City {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        display_name(f, "City", self.id, &self.name)
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        display_name(f, "State", self.id, &self.name)
    }
}

impl fmt::Display for Country {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        display_name(f, "Country", self.id, &self.name)
    }
}

impl fmt::Display for PostalCodeMapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.postal_code)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CityInput {
    pub name: Option<String>,
    pub source_id: Option<String>,
}

impl CityInput {
    pub fn validate(&self) -> FieldResult {
        max_len_opt("name", self.name.as_deref(), 100)?;
        max_len_opt("source_id", self.source_id.as_deref(), 10)
    }

    pub fn normalized(self) -> Self {
        Self {
            name: blank_to_none(self.name),
            source_id: blank_to_none(self.source_id),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StateInput {
    pub name: Option<String>,
    pub short_name: Option<String>,
    pub timezone: Option<String>,
    pub source_id: Option<String>,
}

impl StateInput {
    pub fn validate(&self) -> FieldResult {
        max_len_opt("name", self.name.as_deref(), 100)?;
        max_len_opt("short_name", self.short_name.as_deref(), 5)?;
        max_len_opt("timezone", self.timezone.as_deref(), 100)?;
        max_len_opt("source_id", self.source_id.as_deref(), 10)
    }

    pub fn normalized(self) -> Self {
        Self {
            name: blank_to_none(self.name),
            short_name: blank_to_none(self.short_name),
            timezone: blank_to_none(self.timezone),
            source_id: blank_to_none(self.source_id),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CountryInput {
    pub name: Option<String>,
    pub short_name: Option<String>,
    pub source_id: Option<String>,
}

impl CountryInput {
    pub fn validate(&self) -> FieldResult {
        max_len_opt("name", self.name.as_deref(), 100)?;
        max_len_opt("short_name", self.short_name.as_deref(), 5)?;
        max_len_opt("source_id", self.source_id.as_deref(), 10)
    }

    pub fn normalized(self) -> Self {
        Self {
            name: blank_to_none(self.name),
            short_name: blank_to_none(self.short_name),
            source_id: blank_to_none(self.source_id),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PostalCodeInput {
    pub postal_code: String,
    #[serde(default)]
    pub latitude: Option<String>,
    #[serde(default)]
    pub longitude: Option<String>,
}

impl PostalCodeInput {
    pub fn validate(&self) -> FieldResult {
        required("postal_code", &self.postal_code)?;
        max_len("postal_code", &self.postal_code, 255)?;
        max_len_opt("latitude", self.latitude.as_deref(), 255)?;
        max_len_opt("longitude", self.longitude.as_deref(), 255)
    }

    pub fn normalized(self) -> Self {
        Self {
            postal_code: self.postal_code.trim().to_string(),
            latitude: blank_to_none(self.latitude),
            longitude: blank_to_none(self.longitude),
        }
    }
}
