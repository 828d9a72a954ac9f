//! Reference entities an article points at: providers, partners, ad
//! sections, campaigns and sponsors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::validation::{
    blank_to_none, max_len, max_len_opt, required, url_opt, FieldResult,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ContentProvider {
    pub id: i64,
    pub name: String,
    pub url: Option<String>,
    pub created_on: DateTime<Utc>,
    pub updated_on: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Partner {
    pub id: i64,
    pub name: String,
    pub logo: Option<String>,
    pub description: String,
    pub created_on: DateTime<Utc>,
    pub updated_on: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct AdSection {
    pub id: i64,
    pub name: String,
    pub script: Option<String>,
    pub location: Option<String>,
    pub created_on: DateTime<Utc>,
    pub updated_on: DateTime<Utc>,
}

/// A campaign's `start_date` is fixed when the row is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Campaign {
    pub id: i64,
    pub name: String,
    pub start_date: DateTime<Utc>,
    pub created_on: DateTime<Utc>,
    pub updated_on: DateTime<Utc>,
}

/// `logo` is a path relative to the media root, e.g. `uploads/sponsors/<file>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Sponsor {
    pub id: i64,
    pub name: String,
    pub logo: Option<String>,
    pub external_link: Option<String>,
    pub created_on: DateTime<Utc>,
    pub updated_on: DateTime<Utc>,
}

macro_rules! display_by_name {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.name)
            }
        })*
    };
}

display_by_name!(ContentProvider, Partner, AdSection, Campaign, Sponsor);

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContentProviderInput {
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
}

impl ContentProviderInput {
    pub fn validate(&self) -> FieldResult {
        required("name", &self.name)?;
        max_len("name", &self.name, 255)?;
        url_opt("url", self.url.as_deref())
    }

    pub fn normalized(self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            url: blank_to_none(self.url),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PartnerInput {
    pub name: String,
    #[serde(default)]
    pub logo: Option<String>,
    #[serde(default)]
    pub description: String,
}

impl PartnerInput {
    pub fn validate(&self) -> FieldResult {
        required("name", &self.name)?;
        max_len("name", &self.name, 100)?;
        url_opt("logo", self.logo.as_deref())
    }

    pub fn normalized(self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            logo: blank_to_none(self.logo),
            description: self.description,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdSectionInput {
    pub name: String,
    #[serde(default)]
    pub script: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

impl AdSectionInput {
    pub fn validate(&self) -> FieldResult {
        required("name", &self.name)?;
        max_len("name", &self.name, 255)?;
        max_len_opt("location", self.location.as_deref(), 50)
    }

    pub fn normalized(self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            script: self.script,
            location: blank_to_none(self.location),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CampaignInput {
    pub name: String,
}

impl CampaignInput {
    pub fn validate(&self) -> FieldResult {
        required("name", &self.name)?;
        max_len("name", &self.name, 100)
    }

    pub fn normalized(self) -> Self {
        Self {
            name: self.name.trim().to_string(),
        }
    }
}

/// The logo is not part of the input; it is set through the upload endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SponsorInput {
    pub name: String,
    #[serde(default)]
    pub external_link: Option<String>,
}

impl SponsorInput {
    pub fn validate(&self) -> FieldResult {
        required("name", &self.name)?;
        max_len("name", &self.name, 255)?;
        url_opt("external_link", self.external_link.as_deref())
    }

    pub fn normalized(self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            external_link: blank_to_none(self.external_link),
        }
    }
}
