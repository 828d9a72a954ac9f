//! Media assets
//!
//! An [`Asset`] groups one or more [`AssetContent`] files under a type and
//! an optional thumbnail. Articles do not reference assets directly; they go
//! through an [`AssetAssociation`] that also records where in the template
//! the asset is placed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::validation::{blank_to_none, max_len, max_len_opt, required, FieldResult};

/// Thumbnail dimensions, width by height
pub const THUMBNAIL_SIZE: (u32, u32) = (300, 180);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct AssetType {
    pub id: i64,
    pub name: String,
    pub created_on: DateTime<Utc>,
    pub updated_on: DateTime<Utc>,
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// One file of an asset. `start_time` and `duration` are whole seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct AssetContent {
    pub id: i64,
    pub identifier: String,
    /// Path relative to the media root, under `uploads/`
    pub content: Option<String>,
    pub alternate_text: Option<String>,
    #[serde(rename = "order")]
    pub sort_order: Option<i32>,
    pub start_time: i32,
    pub duration: i32,
    pub created_on: DateTime<Utc>,
    pub updated_on: DateTime<Utc>,
}

impl fmt::Display for AssetContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.identifier)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Asset {
    pub id: i64,
    pub name: String,
    pub asset_type_id: Option<i64>,
    pub source: Option<String>,
    pub content_attribution: Option<String>,
    /// Path relative to the media root, under `uploads/thumbnails/`
    pub thumbnail: Option<String>,
    pub created_on: DateTime<Utc>,
    pub updated_on: DateTime<Utc>,
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Asset with its type and content files resolved
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetDetail {
    #[serde(flatten)]
    pub asset: Asset,
    pub asset_type: Option<AssetType>,
    pub contents: Vec<AssetContent>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct AssetAssociation {
    pub id: i64,
    pub asset_id: Option<i64>,
    pub template_location: Option<String>,
    pub created_on: DateTime<Utc>,
    pub updated_on: DateTime<Utc>,
}

impl AssetAssociation {
    /// Human-readable label, given the name of the linked asset.
    pub fn label(&self, asset_name: Option<&str>) -> String {
        let location = self.template_location.as_deref().filter(|l| !l.is_empty());
        match (location, asset_name) {
            (Some(location), Some(name)) => format!("At {} asset {}", location, name),
            (Some(location), None) => format!("At {}", location),
            (None, Some(name)) => name.to_string(),
            (None, None) => format!("Association {}", self.id),
        }
    }
}

/// Association as returned by the API, label resolved
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetAssociationView {
    #[serde(flatten)]
    pub association: AssetAssociation,
    pub label: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssetTypeInput {
    pub name: String,
}

impl AssetTypeInput {
    pub fn validate(&self) -> FieldResult {
        required("name", &self.name)?;
        max_len("name", &self.name, 20)
    }

    pub fn normalized(self) -> Self {
        Self {
            name: self.name.trim().to_string(),
        }
    }
}

fn default_duration() -> i32 {
    5
}

/// The file itself is uploaded separately.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetContentInput {
    pub identifier: String,
    #[serde(default)]
    pub alternate_text: Option<String>,
    #[serde(default)]
    pub order: Option<i32>,
    #[serde(default)]
    pub start_time: i32,
    #[serde(default = "default_duration")]
    pub duration: i32,
}

impl Default for AssetContentInput {
    fn default() -> Self {
        Self {
            identifier: String::new(),
            alternate_text: None,
            order: None,
            start_time: 0,
            duration: default_duration(),
        }
    }
}

impl AssetContentInput {
    pub fn validate(&self) -> FieldResult {
        required("identifier", &self.identifier)?;
        max_len("identifier", &self.identifier, 255)?;
        max_len_opt("alternate_text", self.alternate_text.as_deref(), 255)
    }

    pub fn normalized(self) -> Self {
        Self {
            identifier: self.identifier.trim().to_string(),
            alternate_text: blank_to_none(self.alternate_text),
            ..self
        }
    }
}

/// `contents`, when present, replaces the asset's content list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssetInput {
    pub name: String,
    #[serde(default)]
    pub asset_type_id: Option<i64>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub content_attribution: Option<String>,
    #[serde(default)]
    pub contents: Option<Vec<i64>>,
}

impl AssetInput {
    pub fn validate(&self) -> FieldResult {
        required("name", &self.name)?;
        max_len("name", &self.name, 255)?;
        max_len_opt("source", self.source.as_deref(), 255)?;
        max_len_opt("content_attribution", self.content_attribution.as_deref(), 255)
    }

    pub fn normalized(self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            source: blank_to_none(self.source),
            content_attribution: blank_to_none(self.content_attribution),
            ..self
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetAssociationInput {
    pub asset_id: Option<i64>,
    pub template_location: Option<String>,
}

impl AssetAssociationInput {
    pub fn validate(&self) -> FieldResult {
        max_len_opt("template_location", self.template_location.as_deref(), 50)
    }

    pub fn normalized(self) -> Self {
        Self {
            asset_id: self.asset_id,
            template_location: blank_to_none(self.template_location),
        }
    }
}
