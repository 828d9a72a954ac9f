//! Articles ("template content")
//!
//! A [`TemplateContent`] is rendered through one of a fixed set of templates
//! and carries its editorial copy, search and SEO metadata, geography and
//! sponsorship tagging, and several many-to-many relations managed through
//! [`ContentRelation`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::publishing::PublishingState;
use super::validation::{
    blank_to_none, max_len, max_len_opt, required, slug, url, FieldError, FieldResult,
};

/// Template an article is rendered with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Template {
    #[serde(rename = "Editorial Template")]
    Editorial,
    #[serde(rename = "Vehicle Editorial Template")]
    VehicleEditorial,
}

impl Template {
    pub const ALL: [Template; 2] = [Template::Editorial, Template::VehicleEditorial];

    pub fn as_str(&self) -> &'static str {
        match self {
            Template::Editorial => "Editorial Template",
            Template::VehicleEditorial => "Vehicle Editorial Template",
        }
    }
}

impl FromStr for Template {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Template::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("Unknown template: {}", s))
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

text_column!(Template);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct TemplateContent {
    pub id: i64,
    pub content_heading: String,
    pub content_subheading: String,
    pub content_url: String,
    pub content_byline: String,
    pub content_byline_link: String,
    pub content_body: String,
    pub content_synopsis: Option<String>,
    pub content_publish_date: DateTime<Utc>,
    pub content_provider_id: Option<i64>,
    pub disable_ads: bool,
    pub content_partner_id: Option<i64>,
    pub content_received_date: Option<DateTime<Utc>>,
    pub search_keywords: Option<String>,
    pub search_boost: Option<i32>,
    pub include_in_search: bool,
    /// Canonical link
    pub guid: Option<String>,
    pub seo_meta_name: Option<String>,
    pub seo_keywords: Option<String>,
    pub seo_meta_description: Option<String>,
    pub template: Option<Template>,
    pub preview_path: Option<String>,
    pub country_id: Option<i64>,
    pub state_id: Option<i64>,
    pub city_id: Option<i64>,
    pub sponsor_id: Option<i64>,
    pub is_timely_content: bool,
    pub available_in_trends: bool,
    pub disable_personalization: bool,
    pub is_promoted_content: bool,
    pub homepage_availability: bool,
    pub year: Option<i32>,
    pub manufacturer: Option<String>,
    pub make: Option<String>,
    pub make_model: Option<String>,
    pub likes: Option<i32>,
    pub views: Option<i32>,
    pub slug: Option<String>,
    pub is_featured: bool,
    pub template_configuration: Option<String>,
    pub created_on: DateTime<Utc>,
    pub updated_on: DateTime<Utc>,
}

impl fmt::Display for TemplateContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.content_heading.is_empty() {
            write!(f, "Content {}", self.id)
        } else {
            f.write_str(&self.content_heading)
        }
    }
}

/// The many-to-many relations of an article
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentRelation {
    SecondaryNavigation,
    RelatedArticles,
    AssetAssociations,
    RelatedAds,
    Campaigns,
}

impl ContentRelation {
    pub const ALL: [ContentRelation; 5] = [
        ContentRelation::SecondaryNavigation,
        ContentRelation::RelatedArticles,
        ContentRelation::AssetAssociations,
        ContentRelation::RelatedAds,
        ContentRelation::Campaigns,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentRelation::SecondaryNavigation => "secondary_navigation",
            ContentRelation::RelatedArticles => "related_articles",
            ContentRelation::AssetAssociations => "asset_associations",
            ContentRelation::RelatedAds => "related_ads",
            ContentRelation::Campaigns => "campaigns",
        }
    }

    /// Relations whose targets are other articles
    pub fn is_self_referential(&self) -> bool {
        matches!(
            self,
            ContentRelation::SecondaryNavigation | ContentRelation::RelatedArticles
        )
    }
}

impl FromStr for ContentRelation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ContentRelation::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| format!("Unknown relation: {}", s))
    }
}

impl fmt::Display for ContentRelation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Article with all relation ids and its publishing state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateContentDetail {
    #[serde(flatten)]
    pub content: TemplateContent,
    pub secondary_navigation: Vec<i64>,
    pub related_articles: Vec<i64>,
    pub asset_associations: Vec<i64>,
    pub related_ads: Vec<i64>,
    pub campaigns: Vec<i64>,
    pub publishing_state: Option<PublishingState>,
}

/// Create / full-replacement input.
///
/// Text fields left out take the configured defaults. Relation lists are
/// only written when present.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateContentInput {
    pub content_heading: String,
    pub content_subheading: String,
    pub content_url: Option<String>,
    pub content_byline: Option<String>,
    pub content_byline_link: Option<String>,
    pub content_body: Option<String>,
    pub content_synopsis: Option<String>,
    pub content_provider_id: Option<i64>,
    pub disable_ads: bool,
    pub content_partner_id: Option<i64>,
    pub content_received_date: Option<DateTime<Utc>>,
    pub search_keywords: Option<String>,
    pub search_boost: Option<i32>,
    pub include_in_search: bool,
    pub guid: Option<String>,
    pub seo_meta_name: Option<String>,
    pub seo_keywords: Option<String>,
    pub seo_meta_description: Option<String>,
    /// Empty string means no template
    pub template: Option<String>,
    pub preview_path: Option<String>,
    pub country_id: Option<i64>,
    pub state_id: Option<i64>,
    pub city_id: Option<i64>,
    pub sponsor_id: Option<i64>,
    pub is_timely_content: bool,
    pub available_in_trends: bool,
    pub disable_personalization: bool,
    pub is_promoted_content: bool,
    pub homepage_availability: bool,
    pub year: Option<i32>,
    pub manufacturer: Option<String>,
    pub make: Option<String>,
    pub make_model: Option<String>,
    pub likes: Option<i32>,
    pub views: Option<i32>,
    pub slug: Option<String>,
    pub is_featured: bool,
    pub template_configuration: Option<String>,
    pub secondary_navigation: Option<Vec<i64>>,
    pub related_articles: Option<Vec<i64>>,
    pub asset_associations: Option<Vec<i64>>,
    pub related_ads: Option<Vec<i64>>,
    pub campaigns: Option<Vec<i64>>,
}

impl TemplateContentInput {
    pub fn new(heading: impl Into<String>) -> Self {
        Self {
            content_heading: heading.into(),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> FieldResult {
        required("content_heading", &self.content_heading)?;
        max_len("content_heading", &self.content_heading, 255)?;
        max_len("content_subheading", &self.content_subheading, 255)?;
        if let Some(link) = self.content_url.as_deref().filter(|u| !u.is_empty()) {
            url("content_url", link)?;
        }
        max_len_opt("guid", self.guid.as_deref(), 255)?;
        max_len_opt("seo_meta_name", self.seo_meta_name.as_deref(), 100)?;
        max_len_opt("preview_path", self.preview_path.as_deref(), 20)?;
        self.template_choice()?;
        if let Some(value) = self.slug.as_deref() {
            slug("slug", value)?;
        }
        Ok(())
    }

    /// The selected template; blank means none.
    pub fn template_choice(&self) -> Result<Option<Template>, FieldError> {
        match self.template.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(value) => value.parse().map(Some).map_err(|_| {
                FieldError::new(
                    "template",
                    format!("Select a valid choice. {} is not one of the available choices", value),
                )
            }),
        }
    }

    pub fn normalized(self) -> Self {
        Self {
            content_heading: self.content_heading.trim().to_string(),
            guid: blank_to_none(self.guid),
            seo_meta_name: blank_to_none(self.seo_meta_name),
            preview_path: blank_to_none(self.preview_path),
            slug: blank_to_none(self.slug).map(|s| s.trim().to_string()),
            ..self
        }
    }

    /// Relation lists supplied with the input
    pub fn relations(&self) -> Vec<(ContentRelation, &[i64])> {
        [
            (ContentRelation::SecondaryNavigation, &self.secondary_navigation),
            (ContentRelation::RelatedArticles, &self.related_articles),
            (ContentRelation::AssetAssociations, &self.asset_associations),
            (ContentRelation::RelatedAds, &self.related_ads),
            (ContentRelation::Campaigns, &self.campaigns),
        ]
        .into_iter()
        .filter_map(|(relation, ids)| ids.as_deref().map(|ids| (relation, ids)))
        .collect()
    }
}

/// List filters; every set field must match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentFilter {
    pub homepage_availability: Option<bool>,
    pub is_featured: Option<bool>,
    pub is_promoted_content: Option<bool>,
    pub available_in_trends: Option<bool>,
    pub country_id: Option<i64>,
    pub state_id: Option<i64>,
    pub city_id: Option<i64>,
    pub sponsor_id: Option<i64>,
    pub partner_id: Option<i64>,
    pub provider_id: Option<i64>,
    pub template: Option<Template>,
}
