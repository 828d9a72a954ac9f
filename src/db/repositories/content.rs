//! Reference entity repository
//!
//! Content providers, partners, ad sections, campaigns and sponsors.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

use super::geo::fetch_created;
use super::{delete_by_id, find_by_id, list_all};
use crate::db::{DynDatabasePool, InsertedId};
use crate::models::{
    AdSection, AdSectionInput, Campaign, CampaignInput, ContentProvider, ContentProviderInput,
    Partner, PartnerInput, Sponsor, SponsorInput,
};

#[async_trait]
pub trait ReferenceRepository: Send + Sync {
    async fn create_provider(&self, input: &ContentProviderInput) -> Result<ContentProvider>;
    async fn get_provider(&self, id: i64) -> Result<Option<ContentProvider>>;
    async fn list_providers(&self) -> Result<Vec<ContentProvider>>;
    async fn update_provider(
        &self,
        id: i64,
        input: &ContentProviderInput,
    ) -> Result<Option<ContentProvider>>;
    async fn delete_provider(&self, id: i64) -> Result<bool>;

    async fn create_partner(&self, input: &PartnerInput) -> Result<Partner>;
    async fn get_partner(&self, id: i64) -> Result<Option<Partner>>;
    async fn list_partners(&self) -> Result<Vec<Partner>>;
    async fn update_partner(&self, id: i64, input: &PartnerInput) -> Result<Option<Partner>>;
    async fn delete_partner(&self, id: i64) -> Result<bool>;

    async fn create_ad_section(&self, input: &AdSectionInput) -> Result<AdSection>;
    async fn get_ad_section(&self, id: i64) -> Result<Option<AdSection>>;
    async fn list_ad_sections(&self) -> Result<Vec<AdSection>>;
    async fn update_ad_section(&self, id: i64, input: &AdSectionInput)
        -> Result<Option<AdSection>>;
    async fn delete_ad_section(&self, id: i64) -> Result<bool>;

    /// `start_date` is set to the insert time
    async fn create_campaign(&self, input: &CampaignInput) -> Result<Campaign>;
    async fn get_campaign(&self, id: i64) -> Result<Option<Campaign>>;
    async fn list_campaigns(&self) -> Result<Vec<Campaign>>;
    /// Leaves `start_date` untouched
    async fn update_campaign(&self, id: i64, input: &CampaignInput) -> Result<Option<Campaign>>;
    async fn delete_campaign(&self, id: i64) -> Result<bool>;

    async fn create_sponsor(&self, input: &SponsorInput) -> Result<Sponsor>;
    async fn get_sponsor(&self, id: i64) -> Result<Option<Sponsor>>;
    async fn list_sponsors(&self) -> Result<Vec<Sponsor>>;
    /// Leaves the logo untouched
    async fn update_sponsor(&self, id: i64, input: &SponsorInput) -> Result<Option<Sponsor>>;
    async fn set_sponsor_logo(&self, id: i64, logo: Option<&str>) -> Result<Option<Sponsor>>;
    async fn delete_sponsor(&self, id: i64) -> Result<bool>;
}

pub struct SqlxReferenceRepository {
    pool: DynDatabasePool,
}

impl SqlxReferenceRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ReferenceRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl ReferenceRepository for SqlxReferenceRepository {
    async fn create_provider(&self, input: &ContentProviderInput) -> Result<ContentProvider> {
        let now = Utc::now();
        let id = with_pool!(self.pool, |conn| {
            sqlx::query(
                "INSERT INTO content_providers (name, url, created_on, updated_on) VALUES (?, ?, ?, ?)",
            )
            .bind(&input.name)
            .bind(&input.url)
            .bind(now)
            .bind(now)
            .execute(conn)
            .await
            .context("Failed to insert content provider")?
            .inserted_id()
        });
        fetch_created(self.get_provider(id).await?, "content provider", id)
    }

    async fn get_provider(&self, id: i64) -> Result<Option<ContentProvider>> {
        find_by_id(&self.pool, "content_providers", id).await
    }

    async fn list_providers(&self) -> Result<Vec<ContentProvider>> {
        list_all(&self.pool, "content_providers", "name, id").await
    }

    async fn update_provider(
        &self,
        id: i64,
        input: &ContentProviderInput,
    ) -> Result<Option<ContentProvider>> {
        let affected = with_pool!(self.pool, |conn| {
            sqlx::query("UPDATE content_providers SET name = ?, url = ?, updated_on = ? WHERE id = ?")
                .bind(&input.name)
                .bind(&input.url)
                .bind(Utc::now())
                .bind(id)
                .execute(conn)
                .await
                .context("Failed to update content provider")?
                .rows_affected()
        });
        if affected == 0 {
            return Ok(None);
        }
        self.get_provider(id).await
    }

    async fn delete_provider(&self, id: i64) -> Result<bool> {
        delete_by_id(&self.pool, "content_providers", id).await
    }

    async fn create_partner(&self, input: &PartnerInput) -> Result<Partner> {
        let now = Utc::now();
        let id = with_pool!(self.pool, |conn| {
            sqlx::query(
                "INSERT INTO partners (name, logo, description, created_on, updated_on) VALUES (?, ?, ?, ?, ?)",
            )
            .bind(&input.name)
            .bind(&input.logo)
            .bind(&input.description)
            .bind(now)
            .bind(now)
            .execute(conn)
            .await
            .context("Failed to insert partner")?
            .inserted_id()
        });
        fetch_created(self.get_partner(id).await?, "partner", id)
    }

    async fn get_partner(&self, id: i64) -> Result<Option<Partner>> {
        find_by_id(&self.pool, "partners", id).await
    }

    async fn list_partners(&self) -> Result<Vec<Partner>> {
        list_all(&self.pool, "partners", "name, id").await
    }

    async fn update_partner(&self, id: i64, input: &PartnerInput) -> Result<Option<Partner>> {
        let affected = with_pool!(self.pool, |conn| {
            sqlx::query(
                "UPDATE partners SET name = ?, logo = ?, description = ?, updated_on = ? WHERE id = ?",
            )
            .bind(&input.name)
            .bind(&input.logo)
            .bind(&input.description)
            .bind(Utc::now())
            .bind(id)
            .execute(conn)
            .await
            .context("Failed to update partner")?
            .rows_affected()
        });
        if affected == 0 {
            return Ok(None);
        }
        self.get_partner(id).await
    }

    async fn delete_partner(&self, id: i64) -> Result<bool> {
        delete_by_id(&self.pool, "partners", id).await
    }

    async fn create_ad_section(&self, input: &AdSectionInput) -> Result<AdSection> {
        let now = Utc::now();
        let id = with_pool!(self.pool, |conn| {
            sqlx::query(
                "INSERT INTO ad_sections (name, script, location, created_on, updated_on) VALUES (?, ?, ?, ?, ?)",
            )
            .bind(&input.name)
            .bind(&input.script)
            .bind(&input.location)
            .bind(now)
            .bind(now)
            .execute(conn)
            .await
            .context("Failed to insert ad section")?
            .inserted_id()
        });
        fetch_created(self.get_ad_section(id).await?, "ad section", id)
    }

    async fn get_ad_section(&self, id: i64) -> Result<Option<AdSection>> {
        find_by_id(&self.pool, "ad_sections", id).await
    }

    async fn list_ad_sections(&self) -> Result<Vec<AdSection>> {
        list_all(&self.pool, "ad_sections", "name, id").await
    }

    async fn update_ad_section(
        &self,
        id: i64,
        input: &AdSectionInput,
    ) -> Result<Option<AdSection>> {
        let affected = with_pool!(self.pool, |conn| {
            sqlx::query(
                "UPDATE ad_sections SET name = ?, script = ?, location = ?, updated_on = ? WHERE id = ?",
            )
            .bind(&input.name)
            .bind(&input.script)
            .bind(&input.location)
            .bind(Utc::now())
            .bind(id)
            .execute(conn)
            .await
            .context("Failed to update ad section")?
            .rows_affected()
        });
        if affected == 0 {
            return Ok(None);
        }
        self.get_ad_section(id).await
    }

    async fn delete_ad_section(&self, id: i64) -> Result<bool> {
        delete_by_id(&self.pool, "ad_sections", id).await
    }

    async fn create_campaign(&self, input: &CampaignInput) -> Result<Campaign> {
        let now = Utc::now();
        let id = with_pool!(self.pool, |conn| {
            sqlx::query(
                "INSERT INTO campaigns (name, start_date, created_on, updated_on) VALUES (?, ?, ?, ?)",
            )
            .bind(&input.name)
            .bind(now)
            .bind(now)
            .bind(now)
            .execute(conn)
            .await
            .context("Failed to insert campaign")?
            .inserted_id()
        });
        fetch_created(self.get_campaign(id).await?, "campaign", id)
    }

    async fn get_campaign(&self, id: i64) -> Result<Option<Campaign>> {
        find_by_id(&self.pool, "campaigns", id).await
    }

    async fn list_campaigns(&self) -> Result<Vec<Campaign>> {
        list_all(&self.pool, "campaigns", "start_date DESC, id DESC").await
    }

    async fn update_campaign(&self, id: i64, input: &CampaignInput) -> Result<Option<Campaign>> {
        let affected = with_pool!(self.pool, |conn| {
            sqlx::query("UPDATE campaigns SET name = ?, updated_on = ? WHERE id = ?")
                .bind(&input.name)
                .bind(Utc::now())
                .bind(id)
                .execute(conn)
                .await
                .context("Failed to update campaign")?
                .rows_affected()
        });
        if affected == 0 {
            return Ok(None);
        }
        self.get_campaign(id).await
    }

    async fn delete_campaign(&self, id: i64) -> Result<bool> {
        delete_by_id(&self.pool, "campaigns", id).await
    }

    async fn create_sponsor(&self, input: &SponsorInput) -> Result<Sponsor> {
        let now = Utc::now();
        let id = with_pool!(self.pool, |conn| {
            sqlx::query(
                "INSERT INTO sponsors (name, external_link, created_on, updated_on) VALUES (?, ?, ?, ?)",
            )
            .bind(&input.name)
            .bind(&input.external_link)
            .bind(now)
            .bind(now)
            .execute(conn)
            .await
            .context("Failed to insert sponsor")?
            .inserted_id()
        });
        fetch_created(self.get_sponsor(id).await?, "sponsor", id)
    }

    async fn get_sponsor(&self, id: i64) -> Result<Option<Sponsor>> {
        find_by_id(&self.pool, "sponsors", id).await
    }

    async fn list_sponsors(&self) -> Result<Vec<Sponsor>> {
        list_all(&self.pool, "sponsors", "name, id").await
    }

    async fn update_sponsor(&self, id: i64, input: &SponsorInput) -> Result<Option<Sponsor>> {
        let affected = with_pool!(self.pool, |conn| {
            sqlx::query("UPDATE sponsors SET name = ?, external_link = ?, updated_on = ? WHERE id = ?")
                .bind(&input.name)
                .bind(&input.external_link)
                .bind(Utc::now())
                .bind(id)
                .execute(conn)
                .await
                .context("Failed to update sponsor")?
                .rows_affected()
        });
        if affected == 0 {
            return Ok(None);
        }
        self.get_sponsor(id).await
    }

    async fn set_sponsor_logo(&self, id: i64, logo: Option<&str>) -> Result<Option<Sponsor>> {
        let affected = with_pool!(self.pool, |conn| {
            sqlx::query("UPDATE sponsors SET logo = ?, updated_on = ? WHERE id = ?")
                .bind(logo)
                .bind(Utc::now())
                .bind(id)
                .execute(conn)
                .await
                .context("Failed to set sponsor logo")?
                .rows_affected()
        });
        if affected == 0 {
            return Ok(None);
        }
        self.get_sponsor(id).await
    }

    async fn delete_sponsor(&self, id: i64) -> Result<bool> {
        delete_by_id(&self.pool, "sponsors", id).await
    }
}
