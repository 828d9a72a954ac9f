//! Reference entity service
//!
//! Content providers, partners, ad sections, campaigns and sponsors. Lists
//! and single reads are cached under the `ref:` prefix.

use std::sync::Arc;

use super::media::{MediaKind, MediaStorage};
use super::{ReadCache, ServiceError, ServiceResult};
use crate::cache::Cache;
use crate::db::repositories::ReferenceRepository;
use crate::models::{
    AdSection, AdSectionInput, Campaign, CampaignInput, ContentProvider, ContentProviderInput,
    Partner, PartnerInput, Sponsor, SponsorInput,
};

const CACHE_PREFIX: &str = "ref:";

pub struct ReferenceService {
    repo: Arc<dyn ReferenceRepository>,
    media: Arc<MediaStorage>,
    reads: ReadCache,
}

/// create / get / list / update / delete for one reference entity
macro_rules! reference_crud {
    (
        $entity:literal, $key:literal, $ty:ty, $input:ty,
        $create:ident, $get:ident, $list:ident, $update:ident, $delete:ident
    ) => {
        reference_crud!($entity, $key, $ty, $input, $create, $get, $list, $update);

        pub async fn $delete(&self, id: i64) -> ServiceResult<()> {
            self.delete_row($entity, id, self.repo.$delete(id).await).await
        }
    };
    (
        $entity:literal, $key:literal, $ty:ty, $input:ty,
        $create:ident, $get:ident, $list:ident, $update:ident
    ) => {
        pub async fn $create(&self, input: $input) -> ServiceResult<$ty> {
            let input = input.normalized();
            input.validate()?;
            let created = self.repo.$create(&input).await?;
            self.reads.invalidate().await;
            tracing::info!("Created {} {} ({})", $entity, created.id, created);
            Ok(created)
        }

        pub async fn $get(&self, id: i64) -> ServiceResult<$ty> {
            let repo = &self.repo;
            self.reads
                .get_or_load(&format!("{}:{}", $key, id), || repo.$get(id))
                .await?
                .ok_or_else(|| ServiceError::not_found($entity, id))
        }

        pub async fn $list(&self) -> ServiceResult<Vec<$ty>> {
            let repo = &self.repo;
            Ok(self
                .reads
                .get_or_load(concat!($key, ":list"), || repo.$list())
                .await?)
        }

        pub async fn $update(&self, id: i64, input: $input) -> ServiceResult<$ty> {
            let input = input.normalized();
            input.validate()?;
            let updated = self
                .repo
                .$update(id, &input)
                .await?
                .ok_or_else(|| ServiceError::not_found($entity, id))?;
            self.reads.invalidate().await;
            Ok(updated)
        }
    };
}

impl ReferenceService {
    pub fn new(repo: Arc<dyn ReferenceRepository>, cache: Arc<Cache>, media: Arc<MediaStorage>) -> Self {
        Self {
            repo,
            media,
            reads: ReadCache::new(cache, CACHE_PREFIX),
        }
    }

    reference_crud!(
        "ContentProvider", "provider", ContentProvider, ContentProviderInput,
        create_provider, get_provider, list_providers, update_provider, delete_provider
    );

    reference_crud!(
        "Partner", "partner", Partner, PartnerInput,
        create_partner, get_partner, list_partners, update_partner, delete_partner
    );

    reference_crud!(
        "AdSection", "ad_section", AdSection, AdSectionInput,
        create_ad_section, get_ad_section, list_ad_sections, update_ad_section, delete_ad_section
    );

    reference_crud!(
        "Campaign", "campaign", Campaign, CampaignInput,
        create_campaign, get_campaign, list_campaigns, update_campaign, delete_campaign
    );

    reference_crud!(
        "Sponsor", "sponsor", Sponsor, SponsorInput,
        create_sponsor, get_sponsor, list_sponsors, update_sponsor
    );

    async fn delete_row(
        &self,
        entity: &'static str,
        id: i64,
        result: anyhow::Result<bool>,
    ) -> ServiceResult<()> {
        let deleted =
            result.map_err(|e| ServiceError::from_write(e, &format!("{} {}", entity, id)))?;
        if !deleted {
            return Err(ServiceError::not_found(entity, id));
        }
        self.reads.invalidate().await;
        tracing::info!("Deleted {} {}", entity, id);
        Ok(())
    }

    /// Delete a sponsor and its logo file
    pub async fn delete_sponsor(&self, id: i64) -> ServiceResult<()> {
        let logo = self.get_sponsor(id).await?.logo;
        self.delete_row("Sponsor", id, self.repo.delete_sponsor(id).await)
            .await?;
        if let Some(logo) = logo {
            self.media.remove(&logo).await;
        }
        Ok(())
    }

    /// Store a new logo for the sponsor, replacing any previous file
    pub async fn upload_sponsor_logo(&self, id: i64, filename: &str, data: &[u8]) -> ServiceResult<Sponsor> {
        let previous = self.get_sponsor(id).await?.logo;
        let stored = self.media.store(MediaKind::SponsorLogo, filename, data).await?;

        let sponsor = match self.repo.set_sponsor_logo(id, Some(&stored.path)).await {
            Ok(Some(sponsor)) => sponsor,
            Ok(None) => {
                self.media.remove(&stored.path).await;
                return Err(ServiceError::not_found("Sponsor", id));
            }
            Err(e) => {
                self.media.remove(&stored.path).await;
                return Err(e.into());
            }
        };
        self.reads.invalidate().await;

        if let Some(previous) = previous {
            self.media.remove(&previous).await;
        }
        tracing::info!("Sponsor {} logo set to {}", id, stored.path);
        Ok(sponsor)
    }
}
