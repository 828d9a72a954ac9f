//! Article service
//!
//! Fills configured defaults into new articles, checks every referenced row
//! exists, keeps slugs unique and maintains the many-to-many relations.

use std::sync::Arc;

use super::{ensure_exist, ServiceError, ServiceResult};
use crate::config::ContentDefaults;
use crate::db::repositories::template_content::target_table;
use crate::db::repositories::{Counter, PublishingStateRepository, TemplateContentRepository};
use crate::models::{
    ContentFilter, ContentRelation, FieldError, ListParams, PagedResult, TemplateContent,
    TemplateContentDetail, TemplateContentInput,
};

/// Single-row references of an article: field, table, entity
const REFERENCES: &[(&str, &str, &str)] = &[
    ("content_provider_id", "content_providers", "ContentProvider"),
    ("content_partner_id", "partners", "Partner"),
    ("country_id", "countries", "Country"),
    ("state_id", "states", "State"),
    ("city_id", "cities", "City"),
    ("sponsor_id", "sponsors", "Sponsor"),
];

pub struct TemplateContentService {
    repo: Arc<dyn TemplateContentRepository>,
    publishing: Arc<dyn PublishingStateRepository>,
    defaults: ContentDefaults,
}

impl TemplateContentService {
    pub fn new(
        repo: Arc<dyn TemplateContentRepository>,
        publishing: Arc<dyn PublishingStateRepository>,
        defaults: ContentDefaults,
    ) -> Self {
        Self {
            repo,
            publishing,
            defaults,
        }
    }

    /// Normalize, validate and fill defaults
    fn prepare(&self, input: TemplateContentInput) -> ServiceResult<TemplateContentInput> {
        let mut input = input.normalized();
        input.validate()?;

        let defaults = &self.defaults;
        input.template = input.template_choice()?.map(|t| t.as_str().to_string());
        input.content_url.get_or_insert_with(|| defaults.content_url.clone());
        input.content_byline.get_or_insert_with(|| defaults.byline.clone());
        input
            .content_byline_link
            .get_or_insert_with(|| defaults.byline_link.clone());
        input.content_body.get_or_insert_with(|| defaults.body.clone());
        input
            .content_synopsis
            .get_or_insert_with(|| defaults.synopsis.clone());
        input.search_boost.get_or_insert(0);
        Ok(input)
    }

    async fn check_references(&self, input: &TemplateContentInput, own_id: Option<i64>) -> ServiceResult<()> {
        let ids = [
            input.content_provider_id,
            input.content_partner_id,
            input.country_id,
            input.state_id,
            input.city_id,
            input.sponsor_id,
        ];
        for (&(field, table, entity), id) in REFERENCES.iter().zip(ids) {
            if let Some(id) = id {
                ensure_exist(field, entity, self.repo.missing(table, &[id]).await?)?;
            }
        }

        for (relation, targets) in input.relations() {
            self.check_relation(relation, targets, own_id).await?;
        }

        if let Some(slug) = input.slug.as_deref() {
            if self.repo.slug_taken(slug, own_id).await? {
                return Err(ServiceError::Conflict(format!(
                    "Article with this slug already exists: {}",
                    slug
                )));
            }
        }
        Ok(())
    }

    async fn check_relation(
        &self,
        relation: ContentRelation,
        targets: &[i64],
        own_id: Option<i64>,
    ) -> ServiceResult<()> {
        if relation.is_self_referential() {
            if let Some(own_id) = own_id.filter(|id| targets.contains(id)) {
                return Err(FieldError::new(
                    relation.as_str(),
                    format!("Article {} cannot link to itself", own_id),
                )
                .into());
            }
        }
        let entity = if relation.is_self_referential() {
            "TemplateContent"
        } else {
            match relation {
                ContentRelation::AssetAssociations => "AssetAssociation",
                ContentRelation::RelatedAds => "AdSection",
                _ => "Campaign",
            }
        };
        let missing = self.repo.missing(target_table(relation), targets).await?;
        ensure_exist(relation.as_str(), entity, missing)
    }

    pub async fn create(&self, input: TemplateContentInput) -> ServiceResult<TemplateContent> {
        let mut input = self.prepare(input)?;
        input.likes.get_or_insert(0);
        input.views.get_or_insert(0);
        self.check_references(&input, None).await?;

        let content = self
            .repo
            .create(&input)
            .await
            .map_err(|e| ServiceError::from_write(e, "Article"))?;
        tracing::info!("Created article {} ({})", content.id, content);
        Ok(content)
    }

    pub async fn get(&self, id: i64) -> ServiceResult<TemplateContent> {
        self.repo
            .get_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("TemplateContent", id))
    }

    pub async fn get_by_slug(&self, slug: &str) -> ServiceResult<TemplateContent> {
        self.repo
            .get_by_slug(slug)
            .await?
            .ok_or_else(|| ServiceError::not_found("TemplateContent", slug))
    }

    /// Article with every relation id list and its publishing state
    pub async fn detail(&self, id: i64) -> ServiceResult<TemplateContentDetail> {
        let content = self.get(id).await?;
        Ok(TemplateContentDetail {
            secondary_navigation: self
                .repo
                .list_relation(id, ContentRelation::SecondaryNavigation)
                .await?,
            related_articles: self
                .repo
                .list_relation(id, ContentRelation::RelatedArticles)
                .await?,
            asset_associations: self
                .repo
                .list_relation(id, ContentRelation::AssetAssociations)
                .await?,
            related_ads: self.repo.list_relation(id, ContentRelation::RelatedAds).await?,
            campaigns: self.repo.list_relation(id, ContentRelation::Campaigns).await?,
            publishing_state: self.publishing.get_for_content(id).await?,
            content,
        })
    }

    /// Full replacement of scalar fields; relation lists only when supplied.
    /// Omitted counters keep their stored values.
    pub async fn update(&self, id: i64, input: TemplateContentInput) -> ServiceResult<TemplateContent> {
        let existing = self.get(id).await?;
        let mut input = self.prepare(input)?;
        input.likes = input.likes.or(existing.likes);
        input.views = input.views.or(existing.views);
        self.check_references(&input, Some(id)).await?;

        let content = self
            .repo
            .update(id, &input)
            .await
            .map_err(|e| ServiceError::from_write(e, "Article"))?
            .ok_or_else(|| ServiceError::not_found("TemplateContent", id))?;
        Ok(content)
    }

    pub async fn delete(&self, id: i64) -> ServiceResult<()> {
        if !self.repo.delete(id).await? {
            return Err(ServiceError::not_found("TemplateContent", id));
        }
        tracing::info!("Deleted article {}", id);
        Ok(())
    }

    pub async fn list(
        &self,
        filter: &ContentFilter,
        params: &ListParams,
    ) -> ServiceResult<PagedResult<TemplateContent>> {
        let (items, total) = self.repo.list(filter, params).await?;
        Ok(PagedResult::new(items, total, params))
    }

    pub async fn search(&self, keyword: &str, params: &ListParams) -> ServiceResult<PagedResult<TemplateContent>> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return Err(FieldError::new("q", "This field is required").into());
        }
        let (items, total) = self.repo.search(keyword, params).await?;
        Ok(PagedResult::new(items, total, params))
    }

    pub async fn set_relation(
        &self,
        id: i64,
        relation: ContentRelation,
        targets: &[i64],
    ) -> ServiceResult<Vec<i64>> {
        self.get(id).await?;
        self.check_relation(relation, targets, Some(id)).await?;
        self.repo.set_relation(id, relation, targets).await?;
        Ok(self.repo.list_relation(id, relation).await?)
    }

    pub async fn list_relation(&self, id: i64, relation: ContentRelation) -> ServiceResult<Vec<i64>> {
        self.get(id).await?;
        Ok(self.repo.list_relation(id, relation).await?)
    }

    /// Articles that list `id` under `relation`
    pub async fn referencing(&self, id: i64, relation: ContentRelation) -> ServiceResult<Vec<i64>> {
        Ok(self.repo.referencing(relation, id).await?)
    }

    pub async fn record_view(&self, id: i64) -> ServiceResult<i32> {
        self.bump(id, Counter::Views).await
    }

    pub async fn record_like(&self, id: i64) -> ServiceResult<i32> {
        self.bump(id, Counter::Likes).await
    }

    async fn bump(&self, id: i64, counter: Counter) -> ServiceResult<i32> {
        self.repo
            .increment(id, counter)
            .await?
            .ok_or_else(|| ServiceError::not_found("TemplateContent", id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{
        ReferenceRepository, SqlxPublishingStateRepository, SqlxReferenceRepository,
        SqlxTemplateContentRepository,
    };
    use crate::db::{create_test_pool, migrations::run_migrations, DynDatabasePool};
    use crate::models::{CampaignInput, PublishState, PublishingStateInput, Template};

    async fn service() -> (DynDatabasePool, TemplateContentService) {
        let pool = create_test_pool().await.unwrap();
        run_migrations(&pool).await.unwrap();
        let service = TemplateContentService::new(
            SqlxTemplateContentRepository::boxed(pool.clone()),
            SqlxPublishingStateRepository::boxed(pool.clone()),
            ContentDefaults::default(),
        );
        (pool, service)
    }

    #[tokio::test]
    async fn test_create_fills_defaults() {
        let (_, articles) = service().await;
        let created = articles
            .create(TemplateContentInput::new("  Monsoon drive  "))
            .await
            .unwrap();

        assert_eq!(created.content_heading, "Monsoon drive");
        assert_eq!(created.content_url, "http://bainslabs.in");
        assert_eq!(created.content_byline, "Byline Goes here");
        assert_eq!(created.content_byline_link, "http://bainslabs.in/");
        assert_eq!(created.content_body, "article body");
        assert_eq!(created.content_synopsis.as_deref(), Some("article synopsis"));
        assert_eq!(created.search_boost, Some(0));
        assert_eq!(created.likes, Some(0));
        assert_eq!(created.views, Some(0));
        assert_eq!(created.template, None);
        assert_eq!(created.slug, None);
    }

    #[tokio::test]
    async fn test_blank_url_kept_and_template_parsed() {
        let (_, articles) = service().await;
        let created = articles
            .create(TemplateContentInput {
                content_url: Some(String::new()),
                template: Some(" Editorial Template ".into()),
                ..TemplateContentInput::new("Review")
            })
            .await
            .unwrap();
        assert_eq!(created.content_url, "");
        assert_eq!(created.template, Some(Template::Editorial));

        let err = articles
            .create(TemplateContentInput {
                template: Some("Gallery".into()),
                ..TemplateContentInput::new("Review")
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(ref e) if e.field == "template"));
    }

    #[tokio::test]
    async fn test_references_must_exist() {
        let (_, articles) = service().await;
        let err = articles
            .create(TemplateContentInput {
                sponsor_id: Some(3),
                ..TemplateContentInput::new("Sponsored")
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidReference { field: "sponsor_id", .. }));

        let err = articles
            .create(TemplateContentInput {
                campaigns: Some(vec![1]),
                ..TemplateContentInput::new("Campaign")
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidReference { field: "campaigns", .. }));
    }

    #[tokio::test]
    async fn test_slug_unique() {
        let (_, articles) = service().await;
        let first = articles
            .create(TemplateContentInput {
                slug: Some("first-drive".into()),
                ..TemplateContentInput::new("First")
            })
            .await
            .unwrap();
        let err = articles
            .create(TemplateContentInput {
                slug: Some("first-drive".into()),
                ..TemplateContentInput::new("Second")
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));

        // keeping its own slug is fine
        articles
            .update(
                first.id,
                TemplateContentInput {
                    slug: Some("first-drive".into()),
                    ..TemplateContentInput::new("First, revised")
                },
            )
            .await
            .unwrap();
        assert_eq!(articles.get_by_slug("first-drive").await.unwrap().id, first.id);
    }

    #[tokio::test]
    async fn test_relations_and_detail() {
        let (pool, articles) = service().await;
        let campaign = SqlxReferenceRepository::new(pool.clone())
            .create_campaign(&CampaignInput { name: "Launch".into() })
            .await
            .unwrap();
        let a = articles.create(TemplateContentInput::new("A")).await.unwrap();
        let b = articles.create(TemplateContentInput::new("B")).await.unwrap();

        let c = articles
            .create(TemplateContentInput {
                related_articles: Some(vec![a.id, b.id]),
                campaigns: Some(vec![campaign.id]),
                ..TemplateContentInput::new("C")
            })
            .await
            .unwrap();

        let detail = articles.detail(c.id).await.unwrap();
        assert_eq!(detail.related_articles, vec![a.id, b.id]);
        assert_eq!(detail.campaigns, vec![campaign.id]);
        assert!(detail.secondary_navigation.is_empty());
        assert!(detail.publishing_state.is_none());

        // update without relation lists leaves them
        articles.update(c.id, TemplateContentInput::new("C2")).await.unwrap();
        assert_eq!(
            articles.list_relation(c.id, ContentRelation::RelatedArticles).await.unwrap(),
            vec![a.id, b.id]
        );
        assert_eq!(
            articles.referencing(a.id, ContentRelation::RelatedArticles).await.unwrap(),
            vec![c.id]
        );

        let err = articles
            .set_relation(c.id, ContentRelation::SecondaryNavigation, &[a.id, c.id])
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(ref e) if e.field == "secondary_navigation"));

        let nav = articles
            .set_relation(c.id, ContentRelation::SecondaryNavigation, &[b.id])
            .await
            .unwrap();
        assert_eq!(nav, vec![b.id]);
    }

    #[tokio::test]
    async fn test_update_rejects_self_link() {
        let (_, articles) = service().await;
        let a = articles.create(TemplateContentInput::new("A")).await.unwrap();
        let err = articles
            .update(
                a.id,
                TemplateContentInput {
                    related_articles: Some(vec![a.id]),
                    ..TemplateContentInput::new("A")
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn test_delete_removes_publishing_state() {
        let (pool, articles) = service().await;
        let a = articles.create(TemplateContentInput::new("A")).await.unwrap();
        let states = SqlxPublishingStateRepository::new(pool);
        states
            .upsert(
                a.id,
                &PublishingStateInput {
                    publish_state: Some(PublishState::Published),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        articles.delete(a.id).await.unwrap();
        assert!(states.get_for_content(a.id).await.unwrap().is_none());
        assert!(matches!(articles.delete(a.id).await, Err(ServiceError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_counters() {
        let (_, articles) = service().await;
        let a = articles.create(TemplateContentInput::new("A")).await.unwrap();
        assert_eq!(articles.record_view(a.id).await.unwrap(), 1);
        assert_eq!(articles.record_view(a.id).await.unwrap(), 2);
        assert_eq!(articles.record_like(a.id).await.unwrap(), 1);
        assert!(matches!(
            articles.record_like(a.id + 100).await,
            Err(ServiceError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_update_keeps_counters() {
        let (_, articles) = service().await;
        let a = articles.create(TemplateContentInput::new("A")).await.unwrap();
        articles.record_view(a.id).await.unwrap();
        articles.record_view(a.id).await.unwrap();
        articles.record_like(a.id).await.unwrap();

        let updated = articles
            .update(a.id, TemplateContentInput::new("A revised"))
            .await
            .unwrap();
        assert_eq!(updated.content_heading, "A revised");
        assert_eq!(updated.views, Some(2));
        assert_eq!(updated.likes, Some(1));

        // explicit values still win
        let reset = articles
            .update(
                a.id,
                TemplateContentInput {
                    views: Some(0),
                    ..TemplateContentInput::new("A revised")
                },
            )
            .await
            .unwrap();
        assert_eq!(reset.views, Some(0));
        assert_eq!(reset.likes, Some(1));
    }

    #[tokio::test]
    async fn test_list_and_search() {
        let (_, articles) = service().await;
        for i in 0..3 {
            articles
                .create(TemplateContentInput {
                    homepage_availability: i > 0,
                    include_in_search: true,
                    search_keywords: Some(format!("road trip {}", i)),
                    ..TemplateContentInput::new(format!("Trip {}", i))
                })
                .await
                .unwrap();
        }

        let filter = ContentFilter {
            homepage_availability: Some(true),
            ..Default::default()
        };
        let page = articles.list(&filter, &ListParams::new(1, 1)).await.unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.items.len(), 1);
        assert!(page.has_next());

        let found = articles.search("road", &ListParams::default()).await.unwrap();
        assert_eq!(found.total, 3);
        assert!(matches!(
            articles.search("   ", &ListParams::default()).await,
            Err(ServiceError::Validation(_))
        ));
    }
}
