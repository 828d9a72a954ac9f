//! Template content (article) repository
//!
//! Stores articles, their many-to-many relations, counters and the
//! filtered / searched listings. Inputs reaching this layer already carry
//! resolved defaults.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

use super::geo::fetch_created;
use super::{dedup, find_by_id, list_links, list_owners, missing_ids, set_links, LinkTable};
use crate::db::{DynDatabasePool, InsertedId};
use crate::models::{ContentFilter, ContentRelation, ListParams, TemplateContent, TemplateContentInput};

const CONTENT_COLUMNS: &[&str] = &[
    "content_heading",
    "content_subheading",
    "content_url",
    "content_byline",
    "content_byline_link",
    "content_body",
    "content_synopsis",
    "content_provider_id",
    "disable_ads",
    "content_partner_id",
    "content_received_date",
    "search_keywords",
    "search_boost",
    "include_in_search",
    "guid",
    "seo_meta_name",
    "seo_keywords",
    "seo_meta_description",
    "template",
    "preview_path",
    "country_id",
    "state_id",
    "city_id",
    "sponsor_id",
    "is_timely_content",
    "available_in_trends",
    "disable_personalization",
    "is_promoted_content",
    "homepage_availability",
    "year",
    "manufacturer",
    "make",
    "make_model",
    "likes",
    "views",
    "slug",
    "is_featured",
    "template_configuration",
];

/// Bind every column of `CONTENT_COLUMNS`, in order.
macro_rules! bind_content {
    ($query:expr, $input:expr) => {{
        let input: &TemplateContentInput = $input;
        $query
            .bind(&input.content_heading)
            .bind(&input.content_subheading)
            .bind(input.content_url.as_deref().unwrap_or_default())
            .bind(input.content_byline.as_deref().unwrap_or_default())
            .bind(input.content_byline_link.as_deref().unwrap_or_default())
            .bind(input.content_body.as_deref().unwrap_or_default())
            .bind(&input.content_synopsis)
            .bind(input.content_provider_id)
            .bind(input.disable_ads)
            .bind(input.content_partner_id)
            .bind(input.content_received_date)
            .bind(&input.search_keywords)
            .bind(input.search_boost)
            .bind(input.include_in_search)
            .bind(&input.guid)
            .bind(&input.seo_meta_name)
            .bind(&input.seo_keywords)
            .bind(&input.seo_meta_description)
            .bind(&input.template)
            .bind(&input.preview_path)
            .bind(input.country_id)
            .bind(input.state_id)
            .bind(input.city_id)
            .bind(input.sponsor_id)
            .bind(input.is_timely_content)
            .bind(input.available_in_trends)
            .bind(input.disable_personalization)
            .bind(input.is_promoted_content)
            .bind(input.homepage_availability)
            .bind(input.year)
            .bind(&input.manufacturer)
            .bind(&input.make)
            .bind(&input.make_model)
            .bind(input.likes)
            .bind(input.views)
            .bind(&input.slug)
            .bind(input.is_featured)
            .bind(&input.template_configuration)
    }};
}

/// Replace the links of `owner` for each prepared relation, inside `tx`.
macro_rules! replace_relations {
    ($tx:ident, $owner:expr, $writes:expr) => {
        for write in $writes {
            sqlx::query(&write.clear)
                .bind($owner)
                .execute(&mut *$tx)
                .await
                .with_context(|| format!("Failed to clear {}", write.link.table))?;
            for target in &write.targets {
                sqlx::query(&write.insert)
                    .bind($owner)
                    .bind(*target)
                    .execute(&mut *$tx)
                    .await
                    .with_context(|| format!("Failed to link {} -> {}", write.link.table, target))?;
            }
        }
    };
}

/// A relation list supplied with an article write
struct RelationWrite {
    link: LinkTable,
    clear: String,
    insert: String,
    targets: Vec<i64>,
}

fn relation_writes(input: &TemplateContentInput) -> Vec<RelationWrite> {
    input
        .relations()
        .into_iter()
        .map(|(relation, targets)| {
            let link = link_table(relation);
            RelationWrite {
                link,
                clear: link.clear_sql(),
                insert: link.insert_sql(),
                targets: dedup(targets),
            }
        })
        .collect()
}

/// Join table backing each relation
pub fn link_table(relation: ContentRelation) -> LinkTable {
    match relation {
        ContentRelation::SecondaryNavigation => LinkTable {
            table: "template_content_secondary_navigation",
            owner: "from_content_id",
            target: "to_content_id",
        },
        ContentRelation::RelatedArticles => LinkTable {
            table: "template_content_related_articles",
            owner: "from_content_id",
            target: "to_content_id",
        },
        ContentRelation::AssetAssociations => LinkTable {
            table: "template_content_asset_associations",
            owner: "content_id",
            target: "asset_association_id",
        },
        ContentRelation::RelatedAds => LinkTable {
            table: "template_content_ads",
            owner: "content_id",
            target: "ad_section_id",
        },
        ContentRelation::Campaigns => LinkTable {
            table: "template_content_campaigns",
            owner: "content_id",
            target: "campaign_id",
        },
    }
}

/// Table the relation's targets live in
pub fn target_table(relation: ContentRelation) -> &'static str {
    match relation {
        ContentRelation::SecondaryNavigation | ContentRelation::RelatedArticles => {
            "template_contents"
        }
        ContentRelation::AssetAssociations => "asset_associations",
        ContentRelation::RelatedAds => "ad_sections",
        ContentRelation::Campaigns => "campaigns",
    }
}

/// Engagement counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Counter {
    Views,
    Likes,
}

impl Counter {
    fn column(&self) -> &'static str {
        match self {
            Counter::Views => "views",
            Counter::Likes => "likes",
        }
    }
}

#[async_trait]
pub trait TemplateContentRepository: Send + Sync {
    /// Insert the article and every supplied relation list in one transaction
    async fn create(&self, input: &TemplateContentInput) -> Result<TemplateContent>;
    async fn get_by_id(&self, id: i64) -> Result<Option<TemplateContent>>;
    async fn get_by_slug(&self, slug: &str) -> Result<Option<TemplateContent>>;
    /// Replace every scalar field and the supplied relation lists in one
    /// transaction; the publish date and omitted relations are kept
    async fn update(&self, id: i64, input: &TemplateContentInput) -> Result<Option<TemplateContent>>;
    /// Delete the article together with its publishing state
    async fn delete(&self, id: i64) -> Result<bool>;

    /// Newest first, with the total matching `filter`
    async fn list(
        &self,
        filter: &ContentFilter,
        params: &ListParams,
    ) -> Result<(Vec<TemplateContent>, i64)>;
    /// Searchable articles whose heading or keywords contain `keyword`
    async fn search(&self, keyword: &str, params: &ListParams)
        -> Result<(Vec<TemplateContent>, i64)>;

    /// Whether another article already uses `slug`
    async fn slug_taken(&self, slug: &str, except_id: Option<i64>) -> Result<bool>;

    /// Increment a counter, returning the new value
    async fn increment(&self, id: i64, counter: Counter) -> Result<Option<i32>>;

    async fn set_relation(&self, id: i64, relation: ContentRelation, targets: &[i64]) -> Result<()>;
    async fn list_relation(&self, id: i64, relation: ContentRelation) -> Result<Vec<i64>>;
    /// Articles whose `relation` includes `target`
    async fn referencing(&self, relation: ContentRelation, target: i64) -> Result<Vec<i64>>;

    /// Ids among `ids` that have no row in `table`
    async fn missing(&self, table: &'static str, ids: &[i64]) -> Result<Vec<i64>>;
}

pub struct SqlxTemplateContentRepository {
    pool: DynDatabasePool,
}

impl SqlxTemplateContentRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn TemplateContentRepository> {
        Arc::new(Self::new(pool))
    }
}

enum FilterValue {
    Bool(bool),
    Int(i64),
    Text(&'static str),
}

fn filter_clause(filter: &ContentFilter) -> (String, Vec<FilterValue>) {
    let mut conditions = Vec::new();
    let mut values = Vec::new();

    let flags = [
        ("homepage_availability", filter.homepage_availability),
        ("is_featured", filter.is_featured),
        ("is_promoted_content", filter.is_promoted_content),
        ("available_in_trends", filter.available_in_trends),
    ];
    for (column, flag) in flags {
        if let Some(flag) = flag {
            conditions.push(format!("{} = ?", column));
            values.push(FilterValue::Bool(flag));
        }
    }

    let references = [
        ("country_id", filter.country_id),
        ("state_id", filter.state_id),
        ("city_id", filter.city_id),
        ("sponsor_id", filter.sponsor_id),
        ("content_partner_id", filter.partner_id),
        ("content_provider_id", filter.provider_id),
    ];
    for (column, id) in references {
        if let Some(id) = id {
            conditions.push(format!("{} = ?", column));
            values.push(FilterValue::Int(id));
        }
    }

    if let Some(template) = filter.template {
        conditions.push("template = ?".to_string());
        values.push(FilterValue::Text(template.as_str()));
    }

    let clause = if conditions.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conditions.join(" AND "))
    };
    (clause, values)
}

/// LIKE pattern matching `keyword` anywhere, with `!` as escape character
fn contains_pattern(keyword: &str) -> String {
    let mut pattern = String::with_capacity(keyword.len() + 2);
    pattern.push('%');
    for c in keyword.to_lowercase().chars() {
        if matches!(c, '!' | '%' | '_') {
            pattern.push('!');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[async_trait]
impl TemplateContentRepository for SqlxTemplateContentRepository {
    async fn create(&self, input: &TemplateContentInput) -> Result<TemplateContent> {
        let now = Utc::now();
        let sql = format!(
            "INSERT INTO template_contents ({}, content_publish_date, created_on, updated_on) VALUES ({}, ?, ?, ?)",
            CONTENT_COLUMNS.join(", "),
            vec!["?"; CONTENT_COLUMNS.len()].join(", ")
        );
        let writes = relation_writes(input);
        let id = with_pool!(self.pool, |conn| {
            let mut tx = conn.begin().await?;
            let id = bind_content!(sqlx::query(&sql), input)
                .bind(now)
                .bind(now)
                .bind(now)
                .execute(&mut *tx)
                .await
                .context("Failed to insert template content")?
                .inserted_id();
            replace_relations!(tx, id, &writes);
            tx.commit().await?;
            id
        });
        fetch_created(self.get_by_id(id).await?, "template content", id)
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<TemplateContent>> {
        find_by_id(&self.pool, "template_contents", id).await
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<TemplateContent>> {
        with_pool!(self.pool, |conn| {
            sqlx::query_as::<_, TemplateContent>("SELECT * FROM template_contents WHERE slug = ?")
                .bind(slug)
                .fetch_optional(conn)
                .await
                .context("Failed to load template content by slug")
        })
    }

    async fn update(&self, id: i64, input: &TemplateContentInput) -> Result<Option<TemplateContent>> {
        let assignments: Vec<String> = CONTENT_COLUMNS
            .iter()
            .map(|column| format!("{} = ?", column))
            .collect();
        let sql = format!(
            "UPDATE template_contents SET {}, updated_on = ? WHERE id = ?",
            assignments.join(", ")
        );
        let writes = relation_writes(input);
        with_pool!(self.pool, |conn| {
            let mut tx = conn.begin().await?;
            let affected = bind_content!(sqlx::query(&sql), input)
                .bind(Utc::now())
                .bind(id)
                .execute(&mut *tx)
                .await
                .context("Failed to update template content")?
                .rows_affected();
            if affected == 0 {
                return Ok(None);
            }
            replace_relations!(tx, id, &writes);
            tx.commit().await?;
        });
        self.get_by_id(id).await
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let affected = with_pool!(self.pool, |conn| {
            let mut tx = conn.begin().await?;
            sqlx::query("DELETE FROM publishing_states WHERE content_id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await
                .context("Failed to delete publishing state")?;
            let affected = sqlx::query("DELETE FROM template_contents WHERE id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await
                .context("Failed to delete template content")?
                .rows_affected();
            tx.commit().await?;
            affected
        });
        Ok(affected > 0)
    }

    async fn list(
        &self,
        filter: &ContentFilter,
        params: &ListParams,
    ) -> Result<(Vec<TemplateContent>, i64)> {
        let (clause, values) = filter_clause(filter);
        let select = format!(
            "SELECT * FROM template_contents{} ORDER BY content_publish_date DESC, id DESC LIMIT ? OFFSET ?",
            clause
        );
        let count = format!("SELECT COUNT(*) FROM template_contents{}", clause);

        with_pool!(self.pool, |conn| {
            let mut query = sqlx::query_as::<_, TemplateContent>(&select);
            let mut count_query = sqlx::query_scalar::<_, i64>(&count);
            for value in &values {
                query = match value {
                    FilterValue::Bool(v) => query.bind(*v),
                    FilterValue::Int(v) => query.bind(*v),
                    FilterValue::Text(v) => query.bind(*v),
                };
                count_query = match value {
                    FilterValue::Bool(v) => count_query.bind(*v),
                    FilterValue::Int(v) => count_query.bind(*v),
                    FilterValue::Text(v) => count_query.bind(*v),
                };
            }
            let items = query
                .bind(params.limit())
                .bind(params.offset())
                .fetch_all(conn)
                .await
                .context("Failed to list template contents")?;
            let total = count_query
                .fetch_one(conn)
                .await
                .context("Failed to count template contents")?;
            Ok((items, total))
        })
    }

    async fn search(
        &self,
        keyword: &str,
        params: &ListParams,
    ) -> Result<(Vec<TemplateContent>, i64)> {
        const MATCH: &str = "include_in_search = ? AND (LOWER(content_heading) LIKE ? ESCAPE '!' OR LOWER(COALESCE(search_keywords, '')) LIKE ? ESCAPE '!')";
        let select = format!(
            "SELECT * FROM template_contents WHERE {} ORDER BY COALESCE(search_boost, 0) DESC, content_publish_date DESC, id DESC LIMIT ? OFFSET ?",
            MATCH
        );
        let count = format!("SELECT COUNT(*) FROM template_contents WHERE {}", MATCH);
        let pattern = contains_pattern(keyword.trim());

        with_pool!(self.pool, |conn| {
            let items = sqlx::query_as::<_, TemplateContent>(&select)
                .bind(true)
                .bind(&pattern)
                .bind(&pattern)
                .bind(params.limit())
                .bind(params.offset())
                .fetch_all(conn)
                .await
                .context("Failed to search template contents")?;
            let total = sqlx::query_scalar::<_, i64>(&count)
                .bind(true)
                .bind(&pattern)
                .bind(&pattern)
                .fetch_one(conn)
                .await
                .context("Failed to count search results")?;
            Ok((items, total))
        })
    }

    async fn slug_taken(&self, slug: &str, except_id: Option<i64>) -> Result<bool> {
        let count = with_pool!(self.pool, |conn| {
            sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM template_contents WHERE slug = ? AND id <> ?",
            )
            .bind(slug)
            .bind(except_id.unwrap_or(0))
            .fetch_one(conn)
            .await
            .context("Failed to check slug")?
        });
        Ok(count > 0)
    }

    async fn increment(&self, id: i64, counter: Counter) -> Result<Option<i32>> {
        let column = counter.column();
        let update = format!(
            "UPDATE template_contents SET {column} = COALESCE({column}, 0) + 1 WHERE id = ?",
            column = column
        );
        let select = format!("SELECT {} FROM template_contents WHERE id = ?", column);
        with_pool!(self.pool, |conn| {
            let affected = sqlx::query(&update)
                .bind(id)
                .execute(conn)
                .await
                .with_context(|| format!("Failed to increment {}", column))?
                .rows_affected();
            if affected == 0 {
                return Ok(None);
            }
            let value = sqlx::query_scalar::<_, Option<i32>>(&select)
                .bind(id)
                .fetch_one(conn)
                .await
                .with_context(|| format!("Failed to read {}", column))?;
            Ok(value)
        })
    }

    async fn set_relation(&self, id: i64, relation: ContentRelation, targets: &[i64]) -> Result<()> {
        set_links(&self.pool, link_table(relation), id, targets).await
    }

    async fn list_relation(&self, id: i64, relation: ContentRelation) -> Result<Vec<i64>> {
        list_links(&self.pool, link_table(relation), id).await
    }

    async fn referencing(&self, relation: ContentRelation, target: i64) -> Result<Vec<i64>> {
        list_owners(&self.pool, link_table(relation), target).await
    }

    async fn missing(&self, table: &'static str, ids: &[i64]) -> Result<Vec<i64>> {
        missing_ids(&self.pool, table, ids).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, is_unique_violation, migrations::run_migrations};
    use crate::models::Template;

    async fn repo() -> (DynDatabasePool, SqlxTemplateContentRepository) {
        let pool = create_test_pool().await.unwrap();
        run_migrations(&pool).await.unwrap();
        (pool.clone(), SqlxTemplateContentRepository::new(pool))
    }

    fn article(heading: &str) -> TemplateContentInput {
        TemplateContentInput {
            content_url: Some("http://bainslabs.in".into()),
            content_byline: Some("Byline Goes here".into()),
            content_byline_link: Some("http://bainslabs.in/".into()),
            content_body: Some("article body".into()),
            content_synopsis: Some("article synopsis".into()),
            search_boost: Some(0),
            likes: Some(0),
            views: Some(0),
            ..TemplateContentInput::new(heading)
        }
    }

    #[test]
    fn test_contains_pattern_escapes_wildcards() {
        assert_eq!(contains_pattern("Drive"), "%drive%");
        assert_eq!(contains_pattern("50%_off!"), "%50!%!_off!!%");
    }

    #[test]
    fn test_filter_clause() {
        let (clause, values) = filter_clause(&ContentFilter::default());
        assert!(clause.is_empty());
        assert!(values.is_empty());

        let filter = ContentFilter {
            is_featured: Some(true),
            country_id: Some(4),
            template: Some(Template::Editorial),
            ..Default::default()
        };
        let (clause, values) = filter_clause(&filter);
        assert_eq!(clause, " WHERE is_featured = ? AND country_id = ? AND template = ?");
        assert_eq!(values.len(), 3);
    }

    #[test]
    fn test_columns_cover_input() {
        assert_eq!(CONTENT_COLUMNS.len(), 38);
        for relation in ContentRelation::ALL {
            assert!(!CONTENT_COLUMNS.contains(&relation.as_str()));
        }
    }

    #[tokio::test]
    async fn test_create_and_read_back() {
        let (_, repo) = repo().await;
        let mut input = article("First Drive");
        input.template = Some("Vehicle Editorial Template".into());
        input.slug = Some("first-drive".into());
        input.year = Some(2024);

        let created = repo.create(&input).await.unwrap();
        assert_eq!(created.content_heading, "First Drive");
        assert_eq!(created.template, Some(Template::VehicleEditorial));
        assert_eq!(created.content_byline, "Byline Goes here");
        assert_eq!(created.likes, Some(0));
        assert_eq!(created.year, Some(2024));
        assert!(!created.is_featured);
        assert_eq!(created.content_publish_date, created.created_on);

        let by_slug = repo.get_by_slug("first-drive").await.unwrap().unwrap();
        assert_eq!(by_slug.id, created.id);
    }

    #[tokio::test]
    async fn test_update_keeps_publish_date() {
        let (_, repo) = repo().await;
        let created = repo.create(&article("Draft")).await.unwrap();

        let mut input = article("Final");
        input.is_featured = true;
        let updated = repo.update(created.id, &input).await.unwrap().unwrap();

        assert_eq!(updated.content_heading, "Final");
        assert!(updated.is_featured);
        assert_eq!(updated.content_publish_date, created.content_publish_date);
        assert!(repo.update(999, &input).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_with_bad_relation_leaves_nothing() {
        let (_, repo) = repo().await;
        let target = repo.create(&article("Target")).await.unwrap();

        let mut input = article("Orphan");
        input.related_articles = Some(vec![target.id]);
        input.campaigns = Some(vec![999]);
        assert!(repo.create(&input).await.is_err());

        let (items, total) = repo.list(&ContentFilter::default(), &ListParams::default()).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(items[0].id, target.id);
        assert!(repo
            .referencing(ContentRelation::RelatedArticles, target.id)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_update_with_bad_relation_rolls_back() {
        let (_, repo) = repo().await;
        let a = repo.create(&article("A")).await.unwrap();
        let b = repo.create(&article("B")).await.unwrap();

        let mut input = article("A changed");
        input.related_articles = Some(vec![b.id]);
        input.related_ads = Some(vec![42]);
        assert!(repo.update(a.id, &input).await.is_err());

        let stored = repo.get_by_id(a.id).await.unwrap().unwrap();
        assert_eq!(stored.content_heading, "A");
        assert!(repo
            .list_relation(a.id, ContentRelation::RelatedArticles)
            .await
            .unwrap()
            .is_empty());

        input.related_ads = None;
        let updated = repo.update(a.id, &input).await.unwrap().unwrap();
        assert_eq!(updated.content_heading, "A changed");
        assert_eq!(
            repo.list_relation(a.id, ContentRelation::RelatedArticles).await.unwrap(),
            vec![b.id]
        );
    }

    #[tokio::test]
    async fn test_duplicate_slug_rejected_by_index() {
        let (_, repo) = repo().await;
        let mut input = article("One");
        input.slug = Some("same".into());
        repo.create(&input).await.unwrap();

        assert!(repo.slug_taken("same", None).await.unwrap());
        let err = repo.create(&input).await.unwrap_err();
        assert!(is_unique_violation(&err));
    }

    #[tokio::test]
    async fn test_slug_taken_ignores_self() {
        let (_, repo) = repo().await;
        let mut input = article("One");
        input.slug = Some("mine".into());
        let created = repo.create(&input).await.unwrap();

        assert!(!repo.slug_taken("mine", Some(created.id)).await.unwrap());
        assert!(repo.slug_taken("mine", Some(created.id + 1)).await.unwrap());
        assert!(!repo.slug_taken("free", None).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_filters_and_paginates() {
        let (_, repo) = repo().await;
        for i in 0..5 {
            let mut input = article(&format!("Article {}", i));
            input.is_featured = i % 2 == 0;
            repo.create(&input).await.unwrap();
        }

        let filter = ContentFilter {
            is_featured: Some(true),
            ..Default::default()
        };
        let (items, total) = repo.list(&filter, &ListParams::new(1, 2)).await.unwrap();
        assert_eq!(total, 3);
        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|c| c.is_featured));
        // newest first
        assert_eq!(items[0].content_heading, "Article 4");

        let (items, total) = repo.list(&ContentFilter::default(), &ListParams::new(3, 2)).await.unwrap();
        assert_eq!(total, 5);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].content_heading, "Article 0");
    }

    #[tokio::test]
    async fn test_search_respects_flag_and_boost() {
        let (_, repo) = repo().await;

        let mut hidden = article("Monsoon drive");
        hidden.include_in_search = false;
        repo.create(&hidden).await.unwrap();

        let mut plain = article("Monsoon drive tips");
        plain.include_in_search = true;
        let plain = repo.create(&plain).await.unwrap();

        let mut boosted = article("Coastal roads");
        boosted.include_in_search = true;
        boosted.search_keywords = Some("monsoon, coast".into());
        boosted.search_boost = Some(10);
        let boosted = repo.create(&boosted).await.unwrap();

        let (items, total) = repo.search("MONSOON", &ListParams::default()).await.unwrap();
        assert_eq!(total, 2);
        let ids: Vec<i64> = items.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![boosted.id, plain.id]);

        let (items, _) = repo.search("100%", &ListParams::default()).await.unwrap();
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn test_increment_counts_null_as_zero() {
        let (pool, repo) = repo().await;
        let created = repo.create(&article("Counted")).await.unwrap();
        pool.execute(&format!("UPDATE template_contents SET views = NULL WHERE id = {}", created.id))
            .await
            .unwrap();

        assert_eq!(repo.increment(created.id, Counter::Views).await.unwrap(), Some(1));
        assert_eq!(repo.increment(created.id, Counter::Views).await.unwrap(), Some(2));
        assert_eq!(repo.increment(created.id, Counter::Likes).await.unwrap(), Some(1));
        assert_eq!(repo.increment(999, Counter::Likes).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_relations_and_delete() {
        let (pool, repo) = repo().await;
        let a = repo.create(&article("A")).await.unwrap();
        let b = repo.create(&article("B")).await.unwrap();
        let c = repo.create(&article("C")).await.unwrap();

        repo.set_relation(a.id, ContentRelation::RelatedArticles, &[b.id, c.id])
            .await
            .unwrap();
        repo.set_relation(b.id, ContentRelation::SecondaryNavigation, &[c.id])
            .await
            .unwrap();

        assert_eq!(
            repo.list_relation(a.id, ContentRelation::RelatedArticles).await.unwrap(),
            vec![b.id, c.id]
        );
        // not symmetrical
        assert!(repo
            .list_relation(b.id, ContentRelation::RelatedArticles)
            .await
            .unwrap()
            .is_empty());
        assert_eq!(
            repo.referencing(ContentRelation::RelatedArticles, c.id).await.unwrap(),
            vec![a.id]
        );

        pool.execute(&format!(
            "INSERT INTO publishing_states (content_id, publish_state, not_for_external_use, created_on, updated_on) VALUES ({}, 'Draft', 0, '2024-01-01T00:00:00+00:00', '2024-01-01T00:00:00+00:00')",
            c.id
        ))
        .await
        .unwrap();

        assert!(repo.delete(c.id).await.unwrap());
        assert!(repo.get_by_id(c.id).await.unwrap().is_none());
        assert_eq!(
            repo.list_relation(a.id, ContentRelation::RelatedArticles).await.unwrap(),
            vec![b.id]
        );
        assert!(repo
            .list_relation(b.id, ContentRelation::SecondaryNavigation)
            .await
            .unwrap()
            .is_empty());
        assert!(!repo.delete(c.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_targets() {
        let (_, repo) = repo().await;
        let missing = repo
            .missing(target_table(ContentRelation::Campaigns), &[1, 2])
            .await
            .unwrap();
        assert_eq!(missing, vec![1, 2]);
    }
}
