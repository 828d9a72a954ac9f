//! Publishing state repository

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

use super::geo::fetch_created;
use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{ListParams, PublishState, PublishingState, PublishingStateInput, TemplateContent};

#[async_trait]
pub trait PublishingStateRepository: Send + Sync {
    async fn get_for_content(&self, content_id: i64) -> Result<Option<PublishingState>>;
    /// Create or replace the single state of an article
    async fn upsert(&self, content_id: i64, input: &PublishingStateInput) -> Result<PublishingState>;
    async fn delete_for_content(&self, content_id: i64) -> Result<bool>;
    /// Articles live at `now`, newest first, with the total
    async fn list_live(
        &self,
        now: DateTime<Utc>,
        external_only: bool,
        params: &ListParams,
    ) -> Result<(Vec<TemplateContent>, i64)>;
}

pub struct SqlxPublishingStateRepository {
    pool: DynDatabasePool,
}

impl SqlxPublishingStateRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn PublishingStateRepository> {
        Arc::new(Self::new(pool))
    }
}

/// Insert, or replace the state already stored for the article in the same
/// statement; `created_on` keeps its first value.
fn upsert_sql(driver: DatabaseDriver) -> &'static str {
    match driver {
        DatabaseDriver::Sqlite => {
            "INSERT INTO publishing_states (content_id, publish_state, unpublishing_on, do_not_publish_until, not_for_external_use, created_on, updated_on) \
             VALUES (?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(content_id) DO UPDATE SET publish_state = excluded.publish_state, \
             unpublishing_on = excluded.unpublishing_on, do_not_publish_until = excluded.do_not_publish_until, \
             not_for_external_use = excluded.not_for_external_use, updated_on = excluded.updated_on"
        }
        DatabaseDriver::Mysql => {
            "INSERT INTO publishing_states (content_id, publish_state, unpublishing_on, do_not_publish_until, not_for_external_use, created_on, updated_on) \
             VALUES (?, ?, ?, ?, ?, ?, ?) \
             ON DUPLICATE KEY UPDATE publish_state = VALUES(publish_state), \
             unpublishing_on = VALUES(unpublishing_on), do_not_publish_until = VALUES(do_not_publish_until), \
             not_for_external_use = VALUES(not_for_external_use), updated_on = VALUES(updated_on)"
        }
    }
}

fn live_clause(external_only: bool) -> String {
    let mut clause = String::from(
        "FROM template_contents c JOIN publishing_states p ON p.content_id = c.id \
         WHERE p.publish_state = ? \
         AND (p.do_not_publish_until IS NULL OR p.do_not_publish_until <= ?) \
         AND (p.unpublishing_on IS NULL OR p.unpublishing_on > ?)",
    );
    if external_only {
        clause.push_str(" AND p.not_for_external_use = ?");
    }
    clause
}

#[async_trait]
impl PublishingStateRepository for SqlxPublishingStateRepository {
    async fn get_for_content(&self, content_id: i64) -> Result<Option<PublishingState>> {
        with_pool!(self.pool, |conn| {
            sqlx::query_as::<_, PublishingState>(
                "SELECT * FROM publishing_states WHERE content_id = ?",
            )
            .bind(content_id)
            .fetch_optional(conn)
            .await
            .context("Failed to load publishing state")
        })
    }

    async fn upsert(&self, content_id: i64, input: &PublishingStateInput) -> Result<PublishingState> {
        let now = Utc::now();
        let sql = upsert_sql(self.pool.driver());
        with_pool!(self.pool, |conn| {
            sqlx::query(sql)
                .bind(content_id)
                .bind(input.publish_state)
                .bind(input.unpublishing_on)
                .bind(input.do_not_publish_until)
                .bind(input.not_for_external_use)
                .bind(now)
                .bind(now)
                .execute(conn)
                .await
                .context("Failed to save publishing state")?;
        });
        fetch_created(
            self.get_for_content(content_id).await?,
            "publishing state for content",
            content_id,
        )
    }

    async fn delete_for_content(&self, content_id: i64) -> Result<bool> {
        let affected = with_pool!(self.pool, |conn| {
            sqlx::query("DELETE FROM publishing_states WHERE content_id = ?")
                .bind(content_id)
                .execute(conn)
                .await
                .context("Failed to delete publishing state")?
                .rows_affected()
        });
        Ok(affected > 0)
    }

    async fn list_live(
        &self,
        now: DateTime<Utc>,
        external_only: bool,
        params: &ListParams,
    ) -> Result<(Vec<TemplateContent>, i64)> {
        let clause = live_clause(external_only);
        let select = format!(
            "SELECT c.* {} ORDER BY c.content_publish_date DESC, c.id DESC LIMIT ? OFFSET ?",
            clause
        );
        let count = format!("SELECT COUNT(*) {}", clause);

        with_pool!(self.pool, |conn| {
            let mut query = sqlx::query_as::<_, TemplateContent>(&select)
                .bind(PublishState::Published)
                .bind(now)
                .bind(now);
            let mut count_query = sqlx::query_scalar::<_, i64>(&count)
                .bind(PublishState::Published)
                .bind(now)
                .bind(now);
            if external_only {
                query = query.bind(false);
                count_query = count_query.bind(false);
            }
            let items = query
                .bind(params.limit())
                .bind(params.offset())
                .fetch_all(conn)
                .await
                .context("Failed to list live content")?;
            let total = count_query
                .fetch_one(conn)
                .await
                .context("Failed to count live content")?;
            Ok((items, total))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxTemplateContentRepository, TemplateContentRepository};
    use crate::db::{create_test_pool, migrations::run_migrations};
    use crate::models::TemplateContentInput;
    use chrono::Duration;

    struct Fixture {
        contents: SqlxTemplateContentRepository,
        states: SqlxPublishingStateRepository,
    }

    async fn fixture() -> Fixture {
        let pool = create_test_pool().await.unwrap();
        run_migrations(&pool).await.unwrap();
        Fixture {
            contents: SqlxTemplateContentRepository::new(pool.clone()),
            states: SqlxPublishingStateRepository::new(pool),
        }
    }

    async fn article(f: &Fixture, heading: &str) -> TemplateContent {
        f.contents
            .create(&TemplateContentInput::new(heading))
            .await
            .unwrap()
    }

    fn published() -> PublishingStateInput {
        PublishingStateInput {
            publish_state: Some(PublishState::Published),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_upsert_creates_then_replaces() {
        let f = fixture().await;
        let content = article(&f, "Story").await;
        assert!(f.states.get_for_content(content.id).await.unwrap().is_none());

        let draft = PublishingStateInput {
            publish_state: Some(PublishState::Draft),
            not_for_external_use: true,
            ..Default::default()
        };
        let created = f.states.upsert(content.id, &draft).await.unwrap();
        assert_eq!(created.publish_state, Some(PublishState::Draft));
        assert!(created.not_for_external_use);

        let replaced = f.states.upsert(content.id, &published()).await.unwrap();
        assert_eq!(replaced.id, created.id);
        assert_eq!(replaced.publish_state, Some(PublishState::Published));
        assert!(!replaced.not_for_external_use);
    }

    #[tokio::test]
    async fn test_concurrent_upserts_share_one_row() {
        let f = fixture().await;
        let content = article(&f, "Story").await;
        let draft = PublishingStateInput {
            publish_state: Some(PublishState::Draft),
            ..Default::default()
        };
        let published = published();

        let (first, second) = tokio::join!(
            f.states.upsert(content.id, &draft),
            f.states.upsert(content.id, &published),
        );
        let (first, second) = (first.unwrap(), second.unwrap());
        assert_eq!(first.id, second.id);

        let stored = f.states.get_for_content(content.id).await.unwrap().unwrap();
        assert_eq!(stored.id, first.id);
        assert!(matches!(
            stored.publish_state,
            Some(PublishState::Draft) | Some(PublishState::Published)
        ));
    }

    #[tokio::test]
    async fn test_upsert_unknown_content_fails() {
        let f = fixture().await;
        assert!(f.states.upsert(404, &published()).await.is_err());
    }

    #[tokio::test]
    async fn test_delete_for_content() {
        let f = fixture().await;
        let content = article(&f, "Story").await;
        f.states.upsert(content.id, &published()).await.unwrap();

        assert!(f.states.delete_for_content(content.id).await.unwrap());
        assert!(!f.states.delete_for_content(content.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_live_applies_window() {
        let f = fixture().await;
        let now = Utc::now();

        let live = article(&f, "Live").await;
        f.states.upsert(live.id, &published()).await.unwrap();

        let embargoed = article(&f, "Embargoed").await;
        let mut input = published();
        input.do_not_publish_until = Some(now + Duration::days(1));
        f.states.upsert(embargoed.id, &input).await.unwrap();

        let withdrawn = article(&f, "Withdrawn").await;
        let mut input = published();
        input.unpublishing_on = Some(now - Duration::days(1));
        f.states.upsert(withdrawn.id, &input).await.unwrap();

        let internal = article(&f, "Internal").await;
        let mut input = published();
        input.not_for_external_use = true;
        f.states.upsert(internal.id, &input).await.unwrap();

        let draft = article(&f, "Draft").await;
        let input = PublishingStateInput {
            publish_state: Some(PublishState::Draft),
            ..Default::default()
        };
        f.states.upsert(draft.id, &input).await.unwrap();

        article(&f, "No state").await;

        let at = Utc::now();
        let (items, total) = f.states.list_live(at, false, &ListParams::default()).await.unwrap();
        assert_eq!(total, 2);
        let ids: Vec<i64> = items.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![internal.id, live.id]);

        let (items, total) = f.states.list_live(at, true, &ListParams::default()).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(items[0].id, live.id);

        let (items, _) = f
            .states
            .list_live(now + Duration::days(2), false, &ListParams::default())
            .await
            .unwrap();
        assert!(items.iter().any(|c| c.id == embargoed.id));
    }
}
