//! Publishing state service
//!
//! States are plain labels; any state may be written at any time. Whether
//! an article is visible is decided from the state and its time window.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

use super::{ServiceError, ServiceResult};
use crate::db::repositories::{PublishingStateRepository, TemplateContentRepository};
use crate::models::{ListParams, PagedResult, PublishingState, PublishingStateInput, TemplateContent};

/// A publishing state with the heading of its article
#[derive(Debug, Clone, Serialize)]
pub struct PublishingStateView {
    #[serde(flatten)]
    pub state: PublishingState,
    pub label: String,
    pub is_live: bool,
}

pub struct PublishingService {
    repo: Arc<dyn PublishingStateRepository>,
    contents: Arc<dyn TemplateContentRepository>,
}

impl PublishingService {
    pub fn new(
        repo: Arc<dyn PublishingStateRepository>,
        contents: Arc<dyn TemplateContentRepository>,
    ) -> Self {
        Self { repo, contents }
    }

    async fn content(&self, content_id: i64) -> ServiceResult<TemplateContent> {
        self.contents
            .get_by_id(content_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("TemplateContent", content_id))
    }

    fn view(content: &TemplateContent, state: PublishingState, now: DateTime<Utc>) -> PublishingStateView {
        PublishingStateView {
            label: content.to_string(),
            is_live: state.is_live(now),
            state,
        }
    }

    pub async fn get_for_content(&self, content_id: i64) -> ServiceResult<PublishingStateView> {
        let content = self.content(content_id).await?;
        let state = self
            .repo
            .get_for_content(content_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("PublishingState", content_id))?;
        Ok(Self::view(&content, state, Utc::now()))
    }

    /// Create or replace the article's state
    pub async fn upsert(&self, content_id: i64, input: PublishingStateInput) -> ServiceResult<PublishingStateView> {
        let content = self.content(content_id).await?;
        let state = self.repo.upsert(content_id, &input).await?;
        tracing::info!(
            "Article {} publishing state set to {}",
            content_id,
            state.publish_state.map_or("none", |s| s.as_str())
        );
        Ok(Self::view(&content, state, Utc::now()))
    }

    pub async fn delete(&self, content_id: i64) -> ServiceResult<()> {
        if !self.repo.delete_for_content(content_id).await? {
            return Err(ServiceError::not_found("PublishingState", content_id));
        }
        Ok(())
    }

    /// Articles live at `now`; `external_only` drops internal-use articles
    pub async fn list_live(
        &self,
        now: DateTime<Utc>,
        external_only: bool,
        params: &ListParams,
    ) -> ServiceResult<PagedResult<TemplateContent>> {
        let (items, total) = self.repo.list_live(now, external_only, params).await?;
        Ok(PagedResult::new(items, total, params))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxPublishingStateRepository, SqlxTemplateContentRepository};
    use crate::db::{create_test_pool, migrations::run_migrations};
    use crate::models::{PublishState, TemplateContentInput};
    use chrono::Duration;

    async fn setup() -> (Arc<dyn TemplateContentRepository>, PublishingService) {
        let pool = create_test_pool().await.unwrap();
        run_migrations(&pool).await.unwrap();
        let contents = SqlxTemplateContentRepository::boxed(pool.clone());
        let service = PublishingService::new(
            SqlxPublishingStateRepository::boxed(pool),
            contents.clone(),
        );
        (contents, service)
    }

    #[tokio::test]
    async fn test_upsert_view() {
        let (contents, publishing) = setup().await;
        let article = contents
            .create(&TemplateContentInput::new("Launch day"))
            .await
            .unwrap();

        let view = publishing
            .upsert(
                article.id,
                PublishingStateInput {
                    publish_state: Some(PublishState::ReadyToApprove),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(view.label, "Launch day");
        assert!(!view.is_live);

        // any transition is allowed
        let view = publishing
            .upsert(
                article.id,
                PublishingStateInput {
                    publish_state: Some(PublishState::Published),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(view.is_live);
        let view = publishing
            .upsert(
                article.id,
                PublishingStateInput {
                    publish_state: Some(PublishState::Draft),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(view.state.publish_state, Some(PublishState::Draft));

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["publish_state"], "Draft");
        assert_eq!(json["label"], "Launch day");
    }

    #[tokio::test]
    async fn test_missing_article_or_state() {
        let (contents, publishing) = setup().await;
        assert!(matches!(
            publishing.upsert(9, PublishingStateInput::default()).await,
            Err(ServiceError::NotFound { .. })
        ));

        let article = contents
            .create(&TemplateContentInput::new("Quiet"))
            .await
            .unwrap();
        assert!(matches!(
            publishing.get_for_content(article.id).await,
            Err(ServiceError::NotFound { .. })
        ));
        assert!(matches!(
            publishing.delete(article.id).await,
            Err(ServiceError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_list_live_pages() {
        let (contents, publishing) = setup().await;
        for heading in ["One", "Two", "Three"] {
            let article = contents
                .create(&TemplateContentInput::new(heading))
                .await
                .unwrap();
            publishing
                .upsert(
                    article.id,
                    PublishingStateInput {
                        publish_state: Some(PublishState::Published),
                        unpublishing_on: Some(Utc::now() + Duration::days(7)),
                        ..Default::default()
                    },
                )
                .await
                .unwrap();
        }

        let page = publishing
            .list_live(Utc::now(), true, &ListParams::new(1, 2))
            .await
            .unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].content_heading, "Three");

        let later = publishing
            .list_live(Utc::now() + Duration::days(8), true, &ListParams::default())
            .await
            .unwrap();
        assert_eq!(later.total, 0);
    }
}
