//! Asset repository
//!
//! Asset types, asset content files, assets with their content lists, and
//! the template associations that articles link to.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

use super::geo::fetch_created;
use super::{
    delete_by_id, find_by_id, list_all, list_by_ids, list_links, missing_ids, set_links, LinkTable,
};
use crate::db::{DynDatabasePool, InsertedId};
use crate::models::{
    Asset, AssetAssociation, AssetAssociationInput, AssetContent, AssetContentInput, AssetInput,
    AssetType, AssetTypeInput,
};

pub const ASSET_CONTENTS: LinkTable = LinkTable {
    table: "asset_asset_contents",
    owner: "asset_id",
    target: "asset_content_id",
};

/// Asset repository trait
#[async_trait]
pub trait AssetRepository: Send + Sync {
    async fn create_type(&self, input: &AssetTypeInput) -> Result<AssetType>;
    async fn get_type(&self, id: i64) -> Result<Option<AssetType>>;
    async fn list_types(&self) -> Result<Vec<AssetType>>;
    async fn update_type(&self, id: i64, input: &AssetTypeInput) -> Result<Option<AssetType>>;
    async fn delete_type(&self, id: i64) -> Result<bool>;

    async fn create_content(&self, input: &AssetContentInput) -> Result<AssetContent>;
    async fn get_content(&self, id: i64) -> Result<Option<AssetContent>>;
    async fn list_contents(&self) -> Result<Vec<AssetContent>>;
    /// Leaves the stored file untouched
    async fn update_content(
        &self,
        id: i64,
        input: &AssetContentInput,
    ) -> Result<Option<AssetContent>>;
    async fn set_content_file(&self, id: i64, path: Option<&str>) -> Result<Option<AssetContent>>;
    async fn delete_content(&self, id: i64) -> Result<bool>;

    async fn create_asset(&self, input: &AssetInput) -> Result<Asset>;
    async fn get_asset(&self, id: i64) -> Result<Option<Asset>>;
    async fn list_assets(&self) -> Result<Vec<Asset>>;
    /// Leaves the thumbnail and content list untouched
    async fn update_asset(&self, id: i64, input: &AssetInput) -> Result<Option<Asset>>;
    async fn set_thumbnail(&self, id: i64, path: Option<&str>) -> Result<Option<Asset>>;
    async fn delete_asset(&self, id: i64) -> Result<bool>;

    async fn set_asset_contents(&self, asset_id: i64, content_ids: &[i64]) -> Result<()>;
    /// Content files of an asset, ordered by `order` then id
    async fn contents_of(&self, asset_id: i64) -> Result<Vec<AssetContent>>;

    async fn create_association(&self, input: &AssetAssociationInput) -> Result<AssetAssociation>;
    async fn get_association(&self, id: i64) -> Result<Option<AssetAssociation>>;
    async fn list_associations(&self) -> Result<Vec<AssetAssociation>>;
    async fn update_association(
        &self,
        id: i64,
        input: &AssetAssociationInput,
    ) -> Result<Option<AssetAssociation>>;
    async fn delete_association(&self, id: i64) -> Result<bool>;
    /// Associations that place `asset_id`
    async fn associations_of(&self, asset_id: i64) -> Result<Vec<AssetAssociation>>;

    /// Ids among `ids` that have no row in `table`
    async fn missing(&self, table: &'static str, ids: &[i64]) -> Result<Vec<i64>>;
}

pub struct SqlxAssetRepository {
    pool: DynDatabasePool,
}

impl SqlxAssetRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn AssetRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl AssetRepository for SqlxAssetRepository {
    async fn create_type(&self, input: &AssetTypeInput) -> Result<AssetType> {
        let now = Utc::now();
        let id = with_pool!(self.pool, |conn| {
            sqlx::query("INSERT INTO asset_types (name, created_on, updated_on) VALUES (?, ?, ?)")
                .bind(&input.name)
                .bind(now)
                .bind(now)
                .execute(conn)
                .await
                .context("Failed to insert asset type")?
                .inserted_id()
        });
        fetch_created(self.get_type(id).await?, "asset type", id)
    }

    async fn get_type(&self, id: i64) -> Result<Option<AssetType>> {
        find_by_id(&self.pool, "asset_types", id).await
    }

    async fn list_types(&self) -> Result<Vec<AssetType>> {
        list_all(&self.pool, "asset_types", "name, id").await
    }

    async fn update_type(&self, id: i64, input: &AssetTypeInput) -> Result<Option<AssetType>> {
        let affected = with_pool!(self.pool, |conn| {
            sqlx::query("UPDATE asset_types SET name = ?, updated_on = ? WHERE id = ?")
                .bind(&input.name)
                .bind(Utc::now())
                .bind(id)
                .execute(conn)
                .await
                .context("Failed to update asset type")?
                .rows_affected()
        });
        if affected == 0 {
            return Ok(None);
        }
        self.get_type(id).await
    }

    async fn delete_type(&self, id: i64) -> Result<bool> {
        delete_by_id(&self.pool, "asset_types", id).await
    }

    async fn create_content(&self, input: &AssetContentInput) -> Result<AssetContent> {
        let now = Utc::now();
        let id = with_pool!(self.pool, |conn| {
            sqlx::query(
                "INSERT INTO asset_contents (identifier, alternate_text, sort_order, start_time, duration, created_on, updated_on) VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&input.identifier)
            .bind(&input.alternate_text)
            .bind(input.order)
            .bind(input.start_time)
            .bind(input.duration)
            .bind(now)
            .bind(now)
            .execute(conn)
            .await
            .context("Failed to insert asset content")?
            .inserted_id()
        });
        fetch_created(self.get_content(id).await?, "asset content", id)
    }

    async fn get_content(&self, id: i64) -> Result<Option<AssetContent>> {
        find_by_id(&self.pool, "asset_contents", id).await
    }

    async fn list_contents(&self) -> Result<Vec<AssetContent>> {
        list_all(&self.pool, "asset_contents", "identifier, id").await
    }

    async fn update_content(
        &self,
        id: i64,
        input: &AssetContentInput,
    ) -> Result<Option<AssetContent>> {
        let affected = with_pool!(self.pool, |conn| {
            sqlx::query(
                "UPDATE asset_contents SET identifier = ?, alternate_text = ?, sort_order = ?, start_time = ?, duration = ?, updated_on = ? WHERE id = ?",
            )
            .bind(&input.identifier)
            .bind(&input.alternate_text)
            .bind(input.order)
            .bind(input.start_time)
            .bind(input.duration)
            .bind(Utc::now())
            .bind(id)
            .execute(conn)
            .await
            .context("Failed to update asset content")?
            .rows_affected()
        });
        if affected == 0 {
            return Ok(None);
        }
        self.get_content(id).await
    }

    async fn set_content_file(&self, id: i64, path: Option<&str>) -> Result<Option<AssetContent>> {
        let affected = with_pool!(self.pool, |conn| {
            sqlx::query("UPDATE asset_contents SET content = ?, updated_on = ? WHERE id = ?")
                .bind(path)
                .bind(Utc::now())
                .bind(id)
                .execute(conn)
                .await
                .context("Failed to set asset content file")?
                .rows_affected()
        });
        if affected == 0 {
            return Ok(None);
        }
        self.get_content(id).await
    }

    async fn delete_content(&self, id: i64) -> Result<bool> {
        delete_by_id(&self.pool, "asset_contents", id).await
    }

    async fn create_asset(&self, input: &AssetInput) -> Result<Asset> {
        let now = Utc::now();
        let id = with_pool!(self.pool, |conn| {
            sqlx::query(
                "INSERT INTO assets (name, asset_type_id, source, content_attribution, created_on, updated_on) VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(&input.name)
            .bind(input.asset_type_id)
            .bind(&input.source)
            .bind(&input.content_attribution)
            .bind(now)
            .bind(now)
            .execute(conn)
            .await
            .context("Failed to insert asset")?
            .inserted_id()
        });
        fetch_created(self.get_asset(id).await?, "asset", id)
    }

    async fn get_asset(&self, id: i64) -> Result<Option<Asset>> {
        find_by_id(&self.pool, "assets", id).await
    }

    async fn list_assets(&self) -> Result<Vec<Asset>> {
        list_all(&self.pool, "assets", "name, id").await
    }

    async fn update_asset(&self, id: i64, input: &AssetInput) -> Result<Option<Asset>> {
        let affected = with_pool!(self.pool, |conn| {
            sqlx::query(
                "UPDATE assets SET name = ?, asset_type_id = ?, source = ?, content_attribution = ?, updated_on = ? WHERE id = ?",
            )
            .bind(&input.name)
            .bind(input.asset_type_id)
            .bind(&input.source)
            .bind(&input.content_attribution)
            .bind(Utc::now())
            .bind(id)
            .execute(conn)
            .await
            .context("Failed to update asset")?
            .rows_affected()
        });
        if affected == 0 {
            return Ok(None);
        }
        self.get_asset(id).await
    }

    async fn set_thumbnail(&self, id: i64, path: Option<&str>) -> Result<Option<Asset>> {
        let affected = with_pool!(self.pool, |conn| {
            sqlx::query("UPDATE assets SET thumbnail = ?, updated_on = ? WHERE id = ?")
                .bind(path)
                .bind(Utc::now())
                .bind(id)
                .execute(conn)
                .await
                .context("Failed to set asset thumbnail")?
                .rows_affected()
        });
        if affected == 0 {
            return Ok(None);
        }
        self.get_asset(id).await
    }

    async fn delete_asset(&self, id: i64) -> Result<bool> {
        delete_by_id(&self.pool, "assets", id).await
    }

    async fn set_asset_contents(&self, asset_id: i64, content_ids: &[i64]) -> Result<()> {
        set_links(&self.pool, ASSET_CONTENTS, asset_id, content_ids).await
    }

    async fn contents_of(&self, asset_id: i64) -> Result<Vec<AssetContent>> {
        let ids = list_links(&self.pool, ASSET_CONTENTS, asset_id).await?;
        let mut contents: Vec<AssetContent> = list_by_ids(&self.pool, "asset_contents", &ids).await?;
        // unordered contents go last
        contents.sort_by_key(|c| (c.sort_order.is_none(), c.sort_order, c.id));
        Ok(contents)
    }

    async fn create_association(&self, input: &AssetAssociationInput) -> Result<AssetAssociation> {
        let now = Utc::now();
        let id = with_pool!(self.pool, |conn| {
            sqlx::query(
                "INSERT INTO asset_associations (asset_id, template_location, created_on, updated_on) VALUES (?, ?, ?, ?)",
            )
            .bind(input.asset_id)
            .bind(&input.template_location)
            .bind(now)
            .bind(now)
            .execute(conn)
            .await
            .context("Failed to insert asset association")?
            .inserted_id()
        });
        fetch_created(self.get_association(id).await?, "asset association", id)
    }

    async fn get_association(&self, id: i64) -> Result<Option<AssetAssociation>> {
        find_by_id(&self.pool, "asset_associations", id).await
    }

    async fn list_associations(&self) -> Result<Vec<AssetAssociation>> {
        list_all(&self.pool, "asset_associations", "id").await
    }

    async fn update_association(
        &self,
        id: i64,
        input: &AssetAssociationInput,
    ) -> Result<Option<AssetAssociation>> {
        let affected = with_pool!(self.pool, |conn| {
            sqlx::query(
                "UPDATE asset_associations SET asset_id = ?, template_location = ?, updated_on = ? WHERE id = ?",
            )
            .bind(input.asset_id)
            .bind(&input.template_location)
            .bind(Utc::now())
            .bind(id)
            .execute(conn)
            .await
            .context("Failed to update asset association")?
            .rows_affected()
        });
        if affected == 0 {
            return Ok(None);
        }
        self.get_association(id).await
    }

    async fn delete_association(&self, id: i64) -> Result<bool> {
        delete_by_id(&self.pool, "asset_associations", id).await
    }

    async fn associations_of(&self, asset_id: i64) -> Result<Vec<AssetAssociation>> {
        with_pool!(self.pool, |conn| {
            sqlx::query_as::<_, AssetAssociation>(
                "SELECT * FROM asset_associations WHERE asset_id = ? ORDER BY id",
            )
            .bind(asset_id)
            .fetch_all(conn)
            .await
            .context("Failed to list asset associations")
        })
    }

    async fn missing(&self, table: &'static str, ids: &[i64]) -> Result<Vec<i64>> {
        missing_ids(&self.pool, table, ids).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, is_foreign_key_violation, migrations::run_migrations};

    async fn repo() -> SqlxAssetRepository {
        let pool = create_test_pool().await.unwrap();
        run_migrations(&pool).await.unwrap();
        SqlxAssetRepository::new(pool)
    }

    fn content(identifier: &str, order: Option<i32>) -> AssetContentInput {
        AssetContentInput {
            identifier: identifier.into(),
            order,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_content_defaults_and_file() {
        let repo = repo().await;
        let created = repo.create_content(&content("clip", None)).await.unwrap();
        assert_eq!(created.start_time, 0);
        assert_eq!(created.duration, 5);
        assert!(created.content.is_none());

        let with_file = repo
            .set_content_file(created.id, Some("uploads/clip.mp4"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(with_file.content.as_deref(), Some("uploads/clip.mp4"));

        let renamed = repo
            .update_content(created.id, &content("clip-2", Some(1)))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(renamed.identifier, "clip-2");
        assert_eq!(renamed.sort_order, Some(1));
        assert_eq!(renamed.content.as_deref(), Some("uploads/clip.mp4"));
    }

    #[tokio::test]
    async fn test_asset_contents_ordered() {
        let repo = repo().await;
        let a = repo.create_content(&content("a", None)).await.unwrap();
        let b = repo.create_content(&content("b", Some(2))).await.unwrap();
        let c = repo.create_content(&content("c", Some(1))).await.unwrap();
        let asset = repo
            .create_asset(&AssetInput {
                name: "Launch".into(),
                ..Default::default()
            })
            .await
            .unwrap();

        repo.set_asset_contents(asset.id, &[a.id, b.id, c.id]).await.unwrap();

        let ids: Vec<i64> = repo
            .contents_of(asset.id)
            .await
            .unwrap()
            .iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, vec![c.id, b.id, a.id]);
    }

    #[tokio::test]
    async fn test_type_in_use_cannot_be_deleted() {
        let repo = repo().await;
        let video = repo
            .create_type(&AssetTypeInput { name: "Video".into() })
            .await
            .unwrap();
        repo.create_asset(&AssetInput {
            name: "Launch".into(),
            asset_type_id: Some(video.id),
            ..Default::default()
        })
        .await
        .unwrap();

        let err = repo.delete_type(video.id).await.unwrap_err();
        assert!(is_foreign_key_violation(&err));
    }

    #[tokio::test]
    async fn test_associations_of_asset() {
        let repo = repo().await;
        let asset = repo
            .create_asset(&AssetInput {
                name: "Launch".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        let hero = repo
            .create_association(&AssetAssociationInput {
                asset_id: Some(asset.id),
                template_location: Some("hero".into()),
            })
            .await
            .unwrap();
        repo.create_association(&AssetAssociationInput::default())
            .await
            .unwrap();

        let found = repo.associations_of(asset.id).await.unwrap();
        assert_eq!(found, vec![hero]);
    }

    #[tokio::test]
    async fn test_thumbnail_survives_update() {
        let repo = repo().await;
        let asset = repo
            .create_asset(&AssetInput {
                name: "Launch".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        repo.set_thumbnail(asset.id, Some("uploads/thumbnails/t.png"))
            .await
            .unwrap();

        let updated = repo
            .update_asset(
                asset.id,
                &AssetInput {
                    name: "Launch film".into(),
                    source: Some("Studio".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.thumbnail.as_deref(), Some("uploads/thumbnails/t.png"));
        assert_eq!(updated.source.as_deref(), Some("Studio"));
    }
}
