//! Asset service
//!
//! Asset types, content files, assets and their placements
//! (associations). Uploaded files go through [`MediaStorage`]; replacing or
//! deleting a row removes the file it pointed at.

use std::sync::Arc;

use super::media::{MediaKind, MediaStorage};
use super::{ensure_exist, ServiceError, ServiceResult};
use crate::db::repositories::AssetRepository;
use crate::models::{
    Asset, AssetAssociation, AssetAssociationInput, AssetAssociationView, AssetContent,
    AssetContentInput, AssetDetail, AssetInput, AssetType, AssetTypeInput,
};

pub struct AssetService {
    repo: Arc<dyn AssetRepository>,
    media: Arc<MediaStorage>,
}

impl AssetService {
    pub fn new(repo: Arc<dyn AssetRepository>, media: Arc<MediaStorage>) -> Self {
        Self { repo, media }
    }

    // ---- asset types ----

    pub async fn create_type(&self, input: AssetTypeInput) -> ServiceResult<AssetType> {
        let input = input.normalized();
        input.validate()?;
        Ok(self.repo.create_type(&input).await?)
    }

    pub async fn get_type(&self, id: i64) -> ServiceResult<AssetType> {
        self.repo
            .get_type(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("AssetType", id))
    }

    pub async fn list_types(&self) -> ServiceResult<Vec<AssetType>> {
        Ok(self.repo.list_types().await?)
    }

    pub async fn update_type(&self, id: i64, input: AssetTypeInput) -> ServiceResult<AssetType> {
        let input = input.normalized();
        input.validate()?;
        self.repo
            .update_type(id, &input)
            .await?
            .ok_or_else(|| ServiceError::not_found("AssetType", id))
    }

    pub async fn delete_type(&self, id: i64) -> ServiceResult<()> {
        let deleted = self
            .repo
            .delete_type(id)
            .await
            .map_err(|e| ServiceError::from_write(e, &format!("AssetType {}", id)))?;
        if !deleted {
            return Err(ServiceError::not_found("AssetType", id));
        }
        Ok(())
    }

    // ---- asset contents ----

    pub async fn create_content(&self, input: AssetContentInput) -> ServiceResult<AssetContent> {
        let input = input.normalized();
        input.validate()?;
        Ok(self.repo.create_content(&input).await?)
    }

    pub async fn get_content(&self, id: i64) -> ServiceResult<AssetContent> {
        self.repo
            .get_content(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("AssetContent", id))
    }

    pub async fn list_contents(&self) -> ServiceResult<Vec<AssetContent>> {
        Ok(self.repo.list_contents().await?)
    }

    pub async fn update_content(&self, id: i64, input: AssetContentInput) -> ServiceResult<AssetContent> {
        let input = input.normalized();
        input.validate()?;
        self.repo
            .update_content(id, &input)
            .await?
            .ok_or_else(|| ServiceError::not_found("AssetContent", id))
    }

    pub async fn delete_content(&self, id: i64) -> ServiceResult<()> {
        let file = self.get_content(id).await?.content;
        self.repo.delete_content(id).await?;
        if let Some(file) = file {
            self.media.remove(&file).await;
        }
        Ok(())
    }

    /// Store the media file of an asset content, replacing any previous one
    pub async fn upload_content_file(&self, id: i64, filename: &str, data: &[u8]) -> ServiceResult<AssetContent> {
        let previous = self.get_content(id).await?.content;
        let stored = self.media.store(MediaKind::AssetContent, filename, data).await?;
        let content = match self.repo.set_content_file(id, Some(&stored.path)).await {
            Ok(Some(content)) => content,
            Ok(None) => {
                self.media.remove(&stored.path).await;
                return Err(ServiceError::not_found("AssetContent", id));
            }
            Err(e) => {
                self.media.remove(&stored.path).await;
                return Err(e.into());
            }
        };
        if let Some(previous) = previous {
            self.media.remove(&previous).await;
        }
        Ok(content)
    }

    // ---- assets ----

    async fn check_asset_refs(&self, input: &AssetInput) -> ServiceResult<()> {
        if let Some(type_id) = input.asset_type_id {
            ensure_exist(
                "asset_type_id",
                "AssetType",
                self.repo.missing("asset_types", &[type_id]).await?,
            )?;
        }
        if let Some(contents) = &input.contents {
            ensure_exist(
                "contents",
                "AssetContent",
                self.repo.missing("asset_contents", contents).await?,
            )?;
        }
        Ok(())
    }

    pub async fn create_asset(&self, input: AssetInput) -> ServiceResult<Asset> {
        let input = input.normalized();
        input.validate()?;
        self.check_asset_refs(&input).await?;

        let asset = self.repo.create_asset(&input).await?;
        if let Some(contents) = &input.contents {
            self.repo.set_asset_contents(asset.id, contents).await?;
        }
        tracing::info!("Created asset {} ({})", asset.id, asset.name);
        Ok(asset)
    }

    pub async fn get_asset(&self, id: i64) -> ServiceResult<Asset> {
        self.repo
            .get_asset(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Asset", id))
    }

    /// Asset with its type and ordered content files
    pub async fn asset_detail(&self, id: i64) -> ServiceResult<AssetDetail> {
        let asset = self.get_asset(id).await?;
        let asset_type = match asset.asset_type_id {
            Some(type_id) => self.repo.get_type(type_id).await?,
            None => None,
        };
        let contents = self.repo.contents_of(id).await?;
        Ok(AssetDetail {
            asset,
            asset_type,
            contents,
        })
    }

    pub async fn list_assets(&self) -> ServiceResult<Vec<Asset>> {
        Ok(self.repo.list_assets().await?)
    }

    /// Replaces scalar fields; the content list only when supplied
    pub async fn update_asset(&self, id: i64, input: AssetInput) -> ServiceResult<Asset> {
        let input = input.normalized();
        input.validate()?;
        self.check_asset_refs(&input).await?;

        let asset = self
            .repo
            .update_asset(id, &input)
            .await?
            .ok_or_else(|| ServiceError::not_found("Asset", id))?;
        if let Some(contents) = &input.contents {
            self.repo.set_asset_contents(id, contents).await?;
        }
        Ok(asset)
    }

    pub async fn delete_asset(&self, id: i64) -> ServiceResult<()> {
        let thumbnail = self.get_asset(id).await?.thumbnail;
        self.repo
            .delete_asset(id)
            .await
            .map_err(|e| ServiceError::from_write(e, &format!("Asset {}", id)))?;
        if let Some(thumbnail) = thumbnail {
            self.media.remove(&thumbnail).await;
        }
        Ok(())
    }

    pub async fn set_asset_contents(&self, id: i64, content_ids: &[i64]) -> ServiceResult<Vec<AssetContent>> {
        self.get_asset(id).await?;
        ensure_exist(
            "contents",
            "AssetContent",
            self.repo.missing("asset_contents", content_ids).await?,
        )?;
        self.repo.set_asset_contents(id, content_ids).await?;
        Ok(self.repo.contents_of(id).await?)
    }

    pub async fn contents_of(&self, id: i64) -> ServiceResult<Vec<AssetContent>> {
        self.get_asset(id).await?;
        Ok(self.repo.contents_of(id).await?)
    }

    /// Resize and store a thumbnail, replacing any previous one
    pub async fn upload_thumbnail(&self, id: i64, filename: &str, data: &[u8]) -> ServiceResult<Asset> {
        let previous = self.get_asset(id).await?.thumbnail;
        let stored = self.media.store(MediaKind::Thumbnail, filename, data).await?;
        let asset = match self.repo.set_thumbnail(id, Some(&stored.path)).await {
            Ok(Some(asset)) => asset,
            Ok(None) => {
                self.media.remove(&stored.path).await;
                return Err(ServiceError::not_found("Asset", id));
            }
            Err(e) => {
                self.media.remove(&stored.path).await;
                return Err(e.into());
            }
        };
        if let Some(previous) = previous {
            self.media.remove(&previous).await;
        }
        Ok(asset)
    }

    // ---- associations ----

    async fn view(&self, association: AssetAssociation) -> ServiceResult<AssetAssociationView> {
        let asset_name = match association.asset_id {
            Some(asset_id) => self.repo.get_asset(asset_id).await?.map(|a| a.name),
            None => None,
        };
        let label = association.label(asset_name.as_deref());
        Ok(AssetAssociationView { association, label })
    }

    async fn check_association_refs(&self, input: &AssetAssociationInput) -> ServiceResult<()> {
        if let Some(asset_id) = input.asset_id {
            ensure_exist("asset_id", "Asset", self.repo.missing("assets", &[asset_id]).await?)?;
        }
        Ok(())
    }

    pub async fn create_association(&self, input: AssetAssociationInput) -> ServiceResult<AssetAssociationView> {
        let input = input.normalized();
        input.validate()?;
        self.check_association_refs(&input).await?;
        let association = self.repo.create_association(&input).await?;
        self.view(association).await
    }

    pub async fn get_association(&self, id: i64) -> ServiceResult<AssetAssociationView> {
        let association = self
            .repo
            .get_association(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("AssetAssociation", id))?;
        self.view(association).await
    }

    pub async fn list_associations(&self) -> ServiceResult<Vec<AssetAssociationView>> {
        let mut views = Vec::new();
        for association in self.repo.list_associations().await? {
            views.push(self.view(association).await?);
        }
        Ok(views)
    }

    pub async fn update_association(
        &self,
        id: i64,
        input: AssetAssociationInput,
    ) -> ServiceResult<AssetAssociationView> {
        let input = input.normalized();
        input.validate()?;
        self.check_association_refs(&input).await?;
        let association = self
            .repo
            .update_association(id, &input)
            .await?
            .ok_or_else(|| ServiceError::not_found("AssetAssociation", id))?;
        self.view(association).await
    }

    pub async fn delete_association(&self, id: i64) -> ServiceResult<()> {
        if !self.repo.delete_association(id).await? {
            return Err(ServiceError::not_found("AssetAssociation", id));
        }
        Ok(())
    }

    /// Placements of one asset
    pub async fn associations_of(&self, asset_id: i64) -> ServiceResult<Vec<AssetAssociationView>> {
        self.get_asset(asset_id).await?;
        let mut views = Vec::new();
        for association in self.repo.associations_of(asset_id).await? {
            views.push(self.view(association).await?);
        }
        Ok(views)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MediaConfig;
    use crate::db::repositories::SqlxAssetRepository;
    use crate::db::{create_test_pool, migrations::run_migrations};
    use image::{DynamicImage, ImageOutputFormat, RgbImage};
    use std::io::Cursor;
    use tempfile::TempDir;

    async fn service() -> (AssetService, Arc<MediaStorage>, TempDir) {
        let pool = create_test_pool().await.unwrap();
        run_migrations(&pool).await.unwrap();
        let dir = tempfile::tempdir().unwrap();
        let media = Arc::new(MediaStorage::new(MediaConfig {
            path: dir.path().to_path_buf(),
            ..Default::default()
        }));
        (
            AssetService::new(SqlxAssetRepository::boxed(pool), media.clone()),
            media,
            dir,
        )
    }

    fn content(identifier: &str, order: Option<i32>) -> AssetContentInput {
        AssetContentInput {
            identifier: identifier.to_string(),
            order,
            ..Default::default()
        }
    }

    fn asset(name: &str) -> AssetInput {
        AssetInput {
            name: name.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_asset_with_type_and_ordered_contents() {
        let (assets, _, _dir) = service().await;
        let gallery = assets
            .create_type(AssetTypeInput {
                name: "Gallery".into(),
            })
            .await
            .unwrap();
        let second = assets.create_content(content("second", Some(2))).await.unwrap();
        let first = assets.create_content(content("first", Some(1))).await.unwrap();
        let loose = assets.create_content(content("loose", None)).await.unwrap();
        assert_eq!(loose.duration, 5);
        assert_eq!(loose.start_time, 0);

        let created = assets
            .create_asset(AssetInput {
                asset_type_id: Some(gallery.id),
                contents: Some(vec![loose.id, second.id, first.id]),
                ..asset("Monsoon")
            })
            .await
            .unwrap();

        let detail = assets.asset_detail(created.id).await.unwrap();
        assert_eq!(detail.asset_type.unwrap().name, "Gallery");
        let order: Vec<_> = detail.contents.iter().map(|c| c.identifier.as_str()).collect();
        assert_eq!(order, vec!["first", "second", "loose"]);

        // update without a content list keeps it
        assets.update_asset(created.id, asset("Monsoon 2")).await.unwrap();
        assert_eq!(assets.contents_of(created.id).await.unwrap().len(), 3);

        let remaining = assets.set_asset_contents(created.id, &[first.id]).await.unwrap();
        assert_eq!(remaining.len(), 1);
    }

    #[tokio::test]
    async fn test_asset_references_checked() {
        let (assets, _, _dir) = service().await;
        let err = assets
            .create_asset(AssetInput {
                asset_type_id: Some(77),
                ..asset("Orphan")
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidReference { field: "asset_type_id", .. }));

        let err = assets
            .create_asset(AssetInput {
                contents: Some(vec![5, 6]),
                ..asset("Orphan")
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidReference { ref ids, .. } if ids == &vec![5, 6]));
        assert!(assets.list_assets().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_type_in_use_cannot_be_deleted() {
        let (assets, _, _dir) = service().await;
        let video = assets
            .create_type(AssetTypeInput { name: "Video".into() })
            .await
            .unwrap();
        assets
            .create_asset(AssetInput {
                asset_type_id: Some(video.id),
                ..asset("Clip")
            })
            .await
            .unwrap();
        assert!(matches!(
            assets.delete_type(video.id).await,
            Err(ServiceError::Conflict(_))
        ));

        let err = assets
            .create_type(AssetTypeInput {
                name: "x".repeat(21),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(ref e) if e.field == "name"));
    }

    #[tokio::test]
    async fn test_association_labels() {
        let (assets, _, _dir) = service().await;
        let banner = assets.create_asset(asset("Banner")).await.unwrap();

        let placed = assets
            .create_association(AssetAssociationInput {
                asset_id: Some(banner.id),
                template_location: Some("header".into()),
            })
            .await
            .unwrap();
        assert_eq!(placed.label, "At header asset Banner");

        let unplaced = assets
            .create_association(AssetAssociationInput {
                asset_id: Some(banner.id),
                template_location: Some("  ".into()),
            })
            .await
            .unwrap();
        assert_eq!(unplaced.label, "Banner");

        let views = assets.associations_of(banner.id).await.unwrap();
        assert_eq!(views.len(), 2);

        assert!(matches!(
            assets.delete_asset(banner.id).await,
            Err(ServiceError::Conflict(_))
        ));

        let err = assets
            .create_association(AssetAssociationInput {
                asset_id: Some(999),
                template_location: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidReference { field: "asset_id", .. }));
    }

    #[tokio::test]
    async fn test_thumbnail_upload_replaces_file() {
        let (assets, media, _dir) = service().await;
        let created = assets.create_asset(asset("Cover")).await.unwrap();

        let img = DynamicImage::ImageRgb8(RgbImage::new(400, 400));
        let mut png = Vec::new();
        img.write_to(&mut Cursor::new(&mut png), ImageOutputFormat::Png)
            .unwrap();

        let first = assets.upload_thumbnail(created.id, "cover.png", &png).await.unwrap();
        let first_path = first.thumbnail.unwrap();
        assert!(first_path.starts_with("uploads/thumbnails/"));

        let second = assets.upload_thumbnail(created.id, "cover.png", &png).await.unwrap();
        let second_path = second.thumbnail.unwrap();
        assert!(!media.resolve(&first_path).unwrap().exists());
        assert!(media.resolve(&second_path).unwrap().exists());

        assets.delete_asset(created.id).await.unwrap();
        assert!(!media.resolve(&second_path).unwrap().exists());
    }

    #[tokio::test]
    async fn test_content_file_upload_and_delete() {
        let (assets, media, _dir) = service().await;
        let clip = assets.create_content(content("clip", None)).await.unwrap();

        let updated = assets
            .upload_content_file(clip.id, "clip.mp4", b"\x00\x00\x00\x18ftypmp42")
            .await
            .unwrap();
        let path = updated.content.unwrap();
        assert!(path.starts_with("uploads/"));
        assert!(media.resolve(&path).unwrap().exists());

        assert!(matches!(
            assets.upload_content_file(clip.id, "clip.mov", b"data").await,
            Err(ServiceError::Media(_))
        ));

        assets.delete_content(clip.id).await.unwrap();
        assert!(!media.resolve(&path).unwrap().exists());
        assert!(matches!(
            assets.get_content(clip.id).await,
            Err(ServiceError::NotFound { .. })
        ));
    }
}
