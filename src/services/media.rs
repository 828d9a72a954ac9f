//! Media storage
//!
//! Uploaded files are written beneath the configured media root with
//! generated names:
//! - `uploads/` for asset content (images and video)
//! - `uploads/thumbnails/` for asset thumbnails, cropped to [`THUMBNAIL_SIZE`]
//! - `uploads/sponsors/` for sponsor logos
//!
//! Stored paths are relative to the media root and use `/` separators, so
//! they can be served as-is under `/uploads`.

use image::{imageops::FilterType, ImageFormat, ImageOutputFormat};
use serde::Serialize;
use std::io::Cursor;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use uuid::Uuid;

use super::{ServiceError, ServiceResult};
use crate::config::MediaConfig;
use crate::models::THUMBNAIL_SIZE;

const JPEG_QUALITY: u8 = 85;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    AssetContent,
    Thumbnail,
    SponsorLogo,
}

impl MediaKind {
    pub fn dir(&self) -> &'static str {
        match self {
            MediaKind::AssetContent => "uploads",
            MediaKind::Thumbnail => "uploads/thumbnails",
            MediaKind::SponsorLogo => "uploads/sponsors",
        }
    }
}

/// A file written by [`MediaStorage::store`]
#[derive(Debug, Clone, Serialize)]
pub struct StoredFile {
    /// Path relative to the media root
    pub path: String,
    pub size: u64,
}

pub struct MediaStorage {
    config: MediaConfig,
}

impl MediaStorage {
    pub fn new(config: MediaConfig) -> Self {
        Self { config }
    }

    pub fn root(&self) -> &Path {
        &self.config.path
    }

    /// Largest accepted upload in bytes
    pub fn max_file_size(&self) -> u64 {
        self.config.max_file_size
    }

    /// Lowercased extension of `filename` if `kind` accepts it
    pub fn accepted_extension(&self, kind: MediaKind, filename: &str) -> ServiceResult<String> {
        let ext = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .ok_or_else(|| ServiceError::Media(format!("File has no extension: {}", filename)))?;

        let accepted = match kind {
            MediaKind::AssetContent => self.config.is_content_extension(&ext),
            MediaKind::Thumbnail | MediaKind::SponsorLogo => self.config.is_image_extension(&ext),
        };
        if !accepted {
            return Err(ServiceError::Media(format!(
                "File type .{} is not allowed here",
                ext
            )));
        }
        Ok(ext)
    }

    /// Validate and write an upload, returning where it was stored
    pub async fn store(&self, kind: MediaKind, filename: &str, data: &[u8]) -> ServiceResult<StoredFile> {
        if data.is_empty() {
            return Err(ServiceError::Media("The submitted file is empty".to_string()));
        }
        if data.len() as u64 > self.config.max_file_size {
            return Err(ServiceError::Media(format!(
                "File too large. Maximum size: {} bytes",
                self.config.max_file_size
            )));
        }
        let ext = self.accepted_extension(kind, filename)?;

        let (ext, bytes) = match kind {
            MediaKind::Thumbnail => {
                let data = data.to_vec();
                tokio::task::spawn_blocking(move || make_thumbnail(&data))
                    .await
                    .map_err(|e| ServiceError::Internal(e.into()))??
            }
            MediaKind::AssetContent | MediaKind::SponsorLogo => (ext, data.to_vec()),
        };

        let dir = self.config.path.join(kind.dir());
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| ServiceError::Internal(anyhow::anyhow!("Failed to create {:?}: {}", dir, e)))?;

        let name = format!("{}.{}", Uuid::new_v4(), ext);
        fs::write(dir.join(&name), &bytes)
            .await
            .map_err(|e| ServiceError::Internal(anyhow::anyhow!("Failed to save {}: {}", name, e)))?;

        let stored = StoredFile {
            path: format!("{}/{}", kind.dir(), name),
            size: bytes.len() as u64,
        };
        tracing::debug!("Stored {} ({} bytes)", stored.path, stored.size);
        Ok(stored)
    }

    /// Absolute location of a stored path; `None` if it escapes the root
    pub fn resolve(&self, stored: &str) -> Option<PathBuf> {
        let relative = Path::new(stored);
        let safe = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if !safe || stored.is_empty() {
            return None;
        }
        Some(self.config.path.join(relative))
    }

    /// Remove a stored file, best effort
    pub async fn remove(&self, stored: &str) {
        let Some(path) = self.resolve(stored) else {
            tracing::warn!("Refusing to remove {:?} outside the media root", stored);
            return;
        };
        if let Err(e) = fs::remove_file(&path).await {
            tracing::warn!("Failed to remove {:?}: {}", path, e);
        }
    }
}

/// Resize to fill [`THUMBNAIL_SIZE`] with a centred crop.
///
/// JPEG input stays JPEG; everything else is written as PNG.
fn make_thumbnail(data: &[u8]) -> ServiceResult<(String, Vec<u8>)> {
    let format = image::guess_format(data)
        .map_err(|e| ServiceError::Media(format!("Unrecognised image: {}", e)))?;
    let img = image::load_from_memory_with_format(data, format)
        .map_err(|e| ServiceError::Media(format!("Failed to decode image: {}", e)))?;

    let (width, height) = THUMBNAIL_SIZE;
    let thumb = img.resize_to_fill(width, height, FilterType::Lanczos3);

    let (ext, output) = if format == ImageFormat::Jpeg {
        ("jpg", ImageOutputFormat::Jpeg(JPEG_QUALITY))
    } else {
        ("png", ImageOutputFormat::Png)
    };
    let mut bytes = Vec::new();
    thumb
        .write_to(&mut Cursor::new(&mut bytes), output)
        .map_err(|e| ServiceError::Media(format!("Failed to encode thumbnail: {}", e)))?;
    Ok((ext.to_string(), bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, RgbImage};

    fn storage(dir: &Path) -> MediaStorage {
        MediaStorage::new(MediaConfig {
            path: dir.to_path_buf(),
            max_file_size: 1024 * 1024,
            ..Default::default()
        })
    }

    fn encoded(width: u32, height: u32, format: ImageOutputFormat) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, image::Rgb([200, 30, 30])));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), format).unwrap();
        bytes
    }

    #[test]
    fn test_extension_rules() {
        let dir = tempfile::tempdir().unwrap();
        let media = storage(dir.path());
        assert_eq!(media.accepted_extension(MediaKind::AssetContent, "clip.MP4").unwrap(), "mp4");
        assert!(media.accepted_extension(MediaKind::Thumbnail, "clip.mp4").is_err());
        assert!(media.accepted_extension(MediaKind::SponsorLogo, "logo").is_err());
        assert_eq!(media.accepted_extension(MediaKind::SponsorLogo, "logo.webp").unwrap(), "webp");
    }

    #[test]
    fn test_resolve_rejects_escapes() {
        let dir = tempfile::tempdir().unwrap();
        let media = storage(dir.path());
        assert!(media.resolve("uploads/a.png").is_some());
        assert!(media.resolve("../etc/passwd").is_none());
        assert!(media.resolve("/etc/passwd").is_none());
        assert!(media.resolve("").is_none());
    }

    #[tokio::test]
    async fn test_store_and_remove_content() {
        let dir = tempfile::tempdir().unwrap();
        let media = storage(dir.path());

        let stored = media
            .store(MediaKind::AssetContent, "intro.webm", b"not really video")
            .await
            .unwrap();
        assert!(stored.path.starts_with("uploads/"));
        assert!(stored.path.ends_with(".webm"));
        assert_eq!(stored.size, 16);

        let path = media.resolve(&stored.path).unwrap();
        assert!(path.exists());
        media.remove(&stored.path).await;
        assert!(!path.exists());
        // second removal is a no-op
        media.remove(&stored.path).await;
    }

    #[tokio::test]
    async fn test_store_rejects_size_and_type() {
        let dir = tempfile::tempdir().unwrap();
        let media = storage(dir.path());

        let big = vec![0u8; 1024 * 1024 + 1];
        assert!(matches!(
            media.store(MediaKind::AssetContent, "big.png", &big).await,
            Err(ServiceError::Media(_))
        ));
        assert!(matches!(
            media.store(MediaKind::SponsorLogo, "logo.exe", b"MZ").await,
            Err(ServiceError::Media(_))
        ));
        assert!(matches!(
            media.store(MediaKind::SponsorLogo, "logo.png", b"").await,
            Err(ServiceError::Media(_))
        ));
    }

    #[tokio::test]
    async fn test_thumbnail_is_cropped_png() {
        let dir = tempfile::tempdir().unwrap();
        let media = storage(dir.path());
        let source = encoded(640, 200, ImageOutputFormat::Png);

        let stored = media.store(MediaKind::Thumbnail, "wide.png", &source).await.unwrap();
        assert!(stored.path.starts_with("uploads/thumbnails/"));
        assert!(stored.path.ends_with(".png"));

        let written = std::fs::read(media.resolve(&stored.path).unwrap()).unwrap();
        let thumb = image::load_from_memory(&written).unwrap();
        assert_eq!((thumb.width(), thumb.height()), THUMBNAIL_SIZE);
    }

    #[tokio::test]
    async fn test_thumbnail_keeps_jpeg() {
        let dir = tempfile::tempdir().unwrap();
        let media = storage(dir.path());
        let source = encoded(120, 400, ImageOutputFormat::Jpeg(90));

        let stored = media.store(MediaKind::Thumbnail, "tall.jpeg", &source).await.unwrap();
        assert!(stored.path.ends_with(".jpg"));
        let written = std::fs::read(media.resolve(&stored.path).unwrap()).unwrap();
        assert_eq!(image::guess_format(&written).unwrap(), ImageFormat::Jpeg);
    }

    #[tokio::test]
    async fn test_thumbnail_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let media = storage(dir.path());
        assert!(matches!(
            media.store(MediaKind::Thumbnail, "x.png", b"definitely not an image").await,
            Err(ServiceError::Media(_))
        ));
    }
}
