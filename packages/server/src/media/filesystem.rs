use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;

use super::error::MediaError;
use super::hash::ContentHash;
use super::image::{DecodedImage, ImageName};
use super::ImageStore;

/// Filesystem-backed content-addressed image store.
///
/// Images are stored in a Git-style sharded directory layout:
/// `{base_path}/{first 2 hex chars}/{remaining 62 hex chars}.{ext}`
pub struct FilesystemImageStore {
    base_path: PathBuf,
}

impl FilesystemImageStore {
    pub async fn new(base_path: PathBuf) -> Result<Self, MediaError> {
        fs::create_dir_all(&base_path).await?;
        fs::create_dir_all(base_path.join(".tmp")).await?;
        Ok(Self { base_path })
    }

    fn image_path(&self, name: &ImageName) -> PathBuf {
        self.base_path.join(name.hash.shard_prefix()).join(format!(
            "{}.{}",
            name.hash.shard_suffix(),
            name.format.extension()
        ))
    }

    fn temp_path(&self) -> PathBuf {
        self.base_path
            .join(".tmp")
            .join(uuid::Uuid::new_v4().to_string())
    }
}

#[async_trait]
impl ImageStore for FilesystemImageStore {
    async fn put(&self, image: &DecodedImage) -> Result<ImageName, MediaError> {
        let name = ImageName {
            hash: ContentHash::compute(&image.bytes),
            format: image.format,
        };
        if self.exists(&name).await? {
            return Ok(name);
        }
        let path = self.image_path(&name);

        // Write to a temp file first so readers never observe a partial image.
        let temp_path = self.temp_path();
        if let Err(e) = fs::write(&temp_path, &image.bytes).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        if let Err(e) = fs::rename(&temp_path, &path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        tracing::debug!(image = %name, bytes = image.bytes.len(), "Stored image");
        Ok(name)
    }

    async fn get(&self, name: &ImageName) -> Result<Vec<u8>, MediaError> {
        match fs::read(self.image_path(name)).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(MediaError::NotFound(name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, name: &ImageName) -> Result<bool, MediaError> {
        Ok(fs::try_exists(self.image_path(name)).await?)
    }
}
