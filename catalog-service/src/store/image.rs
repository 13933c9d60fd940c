//! Image blob sink
//!
//! The upload handler only needs one call per completed upload returning a
//! stable identifier; everything behind that is swappable. The server binary
//! uses the disk-backed store, tests use the in-memory one.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

/// Blob sink for completed uploads.
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Persist the accumulated bytes and return a generated image id.
    async fn save(
        &self,
        laptop_id: &str,
        image_type: &str,
        data: Bytes,
    ) -> anyhow::Result<String>;
}

#[derive(Debug, Clone)]
pub struct ImageInfo {
    pub laptop_id: String,
    pub image_type: String,
    pub path: PathBuf,
}

/// Writes images as `<folder>/<uuid><ext>` and keeps their metadata in memory.
pub struct DiskImageStore {
    folder: PathBuf,
    images: RwLock<HashMap<String, ImageInfo>>,
}

impl DiskImageStore {
    pub fn new(folder: impl Into<PathBuf>) -> Self {
        Self {
            folder: folder.into(),
            images: RwLock::new(HashMap::new()),
        }
    }

    pub async fn info(&self, image_id: &str) -> Option<ImageInfo> {
        self.images.read().await.get(image_id).cloned()
    }
}

#[async_trait]
impl ImageStore for DiskImageStore {
    async fn save(
        &self,
        laptop_id: &str,
        image_type: &str,
        data: Bytes,
    ) -> anyhow::Result<String> {
        let image_id = Uuid::new_v4().to_string();
        let path = self.folder.join(format!("{image_id}{image_type}"));

        tokio::fs::create_dir_all(&self.folder).await?;
        tokio::fs::write(&path, &data).await?;

        info!(image_id = %image_id, path = %path.display(), size = data.len(), "image written");

        let mut images = self.images.write().await;
        images.insert(
            image_id.clone(),
            ImageInfo {
                laptop_id: laptop_id.to_string(),
                image_type: image_type.to_string(),
                path,
            },
        );

        Ok(image_id)
    }
}

/// In-memory sink for tests: records the bytes instead of writing files.
#[derive(Default)]
pub struct MemoryImageStore {
    images: RwLock<HashMap<String, Bytes>>,
}

impl MemoryImageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, image_id: &str) -> Option<Bytes> {
        self.images.read().await.get(image_id).cloned()
    }
}

#[async_trait]
impl ImageStore for MemoryImageStore {
    async fn save(
        &self,
        _laptop_id: &str,
        _image_type: &str,
        data: Bytes,
    ) -> anyhow::Result<String> {
        let image_id = Uuid::new_v4().to_string();
        let mut images = self.images.write().await;
        images.insert(image_id.clone(), data);
        Ok(image_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disk_store_writes_and_records_the_image() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskImageStore::new(dir.path());

        let id = store
            .save("laptop-1", ".jpg", Bytes::from_static(b"fake-jpeg-bytes"))
            .await
            .unwrap();

        let info = store.info(&id).await.expect("image should be recorded");
        assert_eq!(info.laptop_id, "laptop-1");
        assert_eq!(info.image_type, ".jpg");

        let written = tokio::fs::read(&info.path).await.unwrap();
        assert_eq!(written, b"fake-jpeg-bytes");
    }

    #[tokio::test]
    async fn memory_store_round_trips_bytes() {
        let store = MemoryImageStore::new();
        let id = store
            .save("laptop-1", ".png", Bytes::from_static(b"png"))
            .await
            .unwrap();

        assert_eq!(store.get(&id).await.unwrap(), Bytes::from_static(b"png"));
    }
}
