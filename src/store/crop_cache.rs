use crate::image_ops::image_types::OutputFormat;
use crate::store::records::ImageId;
use crate::store::StoreError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Cache identity for one rendered crop.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CropKey {
    pub image_id: ImageId,
    pub ratio_slug: String,
    pub width: u32,
    pub format: OutputFormat,
}

impl CropKey {
    /// Backing-store key. Invalidation of an (image, ratio) pair relies on
    /// the `{image_id}/{ratio}/` prefix of this layout.
    pub fn storage_key(&self) -> String {
        format!(
            "{}/{}/{}.{}",
            self.image_id,
            self.ratio_slug,
            self.width,
            self.format.extension()
        )
    }

    /// Public URL path of this crop, as handed to the cache flush hook.
    pub fn public_path(&self) -> String {
        format!(
            "/images/{}/{}/{}.{}",
            self.image_id,
            self.ratio_slug,
            self.width,
            self.format.extension()
        )
    }
}

/// Encoded crop payload as served to clients.
#[derive(Clone, Serialize, Deserialize)]
pub struct CachedCrop {
    pub data: Vec<u8>,
    pub format: OutputFormat,
}

/// Lookaside cache for rendered crops.
#[async_trait]
pub trait CropCache: Send + Sync {
    async fn get(&self, key: &CropKey) -> Result<Option<Arc<CachedCrop>>, StoreError>;

    async fn put(&self, key: &CropKey, crop: Arc<CachedCrop>) -> Result<(), StoreError>;

    /// Drop every cached width and format for one (image, ratio) pair,
    /// leaving other ratios of the same image untouched.
    async fn invalidate(&self, image_id: ImageId, ratio_slug: &str) -> Result<(), StoreError>;
}

/// No-op cache for deployments that only want flush-hook invalidation; every
/// request renders fresh and there is no backing storage to delete from.
pub struct DisabledCropCache;

#[async_trait]
impl CropCache for DisabledCropCache {
    async fn get(&self, _key: &CropKey) -> Result<Option<Arc<CachedCrop>>, StoreError> {
        Ok(None)
    }

    async fn put(&self, _key: &CropKey, _crop: Arc<CachedCrop>) -> Result<(), StoreError> {
        Ok(())
    }

    async fn invalidate(&self, _image_id: ImageId, _ratio_slug: &str) -> Result<(), StoreError> {
        Ok(())
    }
}
