use crate::store::crop_cache::{CachedCrop, CropCache, CropKey};
use crate::store::persistent_store::{PersistSpace, PersistentStore};
use crate::store::records::ImageId;
use crate::store::StoreError;
use async_trait::async_trait;
use std::sync::Arc;

/// fjall-backed crop cache. Keys follow [`CropKey::storage_key`], so dropping
/// every variant of an (image, ratio) pair is a single prefix removal over
/// the lsm-tree.
pub struct PersistentCropCache {
    store: Arc<PersistentStore>,
}

impl PersistentCropCache {
    pub fn new(store: Arc<PersistentStore>) -> Self {
        PersistentCropCache { store }
    }
}

#[async_trait]
impl CropCache for PersistentCropCache {
    async fn get(&self, key: &CropKey) -> Result<Option<Arc<CachedCrop>>, StoreError> {
        let value = self
            .store
            .get(PersistSpace::Crops, &key.storage_key())
            .await?;
        match value {
            None => Ok(None),
            Some(value) => Ok(Some(Arc::new(postcard::from_bytes::<CachedCrop>(&value)?))),
        }
    }

    async fn put(&self, key: &CropKey, crop: Arc<CachedCrop>) -> Result<(), StoreError> {
        self.store
            .set(
                PersistSpace::Crops,
                &key.storage_key(),
                postcard::to_stdvec(crop.as_ref())?,
            )
            .await?;
        Ok(())
    }

    async fn invalidate(&self, image_id: ImageId, ratio_slug: &str) -> Result<(), StoreError> {
        self.store
            .remove_by_prefix(PersistSpace::Crops, &format!("{}/{}/", image_id, ratio_slug))
            .await?;
        Ok(())
    }
}
