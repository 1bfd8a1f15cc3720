use crate::store::crop_cache::{CachedCrop, CropCache, CropKey};
use crate::store::records::ImageId;
use crate::store::StoreError;
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio::sync::Mutex;

/// In-memory crop cache. Next to the payload cache it keeps a per-(image,
/// ratio) index of live keys so invalidation can enumerate exactly what was
/// stored instead of guessing widths.
pub struct MemoryCropCache {
    cache: quick_cache::sync::Cache<CropKey, Arc<CachedCrop>>,
    entries: quick_cache::sync::Cache<(ImageId, String), BTreeSet<CropKey>>,
    write_lock: Mutex<()>,
}

impl MemoryCropCache {
    pub fn new(capacity: Option<NonZeroUsize>) -> Self {
        let capacity = capacity.unwrap_or(NonZeroUsize::new(1024).unwrap());

        MemoryCropCache {
            cache: quick_cache::sync::Cache::new(capacity.into()),
            entries: quick_cache::sync::Cache::new(capacity.into()),
            write_lock: Mutex::new(()),
        }
    }

    fn entry_key(key: &CropKey) -> (ImageId, String) {
        (key.image_id, key.ratio_slug.clone())
    }
}

#[async_trait]
impl CropCache for MemoryCropCache {
    async fn get(&self, key: &CropKey) -> Result<Option<Arc<CachedCrop>>, StoreError> {
        Ok(self.cache.get(key))
    }

    async fn put(&self, key: &CropKey, crop: Arc<CachedCrop>) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;

        let entry_key = Self::entry_key(key);
        let mut entries = self.entries.get(&entry_key).unwrap_or_default();
        entries.insert(key.clone());
        self.entries.insert(entry_key, entries);
        self.cache.insert(key.clone(), crop);
        Ok(())
    }

    async fn invalidate(&self, image_id: ImageId, ratio_slug: &str) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;

        let entry_key = (image_id, ratio_slug.to_string());
        if let Some(entries) = self.entries.get(&entry_key) {
            for key in entries.iter() {
                self.cache.remove(key);
            }
        }
        self.entries.remove(&entry_key);
        Ok(())
    }
}
