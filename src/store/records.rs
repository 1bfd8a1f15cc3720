use crate::geometry::Rect;
use crate::store::persistent_store::{PersistSpace, PersistentStore};
use crate::store::StoreError;
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;

pub type ImageId = u64;

const NEXT_IMAGE_ID_KEY: &str = "next_image_id";

/// Stored metadata for one uploaded image. `width`/`height` always come from
/// decoding the uploaded bytes, never from client input.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ImageRecord {
    pub id: ImageId,
    pub name: String,
    pub credit: Option<String>,
    pub width: u32,
    pub height: u32,
    /// Editor selection overrides keyed by ratio slug. Entries are validated
    /// on every write path; slugs outside the configured ratio set are never
    /// stored.
    pub selections: BTreeMap<String, Rect>,
}

/// Closed set of client-updatable fields. Each one independently optional.
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct ImageRecordUpdate {
    pub name: Option<String>,
    pub credit: Option<String>,
    pub selections: Option<BTreeMap<String, Rect>>,
}

impl ImageRecordUpdate {
    fn apply(self, record: &mut ImageRecord) {
        if let Some(name) = self.name {
            record.name = name;
        }
        if let Some(credit) = self.credit {
            record.credit = Some(credit);
        }
        if let Some(selections) = self.selections {
            record.selections = selections;
        }
    }
}

/// Image record repository. Write paths hold an implementation-level write
/// lock so read-modify-write of the selections map never loses a concurrent
/// update to a different ratio slug.
#[async_trait]
pub trait ImageRecords: Send + Sync {
    async fn create(
        &self,
        name: String,
        credit: Option<String>,
        width: u32,
        height: u32,
    ) -> Result<ImageRecord, StoreError>;

    async fn get(&self, id: ImageId) -> Result<Option<ImageRecord>, StoreError>;

    async fn update(
        &self,
        id: ImageId,
        update: ImageRecordUpdate,
    ) -> Result<Option<ImageRecord>, StoreError>;

    /// Replace the selection override for one ratio slug, leaving every other
    /// entry untouched. The rectangle must already be validated.
    async fn set_selection(
        &self,
        id: ImageId,
        ratio_slug: &str,
        rect: Rect,
    ) -> Result<Option<ImageRecord>, StoreError>;

    /// Case-insensitive substring match on image name.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<ImageRecord>, StoreError>;
}

#[derive(Default)]
struct MemoryState {
    next_id: ImageId,
    records: BTreeMap<ImageId, ImageRecord>,
}

/// In-memory repository, used for tests and cache-only deployments.
pub struct MemoryRecords {
    state: Mutex<MemoryState>,
}

impl MemoryRecords {
    pub fn new() -> Self {
        MemoryRecords {
            state: Mutex::new(MemoryState::default()),
        }
    }
}

#[async_trait]
impl ImageRecords for MemoryRecords {
    async fn create(
        &self,
        name: String,
        credit: Option<String>,
        width: u32,
        height: u32,
    ) -> Result<ImageRecord, StoreError> {
        let mut state = self.state.lock().await;
        state.next_id += 1;
        let record = ImageRecord {
            id: state.next_id,
            name,
            credit,
            width,
            height,
            selections: BTreeMap::new(),
        };
        state.records.insert(record.id, record.clone());
        Ok(record)
    }

    async fn get(&self, id: ImageId) -> Result<Option<ImageRecord>, StoreError> {
        Ok(self.state.lock().await.records.get(&id).cloned())
    }

    async fn update(
        &self,
        id: ImageId,
        update: ImageRecordUpdate,
    ) -> Result<Option<ImageRecord>, StoreError> {
        let mut state = self.state.lock().await;
        match state.records.get_mut(&id) {
            None => Ok(None),
            Some(record) => {
                update.apply(record);
                Ok(Some(record.clone()))
            }
        }
    }

    async fn set_selection(
        &self,
        id: ImageId,
        ratio_slug: &str,
        rect: Rect,
    ) -> Result<Option<ImageRecord>, StoreError> {
        let mut state = self.state.lock().await;
        match state.records.get_mut(&id) {
            None => Ok(None),
            Some(record) => {
                record.selections.insert(ratio_slug.to_string(), rect);
                Ok(Some(record.clone()))
            }
        }
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<ImageRecord>, StoreError> {
        let needle = query.to_lowercase();
        Ok(self
            .state
            .lock()
            .await
            .records
            .values()
            .filter(|record| record.name.to_lowercase().contains(&needle))
            .take(limit)
            .cloned()
            .collect())
    }
}

/// fjall-backed repository. Records live in their own keyspace under the id
/// as key; the id counter sits in the meta keyspace and is only touched under
/// the write lock.
pub struct FjallRecords {
    store: Arc<PersistentStore>,
    write_lock: Mutex<()>,
}

impl FjallRecords {
    pub fn new(store: Arc<PersistentStore>) -> Self {
        FjallRecords {
            store,
            write_lock: Mutex::new(()),
        }
    }

    async fn load(&self, id: ImageId) -> Result<Option<ImageRecord>, StoreError> {
        let value = self.store.get(PersistSpace::Records, &id.to_string()).await?;
        match value {
            None => Ok(None),
            Some(value) => Ok(Some(postcard::from_bytes(&value)?)),
        }
    }

    async fn save(&self, record: &ImageRecord) -> Result<(), StoreError> {
        let value = postcard::to_stdvec(record)?;
        self.store
            .set(PersistSpace::Records, &record.id.to_string(), value)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl ImageRecords for FjallRecords {
    async fn create(
        &self,
        name: String,
        credit: Option<String>,
        width: u32,
        height: u32,
    ) -> Result<ImageRecord, StoreError> {
        let _guard = self.write_lock.lock().await;

        let next_id: ImageId = match self.store.get(PersistSpace::Meta, NEXT_IMAGE_ID_KEY).await? {
            None => 1,
            Some(value) => postcard::from_bytes(&value)?,
        };
        let record = ImageRecord {
            id: next_id,
            name,
            credit,
            width,
            height,
            selections: BTreeMap::new(),
        };
        self.save(&record).await?;
        self.store
            .set(
                PersistSpace::Meta,
                NEXT_IMAGE_ID_KEY,
                postcard::to_stdvec(&(next_id + 1))?,
            )
            .await?;
        Ok(record)
    }

    async fn get(&self, id: ImageId) -> Result<Option<ImageRecord>, StoreError> {
        self.load(id).await
    }

    async fn update(
        &self,
        id: ImageId,
        update: ImageRecordUpdate,
    ) -> Result<Option<ImageRecord>, StoreError> {
        let _guard = self.write_lock.lock().await;
        match self.load(id).await? {
            None => Ok(None),
            Some(mut record) => {
                update.apply(&mut record);
                self.save(&record).await?;
                Ok(Some(record))
            }
        }
    }

    async fn set_selection(
        &self,
        id: ImageId,
        ratio_slug: &str,
        rect: Rect,
    ) -> Result<Option<ImageRecord>, StoreError> {
        let _guard = self.write_lock.lock().await;
        match self.load(id).await? {
            None => Ok(None),
            Some(mut record) => {
                record.selections.insert(ratio_slug.to_string(), rect);
                self.save(&record).await?;
                Ok(Some(record))
            }
        }
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<ImageRecord>, StoreError> {
        let needle = query.to_lowercase();
        let mut matches = Vec::new();
        for value in self.store.scan_values(PersistSpace::Records).await? {
            let record: ImageRecord = postcard::from_bytes(&value)?;
            if record.name.to_lowercase().contains(&needle) {
                matches.push(record);
            }
        }
        matches.sort_by_key(|record| record.id);
        matches.truncate(limit);
        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_records_assign_sequential_ids() {
        let records = MemoryRecords::new();
        let first = records.create("a.png".into(), None, 10, 10).await.unwrap();
        let second = records.create("b.png".into(), None, 10, 10).await.unwrap();
        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert!(records.get(2).await.unwrap().is_some());
        assert!(records.get(3).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn set_selection_replaces_only_its_slug() {
        let records = MemoryRecords::new();
        let image = records.create("a.png".into(), None, 512, 512).await.unwrap();
        let one = Rect {
            x0: 0,
            y0: 0,
            x1: 256,
            y1: 256,
        };
        let wide = Rect {
            x0: 0,
            y0: 100,
            x1: 512,
            y1: 388,
        };

        records.set_selection(image.id, "1x1", one).await.unwrap();
        let updated = records
            .set_selection(image.id, "16x9", wide)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.selections.get("1x1"), Some(&one));
        assert_eq!(updated.selections.get("16x9"), Some(&wide));
    }

    #[tokio::test]
    async fn update_applies_only_present_fields() {
        let records = MemoryRecords::new();
        let image = records
            .create("a.png".into(), Some("AP".into()), 512, 512)
            .await
            .unwrap();

        let updated = records
            .update(
                image.id,
                ImageRecordUpdate {
                    name: Some("renamed".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.name, "renamed");
        assert_eq!(updated.credit.as_deref(), Some("AP"));
    }

    #[tokio::test]
    async fn search_is_case_insensitive_and_bounded() {
        let records = MemoryRecords::new();
        for i in 0..25 {
            records
                .create(format!("Lenna-{i}.png"), None, 10, 10)
                .await
                .unwrap();
        }
        records.create("other.jpg".into(), None, 10, 10).await.unwrap();

        let hits = records.search("lenna", 20).await.unwrap();
        assert_eq!(hits.len(), 20);
        let hits = records.search("OTHER", 20).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert!(records.search("missing", 20).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn fjall_records_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(PersistentStore::new(
            Box::from(dir.path()),
            std::num::NonZeroUsize::new(4).unwrap(),
            std::num::NonZeroUsize::new(4).unwrap(),
        ));
        let records = FjallRecords::new(store);

        let image = records
            .create("Lenna.png".into(), Some("AP".into()), 512, 512)
            .await
            .unwrap();
        assert_eq!(image.id, 1);

        let rect = Rect {
            x0: 0,
            y0: 0,
            x1: 256,
            y1: 256,
        };
        records.set_selection(image.id, "1x1", rect).await.unwrap();

        let loaded = records.get(image.id).await.unwrap().unwrap();
        assert_eq!(loaded.name, "Lenna.png");
        assert_eq!(loaded.selections.get("1x1"), Some(&rect));

        let second = records.create("b.png".into(), None, 10, 10).await.unwrap();
        assert_eq!(second.id, 2);

        assert_eq!(records.search("lenna", 20).await.unwrap().len(), 1);
    }
}
