use crate::store::persistent_store::{PersistSpace, PersistentStore};
use crate::store::records::ImageId;
use crate::store::StoreError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Serialize, Deserialize)]
struct SourceBlob {
    filename: String,
    data: Vec<u8>,
}

/// Storage for original uploaded bytes, one blob per image.
#[async_trait]
pub trait SourceStorage: Send + Sync {
    async fn write_source(
        &self,
        image_id: ImageId,
        filename: &str,
        data: Vec<u8>,
    ) -> Result<(), StoreError>;

    async fn read_source(&self, image_id: ImageId) -> Result<Option<Vec<u8>>, StoreError>;
}

pub struct MemorySources {
    blobs: RwLock<HashMap<ImageId, SourceBlob>>,
}

impl MemorySources {
    pub fn new() -> Self {
        MemorySources {
            blobs: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl SourceStorage for MemorySources {
    async fn write_source(
        &self,
        image_id: ImageId,
        filename: &str,
        data: Vec<u8>,
    ) -> Result<(), StoreError> {
        self.blobs.write().await.insert(
            image_id,
            SourceBlob {
                filename: filename.to_string(),
                data,
            },
        );
        Ok(())
    }

    async fn read_source(&self, image_id: ImageId) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self
            .blobs
            .read()
            .await
            .get(&image_id)
            .map(|blob| blob.data.clone()))
    }
}

pub struct FjallSources {
    store: Arc<PersistentStore>,
}

impl FjallSources {
    pub fn new(store: Arc<PersistentStore>) -> Self {
        FjallSources { store }
    }
}

#[async_trait]
impl SourceStorage for FjallSources {
    async fn write_source(
        &self,
        image_id: ImageId,
        filename: &str,
        data: Vec<u8>,
    ) -> Result<(), StoreError> {
        let blob = SourceBlob {
            filename: filename.to_string(),
            data,
        };
        self.store
            .set(
                PersistSpace::Sources,
                &image_id.to_string(),
                postcard::to_stdvec(&blob)?,
            )
            .await?;
        Ok(())
    }

    async fn read_source(&self, image_id: ImageId) -> Result<Option<Vec<u8>>, StoreError> {
        let value = self
            .store
            .get(PersistSpace::Sources, &image_id.to_string())
            .await?;
        match value {
            None => Ok(None),
            Some(value) => {
                let blob: SourceBlob = postcard::from_bytes(&value)?;
                Ok(Some(blob.data))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_sources_round_trip() {
        let sources = MemorySources::new();
        sources
            .write_source(1, "Lenna.png", vec![1, 2, 3])
            .await
            .unwrap();
        assert_eq!(sources.read_source(1).await.unwrap(), Some(vec![1, 2, 3]));
        assert_eq!(sources.read_source(2).await.unwrap(), None);
    }
}
