use crate::utils::background::BackgroundService;
use async_trait::async_trait;
use fjall::{Keyspace, KeyspaceCreateOptions, PersistMode, Slice};
use log::{debug, warn};
use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use strum::{Display, EnumString};
use tokio::sync::watch::Receiver;
use tokio::task::spawn_blocking;

#[derive(Debug, EnumString, Display, Clone, Copy)]
pub enum PersistSpace {
    Records,
    Sources,
    Crops,
    Meta,
}

const RECORDS_KEYSPACE: &str = "records";
const SOURCES_KEYSPACE: &str = "sources";
const CROPS_KEYSPACE: &str = "crops";
const META_KEYSPACE: &str = "meta";

/// Expecting source image is about 2mb size
const SOURCE_IMAGE_SIZE: u64 = 2048 * 1024;

/// Expecting rendered crop is about 64kb size
const CROPPED_IMAGE_SIZE: u64 = 64 * 1024;

/// One fjall database holding every persistent keyspace: image records,
/// source blobs, rendered crops and the id counter. Keys are raw strings so
/// prefix scans over `{image_id}/{ratio}/` stay byte-ordered.
pub struct PersistentStore {
    db: fjall::Database,
    records_keyspace: Keyspace,
    sources_keyspace: Keyspace,
    crops_keyspace: Keyspace,
    meta_keyspace: Keyspace,
}

impl PersistentStore {
    pub fn new(
        db_path: Box<Path>,
        expected_sources: NonZeroUsize,
        expected_crops: NonZeroUsize,
    ) -> Self {
        let sources_size = SOURCE_IMAGE_SIZE * expected_sources.get() as u64;
        let crops_size = CROPPED_IMAGE_SIZE * expected_crops.get() as u64;
        let db_cache_size = sources_size + crops_size;

        let db = fjall::Database::builder(db_path)
            .cache_size(db_cache_size)
            .open()
            .unwrap();

        let records_keyspace = db
            .keyspace(RECORDS_KEYSPACE, KeyspaceCreateOptions::default)
            .unwrap();
        let sources_keyspace = db
            .keyspace(SOURCES_KEYSPACE, KeyspaceCreateOptions::default)
            .unwrap();
        let crops_keyspace = db
            .keyspace(CROPS_KEYSPACE, KeyspaceCreateOptions::default)
            .unwrap();
        let meta_keyspace = db
            .keyspace(META_KEYSPACE, KeyspaceCreateOptions::default)
            .unwrap();

        PersistentStore {
            db,
            records_keyspace,
            sources_keyspace,
            crops_keyspace,
            meta_keyspace,
        }
    }

    fn keyspace(&self, space: PersistSpace) -> Keyspace {
        match space {
            PersistSpace::Records => self.records_keyspace.clone(),
            PersistSpace::Sources => self.sources_keyspace.clone(),
            PersistSpace::Crops => self.crops_keyspace.clone(),
            PersistSpace::Meta => self.meta_keyspace.clone(),
        }
    }

    pub async fn get(&self, space: PersistSpace, key: &str) -> Result<Option<Slice>, fjall::Error> {
        let keyspace = self.keyspace(space);
        let key = key.as_bytes().to_vec();

        spawn_blocking(move || keyspace.get(key)).await.unwrap()
    }

    pub async fn set(
        &self,
        space: PersistSpace,
        key: &str,
        value: Vec<u8>,
    ) -> Result<(), fjall::Error> {
        let keyspace = self.keyspace(space);
        let key = key.as_bytes().to_vec();

        spawn_blocking(move || keyspace.insert(key, value).map(|_| ()))
            .await
            .unwrap()
    }

    pub async fn remove(&self, space: PersistSpace, key: &str) -> Result<(), fjall::Error> {
        let keyspace = self.keyspace(space);
        let key = key.as_bytes().to_vec();

        spawn_blocking(move || keyspace.remove(key).map(|_| ()))
            .await
            .unwrap()
    }

    pub async fn remove_by_prefix(
        &self,
        space: PersistSpace,
        prefix: &str,
    ) -> Result<(), fjall::Error> {
        let keyspace = self.keyspace(space);
        let prefix = prefix.as_bytes().to_vec();

        spawn_blocking(move || {
            for item in keyspace.prefix(prefix) {
                keyspace.remove(item.key()?).map(|_| ())?;
            }
            Ok(())
        })
        .await
        .unwrap()
    }

    /// All values in a keyspace, in key order.
    pub async fn scan_values(&self, space: PersistSpace) -> Result<Vec<Slice>, fjall::Error> {
        let keyspace = self.keyspace(space);

        spawn_blocking(move || {
            let mut values = Vec::new();
            for item in keyspace.prefix(Vec::<u8>::new()) {
                values.push(item.value()?);
            }
            Ok(values)
        })
        .await
        .unwrap()
    }

    pub fn persist(&self) -> Result<(), fjall::Error> {
        self.db.persist(PersistMode::SyncAll)
    }
}

/// Flushes the fjall database to disk on a timer and once more on shutdown.
pub struct PersistFlusher {
    store: Arc<PersistentStore>,
    cancel_chan: (
        tokio::sync::watch::Sender<bool>,
        tokio::sync::watch::Receiver<bool>,
    ),
}

impl PersistFlusher {
    pub fn new(store: Arc<PersistentStore>) -> Self {
        PersistFlusher {
            store,
            cancel_chan: tokio::sync::watch::channel(false),
        }
    }

    fn flush(&self) {
        debug!("Flushing images to disk");
        if let Err(err) = self.store.persist() {
            warn!("Failed to flush data to disk, got error: {}", err)
        }
    }
}

#[async_trait]
impl BackgroundService for PersistFlusher {
    fn background_period(&self) -> Duration {
        Duration::new(60, 0)
    }

    async fn background(&mut self) {
        self.flush();
    }

    fn cancel_token(&self) -> Receiver<bool> {
        self.cancel_chan.1.clone()
    }

    async fn stop(&mut self) {
        self.flush();
        let _ = self.cancel_chan.0.send(true);
    }
}
