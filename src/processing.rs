use crate::config::CropConfig;
use crate::flush::CacheFlusher;
use crate::geometry::{self, GeometryError, Ratio, Rect};
use crate::image_ops::image_types::OutputFormat;
use crate::image_ops::operations;
use crate::store::crop_cache::{CachedCrop, CropCache, CropKey};
use crate::store::records::{ImageId, ImageRecord, ImageRecordUpdate, ImageRecords};
use crate::store::sources::SourceStorage;
use crate::store::StoreError;
use log::{debug, warn};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::spawn_blocking;
use tracing::instrument;

#[derive(Debug, Clone, Copy)]
pub enum CropErrorType {
    Validation,
    UnknownRatio,
    InvalidSelection,
    NotFound,
    Decode,
    Storage,
}

impl CropErrorType {
    pub fn default_detail(&self) -> String {
        match &self {
            CropErrorType::Validation => "Bad request".to_string(),
            CropErrorType::UnknownRatio => "No such ratio".to_string(),
            CropErrorType::InvalidSelection => "Bad selection".to_string(),
            CropErrorType::NotFound => "No such image!".to_string(),
            CropErrorType::Decode => "Source image could not be decoded".to_string(),
            CropErrorType::Storage => "Storage failure".to_string(),
        }
    }
}

#[derive(Debug)]
pub struct CropError {
    pub err_type: CropErrorType,
    pub detail: String,
}

impl CropError {
    fn new(err_type: CropErrorType, detail: Option<String>) -> Self {
        let detail = detail.unwrap_or(err_type.default_detail());
        CropError { err_type, detail }
    }

    fn not_found() -> Self {
        CropError::new(CropErrorType::NotFound, None)
    }

    fn validation(detail: String) -> Self {
        CropError::new(CropErrorType::Validation, Some(detail))
    }
}

impl From<StoreError> for CropError {
    fn from(err: StoreError) -> Self {
        CropError::new(CropErrorType::Storage, Some(err.reason))
    }
}

impl From<GeometryError> for CropError {
    fn from(_: GeometryError) -> Self {
        CropError::new(CropErrorType::UnknownRatio, None)
    }
}

/// Orchestrates a crop request end to end: validation, record lookup, cache
/// lookup, and on miss the decode/crop/resize/encode pipeline. Also owns the
/// selection update path including cache invalidation.
pub struct Processor {
    records: Arc<dyn ImageRecords>,
    sources: Arc<dyn SourceStorage>,
    cache: Arc<dyn CropCache>,
    flusher: Option<Arc<dyn CacheFlusher>>,
    crop: Arc<CropConfig>,
    /// Per-CropKey gates collapsing duplicate in-flight render work.
    inflight: Mutex<HashMap<CropKey, Arc<Mutex<()>>>>,
}

impl Processor {
    pub fn new(
        records: Arc<dyn ImageRecords>,
        sources: Arc<dyn SourceStorage>,
        cache: Arc<dyn CropCache>,
        flusher: Option<Arc<dyn CacheFlusher>>,
        crop: Arc<CropConfig>,
    ) -> Self {
        Processor {
            records,
            sources,
            cache,
            flusher,
            crop,
            inflight: Mutex::new(HashMap::new()),
        }
    }

    /// Serve one crop, from cache when possible.
    ///
    /// Repeated calls with the same key and unchanged selection state return
    /// byte-identical output; the rendered result is only persisted for
    /// widths in the configured persist set.
    #[instrument(skip(self), fields(image_id = %image_id))]
    pub async fn resolve_crop(
        &self,
        image_id: ImageId,
        ratio_slug: &str,
        width: u32,
        format: OutputFormat,
    ) -> Result<Arc<CachedCrop>, CropError> {
        let ratio = geometry::parse_allowed_ratio(&self.crop.ratios, ratio_slug)?;
        if width == 0 || width > self.crop.max_width {
            return Err(CropError::validation(format!(
                "Width must be between 1 and {}",
                self.crop.max_width
            )));
        }
        if !self.crop.allows_format(format) {
            return Err(CropError::validation(format!(
                "Output format {} is not enabled",
                format.extension()
            )));
        }

        let record = self
            .records
            .get(image_id)
            .await?
            .ok_or_else(CropError::not_found)?;

        let key = CropKey {
            image_id,
            ratio_slug: ratio_slug.to_string(),
            width,
            format,
        };
        if let Some(cached) = self.cache.get(&key).await? {
            debug!("Fetched crop {} from cache", key.storage_key());
            return Ok(cached);
        }

        // Collapse concurrent misses for the same key: one request renders,
        // the rest re-check the cache once the gate opens.
        let gate = {
            let mut inflight = self.inflight.lock().await;
            inflight
                .entry(key.clone())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        let outcome = {
            let _guard = gate.lock().await;
            match self.cache.get(&key).await {
                Ok(Some(cached)) => {
                    debug!("Crop {} rendered by concurrent request", key.storage_key());
                    Ok(cached)
                }
                Ok(None) => self.render_crop(&record, &ratio, &key).await,
                Err(err) => Err(CropError::from(err)),
            }
        };
        {
            let mut inflight = self.inflight.lock().await;
            if let Some(current) = inflight.get(&key) {
                if Arc::strong_count(current) <= 2 {
                    inflight.remove(&key);
                }
            }
        }
        outcome
    }

    /// Cache-miss path: geometry, decode, crop, resize, encode, and a cache
    /// write when the width is in the persist set.
    #[instrument(skip(self, record), fields(image_id = %record.id))]
    async fn render_crop(
        &self,
        record: &ImageRecord,
        ratio: &Ratio,
        key: &CropKey,
    ) -> Result<Arc<CachedCrop>, CropError> {
        let override_selection = record.selections.get(key.ratio_slug.as_str()).copied();
        let rect = geometry::resolve_rectangle(
            &self.crop.ratios,
            record.width,
            record.height,
            ratio,
            override_selection,
        )?;
        let plan = geometry::compute_crop_box(rect, key.width);

        let source = self
            .sources
            .read_source(record.id)
            .await?
            .ok_or_else(|| CropError::new(CropErrorType::Storage, Some(format!(
                "Source blob for image {} is missing",
                record.id
            ))))?;

        let format = key.format;
        let quality = self.crop.quality;
        let crop = spawn_blocking(move || -> Result<CachedCrop, CropError> {
            let img = operations::decode(&source)
                .map_err(|err| CropError::new(CropErrorType::Decode, Some(err.to_string())))?;
            let resized = operations::crop_and_resize(&img, &plan);
            let data = operations::encode(&resized, format, quality).map_err(|err| {
                CropError::new(
                    CropErrorType::Decode,
                    Some(format!("Failed to encode crop: {}", err)),
                )
            })?;
            Ok(CachedCrop { data, format })
        })
        .await
        .unwrap()?;

        let crop = Arc::new(crop);
        if self.crop.should_persist(key.width) {
            self.cache.put(key, crop.clone()).await?;
        } else {
            debug!(
                "Width {} not in persist set, serving crop {} without caching",
                key.width,
                key.storage_key()
            );
        }
        Ok(crop)
    }

    /// Store an editor selection for one ratio, then drop every cached crop
    /// that depended on it.
    #[instrument(skip(self), fields(image_id = %image_id))]
    pub async fn update_selection(
        &self,
        image_id: ImageId,
        ratio_slug: &str,
        x0: i64,
        y0: i64,
        x1: i64,
        y1: i64,
    ) -> Result<ImageRecord, CropError> {
        geometry::parse_allowed_ratio(&self.crop.ratios, ratio_slug)?;
        let record = self
            .records
            .get(image_id)
            .await?
            .ok_or_else(CropError::not_found)?;

        let rect = Rect::checked(x0, y0, x1, y1, record.width, record.height)
            .ok_or_else(|| CropError::new(CropErrorType::InvalidSelection, None))?;

        let updated = self
            .records
            .set_selection(image_id, ratio_slug, rect)
            .await?
            .ok_or_else(CropError::not_found)?;

        self.invalidate_crops(image_id, ratio_slug).await?;
        Ok(updated)
    }

    /// Drop cached crops for one (image, ratio) pair and notify the edge
    /// cache for every configured width and format. Hook failures are logged
    /// only; a stale edge entry must not block the edit.
    async fn invalidate_crops(&self, image_id: ImageId, ratio_slug: &str) -> Result<(), CropError> {
        self.cache.invalidate(image_id, ratio_slug).await?;

        if let Some(flusher) = &self.flusher {
            for width in &self.crop.widths {
                for format in &self.crop.formats {
                    let key = CropKey {
                        image_id,
                        ratio_slug: ratio_slug.to_string(),
                        width: *width,
                        format: *format,
                    };
                    let path = key.public_path();
                    if let Err(err) = flusher.flush(&path).await {
                        warn!(
                            "Failed to flush {} from edge cache: {} (status {:?})",
                            path, err.reason, err.http_error_code
                        );
                    }
                }
            }
        }
        Ok(())
    }

    /// Register an upload: probe the decoded dimensions, create the record,
    /// store the source bytes.
    pub async fn create_image(
        &self,
        name: Option<String>,
        credit: Option<String>,
        filename: String,
        data: Vec<u8>,
    ) -> Result<ImageRecord, CropError> {
        let probe_data = data.clone();
        let (width, height) = spawn_blocking(move || operations::probe_dimensions(&probe_data))
            .await
            .unwrap()
            .map_err(|err| CropError::validation(format!("Bad image data: {}", err)))?;

        let name = name.filter(|name| !name.is_empty()).unwrap_or_else(|| filename.clone());
        let record = self.records.create(name, credit, width, height).await?;
        self.sources.write_source(record.id, &filename, data).await?;
        Ok(record)
    }

    pub async fn get_image(&self, image_id: ImageId) -> Result<ImageRecord, CropError> {
        self.records
            .get(image_id)
            .await?
            .ok_or_else(CropError::not_found)
    }

    /// Apply a metadata patch. A replaced selections map is validated the
    /// same way single-selection updates are, and every ratio touched by the
    /// replacement (old or new) gets its cached crops invalidated.
    pub async fn update_image(
        &self,
        image_id: ImageId,
        update: ImageRecordUpdate,
    ) -> Result<ImageRecord, CropError> {
        let record = self
            .records
            .get(image_id)
            .await?
            .ok_or_else(CropError::not_found)?;

        let mut touched_ratios = Vec::new();
        if let Some(selections) = &update.selections {
            for (slug, rect) in selections {
                geometry::parse_allowed_ratio(&self.crop.ratios, slug)?;
                if !rect.fits_within(record.width, record.height) {
                    return Err(CropError::new(
                        CropErrorType::InvalidSelection,
                        Some(format!("Bad selection for ratio {}", slug)),
                    ));
                }
            }
            touched_ratios = record
                .selections
                .keys()
                .chain(selections.keys())
                .cloned()
                .collect::<std::collections::BTreeSet<_>>()
                .into_iter()
                .collect();
        }

        let updated = self
            .records
            .update(image_id, update)
            .await?
            .ok_or_else(CropError::not_found)?;

        for slug in touched_ratios {
            self.invalidate_crops(image_id, &slug).await?;
        }
        Ok(updated)
    }

    pub async fn search_images(&self, query: &str) -> Result<Vec<ImageRecord>, CropError> {
        Ok(self.records.search(query, 20).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flush::FlushError;
    use crate::store::memory_crop_cache::MemoryCropCache;
    use crate::store::records::MemoryRecords;
    use crate::store::sources::MemorySources;
    use async_trait::async_trait;
    use std::collections::{BTreeMap, BTreeSet};
    use std::str::FromStr;

    struct RecordingFlusher {
        flushed: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl CacheFlusher for RecordingFlusher {
        async fn flush(&self, path: &str) -> Result<(), FlushError> {
            self.flushed.lock().await.push(path.to_string());
            Ok(())
        }
    }

    struct Fixture {
        processor: Processor,
        sources: Arc<MemorySources>,
        flusher: Arc<RecordingFlusher>,
    }

    fn fixture() -> Fixture {
        let crop = Arc::new(CropConfig {
            ratios: ["1x1", "3x1", "16x9"]
                .iter()
                .map(|slug| Ratio::from_str(slug).ok().unwrap())
                .collect(),
            widths: BTreeSet::from([200, 400]),
            max_width: 2000,
            formats: vec![OutputFormat::Jpeg, OutputFormat::Png],
            quality: 82,
        });
        let sources = Arc::new(MemorySources::new());
        let flusher = Arc::new(RecordingFlusher {
            flushed: Mutex::new(Vec::new()),
        });
        let processor = Processor::new(
            Arc::new(MemoryRecords::new()),
            sources.clone(),
            Arc::new(MemoryCropCache::new(None)),
            Some(flusher.clone()),
            crop,
        );
        Fixture {
            processor,
            sources,
            flusher,
        }
    }

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = image::DynamicImage::ImageRgb8(image::RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x % 251) as u8, (y % 241) as u8, ((x + y) % 239) as u8])
        }));
        operations::encode(&img, OutputFormat::Png, 82).unwrap()
    }

    fn unwrap_crop<T>(result: Result<T, CropError>) -> T {
        match result {
            Ok(value) => value,
            Err(err) => panic!("unexpected crop error: {}", err.detail),
        }
    }

    async fn upload(fixture: &Fixture, width: u32, height: u32) -> ImageRecord {
        unwrap_crop(
            fixture
                .processor
                .create_image(
                    Some("Lenna".into()),
                    None,
                    "Lenna.png".into(),
                    png_bytes(width, height),
                )
                .await,
        )
    }

    #[tokio::test]
    async fn upload_probes_dimensions_from_decoded_bytes() {
        let fx = fixture();
        let record = upload(&fx, 512, 384).await;
        assert_eq!((record.width, record.height), (512, 384));
        assert_eq!(record.name, "Lenna");
        assert!(record.selections.is_empty());

        // Empty name falls back to the uploaded filename.
        let record = unwrap_crop(
            fx.processor
                .create_image(Some(String::new()), None, "fallback.png".into(), png_bytes(8, 8))
                .await,
        );
        assert_eq!(record.name, "fallback.png");
    }

    #[tokio::test]
    async fn upload_rejects_bytes_that_do_not_decode() {
        let fx = fixture();
        let err = fx
            .processor
            .create_image(None, None, "junk.png".into(), b"not an image".to_vec())
            .await
            .err()
            .unwrap();
        assert!(matches!(err.err_type, CropErrorType::Validation));
    }

    #[tokio::test]
    async fn resolve_crop_is_idempotent_and_reuses_cache() {
        let fx = fixture();
        let record = upload(&fx, 512, 512).await;

        let first = unwrap_crop(
            fx.processor
                .resolve_crop(record.id, "1x1", 200, OutputFormat::Jpeg)
                .await,
        );
        let second = unwrap_crop(
            fx.processor
                .resolve_crop(record.id, "1x1", 200, OutputFormat::Jpeg)
                .await,
        );
        // Width 200 is in the persist set: the second call is a cache hit.
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.data, second.data);

        let decoded = operations::decode(&first.data).unwrap();
        assert_eq!(image::GenericImageView::dimensions(&decoded), (200, 200));
    }

    #[tokio::test]
    async fn arbitrary_widths_are_served_but_not_persisted() {
        let fx = fixture();
        let record = upload(&fx, 512, 512).await;

        let first = unwrap_crop(
            fx.processor
                .resolve_crop(record.id, "1x1", 250, OutputFormat::Jpeg)
                .await,
        );
        let second = unwrap_crop(
            fx.processor
                .resolve_crop(record.id, "1x1", 250, OutputFormat::Jpeg)
                .await,
        );
        assert!(!Arc::ptr_eq(&first, &second));
        // Deterministic output regardless of caching.
        assert_eq!(first.data, second.data);
    }

    #[tokio::test]
    async fn original_preserves_source_aspect() {
        let fx = fixture();
        let record = upload(&fx, 512, 256).await;

        let crop = unwrap_crop(
            fx.processor
                .resolve_crop(record.id, "original", 200, OutputFormat::Png)
                .await,
        );
        let decoded = operations::decode(&crop.data).unwrap();
        assert_eq!(image::GenericImageView::dimensions(&decoded), (200, 100));
    }

    #[tokio::test]
    async fn request_validation_happens_before_any_work() {
        let fx = fixture();
        let record = upload(&fx, 512, 512).await;

        let err = fx
            .processor
            .resolve_crop(record.id, "13x4", 200, OutputFormat::Jpeg)
            .await
            .err()
            .unwrap();
        assert!(matches!(err.err_type, CropErrorType::UnknownRatio));

        let err = fx
            .processor
            .resolve_crop(record.id, "1x1", 2001, OutputFormat::Jpeg)
            .await
            .err()
            .unwrap();
        assert!(matches!(err.err_type, CropErrorType::Validation));

        let err = fx
            .processor
            .resolve_crop(record.id, "1x1", 0, OutputFormat::Jpeg)
            .await
            .err()
            .unwrap();
        assert!(matches!(err.err_type, CropErrorType::Validation));

        // Webp is not in this fixture's format allow-list.
        let err = fx
            .processor
            .resolve_crop(record.id, "1x1", 200, OutputFormat::Webp)
            .await
            .err()
            .unwrap();
        assert!(matches!(err.err_type, CropErrorType::Validation));

        let err = fx
            .processor
            .resolve_crop(666, "1x1", 200, OutputFormat::Jpeg)
            .await
            .err()
            .unwrap();
        assert!(matches!(err.err_type, CropErrorType::NotFound));
    }

    #[tokio::test]
    async fn selection_update_invalidates_only_its_ratio() {
        let fx = fixture();
        let record = upload(&fx, 512, 512).await;

        let square_before = unwrap_crop(
            fx.processor
                .resolve_crop(record.id, "1x1", 200, OutputFormat::Jpeg)
                .await,
        );
        let wide_before = unwrap_crop(
            fx.processor
                .resolve_crop(record.id, "16x9", 200, OutputFormat::Jpeg)
                .await,
        );

        unwrap_crop(
            fx.processor
                .update_selection(record.id, "1x1", 0, 0, 100, 100)
                .await,
        );

        let square_after = unwrap_crop(
            fx.processor
                .resolve_crop(record.id, "1x1", 200, OutputFormat::Jpeg)
                .await,
        );
        assert!(!Arc::ptr_eq(&square_before, &square_after));
        assert_ne!(square_before.data, square_after.data);

        // The other ratio still hits its cached entry.
        let wide_after = unwrap_crop(
            fx.processor
                .resolve_crop(record.id, "16x9", 200, OutputFormat::Jpeg)
                .await,
        );
        assert!(Arc::ptr_eq(&wide_before, &wide_after));
    }

    #[tokio::test]
    async fn selection_update_notifies_every_configured_variant() {
        let fx = fixture();
        let record = upload(&fx, 512, 512).await;

        unwrap_crop(
            fx.processor
                .update_selection(record.id, "1x1", 0, 0, 256, 256)
                .await,
        );

        let mut flushed = fx.flusher.flushed.lock().await.clone();
        flushed.sort();
        let mut expected: Vec<String> = [200u32, 400]
            .iter()
            .flat_map(|width| {
                [OutputFormat::Jpeg, OutputFormat::Png]
                    .iter()
                    .map(move |format| {
                        format!(
                            "/images/{}/1x1/{}.{}",
                            record.id,
                            width,
                            format.extension()
                        )
                    })
            })
            .collect();
        expected.sort();
        assert_eq!(flushed, expected);
    }

    #[tokio::test]
    async fn invalid_selection_is_rejected_and_previous_state_kept() {
        let fx = fixture();
        let record = upload(&fx, 512, 512).await;

        unwrap_crop(
            fx.processor
                .update_selection(record.id, "1x1", 0, 0, 256, 256)
                .await,
        );
        let with_override = unwrap_crop(
            fx.processor
                .resolve_crop(record.id, "1x1", 250, OutputFormat::Jpeg)
                .await,
        );

        // x1 exceeds the image width.
        let err = fx
            .processor
            .update_selection(record.id, "1x1", 0, 0, 513, 512)
            .await
            .err()
            .unwrap();
        assert!(matches!(err.err_type, CropErrorType::InvalidSelection));

        // x0 >= x1.
        let err = fx
            .processor
            .update_selection(record.id, "1x1", 10, 0, 9, 512)
            .await
            .err()
            .unwrap();
        assert!(matches!(err.err_type, CropErrorType::InvalidSelection));

        // Negative coordinate.
        let err = fx
            .processor
            .update_selection(record.id, "1x1", -1, 0, 512, 512)
            .await
            .err()
            .unwrap();
        assert!(matches!(err.err_type, CropErrorType::InvalidSelection));

        let stored = unwrap_crop(fx.processor.get_image(record.id).await);
        assert_eq!(
            stored.selections.get("1x1"),
            Some(&Rect {
                x0: 0,
                y0: 0,
                x1: 256,
                y1: 256
            })
        );
        let after = unwrap_crop(
            fx.processor
                .resolve_crop(record.id, "1x1", 250, OutputFormat::Jpeg)
                .await,
        );
        assert_eq!(with_override.data, after.data);
    }

    #[tokio::test]
    async fn selection_for_unknown_ratio_fails_before_mutation() {
        let fx = fixture();
        let record = upload(&fx, 512, 512).await;

        let err = fx
            .processor
            .update_selection(record.id, "13x4", 0, 0, 100, 100)
            .await
            .err()
            .unwrap();
        assert!(matches!(err.err_type, CropErrorType::UnknownRatio));

        let stored = unwrap_crop(fx.processor.get_image(record.id).await);
        assert!(stored.selections.is_empty());
        assert!(fx.flusher.flushed.lock().await.is_empty());
    }

    #[tokio::test]
    async fn corrupt_stored_source_is_a_decode_error() {
        let fx = fixture();
        let record = upload(&fx, 512, 512).await;
        fx.sources
            .write_source(record.id, "Lenna.png", b"corrupted".to_vec())
            .await
            .unwrap();

        let err = fx
            .processor
            .resolve_crop(record.id, "1x1", 250, OutputFormat::Jpeg)
            .await
            .err()
            .unwrap();
        assert!(matches!(err.err_type, CropErrorType::Decode));
    }

    #[tokio::test]
    async fn patch_replacing_selections_invalidates_touched_ratios() {
        let fx = fixture();
        let record = upload(&fx, 512, 512).await;

        let before = unwrap_crop(
            fx.processor
                .resolve_crop(record.id, "1x1", 200, OutputFormat::Jpeg)
                .await,
        );

        let update = ImageRecordUpdate {
            name: Some("renamed".into()),
            credit: Some("AP".into()),
            selections: Some(BTreeMap::from([(
                "1x1".to_string(),
                Rect {
                    x0: 0,
                    y0: 0,
                    x1: 128,
                    y1: 128,
                },
            )])),
        };
        let updated = unwrap_crop(fx.processor.update_image(record.id, update).await);
        assert_eq!(updated.name, "renamed");
        assert_eq!(updated.credit.as_deref(), Some("AP"));

        let after = unwrap_crop(
            fx.processor
                .resolve_crop(record.id, "1x1", 200, OutputFormat::Jpeg)
                .await,
        );
        assert!(!Arc::ptr_eq(&before, &after));
        assert_ne!(before.data, after.data);
    }

    #[tokio::test]
    async fn patch_rejects_invalid_replacement_selections() {
        let fx = fixture();
        let record = upload(&fx, 512, 512).await;

        let update = ImageRecordUpdate {
            selections: Some(BTreeMap::from([(
                "1x1".to_string(),
                Rect {
                    x0: 0,
                    y0: 0,
                    x1: 513,
                    y1: 512,
                },
            )])),
            ..Default::default()
        };
        let err = fx.processor.update_image(record.id, update).await.err().unwrap();
        assert!(matches!(err.err_type, CropErrorType::InvalidSelection));

        let update = ImageRecordUpdate {
            selections: Some(BTreeMap::from([(
                "13x4".to_string(),
                Rect {
                    x0: 0,
                    y0: 0,
                    x1: 100,
                    y1: 100,
                },
            )])),
            ..Default::default()
        };
        let err = fx.processor.update_image(record.id, update).await.err().unwrap();
        assert!(matches!(err.err_type, CropErrorType::UnknownRatio));
    }

    #[tokio::test]
    async fn search_matches_names() {
        let fx = fixture();
        upload(&fx, 16, 16).await;

        let hits = unwrap_crop(fx.processor.search_images("lenna").await);
        assert_eq!(hits.len(), 1);
        assert!(unwrap_crop(fx.processor.search_images("missing").await).is_empty());
    }
}
