use crate::flush::{CacheFlusher, HttpCacheFlusher};
use crate::geometry::Ratio;
use crate::image_ops::image_types::OutputFormat;
use crate::processing::Processor;
use crate::store::crop_cache::{CropCache, DisabledCropCache};
use crate::store::memory_crop_cache::MemoryCropCache;
use crate::store::persistent_crop_cache::PersistentCropCache;
use crate::store::persistent_store::PersistentStore;
use crate::store::records::{FjallRecords, ImageRecords, MemoryRecords};
use crate::store::sources::{FjallSources, MemorySources, SourceStorage};
use envconfig::Envconfig;
use log::info;
use std::collections::BTreeSet;
use std::num::NonZeroUsize;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use strum::EnumString;

#[derive(Clone, EnumString, strum::Display, Eq, PartialEq)]
pub enum StorageImplementation {
    InMemory,
    Persistent,
}

#[derive(Clone, EnumString, strum::Display, Eq, PartialEq)]
pub enum CropCacheImplementation {
    InMemory,
    Persistent,
    /// Render every request fresh; invalidation still notifies the flush
    /// hook but there is no backing storage to delete from.
    Disabled,
}

/// Immutable crop policy handed to the geometry engine, the caches and the
/// resolver at construction time.
pub struct CropConfig {
    /// Allow-listed aspect ratios. `original` is implicit and always valid.
    pub ratios: Vec<Ratio>,
    /// Widths worth persisting in the crop cache. Other widths are served
    /// but never stored, and the flush hook enumerates exactly this set.
    pub widths: BTreeSet<u32>,
    pub max_width: u32,
    /// Output encodings accepted in crop URLs.
    pub formats: Vec<OutputFormat>,
    pub quality: u8,
}

impl CropConfig {
    pub fn allows_format(&self, format: OutputFormat) -> bool {
        self.formats.contains(&format)
    }

    pub fn should_persist(&self, width: u32) -> bool {
        self.widths.contains(&width)
    }
}

pub struct ParseListError {
    #[allow(dead_code)]
    msg: String,
}

pub struct RatioList(pub Vec<Ratio>);

impl FromStr for RatioList {
    type Err = ParseListError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut ratios = Vec::new();
        for part in s.split(',').map(str::trim).filter(|part| !part.is_empty()) {
            let ratio = Ratio::from_str(part).map_err(|err| ParseListError { msg: err.msg })?;
            if ratio == Ratio::Original {
                return Err(ParseListError {
                    msg: "\"original\" is always served and cannot be listed".to_string(),
                });
            }
            ratios.push(ratio);
        }
        if ratios.is_empty() {
            return Err(ParseListError {
                msg: format!("Expected ratio list \"1x1,16x9,...\", got {}", s),
            });
        }
        Ok(RatioList(ratios))
    }
}

pub struct WidthList(pub BTreeSet<u32>);

impl FromStr for WidthList {
    type Err = ParseListError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect();
        let parsed: Vec<u32> = parts
            .iter()
            .map_while(|part| part.parse::<u32>().ok())
            .collect();
        if parsed.len() != parts.len() {
            return Err(ParseListError {
                msg: format!("Expected width list \"200,400,...\", got {}", s),
            });
        }
        let widths: BTreeSet<u32> = parsed.into_iter().collect();
        if widths.is_empty() || widths.contains(&0) {
            return Err(ParseListError {
                msg: format!("Expected width list \"200,400,...\", got {}", s),
            });
        }
        Ok(WidthList(widths))
    }
}

pub struct FormatList(pub Vec<OutputFormat>);

impl FromStr for FormatList {
    type Err = ParseListError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut formats = Vec::new();
        for part in s.split(',').map(str::trim).filter(|part| !part.is_empty()) {
            let format = OutputFormat::from_extension(part).ok_or_else(|| ParseListError {
                msg: format!("Unknown output format {}", part),
            })?;
            if !formats.contains(&format) {
                formats.push(format);
            }
        }
        if formats.is_empty() {
            return Err(ParseListError {
                msg: format!("Expected format list \"jpg,png,...\", got {}", s),
            });
        }
        Ok(FormatList(formats))
    }
}

#[derive(Envconfig)]
struct EnvConfig {
    #[envconfig(from = "HOST", default = "0.0.0.0")]
    pub host: String,
    #[envconfig(from = "PORT", default = "3021")]
    pub port: u32,

    // ------------------
    // Crop geometry and output surface
    #[envconfig(from = "RATIOS", default = "1x1,2x1,3x1,3x4,4x3,16x9")]
    pub ratios: RatioList,
    /// Widths persisted in the crop cache (and enumerated on flush)
    #[envconfig(from = "WIDTHS", default = "200,400,800,1200,1600")]
    pub widths: WidthList,
    #[envconfig(from = "MAX_WIDTH", default = "2000")]
    pub max_width: u32,
    #[envconfig(from = "FORMATS", default = "jpg,png,webp")]
    pub formats: FormatList,
    #[envconfig(from = "COMPRESSION_QUALITY", default = "82")]
    pub compression_quality: u8,

    // ------------------
    // Storage and caching settings
    #[envconfig(from = "STORAGE_IMPLEMENTATION", default = "Persistent")]
    pub storage_implementation: StorageImplementation,
    #[envconfig(from = "CROP_CACHE_IMPLEMENTATION", default = "Persistent")]
    pub crop_cache_implementation: CropCacheImplementation,
    /// Count of rendered crops kept by the in-memory cache
    #[envconfig(from = "CROP_CACHE_SIZE", default = "1024")]
    pub crop_cache_size: NonZeroUsize,
    /// Expected count of stored sources, used to size the db cache
    #[envconfig(from = "EXPECTED_SOURCE_COUNT", default = "256")]
    pub expected_source_count: NonZeroUsize,
    /// Persistent db location (directory) for records, sources and crops
    #[envconfig(from = "PERSISTENT_STORAGE_DIR", default = ".cropr-serve")]
    pub persistent_storage_dir: String,

    // ------------------
    // Edge cache flushing
    #[envconfig(from = "CACHE_FLUSH_URL")]
    cache_flush_url: Option<String>,
    #[envconfig(from = "CACHE_FLUSH_TIMEOUT", default = "30")]
    cache_flush_timeout: u32,

    /// Client cache (in browser) duration (in seconds) for served crops
    #[envconfig(from = "CLIENT_CACHE_TTL", default = "31536000")]
    pub client_cache_ttl: usize,

    /// Enable OpenAPI and Swagger docs routes
    #[envconfig(from = "ENABLE_DOCS", default = "true")]
    pub enable_docs: bool,
}

pub struct Config {
    pub host: String,
    pub port: u32,
    pub processor: Processor,
    pub persistent_store: Option<Arc<PersistentStore>>,

    pub client_cache_ttl: usize,
    pub enable_docs: bool,
}

impl Config {
    pub fn from_env() -> Config {
        let env_conf = EnvConfig::init_from_env().unwrap();

        let need_persist_store = env_conf.storage_implementation
            == StorageImplementation::Persistent
            || env_conf.crop_cache_implementation == CropCacheImplementation::Persistent;
        let persistent_store = match need_persist_store {
            true => Some(Arc::new(PersistentStore::new(
                Box::from(Path::new(env_conf.persistent_storage_dir.as_str())),
                {
                    if env_conf.storage_implementation == StorageImplementation::Persistent {
                        env_conf.expected_source_count
                    } else {
                        NonZeroUsize::new(1).unwrap()
                    }
                },
                {
                    if env_conf.crop_cache_implementation == CropCacheImplementation::Persistent {
                        env_conf.crop_cache_size
                    } else {
                        NonZeroUsize::new(1).unwrap()
                    }
                },
            ))),
            false => None,
        };

        info!("Using {} record storage", env_conf.storage_implementation);
        let (records, sources): (Arc<dyn ImageRecords>, Arc<dyn SourceStorage>) =
            match env_conf.storage_implementation {
                StorageImplementation::InMemory => (
                    Arc::new(MemoryRecords::new()),
                    Arc::new(MemorySources::new()),
                ),
                StorageImplementation::Persistent => (
                    Arc::new(FjallRecords::new(persistent_store.clone().unwrap())),
                    Arc::new(FjallSources::new(persistent_store.clone().unwrap())),
                ),
            };

        info!("Using {} crop cache", env_conf.crop_cache_implementation);
        let cache: Arc<dyn CropCache> = match env_conf.crop_cache_implementation {
            CropCacheImplementation::InMemory => {
                Arc::new(MemoryCropCache::new(Some(env_conf.crop_cache_size)))
            }
            CropCacheImplementation::Persistent => {
                Arc::new(PersistentCropCache::new(persistent_store.clone().unwrap()))
            }
            CropCacheImplementation::Disabled => Arc::new(DisabledCropCache),
        };

        let flusher = env_conf.cache_flush_url.map(|url| {
            Arc::new(HttpCacheFlusher::new(
                url,
                Some(env_conf.cache_flush_timeout),
            )) as Arc<dyn CacheFlusher>
        });

        let crop = Arc::new(CropConfig {
            ratios: env_conf.ratios.0,
            widths: env_conf.widths.0,
            max_width: env_conf.max_width,
            formats: env_conf.formats.0,
            quality: env_conf.compression_quality,
        });

        let processor = Processor::new(records, sources, cache, flusher, crop);

        Config {
            host: env_conf.host,
            port: env_conf.port,
            processor,
            persistent_store,
            client_cache_ttl: env_conf.client_cache_ttl,
            enable_docs: env_conf.enable_docs,
        }
    }
}
