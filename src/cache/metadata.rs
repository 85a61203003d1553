//! Series metadata, cached.

use super::{LoadingCache, Loader};
use config::RollupConfig;
use constants;
use io::{MetadataStore, StoreError};
use locator::Locator;
use rollup::StatType;
use std::sync::Arc;
use std::time::Duration;

/// Loads metadata records straight from a `MetadataStore`.
pub struct MetadataLoader {
    store: Arc<dyn MetadataStore + Send + Sync>,
}

impl MetadataLoader {
    /// Load from `store`.
    pub fn new(store: Arc<dyn MetadataStore + Send + Sync>) -> MetadataLoader {
        MetadataLoader { store: store }
    }
}

impl Loader<(Locator, String), Option<String>> for MetadataLoader {
    type Error = StoreError;

    fn load(&self, key: &(Locator, String)) -> Result<Option<String>, StoreError> {
        self.store.load(&key.0, &key.1)
    }
}

/// Metadata records keyed by locator and metadata key. An absent record is
/// cached as `None`.
pub type MetadataCache = LoadingCache<(Locator, String), Option<String>, MetadataLoader>;

/// Resolves the statistical type of a series.
pub struct TypeResolver {
    cache: MetadataCache,
}

impl TypeResolver {
    /// Resolve through a fresh cache over `store`.
    pub fn new(
        store: Arc<dyn MetadataStore + Send + Sync>,
        ttl: Duration,
        concurrency: usize,
    ) -> TypeResolver {
        TypeResolver {
            cache: LoadingCache::new(MetadataLoader::new(store), ttl, concurrency),
        }
    }

    /// Resolve through a fresh cache over `store`, sized and aged by
    /// `config.metadata_cache_concurrency` and `config.metadata_cache_ttl`.
    pub fn from_config(
        store: Arc<dyn MetadataStore + Send + Sync>,
        config: &RollupConfig,
    ) -> TypeResolver {
        TypeResolver::new(
            store,
            config.metadata_cache_ttl,
            config.metadata_cache_concurrency,
        )
    }

    /// The type of the series at `locator`
    ///
    /// Series with no recorded type, or a type we do not recognize, are
    /// `StatType::Unknown`. A failing metadata store is reported, not
    /// defaulted.
    pub fn resolve(&self, locator: &Locator) -> Result<StatType, StoreError> {
        let key = (locator.clone(), constants::STAT_TYPE_CACHE_KEY.to_string());
        let record = self.cache.get(&key)?;
        Ok(StatType::from_record(record.as_ref().map(|s| s.as_str())))
    }

    /// The underlying cache.
    pub fn cache(&self) -> &MetadataCache {
        &self.cache
    }
}
