use std::sync::Arc;

use crate::app::error::Result;
use crate::cache::RunCache;
use crate::config::Config;
use crate::fetcher::{Fetcher, HttpFetcher};
use crate::pipeline::Pipeline;
use crate::resolver::{HttpPageProber, ImageResolver, PageProber};

/// Wires together the run-scoped components: cache, fetcher, resolver
/// and pipeline.
pub struct AppContext {
    pub config: Config,
    pub cache: Arc<RunCache>,
    pub pipeline: Pipeline,
}

impl AppContext {
    pub fn new(config: Config) -> Result<Self> {
        let cache_path = config.cache_path()?;
        let cache = Arc::new(RunCache::load(&cache_path, config.cache.retention_days));

        let fetcher: Arc<dyn Fetcher + Send + Sync> = Arc::new(HttpFetcher::new(&config.fetch));
        let prober: Arc<dyn PageProber + Send + Sync> =
            Arc::new(HttpPageProber::new(&config.fetch));
        let resolver = Arc::new(ImageResolver::new(prober, cache.clone(), &config.resolver));

        let pipeline = Pipeline::new(
            fetcher,
            resolver,
            cache.clone(),
            config.fetch.workers,
            config.fingerprint_entries,
        );

        Ok(Self {
            config,
            cache,
            pipeline,
        })
    }
}
