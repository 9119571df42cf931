//! Run orchestration: one bounded task per source, each doing
//! fetch → normalize → fingerprint check → image resolution, then a
//! join barrier and the final merge.

use std::sync::Arc;

use tokio::sync::Semaphore;

use crate::cache::RunCache;
use crate::domain::Article;
use crate::fetcher::{FetchError, Fetcher};
use crate::fingerprint;
use crate::merger;
use crate::normalizer::Normalizer;
use crate::resolver::ImageResolver;

pub const DEFAULT_WORKERS: usize = 12;

/// Per-source failure. Contained and logged by the pipeline; a failing
/// source contributes zero articles but never aborts the run.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("parse failed: {0}")]
    Parse(String),
}

#[derive(Debug, Default, Clone)]
pub struct RunStats {
    pub sources_ok: usize,
    pub sources_failed: usize,
    pub articles_in: usize,
    pub articles_out: usize,
    pub served_from_cache: usize,
}

pub struct Pipeline {
    fetcher: Arc<dyn Fetcher + Send + Sync>,
    normalizer: Normalizer,
    resolver: Arc<ImageResolver>,
    cache: Arc<RunCache>,
    semaphore: Arc<Semaphore>,
    fingerprint_entries: usize,
}

impl Pipeline {
    pub fn new(
        fetcher: Arc<dyn Fetcher + Send + Sync>,
        resolver: Arc<ImageResolver>,
        cache: Arc<RunCache>,
        workers: usize,
        fingerprint_entries: usize,
    ) -> Self {
        Self {
            fetcher,
            normalizer: Normalizer::new(),
            resolver,
            cache,
            semaphore: Arc::new(Semaphore::new(workers)),
            fingerprint_entries,
        }
    }

    /// Process every source concurrently and return the merged,
    /// deduplicated, truncated article list with run statistics.
    pub async fn run(&self, sources: &[String], max_items: usize) -> (Vec<Article>, RunStats) {
        let mut handles = Vec::new();

        for url in sources {
            let fetcher = self.fetcher.clone();
            let normalizer = self.normalizer.clone();
            let resolver = self.resolver.clone();
            let cache = self.cache.clone();
            let semaphore = self.semaphore.clone();
            let url = url.clone();
            let fingerprint_entries = self.fingerprint_entries;

            let handle = tokio::spawn(async move {
                let _permit = semaphore.acquire().await.expect("Semaphore closed");
                let result = process_source(
                    &fetcher,
                    &normalizer,
                    &resolver,
                    &cache,
                    &url,
                    fingerprint_entries,
                )
                .await;
                (url, result)
            });

            handles.push(handle);
        }

        let mut stats = RunStats::default();
        let mut collected = Vec::new();

        // Join barrier: the merge must not run until every source has
        // completed or definitively failed.
        for joined in futures::future::join_all(handles).await {
            match joined {
                Ok((url, Ok(outcome))) => {
                    stats.sources_ok += 1;
                    stats.articles_in += outcome.articles.len();
                    stats.served_from_cache += outcome.served_from_cache;
                    tracing::info!(
                        "{}: {} articles ({} from cache)",
                        url,
                        outcome.articles.len(),
                        outcome.served_from_cache
                    );
                    collected.extend(outcome.articles);
                }
                Ok((url, Err(e))) => {
                    stats.sources_failed += 1;
                    tracing::warn!("Source {} failed: {}", url, e);
                }
                Err(e) => {
                    stats.sources_failed += 1;
                    tracing::error!("Task join error: {}", e);
                }
            }
        }

        let merged = merger::merge(collected, max_items);
        stats.articles_out = merged.len();
        (merged, stats)
    }
}

struct SourceOutcome {
    articles: Vec<Article>,
    served_from_cache: usize,
}

async fn process_source(
    fetcher: &Arc<dyn Fetcher + Send + Sync>,
    normalizer: &Normalizer,
    resolver: &ImageResolver,
    cache: &RunCache,
    url: &str,
    fingerprint_entries: usize,
) -> Result<SourceOutcome, SourceError> {
    let body = fetcher.fetch(url).await?;

    let normalized = normalizer
        .normalize(url, &body)
        .map_err(|e| SourceError::Parse(e.to_string()))?;

    let fingerprint = fingerprint::of_drafts(&normalized.drafts, fingerprint_entries);
    let unchanged = cache.fingerprint(url).as_deref() == Some(fingerprint.as_str());
    if unchanged {
        tracing::debug!("Source {} unchanged since last run", url);
    }

    let mut articles = Vec::with_capacity(normalized.drafts.len());
    let mut served_from_cache = 0;

    for draft in normalized.drafts {
        if unchanged {
            if let Some(cached) = cache.article(&draft.article.link) {
                served_from_cache += 1;
                articles.push(cached);
                continue;
            }
            // Evicted from cache despite the unchanged fingerprint:
            // process fresh rather than dropping the article.
        }

        let image_url = resolver.resolve(&draft).await;
        let mut article = draft.article;
        article.image_url = image_url;
        cache.put_article(&article);
        articles.push(article);
    }

    cache.set_fingerprint(url, fingerprint);

    Ok(SourceOutcome {
        articles,
        served_from_cache,
    })
}
