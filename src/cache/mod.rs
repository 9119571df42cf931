//! Run-to-run resolution cache.
//!
//! A single JSON file with three maps: resolved articles by link, image
//! lookups by link (including negative results), and source fingerprints.
//! The cache is a hint, never authoritative: a missing or corrupt file
//! degrades to an empty cache and only costs extra network work.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::Article;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedArticle {
    pub article: Article,
    pub processed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedImage {
    /// `None` records a completed lookup that found no image, so the
    /// page is not probed again on the next run.
    pub url: Option<String>,
    pub processed_at: DateTime<Utc>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CacheFile {
    #[serde(default)]
    articles: HashMap<String, CachedArticle>,
    #[serde(default)]
    images: HashMap<String, CachedImage>,
    #[serde(default)]
    fingerprints: HashMap<String, String>,
}

pub struct RunCache {
    inner: Mutex<CacheFile>,
    path: Option<PathBuf>,
}

impl RunCache {
    /// Load the cache from disk, evicting entries older than the
    /// retention window. Load failures degrade to an empty cache.
    pub fn load(path: &Path, retention_days: i64) -> Self {
        let file = match std::fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str::<CacheFile>(&content) {
                Ok(file) => file,
                Err(e) => {
                    tracing::warn!("Cache file {} is corrupt, starting empty: {}", path.display(), e);
                    CacheFile::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => CacheFile::default(),
            Err(e) => {
                tracing::warn!("Failed to read cache file {}: {}", path.display(), e);
                CacheFile::default()
            }
        };

        let cache = Self {
            inner: Mutex::new(file),
            path: Some(path.to_path_buf()),
        };
        cache.evict_older_than(retention_days);
        cache
    }

    /// An unpersisted cache, used by tests and `clear-cache`.
    pub fn in_memory() -> Self {
        Self {
            inner: Mutex::new(CacheFile::default()),
            path: None,
        }
    }

    pub fn article(&self, link: &str) -> Option<Article> {
        let inner = self.inner.lock().expect("cache lock poisoned");
        inner.articles.get(link).map(|c| c.article.clone())
    }

    pub fn put_article(&self, article: &Article) {
        let mut inner = self.inner.lock().expect("cache lock poisoned");
        inner.articles.insert(
            article.link.clone(),
            CachedArticle {
                article: article.clone(),
                processed_at: Utc::now(),
            },
        );
    }

    /// `Some(Some(url))` = cached hit, `Some(None)` = cached "no image",
    /// `None` = never looked up.
    pub fn image(&self, link: &str) -> Option<Option<String>> {
        let inner = self.inner.lock().expect("cache lock poisoned");
        inner.images.get(link).map(|c| c.url.clone())
    }

    pub fn put_image(&self, link: &str, url: Option<String>) {
        let mut inner = self.inner.lock().expect("cache lock poisoned");
        inner.images.insert(
            link.to_string(),
            CachedImage {
                url,
                processed_at: Utc::now(),
            },
        );
    }

    pub fn fingerprint(&self, source_url: &str) -> Option<String> {
        let inner = self.inner.lock().expect("cache lock poisoned");
        inner.fingerprints.get(source_url).cloned()
    }

    pub fn set_fingerprint(&self, source_url: &str, fingerprint: String) {
        let mut inner = self.inner.lock().expect("cache lock poisoned");
        inner.fingerprints.insert(source_url.to_string(), fingerprint);
    }

    pub fn evict_older_than(&self, retention_days: i64) {
        let cutoff = Utc::now() - Duration::days(retention_days);
        let mut inner = self.inner.lock().expect("cache lock poisoned");
        inner.articles.retain(|_, c| c.processed_at >= cutoff);
        inner.images.retain(|_, c| c.processed_at >= cutoff);
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock().expect("cache lock poisoned");
        *inner = CacheFile::default();
    }

    pub fn len(&self) -> usize {
        let inner = self.inner.lock().expect("cache lock poisoned");
        inner.articles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Persist the cache. Failures are logged and swallowed: an unsaved
    /// cache only makes the next run slower.
    pub fn flush(&self) {
        let Some(path) = &self.path else {
            return;
        };

        let serialized = {
            let inner = self.inner.lock().expect("cache lock poisoned");
            serde_json::to_string(&*inner)
        };

        let result = serialized
            .map_err(std::io::Error::other)
            .and_then(|json| {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(path, json)
            });

        if let Err(e) = result {
            tracing::warn!("Failed to save cache to {}: {}", path.display(), e);
        }
    }
}
