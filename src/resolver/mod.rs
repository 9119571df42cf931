//! Tiered thumbnail resolution.
//!
//! Tier 1: feed-native media metadata (enclosures, media:content,
//! media:thumbnail). Tier 2: first `<img>` in the entry's richest HTML
//! field. Tier 3: Open Graph / Twitter-card metadata scraped from the
//! article page itself, the only network-costly tier, cached by link.

pub mod page;

use std::sync::Arc;

use async_trait::async_trait;
use scraper::{Html, Selector};
use tokio::sync::Semaphore;
use url::Url;

use crate::cache::RunCache;
use crate::config::ResolverConfig;
use crate::fetcher::FetchError;
use crate::normalizer::{Draft, MediaKind};

pub use page::HttpPageProber;

/// Outcome of an image lookup: distinguishes "no image exists" from
/// "lookup errored" even though both degrade to an empty URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageLookup {
    Found(String),
    Absent,
    Failed(String),
}

/// Network seam for tier-3 page probing.
#[async_trait]
pub trait PageProber {
    /// HEAD request; returns the Content-Type header when the server
    /// supplies one.
    async fn head_content_type(&self, url: &str) -> Result<Option<String>, FetchError>;

    /// GET at most `max_bytes` of the page, stopping early once the
    /// closing `</head>` has been seen.
    async fn fetch_head(&self, url: &str, max_bytes: usize) -> Result<String, FetchError>;
}

pub struct ImageResolver {
    prober: Arc<dyn PageProber + Send + Sync>,
    cache: Arc<RunCache>,
    page_permits: Arc<Semaphore>,
    max_page_bytes: usize,
    generous_page_bytes: usize,
    generous_domains: Vec<String>,
}

impl ImageResolver {
    pub fn new(
        prober: Arc<dyn PageProber + Send + Sync>,
        cache: Arc<RunCache>,
        config: &ResolverConfig,
    ) -> Self {
        Self {
            prober,
            cache,
            page_permits: Arc::new(Semaphore::new(config.page_workers)),
            max_page_bytes: config.max_page_bytes,
            generous_page_bytes: config.generous_page_bytes,
            generous_domains: config.generous_domains.clone(),
        }
    }

    /// Resolve a best-effort thumbnail URL for one draft ("" = none).
    ///
    /// A cached lookup for the article's link short-circuits every tier.
    /// The final outcome, found or absent, is written back to the cache.
    pub async fn resolve(&self, draft: &Draft) -> String {
        let link = &draft.article.link;

        if let Some(cached) = self.cache.image(link) {
            tracing::trace!("Image cache hit for {}", link);
            return cached.unwrap_or_default();
        }

        let outcome = if let Some(url) = self.from_feed_media(draft) {
            ImageLookup::Found(url)
        } else if let Some(url) = self.from_markup(draft) {
            ImageLookup::Found(url)
        } else {
            self.from_page(link).await
        };

        let resolved = match outcome {
            ImageLookup::Found(url) => Some(url),
            ImageLookup::Absent => None,
            ImageLookup::Failed(reason) => {
                tracing::debug!("Image lookup failed for {}: {}", link, reason);
                None
            }
        };

        self.cache.put_image(link, resolved.clone());
        resolved.unwrap_or_default()
    }

    /// Tier 1: feed-native media candidates, in harvest order.
    fn from_feed_media(&self, draft: &Draft) -> Option<String> {
        for candidate in &draft.media {
            let Some(url) = normalize_candidate(&candidate.url, &draft.article.link) else {
                continue;
            };

            let declared_image = candidate
                .media_type
                .as_deref()
                .map(|t| t.starts_with("image/"))
                .unwrap_or(false);

            let accept = match candidate.kind {
                MediaKind::Thumbnail => true,
                MediaKind::Content => {
                    declared_image || has_image_extension(&url) || candidate.media_type.is_none()
                }
                MediaKind::Enclosure => declared_image || has_image_extension(&url),
            };

            if accept {
                return Some(url);
            }
        }
        None
    }

    /// Tier 2: first `<img>` in the richest HTML field, document order.
    fn from_markup(&self, draft: &Draft) -> Option<String> {
        let html = &draft.article.body_html;
        if html.is_empty() {
            return None;
        }

        let fragment = Html::parse_fragment(html);
        let selector = Selector::parse("img").ok()?;
        let img = fragment.select(&selector).next()?;
        let src = img.value().attr("src")?;
        normalize_candidate(src, &draft.article.link)
    }

    /// Tier 3: probe the article page for OG / Twitter-card metadata.
    async fn from_page(&self, link: &str) -> ImageLookup {
        let _permit = match self.page_permits.acquire().await {
            Ok(permit) => permit,
            Err(_) => return ImageLookup::Failed("page semaphore closed".into()),
        };

        // HEAD to skip obvious non-HTML targets cheaply. Servers lie or
        // reject HEAD, so anything but a definite non-HTML answer falls
        // through to the GET.
        match self.prober.head_content_type(link).await {
            Ok(Some(content_type)) => {
                let ct = content_type.to_ascii_lowercase();
                if !ct.contains("text/html") && !ct.contains("application/xhtml") {
                    return ImageLookup::Absent;
                }
            }
            Ok(None) | Err(_) => {}
        }

        let budget = self.page_budget(link);
        let html = match self.prober.fetch_head(link, budget).await {
            Ok(html) => html,
            Err(e) => return ImageLookup::Failed(e.to_string()),
        };

        match extract_meta_image(&html, link) {
            Some(url) => ImageLookup::Found(url),
            None => ImageLookup::Absent,
        }
    }

    fn page_budget(&self, link: &str) -> usize {
        let domain = Url::parse(link)
            .ok()
            .and_then(|u| u.host_str().map(String::from))
            .unwrap_or_default();
        if self.generous_domains.iter().any(|d| d == &domain) {
            self.generous_page_bytes
        } else {
            self.max_page_bytes
        }
    }
}

/// Extract the Open Graph or Twitter-card image from a page's head
/// section.
fn extract_meta_image(html: &str, base: &str) -> Option<String> {
    let head = html
        .find("</head>")
        .or_else(|| html.find("</HEAD>"))
        .map(|end| &html[..end + "</head>".len()])
        .unwrap_or(html);

    let document = Html::parse_document(head);
    let selector = Selector::parse("meta").ok()?;

    let mut fallback = None;
    for meta in document.select(&selector) {
        let Some(key) = meta
            .value()
            .attr("property")
            .or_else(|| meta.value().attr("name"))
        else {
            continue;
        };
        let key = key.to_ascii_lowercase();
        let Some(content) = meta.value().attr("content") else {
            continue;
        };
        match key.as_str() {
            "og:image" => {
                if let Some(url) = normalize_candidate(content, base) {
                    return Some(url);
                }
            }
            "twitter:image" | "twitter:image:src" => {
                if fallback.is_none() {
                    fallback = normalize_candidate(content, base);
                }
            }
            _ => {}
        }
    }
    fallback
}

/// Validate and absolutize a candidate image URL. Data URIs are never
/// fetchable resources and are treated as absent; scheme-relative and
/// relative URLs resolve against the article link.
pub fn normalize_candidate(raw: &str, base: &str) -> Option<String> {
    let url = raw.trim();
    if url.is_empty() || is_data_uri(url) {
        return None;
    }

    if let Some(rest) = url.strip_prefix("//") {
        return Some(format!("https://{rest}"));
    }

    if url.starts_with("http://") || url.starts_with("https://") {
        return Some(url.to_string());
    }

    Url::parse(base).ok()?.join(url).ok().map(|u| u.to_string())
}

fn is_data_uri(url: &str) -> bool {
    url.trim().to_ascii_lowercase().starts_with("data:")
}

fn has_image_extension(url: &str) -> bool {
    let path = url.split(['?', '#']).next().unwrap_or(url).to_ascii_lowercase();
    [".jpg", ".jpeg", ".png", ".webp", ".gif"]
        .iter()
        .any(|ext| path.ends_with(ext))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::Utc;

    use crate::domain::Article;
    use crate::normalizer::MediaCandidate;

    /// Prober that records call counts and serves canned responses.
    pub(crate) struct MockProber {
        pub head_calls: AtomicUsize,
        pub get_calls: AtomicUsize,
        pub content_type: Option<String>,
        pub body: Result<String, String>,
    }

    impl MockProber {
        pub fn html(body: &str) -> Self {
            Self {
                head_calls: AtomicUsize::new(0),
                get_calls: AtomicUsize::new(0),
                content_type: Some("text/html; charset=utf-8".into()),
                body: Ok(body.into()),
            }
        }

        pub fn failing() -> Self {
            Self {
                head_calls: AtomicUsize::new(0),
                get_calls: AtomicUsize::new(0),
                content_type: None,
                body: Err("connection refused".into()),
            }
        }
    }

    #[async_trait]
    impl PageProber for MockProber {
        async fn head_content_type(&self, _url: &str) -> Result<Option<String>, FetchError> {
            self.head_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.content_type.clone())
        }

        async fn fetch_head(&self, _url: &str, _max_bytes: usize) -> Result<String, FetchError> {
            self.get_calls.fetch_add(1, Ordering::SeqCst);
            self.body
                .clone()
                .map_err(FetchError::Transport)
        }
    }

    fn resolver_with(prober: Arc<MockProber>) -> ImageResolver {
        ImageResolver::new(
            prober,
            Arc::new(RunCache::in_memory()),
            &ResolverConfig::default(),
        )
    }

    fn draft(link: &str, body_html: &str, media: Vec<MediaCandidate>) -> Draft {
        Draft {
            article: Article {
                source_name: "S".into(),
                title: "T".into(),
                link: link.into(),
                published_at: Utc::now(),
                summary_text: String::new(),
                body_html: body_html.into(),
                image_url: String::new(),
            },
            media,
        }
    }

    fn thumbnail(url: &str) -> MediaCandidate {
        MediaCandidate {
            url: url.into(),
            media_type: None,
            kind: MediaKind::Thumbnail,
        }
    }

    #[tokio::test]
    async fn test_feed_metadata_wins_over_embedded_img() {
        let prober = Arc::new(MockProber::failing());
        let resolver = resolver_with(prober.clone());

        let draft = draft(
            "https://example.com/a",
            r#"<p><img src="https://img.example.com/embedded.jpg"></p>"#,
            vec![thumbnail("https://img.example.com/thumb.jpg")],
        );

        assert_eq!(resolver.resolve(&draft).await, "https://img.example.com/thumb.jpg");
        // Cheap tiers satisfied the lookup: no network
        assert_eq!(prober.head_calls.load(Ordering::SeqCst), 0);
        assert_eq!(prober.get_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_embedded_img_used_when_no_feed_metadata() {
        let resolver = resolver_with(Arc::new(MockProber::failing()));
        let draft = draft(
            "https://example.com/a",
            r#"<p>text</p><img src="https://img.example.com/embedded.jpg">"#,
            vec![],
        );
        assert_eq!(
            resolver.resolve(&draft).await,
            "https://img.example.com/embedded.jpg"
        );
    }

    #[tokio::test]
    async fn test_data_uri_never_accepted() {
        let resolver = resolver_with(Arc::new(MockProber::html("<html><head></head></html>")));
        let draft = draft(
            "https://example.com/a",
            r#"<img src="data:image/png;base64,iVBORw0KGgo=">"#,
            vec![thumbnail("data:image/gif;base64,R0lGOD")],
        );
        assert_eq!(resolver.resolve(&draft).await, "");
    }

    #[tokio::test]
    async fn test_relative_urls_resolved_against_article_link() {
        let resolver = resolver_with(Arc::new(MockProber::failing()));
        let draft = draft(
            "https://example.com/posts/42",
            r#"<img src="/images/cover.png">"#,
            vec![],
        );
        assert_eq!(
            resolver.resolve(&draft).await,
            "https://example.com/images/cover.png"
        );
    }

    #[tokio::test]
    async fn test_scheme_relative_urls_get_https() {
        let resolver = resolver_with(Arc::new(MockProber::failing()));
        let draft = draft(
            "https://example.com/a",
            r#"<img src="//cdn.example.com/x.jpg">"#,
            vec![],
        );
        assert_eq!(resolver.resolve(&draft).await, "https://cdn.example.com/x.jpg");
    }

    #[tokio::test]
    async fn test_page_fallback_extracts_og_image() {
        let prober = Arc::new(MockProber::html(
            r#"<html><head>
                <meta property="og:image" content="https://img.example.com/og.jpg">
            </head><body></body></html>"#,
        ));
        let resolver = resolver_with(prober.clone());

        let draft = draft("https://example.com/a", "", vec![]);
        assert_eq!(resolver.resolve(&draft).await, "https://img.example.com/og.jpg");
        assert_eq!(prober.get_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_twitter_card_is_fallback() {
        let prober = Arc::new(MockProber::html(
            r#"<head><meta name="twitter:image" content="https://img.example.com/tw.jpg"></head>"#,
        ));
        let resolver = resolver_with(prober);
        let draft = draft("https://example.com/a", "", vec![]);
        assert_eq!(resolver.resolve(&draft).await, "https://img.example.com/tw.jpg");
    }

    #[tokio::test]
    async fn test_non_html_head_skips_get() {
        let prober = Arc::new(MockProber {
            head_calls: AtomicUsize::new(0),
            get_calls: AtomicUsize::new(0),
            content_type: Some("application/pdf".into()),
            body: Ok(String::new()),
        });
        let resolver = resolver_with(prober.clone());

        let draft = draft("https://example.com/report.pdf", "", vec![]);
        assert_eq!(resolver.resolve(&draft).await, "");
        assert_eq!(prober.head_calls.load(Ordering::SeqCst), 1);
        assert_eq!(prober.get_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_page_error_degrades_to_no_image() {
        let resolver = resolver_with(Arc::new(MockProber::failing()));
        let draft = draft("https://example.com/a", "", vec![]);
        assert_eq!(resolver.resolve(&draft).await, "");
    }

    #[tokio::test]
    async fn test_cache_short_circuits_all_tiers() {
        let prober = Arc::new(MockProber::html(
            r#"<head><meta property="og:image" content="https://img.example.com/og.jpg"></head>"#,
        ));
        let resolver = resolver_with(prober.clone());
        let draft = draft("https://example.com/a", "", vec![]);

        assert_eq!(resolver.resolve(&draft).await, "https://img.example.com/og.jpg");
        assert_eq!(resolver.resolve(&draft).await, "https://img.example.com/og.jpg");
        // Second resolve came from cache
        assert_eq!(prober.get_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_negative_result_is_cached() {
        let prober = Arc::new(MockProber::html("<head></head>"));
        let resolver = resolver_with(prober.clone());
        let draft = draft("https://example.com/a", "", vec![]);

        assert_eq!(resolver.resolve(&draft).await, "");
        assert_eq!(resolver.resolve(&draft).await, "");
        assert_eq!(prober.get_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_has_image_extension() {
        assert!(has_image_extension("https://x/y.jpg"));
        assert!(has_image_extension("https://x/y.PNG?w=300"));
        assert!(!has_image_extension("https://x/y.mp3"));
        assert!(!has_image_extension("https://x/y"));
    }

    #[test]
    fn test_enclosure_requires_image_evidence() {
        let resolver = resolver_with(Arc::new(MockProber::failing()));
        let audio = draft(
            "https://example.com/a",
            "",
            vec![MediaCandidate {
                url: "https://example.com/episode.mp3".into(),
                media_type: Some("audio/mpeg".into()),
                kind: MediaKind::Enclosure,
            }],
        );
        assert!(resolver.from_feed_media(&audio).is_none());

        let image = draft(
            "https://example.com/a",
            "",
            vec![MediaCandidate {
                url: "https://example.com/cover".into(),
                media_type: Some("image/jpeg".into()),
                kind: MediaKind::Enclosure,
            }],
        );
        assert_eq!(
            resolver.from_feed_media(&image).as_deref(),
            Some("https://example.com/cover")
        );
    }
}
