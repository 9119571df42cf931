use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// One normalized feed entry, ready for merging and output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    /// Human-readable origin label: the feed's own title, or its domain.
    pub source_name: String,
    pub title: String,
    /// Join key for dedup and caching. Always non-empty.
    pub link: String,
    pub published_at: DateTime<Utc>,
    /// Markup-stripped, whitespace-collapsed excerpt.
    pub summary_text: String,
    /// Richest markup-bearing field; equals the summary when nothing richer exists.
    pub body_html: String,
    /// Resolved thumbnail URL, or empty when none could be found.
    pub image_url: String,
}

impl Article {
    /// Stable identity key over (link, title) used for deduplication.
    pub fn identity_key(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.link.as_bytes());
        hasher.update(b"|");
        hasher.update(self.title.as_bytes());
        hex::encode(hasher.finalize())
    }

    pub fn has_image(&self) -> bool {
        !self.image_url.is_empty()
    }

    /// Best available body for output, falling back to the plain summary.
    pub fn display_body(&self) -> &str {
        if self.body_html.is_empty() {
            &self.summary_text
        } else {
            &self.body_html
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(link: &str, title: &str) -> Article {
        Article {
            source_name: "Example".into(),
            title: title.into(),
            link: link.into(),
            published_at: Utc::now(),
            summary_text: String::new(),
            body_html: String::new(),
            image_url: String::new(),
        }
    }

    #[test]
    fn test_identity_key_deterministic() {
        let a = article("https://example.com/a", "Title");
        let b = article("https://example.com/a", "Title");
        assert_eq!(a.identity_key(), b.identity_key());
    }

    #[test]
    fn test_identity_key_differs_by_link_and_title() {
        let a = article("https://example.com/a", "Title");
        let b = article("https://example.com/b", "Title");
        let c = article("https://example.com/a", "Other");
        assert_ne!(a.identity_key(), b.identity_key());
        assert_ne!(a.identity_key(), c.identity_key());
    }

    #[test]
    fn test_identity_key_is_hex_sha256() {
        let key = article("https://example.com/a", "Title").identity_key();
        assert_eq!(key.len(), 64);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_display_body_falls_back_to_summary() {
        let mut a = article("https://example.com/a", "Title");
        a.summary_text = "plain".into();
        assert_eq!(a.display_body(), "plain");
        a.body_html = "<p>rich</p>".into();
        assert_eq!(a.display_body(), "<p>rich</p>");
    }
}
