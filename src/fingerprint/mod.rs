use sha2::{Digest, Sha256};
use url::Url;

use crate::normalizer::Draft;

/// Query parameters that vary per-click without changing the article.
const TRACKING_PARAMS: &[&str] = &["fbclid", "gclid", "igshid", "mc_cid", "mc_eid"];

/// Digest over the first `entries` drafts' (title, stripped link) pairs.
/// Equal fingerprints between runs mean the source has not materially
/// changed and its articles can be served from cache.
pub fn of_drafts(drafts: &[Draft], entries: usize) -> String {
    let mut hasher = Sha256::new();
    for draft in drafts.iter().take(entries) {
        hasher.update(draft.article.title.as_bytes());
        hasher.update([0x1f]);
        hasher.update(strip_tracking_params(&draft.article.link).as_bytes());
        hasher.update([0x1e]);
    }
    hex::encode(hasher.finalize())
}

/// Remove tracking query parameters so reshuffled campaign tags don't
/// invalidate an otherwise unchanged source.
pub fn strip_tracking_params(link: &str) -> String {
    let Ok(mut url) = Url::parse(link) else {
        return link.trim().to_string();
    };

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| !is_tracking_param(k))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    if kept.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(kept);
    }

    url.to_string()
}

fn is_tracking_param(key: &str) -> bool {
    key.starts_with("utm_") || TRACKING_PARAMS.contains(&key)
}
