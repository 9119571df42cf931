//! Pure in-memory merge: dedup, rank by recency, truncate.

use std::collections::HashSet;

use crate::domain::Article;

/// Deduplicate by (link, title) identity — first occurrence wins — then
/// sort by `published_at` descending (stable, so input order breaks
/// ties) and truncate to the output budget.
pub fn merge(articles: Vec<Article>, max_items: usize) -> Vec<Article> {
    let mut seen = HashSet::new();
    let mut merged: Vec<Article> = articles
        .into_iter()
        .filter(|a| seen.insert(a.identity_key()))
        .collect();

    merged.sort_by(|a, b| b.published_at.cmp(&a.published_at));
    merged.truncate(max_items);
    merged
}
