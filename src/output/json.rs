use chrono::Utc;
use serde::Serialize;

use crate::app::Result;
use crate::domain::Article;

/// Compact projection for widget/automation consumers.
#[derive(Debug, Serialize)]
pub struct JsonDocument {
    pub updated: String,
    pub count: usize,
    pub items: Vec<JsonItem>,
}

#[derive(Debug, Serialize)]
pub struct JsonItem {
    /// Stable 1-based position in the merged list.
    pub id: usize,
    pub title: String,
    pub site: String,
    pub date: String,
    pub link: String,
    pub body: String,
    pub image: Option<String>,
}

pub fn render(articles: &[Article]) -> Result<Vec<u8>> {
    let items = articles
        .iter()
        .enumerate()
        .map(|(idx, article)| JsonItem {
            id: idx + 1,
            title: article.title.clone(),
            site: article.source_name.clone(),
            date: article.published_at.to_rfc3339(),
            link: article.link.clone(),
            body: article.display_body().to_string(),
            image: if article.has_image() {
                Some(article.image_url.clone())
            } else {
                None
            },
        })
        .collect::<Vec<_>>();

    let document = JsonDocument {
        updated: Utc::now().to_rfc3339(),
        count: items.len(),
        items,
    };

    Ok(serde_json::to_vec_pretty(&document)?)
}
